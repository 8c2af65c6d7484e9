//! The 20-byte AgentX PDU header (RFC 2741 §6.1).
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |   h.version   |    h.type     |    h.flags    |  <reserved>   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                          h.sessionID                          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        h.transactionID                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                          h.packetID                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        h.payload_length                       |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use crate::{
    codec::{ByteOrder, Reader},
    error::{Error, Result},
};

/// AgentX protocol version.
pub const AGENTX_VERSION: u8 = 1;

/// PDU header size in bytes.
pub const HEADER_SIZE: usize = 20;

/// Largest payload accepted from the master agent.
pub const MAX_PAYLOAD_SIZE: usize = 1 << 20;

const FLAG_INSTANCE_REGISTRATION: u8 = 1 << 0;
const FLAG_NEW_INDEX: u8 = 1 << 1;
const FLAG_ANY_INDEX: u8 = 1 << 2;
const FLAG_NON_DEFAULT_CONTEXT: u8 = 1 << 3;
const FLAG_NETWORK_BYTE_ORDER: u8 = 1 << 4;

/// PDU type codes (RFC 2741 §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PduType {
    Open = 1,
    Close = 2,
    Register = 3,
    Unregister = 4,
    Get = 5,
    GetNext = 6,
    GetBulk = 7,
    TestSet = 8,
    CommitSet = 9,
    UndoSet = 10,
    CleanupSet = 11,
    Notify = 12,
    Ping = 13,
    IndexAllocate = 14,
    IndexDeallocate = 15,
    AddAgentCaps = 16,
    RemoveAgentCaps = 17,
    Response = 18,
}

impl PduType {
    pub fn from_u8(code: u8) -> Option<PduType> {
        Some(match code {
            1 => PduType::Open,
            2 => PduType::Close,
            3 => PduType::Register,
            4 => PduType::Unregister,
            5 => PduType::Get,
            6 => PduType::GetNext,
            7 => PduType::GetBulk,
            8 => PduType::TestSet,
            9 => PduType::CommitSet,
            10 => PduType::UndoSet,
            11 => PduType::CleanupSet,
            12 => PduType::Notify,
            13 => PduType::Ping,
            14 => PduType::IndexAllocate,
            15 => PduType::IndexDeallocate,
            16 => PduType::AddAgentCaps,
            17 => PduType::RemoveAgentCaps,
            18 => PduType::Response,
            _ => return None,
        })
    }

    /// Whether a non-default context may follow the header.
    pub fn has_context(self) -> bool {
        !matches!(
            self,
            PduType::Open
                | PduType::Close
                | PduType::CommitSet
                | PduType::UndoSet
                | PduType::CleanupSet
                | PduType::Response
        )
    }
}

/// Header flag bits 0-3. Bit 4 (byte order) is not stored: outbound PDUs
/// are always big-endian.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub instance_registration: bool,
    pub new_index: bool,
    pub any_index: bool,
    pub non_default_context: bool,
}

impl Flags {
    fn from_byte(b: u8) -> Self {
        Flags {
            instance_registration: b & FLAG_INSTANCE_REGISTRATION != 0,
            new_index: b & FLAG_NEW_INDEX != 0,
            any_index: b & FLAG_ANY_INDEX != 0,
            non_default_context: b & FLAG_NON_DEFAULT_CONTEXT != 0,
        }
    }

    fn to_byte(self) -> u8 {
        let mut b = FLAG_NETWORK_BYTE_ORDER;
        if self.instance_registration {
            b |= FLAG_INSTANCE_REGISTRATION;
        }
        if self.new_index {
            b |= FLAG_NEW_INDEX;
        }
        if self.any_index {
            b |= FLAG_ANY_INDEX;
        }
        if self.non_default_context {
            b |= FLAG_NON_DEFAULT_CONTEXT;
        }
        b
    }
}

/// Header fields that identify a PDU. The type and payload length are
/// derived from the body when serializing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    pub flags: Flags,
    pub session_id: u32,
    pub transaction_id: u32,
    pub packet_id: u32,
}

/// A decoded header together with the framing information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Raw type code; may not be a known [`PduType`].
    pub pdu_type: u8,
    pub header: Header,
    pub byte_order: ByteOrder,
    pub payload_length: u32,
}

/// Appends a header for a payload of `payload_length` bytes.
pub(crate) fn encode_header(
    buf: &mut Vec<u8>,
    pdu_type: PduType,
    header: &Header,
    payload_length: u32,
) {
    buf.push(AGENTX_VERSION);
    buf.push(pdu_type as u8);
    buf.push(header.flags.to_byte());
    buf.push(0); // reserved
    buf.extend_from_slice(&header.session_id.to_be_bytes());
    buf.extend_from_slice(&header.transaction_id.to_be_bytes());
    buf.extend_from_slice(&header.packet_id.to_be_bytes());
    buf.extend_from_slice(&payload_length.to_be_bytes());
}

/// Decodes an AgentX PDU header from the first 20 bytes of `buf`.
pub fn decode_header(buf: &[u8]) -> Result<FrameHeader> {
    if buf.len() < HEADER_SIZE {
        return Err(Error::Parse(format!("Header too short: {} bytes", buf.len())));
    }
    if buf[0] != AGENTX_VERSION {
        return Err(Error::Version(buf[0]));
    }

    let byte_order = if buf[2] & FLAG_NETWORK_BYTE_ORDER != 0 {
        ByteOrder::BigEndian
    } else {
        ByteOrder::LittleEndian
    };

    let mut reader = Reader::new(&buf[4..HEADER_SIZE], byte_order);
    let session_id = reader.read_u32()?;
    let transaction_id = reader.read_u32()?;
    let packet_id = reader.read_u32()?;
    let payload_length = reader.read_u32()?;

    if payload_length % 4 != 0 {
        return Err(Error::Parse(format!(
            "payload length {} is not a multiple of 4",
            payload_length
        )));
    }
    if payload_length as usize > MAX_PAYLOAD_SIZE {
        return Err(Error::Parse(format!(
            "payload length {} exceeds maximum of {}",
            payload_length, MAX_PAYLOAD_SIZE
        )));
    }

    Ok(FrameHeader {
        pdu_type: buf[1],
        header: Header {
            flags: Flags::from_byte(buf[2]),
            session_id,
            transaction_id,
            packet_id,
        },
        byte_order,
        payload_length,
    })
}

/// Returns the total length of the frame starting at `buf`, or `None` if
/// fewer than 20 bytes are buffered.
pub fn frame_len(buf: &[u8]) -> Option<usize> {
    if buf.len() < HEADER_SIZE {
        return None;
    }
    let len = [buf[16], buf[17], buf[18], buf[19]];
    let payload = if buf[2] & FLAG_NETWORK_BYTE_ORDER != 0 {
        u32::from_be_bytes(len)
    } else {
        u32::from_le_bytes(len)
    };
    Some(HEADER_SIZE + payload as usize)
}
