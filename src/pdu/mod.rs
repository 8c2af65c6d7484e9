//! AgentX PDU framing (RFC 2741 §6).
//!
//! A [`Pdu`] is a header, an optional non-default context and a
//! type-specific [`Body`]. [`Pdu::serialize`] always produces network byte
//! order; [`Pdu::parse`] accepts either order.

mod bodies;
mod header;

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, OnceLock,
};

pub use bodies::{
    AddAgentCapsPdu, Body, CloseReason, ClosePdu, GetBulkPdu, GetNextPdu, GetPdu, OpenPdu,
    RegisterPdu, RemoveAgentCapsPdu, ResponsePdu, SearchRange, UnregisterPdu, DEFAULT_PRIORITY,
};
pub use header::{
    decode_header, frame_len, Flags, FrameHeader, Header, PduType, AGENTX_VERSION, HEADER_SIZE,
    MAX_PAYLOAD_SIZE,
};

use crate::{
    codec::{encode_octet_string, Reader},
    error::{Error, Result},
};

/// Source of packet IDs.
///
/// IDs start at 1 and increase by one per call, wrapping at `u32::MAX`.
/// A process-wide instance is available through [`PacketIdCounter::shared`];
/// sessions may also own their own counter.
#[derive(Debug, Default)]
pub struct PacketIdCounter(AtomicU32);

impl PacketIdCounter {
    pub fn new() -> Self {
        PacketIdCounter(AtomicU32::new(0))
    }

    /// Returns the next packet ID.
    pub fn next(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Restarts the sequence so the next ID is 1.
    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }

    /// The process-wide counter.
    pub fn shared() -> Arc<PacketIdCounter> {
        static SHARED: OnceLock<Arc<PacketIdCounter>> = OnceLock::new();
        SHARED
            .get_or_init(|| Arc::new(PacketIdCounter::new()))
            .clone()
    }
}

/// A complete AgentX PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    pub header: Header,
    /// Non-default context; only carried by types that support one.
    pub context: Option<Vec<u8>>,
    pub body: Body,
}

impl Pdu {
    /// Creates a PDU with a fresh packet ID from the shared counter.
    pub fn new(body: Body) -> Self {
        Pdu::with_counter(body, &PacketIdCounter::shared())
    }

    /// Creates a PDU with a fresh packet ID from `counter`.
    pub fn with_counter(body: Body, counter: &PacketIdCounter) -> Self {
        Pdu {
            header: Header {
                packet_id: counter.next(),
                ..Header::default()
            },
            context: None,
            body,
        }
    }

    /// Builds the Response to a request, echoing its session, transaction
    /// and packet IDs.
    pub fn response(request: &Header, response: ResponsePdu) -> Self {
        Pdu {
            header: Header {
                flags: Flags::default(),
                session_id: request.session_id,
                transaction_id: request.transaction_id,
                packet_id: request.packet_id,
            },
            context: None,
            body: Body::Response(response),
        }
    }

    pub fn pdu_type(&self) -> PduType {
        self.body.pdu_type()
    }

    pub fn packet_id(&self) -> u32 {
        self.header.packet_id
    }

    /// Encodes the PDU in network byte order.
    ///
    /// A context on a type that cannot carry one is dropped. Fails with
    /// [`Error::InvalidParameter`] if an OID in the PDU is longer than
    /// [`Pdu::parse`] would accept.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let pdu_type = self.pdu_type();
        let context = self.context.as_ref().filter(|_| pdu_type.has_context());

        let mut payload = Vec::new();
        if let Some(context) = context {
            encode_octet_string(&mut payload, context);
        }
        self.body.encode(&mut payload)?;

        let mut header = self.header;
        header.flags.non_default_context = context.is_some();

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
        header::encode_header(&mut buf, pdu_type, &header, payload.len() as u32);
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decodes exactly one PDU from `buf`.
    ///
    /// `buf` must hold the whole frame and nothing else.
    pub fn parse(buf: &[u8]) -> Result<Pdu> {
        let frame = decode_header(buf)?;
        let expected = HEADER_SIZE + frame.payload_length as usize;
        if buf.len() != expected {
            return Err(Error::Parse(format!(
                "frame is {} bytes, header announces {}",
                buf.len(),
                expected
            )));
        }
        let pdu_type = PduType::from_u8(frame.pdu_type)
            .ok_or_else(|| Error::Parse(format!("unknown PDU type {}", frame.pdu_type)))?;

        let mut reader = Reader::new(&buf[HEADER_SIZE..], frame.byte_order);
        let context = if frame.header.flags.non_default_context && pdu_type.has_context() {
            Some(reader.read_octet_string()?)
        } else {
            None
        };
        let body = Body::decode(pdu_type, &mut reader)?;
        if !reader.is_empty() {
            return Err(Error::Parse(format!(
                "{} trailing bytes after {:?} body",
                reader.remaining(),
                pdu_type
            )));
        }

        Ok(Pdu {
            header: frame.header,
            context,
            body,
        })
    }
}
