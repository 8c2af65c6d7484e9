//! Type-specific PDU payloads (RFC 2741 §6.2).
//!
//! Every body encodes itself in network byte order and decodes with the byte
//! order announced in the header. Decoding consumes exactly the body's own
//! bytes; list-shaped bodies consume the reader to its end.

use super::header::PduType;
use crate::{
    codec::{encode_octet_string, Reader},
    error::{Error, ResponseError, Result},
    oid::Oid,
    value::{decode_varbinds, encode_varbinds, VarBind},
};

/// Default registration priority (RFC 2741 §6.2.3).
pub const DEFAULT_PRIORITY: u8 = 127;

/// Reasons carried in a Close PDU (RFC 2741 §6.2.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Other = 1,
    ParseError = 2,
    ProtocolError = 3,
    Timeouts = 4,
    Shutdown = 5,
    ByManager = 6,
}

impl CloseReason {
    pub fn from_u8(code: u8) -> Result<CloseReason> {
        Ok(match code {
            1 => CloseReason::Other,
            2 => CloseReason::ParseError,
            3 => CloseReason::ProtocolError,
            4 => CloseReason::Timeouts,
            5 => CloseReason::Shutdown,
            6 => CloseReason::ByManager,
            other => return Err(Error::Parse(format!("invalid close reason {}", other))),
        })
    }
}

/// A (start, end) pair bounding a lexicographic search (RFC 2741 §5.2).
///
/// The start OID's include flag selects whether `start` itself may match.
/// A null `end` means "unbounded".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRange {
    pub start: Oid,
    pub end: Oid,
}

impl SearchRange {
    pub fn new(start: Oid, end: Oid) -> Self {
        SearchRange { start, end }
    }

    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.start.encode(buf)?;
        self.end.encode(buf)
    }

    pub fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let start = Oid::decode(reader)?;
        let end = Oid::decode(reader)?;
        Ok(SearchRange { start, end })
    }
}

fn decode_search_ranges(reader: &mut Reader<'_>) -> Result<Vec<SearchRange>> {
    let mut ranges = Vec::new();
    while !reader.is_empty() {
        ranges.push(SearchRange::decode(reader)?);
    }
    Ok(ranges)
}

/// agentx-Open-PDU: timeout(1) + reserved(3) + id + description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenPdu {
    /// Seconds the master should wait for this sub-agent; 0 = no default.
    pub timeout: u8,
    pub id: Oid,
    pub description: Vec<u8>,
}

impl OpenPdu {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.push(self.timeout);
        buf.extend_from_slice(&[0, 0, 0]);
        self.id.encode(buf)?;
        encode_octet_string(buf, &self.description);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let timeout = reader.read_u8()?;
        reader.skip(3)?;
        let id = Oid::decode(reader)?;
        let description = reader.read_octet_string()?;
        Ok(OpenPdu {
            timeout,
            id,
            description,
        })
    }
}

/// agentx-Close-PDU: reason(1) + reserved(3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosePdu {
    pub reason: CloseReason,
}

impl ClosePdu {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(&[self.reason as u8, 0, 0, 0]);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let reason = CloseReason::from_u8(reader.read_u8()?)?;
        reader.skip(3)?;
        Ok(ClosePdu { reason })
    }
}

/// agentx-Register-PDU: timeout(1) + priority(1) + range_subid(1) +
/// reserved(1) + subtree [+ upper_bound(4) when range_subid != 0].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterPdu {
    pub timeout: u8,
    pub priority: u8,
    pub range_subid: u8,
    pub subtree: Oid,
    pub upper_bound: u32,
}

impl RegisterPdu {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(&[self.timeout, self.priority, self.range_subid, 0]);
        self.subtree.encode(buf)?;
        if self.range_subid != 0 {
            buf.extend_from_slice(&self.upper_bound.to_be_bytes());
        }
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let timeout = reader.read_u8()?;
        let priority = reader.read_u8()?;
        let range_subid = reader.read_u8()?;
        reader.skip(1)?;
        let subtree = Oid::decode(reader)?;
        let upper_bound = if range_subid != 0 {
            reader.read_u32()?
        } else {
            0
        };
        Ok(RegisterPdu {
            timeout,
            priority,
            range_subid,
            subtree,
            upper_bound,
        })
    }
}

/// agentx-Unregister-PDU: reserved(1) + priority(1) + range_subid(1) +
/// reserved(1) + subtree [+ upper_bound(4)].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnregisterPdu {
    pub priority: u8,
    pub range_subid: u8,
    pub subtree: Oid,
    pub upper_bound: u32,
}

impl UnregisterPdu {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(&[0, self.priority, self.range_subid, 0]);
        self.subtree.encode(buf)?;
        if self.range_subid != 0 {
            buf.extend_from_slice(&self.upper_bound.to_be_bytes());
        }
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        reader.skip(1)?;
        let priority = reader.read_u8()?;
        let range_subid = reader.read_u8()?;
        reader.skip(1)?;
        let subtree = Oid::decode(reader)?;
        let upper_bound = if range_subid != 0 {
            reader.read_u32()?
        } else {
            0
        };
        Ok(UnregisterPdu {
            priority,
            range_subid,
            subtree,
            upper_bound,
        })
    }
}

/// agentx-Get-PDU: a SearchRangeList whose ending OIDs are all null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetPdu {
    pub names: Vec<Oid>,
}

impl GetPdu {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        for name in &self.names {
            name.encode(buf)?;
            Oid::null().encode(buf)?;
        }
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let names = decode_search_ranges(reader)?
            .into_iter()
            .map(|range| range.start)
            .collect();
        Ok(GetPdu { names })
    }
}

/// agentx-GetNext-PDU: a SearchRangeList.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetNextPdu {
    pub ranges: Vec<SearchRange>,
}

impl GetNextPdu {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        for range in &self.ranges {
            range.encode(buf)?;
        }
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(GetNextPdu {
            ranges: decode_search_ranges(reader)?,
        })
    }
}

/// agentx-GetBulk-PDU: non_repeaters(2) + max_repetitions(2) +
/// SearchRangeList.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetBulkPdu {
    pub non_repeaters: u16,
    pub max_repetitions: u16,
    pub ranges: Vec<SearchRange>,
}

impl GetBulkPdu {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(&self.non_repeaters.to_be_bytes());
        buf.extend_from_slice(&self.max_repetitions.to_be_bytes());
        for range in &self.ranges {
            range.encode(buf)?;
        }
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let non_repeaters = reader.read_u16()?;
        let max_repetitions = reader.read_u16()?;
        Ok(GetBulkPdu {
            non_repeaters,
            max_repetitions,
            ranges: decode_search_ranges(reader)?,
        })
    }
}

/// agentx-AddAgentCaps-PDU: id + description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddAgentCapsPdu {
    pub id: Oid,
    pub description: Vec<u8>,
}

impl AddAgentCapsPdu {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.id.encode(buf)?;
        encode_octet_string(buf, &self.description);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let id = Oid::decode(reader)?;
        let description = reader.read_octet_string()?;
        Ok(AddAgentCapsPdu { id, description })
    }
}

/// agentx-RemoveAgentCaps-PDU: id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveAgentCapsPdu {
    pub id: Oid,
}

/// agentx-Response-PDU: sysUpTime(4) + res.error(2) + res.index(2) +
/// VarBindList.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponsePdu {
    pub sys_up_time: u32,
    pub error: ResponseError,
    /// 1-based position of the offending item; 0 when not applicable.
    pub index: u16,
    pub varbinds: Vec<VarBind>,
}

impl ResponsePdu {
    /// A Response carrying only an error code.
    pub fn error(error: ResponseError, index: u16) -> Self {
        ResponsePdu {
            error,
            index,
            ..Default::default()
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(&self.sys_up_time.to_be_bytes());
        buf.extend_from_slice(&self.error.code().to_be_bytes());
        buf.extend_from_slice(&self.index.to_be_bytes());
        encode_varbinds(buf, &self.varbinds)
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let sys_up_time = reader.read_u32()?;
        let error = ResponseError::from_code(reader.read_u16()?);
        let index = reader.read_u16()?;
        let varbinds = decode_varbinds(reader)?;
        Ok(ResponsePdu {
            sys_up_time,
            error,
            index,
            varbinds,
        })
    }
}

/// The type-specific part of a PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Open(OpenPdu),
    Close(ClosePdu),
    Register(RegisterPdu),
    Unregister(UnregisterPdu),
    Get(GetPdu),
    GetNext(GetNextPdu),
    GetBulk(GetBulkPdu),
    TestSet(Vec<VarBind>),
    CommitSet,
    UndoSet,
    CleanupSet,
    Notify(Vec<VarBind>),
    Ping,
    IndexAllocate(Vec<VarBind>),
    IndexDeallocate(Vec<VarBind>),
    AddAgentCaps(AddAgentCapsPdu),
    RemoveAgentCaps(RemoveAgentCapsPdu),
    Response(ResponsePdu),
}

impl Body {
    pub fn pdu_type(&self) -> PduType {
        match self {
            Body::Open(_) => PduType::Open,
            Body::Close(_) => PduType::Close,
            Body::Register(_) => PduType::Register,
            Body::Unregister(_) => PduType::Unregister,
            Body::Get(_) => PduType::Get,
            Body::GetNext(_) => PduType::GetNext,
            Body::GetBulk(_) => PduType::GetBulk,
            Body::TestSet(_) => PduType::TestSet,
            Body::CommitSet => PduType::CommitSet,
            Body::UndoSet => PduType::UndoSet,
            Body::CleanupSet => PduType::CleanupSet,
            Body::Notify(_) => PduType::Notify,
            Body::Ping => PduType::Ping,
            Body::IndexAllocate(_) => PduType::IndexAllocate,
            Body::IndexDeallocate(_) => PduType::IndexDeallocate,
            Body::AddAgentCaps(_) => PduType::AddAgentCaps,
            Body::RemoveAgentCaps(_) => PduType::RemoveAgentCaps,
            Body::Response(_) => PduType::Response,
        }
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            Body::Open(pdu) => pdu.encode(buf),
            Body::Close(pdu) => pdu.encode(buf),
            Body::Register(pdu) => pdu.encode(buf),
            Body::Unregister(pdu) => pdu.encode(buf),
            Body::Get(pdu) => pdu.encode(buf),
            Body::GetNext(pdu) => pdu.encode(buf),
            Body::GetBulk(pdu) => pdu.encode(buf),
            Body::TestSet(vbs)
            | Body::Notify(vbs)
            | Body::IndexAllocate(vbs)
            | Body::IndexDeallocate(vbs) => encode_varbinds(buf, vbs),
            Body::CommitSet | Body::UndoSet | Body::CleanupSet | Body::Ping => Ok(()),
            Body::AddAgentCaps(pdu) => pdu.encode(buf),
            Body::RemoveAgentCaps(pdu) => pdu.id.encode(buf),
            Body::Response(pdu) => pdu.encode(buf),
        }
    }

    pub(crate) fn decode(pdu_type: PduType, reader: &mut Reader<'_>) -> Result<Body> {
        Ok(match pdu_type {
            PduType::Open => Body::Open(OpenPdu::decode(reader)?),
            PduType::Close => Body::Close(ClosePdu::decode(reader)?),
            PduType::Register => Body::Register(RegisterPdu::decode(reader)?),
            PduType::Unregister => Body::Unregister(UnregisterPdu::decode(reader)?),
            PduType::Get => Body::Get(GetPdu::decode(reader)?),
            PduType::GetNext => Body::GetNext(GetNextPdu::decode(reader)?),
            PduType::GetBulk => Body::GetBulk(GetBulkPdu::decode(reader)?),
            PduType::TestSet => Body::TestSet(decode_varbinds(reader)?),
            PduType::CommitSet => Body::CommitSet,
            PduType::UndoSet => Body::UndoSet,
            PduType::CleanupSet => Body::CleanupSet,
            PduType::Notify => Body::Notify(decode_varbinds(reader)?),
            PduType::Ping => Body::Ping,
            PduType::IndexAllocate => Body::IndexAllocate(decode_varbinds(reader)?),
            PduType::IndexDeallocate => Body::IndexDeallocate(decode_varbinds(reader)?),
            PduType::AddAgentCaps => Body::AddAgentCaps(AddAgentCapsPdu::decode(reader)?),
            PduType::RemoveAgentCaps => Body::RemoveAgentCaps(RemoveAgentCapsPdu {
                id: Oid::decode(reader)?,
            }),
            PduType::Response => Body::Response(ResponsePdu::decode(reader)?),
        })
    }
}
