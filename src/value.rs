//! SNMP values and variable bindings (RFC 2741 §5.4).

use crate::{
    codec::{encode_octet_string, Reader},
    error::{Error, Result},
    oid::Oid,
};

// --- VarBind type constants (RFC 2741 §5.4) ---

const VARBIND_INTEGER: u16 = 2;
const VARBIND_OCTET_STRING: u16 = 4;
const VARBIND_NULL: u16 = 5;
const VARBIND_OBJECT_IDENTIFIER: u16 = 6;
const VARBIND_IP_ADDRESS: u16 = 64;
const VARBIND_COUNTER32: u16 = 65;
const VARBIND_GAUGE32: u16 = 66;
const VARBIND_TIMETICKS: u16 = 67;
const VARBIND_OPAQUE: u16 = 68;
const VARBIND_COUNTER64: u16 = 70;
const VARBIND_NO_SUCH_OBJECT: u16 = 128;
const VARBIND_NO_SUCH_INSTANCE: u16 = 129;
const VARBIND_END_OF_MIB_VIEW: u16 = 130;

/// An SNMP variable binding value.
///
/// The last three variants are exception tags: they carry no data and only
/// appear in Responses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Integer(i32),
    OctetString(Vec<u8>),
    Null,
    ObjectIdentifier(Oid),
    IpAddress([u8; 4]),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Opaque(Vec<u8>),
    Counter64(u64),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

impl Value {
    /// The VarBind type code of this value.
    pub fn type_code(&self) -> u16 {
        match self {
            Value::Integer(_) => VARBIND_INTEGER,
            Value::OctetString(_) => VARBIND_OCTET_STRING,
            Value::Null => VARBIND_NULL,
            Value::ObjectIdentifier(_) => VARBIND_OBJECT_IDENTIFIER,
            Value::IpAddress(_) => VARBIND_IP_ADDRESS,
            Value::Counter32(_) => VARBIND_COUNTER32,
            Value::Gauge32(_) => VARBIND_GAUGE32,
            Value::TimeTicks(_) => VARBIND_TIMETICKS,
            Value::Opaque(_) => VARBIND_OPAQUE,
            Value::Counter64(_) => VARBIND_COUNTER64,
            Value::NoSuchObject => VARBIND_NO_SUCH_OBJECT,
            Value::NoSuchInstance => VARBIND_NO_SUCH_INSTANCE,
            Value::EndOfMibView => VARBIND_END_OF_MIB_VIEW,
        }
    }

    /// True if both values have the same SNMP type.
    pub fn same_type(&self, other: &Value) -> bool {
        self.type_code() == other.type_code()
    }

    /// True for noSuchObject, noSuchInstance and endOfMibView.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }

    /// Converts the value into the OID fragment used when it serves as a
    /// table index (RFC 2578 §7.7).
    ///
    /// Returns the null OID for kinds that cannot be an index.
    pub fn to_index_oid(&self) -> Oid {
        match self {
            Value::Integer(v) if *v >= 0 => Oid::from_slice(&[*v as u32]),
            Value::Gauge32(v) => Oid::from_slice(&[*v]),
            Value::OctetString(bytes) | Value::Opaque(bytes) => {
                let mut subids = Vec::with_capacity(bytes.len() + 1);
                subids.push(bytes.len() as u32);
                subids.extend(bytes.iter().map(|&b| b as u32));
                Oid::from(subids)
            }
            Value::IpAddress(octets) => {
                Oid::from(octets.iter().map(|&b| b as u32).collect::<Vec<_>>())
            }
            Value::ObjectIdentifier(oid) => {
                let mut index = Oid::from_slice(&[oid.len() as u32]);
                index.extend(oid);
                index
            }
            _ => Oid::null(),
        }
    }

    /// Fails if an ObjectIdentifier value cannot be encoded.
    pub fn validate(&self) -> Result<()> {
        match self {
            Value::ObjectIdentifier(oid) => oid.validate(),
            _ => Ok(()),
        }
    }

    /// Appends the data part of the value (without type header).
    fn encode_data(&self, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            Value::Integer(v) => buf.extend_from_slice(&v.to_be_bytes()),
            Value::OctetString(v) | Value::Opaque(v) => encode_octet_string(buf, v),
            Value::IpAddress(v) => encode_octet_string(buf, v),
            Value::ObjectIdentifier(oid) => oid.encode(buf)?,
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => {
                buf.extend_from_slice(&v.to_be_bytes())
            }
            Value::Counter64(v) => buf.extend_from_slice(&v.to_be_bytes()),
            Value::Null | Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {}
        }
        Ok(())
    }

    fn decode_data(type_code: u16, reader: &mut Reader<'_>) -> Result<Value> {
        Ok(match type_code {
            VARBIND_INTEGER => Value::Integer(reader.read_u32()? as i32),
            VARBIND_OCTET_STRING => Value::OctetString(reader.read_octet_string()?),
            VARBIND_NULL => Value::Null,
            VARBIND_OBJECT_IDENTIFIER => Value::ObjectIdentifier(Oid::decode(reader)?),
            VARBIND_IP_ADDRESS => {
                let data = reader.read_octet_string()?;
                let octets: [u8; 4] = data.as_slice().try_into().map_err(|_| {
                    Error::Parse(format!("IpAddress with {} octets", data.len()))
                })?;
                Value::IpAddress(octets)
            }
            VARBIND_COUNTER32 => Value::Counter32(reader.read_u32()?),
            VARBIND_GAUGE32 => Value::Gauge32(reader.read_u32()?),
            VARBIND_TIMETICKS => Value::TimeTicks(reader.read_u32()?),
            VARBIND_OPAQUE => Value::Opaque(reader.read_octet_string()?),
            VARBIND_COUNTER64 => Value::Counter64(reader.read_u64()?),
            VARBIND_NO_SUCH_OBJECT => Value::NoSuchObject,
            VARBIND_NO_SUCH_INSTANCE => Value::NoSuchInstance,
            VARBIND_END_OF_MIB_VIEW => Value::EndOfMibView,
            other => return Err(Error::Parse(format!("unknown VarBind type {}", other))),
        })
    }
}

/// A variable binding (OID + value).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VarBind {
    pub oid: Oid,
    pub value: Value,
}

impl VarBind {
    pub fn new(oid: Oid, value: Value) -> Self {
        VarBind { oid, value }
    }

    /// Encodes the VarBind: type(2) + reserved(2) + name + data.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.oid.validate()?;
        self.value.validate()?;
        buf.extend_from_slice(&self.value.type_code().to_be_bytes());
        buf.extend_from_slice(&[0, 0]); // reserved
        self.oid.encode(buf)?;
        self.value.encode_data(buf)
    }

    pub fn decode(reader: &mut Reader<'_>) -> Result<VarBind> {
        let type_code = reader.read_u16()?;
        reader.skip(2)?;
        let oid = Oid::decode(reader)?;
        let value = Value::decode_data(type_code, reader)?;
        Ok(VarBind { oid, value })
    }
}

/// Encodes a VarBindList.
pub fn encode_varbinds(buf: &mut Vec<u8>, varbinds: &[VarBind]) -> Result<()> {
    for vb in varbinds {
        vb.encode(buf)?;
    }
    Ok(())
}

/// Decodes VarBinds until the reader is exhausted.
pub fn decode_varbinds(reader: &mut Reader<'_>) -> Result<Vec<VarBind>> {
    let mut varbinds = Vec::new();
    while !reader.is_empty() {
        varbinds.push(VarBind::decode(reader)?);
    }
    Ok(varbinds)
}
