//! Primitive wire encoding shared by OIDs, values and PDUs.
//!
//! AgentX picks the byte order per message (header flag bit 4). Outbound
//! messages are always written big-endian; inbound ones are read with
//! whichever order the sender announced.

use crate::error::{Error, Result};

/// Byte order of a PDU payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

/// Bounds-checked cursor over a received byte buffer.
///
/// Any read past the end fails with [`Error::Parse`]. After a failure the
/// position is unspecified and the whole frame must be discarded.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8], order: ByteOrder) -> Self {
        Reader { buf, pos: 0, order }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Current offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::Parse(format!(
                "need {} bytes at offset {}, have {}",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take::<2>()?;
        Ok(match self.order {
            ByteOrder::BigEndian => u16::from_be_bytes(b),
            ByteOrder::LittleEndian => u16::from_le_bytes(b),
        })
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take::<4>()?;
        Ok(match self.order {
            ByteOrder::BigEndian => u32::from_be_bytes(b),
            ByteOrder::LittleEndian => u32::from_le_bytes(b),
        })
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.take::<8>()?;
        Ok(match self.order {
            ByteOrder::BigEndian => u64::from_be_bytes(b),
            ByteOrder::LittleEndian => u64::from_le_bytes(b),
        })
    }

    /// Reads an octet string (RFC 2741 §5.3): 4-byte length, data, then
    /// zero padding up to the next 4-byte boundary.
    pub fn read_octet_string(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        let data = self.read_bytes(len)?.to_vec();
        self.skip(padding(len))?;
        Ok(data)
    }
}

/// Number of padding bytes needed after `len` bytes of data.
pub fn padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// Appends an octet string (RFC 2741 §5.3) in network byte order.
pub fn encode_octet_string(buf: &mut Vec<u8>, s: &[u8]) {
    buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
    buf.extend_from_slice(s);
    buf.extend(std::iter::repeat(0u8).take(padding(s.len())));
}
