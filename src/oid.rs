//! SNMP Object Identifiers.
//!
//! An [`Oid`] is an ordered sequence of 32-bit sub-identifiers. OIDs order
//! lexicographically, and a strict prefix sorts before any of its
//! extensions, so an `Oid` can key a sorted map and drive GetNext successor
//! searches directly.
//!
//! The `include` flag is only meaningful on the wire (the starting OID of a
//! SearchRange). It takes no part in equality, ordering or hashing.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    codec::Reader,
    error::{Error, Result},
};

/// Maximum number of sub-identifiers in an OID (RFC 2578 §3.5).
pub const MAX_SUBIDS: usize = 128;

/// An SNMP Object Identifier.
#[derive(Clone, Debug, Default)]
pub struct Oid {
    subids: Vec<u32>,
    include: bool,
}

impl Oid {
    /// The null OID: no sub-identifiers.
    pub fn null() -> Self {
        Oid::default()
    }

    /// Creates a new OID from a slice of sub-identifiers.
    pub fn from_slice(subs: &[u32]) -> Self {
        Oid {
            subids: subs.to_vec(),
            include: false,
        }
    }

    /// Parses `suffix` and appends it to `prefix`.
    ///
    /// ```
    /// use agentx_subagent::oid::Oid;
    /// let base: Oid = "1.3.6.1".parse().unwrap();
    /// let oid = Oid::with_suffix(&base, "4.1").unwrap();
    /// assert_eq!(oid.to_string(), "1.3.6.1.4.1");
    /// ```
    pub fn with_suffix(prefix: &Oid, suffix: &str) -> Result<Self> {
        let tail: Oid = suffix.parse()?;
        let oid = prefix.join(&tail);
        if oid.len() > MAX_SUBIDS {
            return Err(Error::InvalidParameter(format!(
                "OID longer than {} sub-identifiers",
                MAX_SUBIDS
            )));
        }
        Ok(oid)
    }

    /// Returns a new OID made of `self` followed by `other`.
    pub fn join(&self, other: &Oid) -> Oid {
        let mut subids = Vec::with_capacity(self.len() + other.len());
        subids.extend_from_slice(&self.subids);
        subids.extend_from_slice(&other.subids);
        Oid {
            subids,
            include: self.include,
        }
    }

    /// Returns a new OID with one more sub-identifier.
    pub fn child(&self, subid: u32) -> Oid {
        let mut oid = self.clone();
        oid.subids.push(subid);
        oid
    }

    pub fn push(&mut self, subid: u32) {
        self.subids.push(subid);
    }

    pub fn extend(&mut self, other: &Oid) {
        self.subids.extend_from_slice(&other.subids);
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.subids
    }

    /// Returns the number of sub-identifiers.
    pub fn len(&self) -> usize {
        self.subids.len()
    }

    /// Returns true if the OID has no sub-identifiers.
    pub fn is_empty(&self) -> bool {
        self.subids.is_empty()
    }

    /// True for the null OID. The include flag is ignored.
    pub fn is_null(&self) -> bool {
        self.subids.is_empty()
    }

    pub fn include(&self) -> bool {
        self.include
    }

    pub fn set_include(&mut self, include: bool) {
        self.include = include;
    }

    pub fn with_include(mut self, include: bool) -> Self {
        self.include = include;
        self
    }

    /// True if `other` lies in the subtree rooted at `self`, i.e. `self` is
    /// a prefix of (or equal to) `other`.
    pub fn contains(&self, other: &Oid) -> bool {
        other.subids.starts_with(&self.subids)
    }

    /// Fails with [`Error::InvalidParameter`] if the OID is longer than
    /// [`MAX_SUBIDS`], the most [`Oid::decode`] accepts.
    pub fn validate(&self) -> Result<()> {
        if self.subids.len() > MAX_SUBIDS {
            return Err(Error::InvalidParameter(format!(
                "OID with {} sub-identifiers exceeds maximum of {}",
                self.subids.len(),
                MAX_SUBIDS
            )));
        }
        Ok(())
    }

    /// Encodes the OID per RFC 2741 §5.1.
    ///
    /// Format: n_subid(1) + prefix(1) + include(1) + reserved(1) +
    /// sub-identifiers(4 each). The prefix optimisation is never applied
    /// on output. Nothing is written if the OID fails [`Oid::validate`].
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.validate()?;
        buf.reserve(4 + self.subids.len() * 4);
        buf.push(self.subids.len() as u8);
        buf.push(0); // prefix
        buf.push(u8::from(self.include));
        buf.push(0); // reserved
        for &sub in &self.subids {
            buf.extend_from_slice(&sub.to_be_bytes());
        }
        Ok(())
    }

    /// Convenience wrapper around [`Oid::encode`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Decodes an OID, expanding a non-zero prefix to `1.3.6.1.<prefix>`.
    pub fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let n_subid = reader.read_u8()? as usize;
        let prefix = reader.read_u8()?;
        let include = reader.read_u8()? != 0;
        reader.skip(1)?;

        let total = n_subid + if prefix > 0 { 5 } else { 0 };
        if total > MAX_SUBIDS {
            return Err(Error::Parse(format!(
                "OID with {} sub-identifiers exceeds maximum of {}",
                total, MAX_SUBIDS
            )));
        }

        let mut subids = Vec::with_capacity(total);
        if prefix > 0 {
            subids.extend_from_slice(&[1, 3, 6, 1, prefix as u32]);
        }
        for _ in 0..n_subid {
            subids.push(reader.read_u32()?);
        }

        Ok(Oid { subids, include })
    }
}

impl PartialEq for Oid {
    fn eq(&self, other: &Self) -> bool {
        self.subids == other.subids
    }
}

impl Eq for Oid {}

impl Hash for Oid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.subids.hash(state);
    }
}

impl Ord for Oid {
    fn cmp(&self, other: &Self) -> Ordering {
        // Slice ordering is lexicographic with shorter prefixes first.
        self.subids.cmp(&other.subids)
    }
}

impl PartialOrd for Oid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<&[u32]> for Oid {
    fn from(subs: &[u32]) -> Self {
        Oid::from_slice(subs)
    }
}

impl From<Vec<u32>> for Oid {
    fn from(subids: Vec<u32>) -> Self {
        Oid {
            subids,
            include: false,
        }
    }
}

impl FromStr for Oid {
    type Err = Error;

    /// Parses dotted notation such as `1.3.6.1.4.1`. A single leading dot is
    /// accepted; the empty string gives the null OID.
    fn from_str(s: &str) -> Result<Self> {
        let body = s.strip_prefix('.').unwrap_or(s);
        if body.is_empty() {
            return Ok(Oid::null());
        }

        let mut subids = Vec::new();
        for part in body.split('.') {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::InvalidParameter(format!("malformed OID '{}'", s)));
            }
            let subid = part.parse::<u32>().map_err(|_| {
                Error::InvalidParameter(format!("sub-identifier {} out of range in '{}'", part, s))
            })?;
            subids.push(subid);
        }

        if subids.len() > MAX_SUBIDS {
            return Err(Error::InvalidParameter(format!(
                "OID longer than {} sub-identifiers",
                MAX_SUBIDS
            )));
        }
        Ok(Oid::from(subids))
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.subids.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl Serialize for Oid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Oid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Well-known OIDs (RFC 1155, RFC 1907).
pub mod known {
    use super::Oid;

    fn under(base: Oid, suffix: &[u32]) -> Oid {
        base.join(&Oid::from_slice(suffix))
    }

    pub fn ccitt() -> Oid {
        Oid::from_slice(&[0])
    }
    pub fn iso() -> Oid {
        Oid::from_slice(&[1])
    }
    pub fn joint_iso_ccitt() -> Oid {
        Oid::from_slice(&[2])
    }
    pub fn org() -> Oid {
        under(iso(), &[3])
    }
    pub fn dod() -> Oid {
        under(org(), &[6])
    }
    pub fn internet() -> Oid {
        under(dod(), &[1])
    }
    pub fn directory() -> Oid {
        under(internet(), &[1])
    }
    pub fn mgmt() -> Oid {
        under(internet(), &[2])
    }
    pub fn experimental() -> Oid {
        under(internet(), &[3])
    }
    pub fn private() -> Oid {
        under(internet(), &[4])
    }
    pub fn enterprises() -> Oid {
        under(private(), &[1])
    }
    /// snmpMIBObjects: 1.3.6.1.6.3.1.1
    pub fn snmp_mib_objects() -> Oid {
        under(internet(), &[6, 3, 1, 1])
    }
    /// snmpTrapOID: 1.3.6.1.6.3.1.1.4.1
    pub fn snmp_trap_oid() -> Oid {
        under(snmp_mib_objects(), &[4, 1])
    }
    /// snmpTraps: 1.3.6.1.6.3.1.1.5
    pub fn snmp_traps() -> Oid {
        under(snmp_mib_objects(), &[5])
    }
    /// sysUpTime: 1.3.6.1.2.1.1.3
    pub fn sys_up_time() -> Oid {
        under(mgmt(), &[1, 1, 3])
    }
}
