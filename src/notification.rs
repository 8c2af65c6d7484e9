//! SNMPv1 trap translation (RFC 3584 §3.1).
//!
//! AgentX notifications are SNMPv2 style: the trap is named by the value of
//! `snmpTrapOID.0`. The helpers here map the SNMPv1 generic/specific trap
//! pair onto that value.

use crate::{
    error::Error,
    oid::{known, Oid},
};

/// SNMPv1 generic-trap values (RFC 1157 §4.1.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericTrap {
    ColdStart = 0,
    WarmStart = 1,
    LinkDown = 2,
    LinkUp = 3,
    AuthenticationFailure = 4,
    EgpNeighborLoss = 5,
    EnterpriseSpecific = 6,
}

impl TryFrom<u8> for GenericTrap {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        Ok(match value {
            0 => GenericTrap::ColdStart,
            1 => GenericTrap::WarmStart,
            2 => GenericTrap::LinkDown,
            3 => GenericTrap::LinkUp,
            4 => GenericTrap::AuthenticationFailure,
            5 => GenericTrap::EgpNeighborLoss,
            6 => GenericTrap::EnterpriseSpecific,
            other => {
                return Err(Error::InvalidParameter(format!(
                    "generic trap {} out of range",
                    other
                )))
            }
        })
    }
}

/// Returns the `snmpTrapOID.0` value for an SNMPv1 trap.
///
/// Generic traps map to `snmpTraps.(generic + 1)`. `specific` is only used
/// for enterpriseSpecific, which maps to `enterprises.0.specific`.
pub fn v1_trap_oid(generic: GenericTrap, specific: u32) -> Oid {
    match generic {
        GenericTrap::EnterpriseSpecific => known::enterprises().child(0).child(specific),
        standard => known::snmp_traps().child(standard as u32 + 1),
    }
}
