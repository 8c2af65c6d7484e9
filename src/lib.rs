//! AgentX sub-agent - RFC 2741 protocol support for SNMP sub-agents.
//!
//! This crate connects to an SNMP master agent (for example net-snmp's
//! snmpd) over its AgentX socket, registers MIB regions and serves Get,
//! GetNext, GetBulk and Set requests from a sorted map of variables.
//!
//! # Usage
//!
//! ```no_run
//! use agentx_subagent::{
//!     configuration::SessionConfig,
//!     session::Session,
//!     value::Value,
//!     variable::{shared, Scalar},
//! };
//!
//! # fn main() -> agentx_subagent::Result<()> {
//! let mut session = Session::new(SessionConfig::new("example sub-agent"));
//! session.connect()?;
//! let root: agentx_subagent::Oid = "1.3.6.1.4.1.8072.9999".parse()?;
//! session.register(&root)?;
//! session.add_variable(root.child(1).child(0), shared(Scalar::new(Value::Integer(42))))?;
//! # Ok(())
//! # }
//! ```

/// Tokio runner for a session.
pub mod agent;
/// Primitive wire encoding helpers.
pub mod codec;
/// Session settings.
pub mod configuration;
/// Error types.
pub mod error;
/// Variable map and request semantics.
pub mod mib;
/// SNMPv1 trap helpers.
pub mod notification;
/// Object identifiers.
pub mod oid;
/// PDU types and framing.
pub mod pdu;
/// Session state machine.
pub mod session;
/// Conceptual tables.
pub mod table;
/// Stream transports.
pub mod transport;
/// SNMP values and variable bindings.
pub mod value;
/// Variable capability and stock implementations.
pub mod variable;

pub use error::{Error, Result};
pub use oid::Oid;
