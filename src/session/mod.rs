//! Sub-agent side of an AgentX session (RFC 2741 §7.1).
//!
//! A [`Session`] owns the transport to the master agent, the registrations
//! made through it and the variables it serves. All protocol traffic runs
//! on the caller's thread: requests block in [`Session::wait_for_response`],
//! which keeps serving inbound master requests while it waits.

mod dispatch;

use std::{
    collections::HashMap,
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    configuration::SessionConfig,
    error::{check_response, Error, ResponseError, Result},
    mib::VariableMap,
    oid::{known, Oid},
    pdu::{
        AddAgentCapsPdu, Body, ClosePdu, CloseReason, Flags, Header, OpenPdu, PacketIdCounter,
        Pdu, RegisterPdu, RemoveAgentCapsPdu, ResponsePdu, UnregisterPdu, DEFAULT_PRIORITY,
    },
    transport::{Transport, UnixTransport},
    value::{Value, VarBind},
    variable::SharedVariable,
};

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Disconnected,
    Connected,
}

/// A MIB region registered with the master agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub subtree: Oid,
    pub priority: u8,
    pub range_subid: u8,
    pub upper_bound: u32,
    pub timeout: u8,
}

impl Registration {
    /// True for a plain subtree registration without a range.
    pub fn is_plain(&self) -> bool {
        self.range_subid == 0
    }

    fn unregister_pdu(&self) -> UnregisterPdu {
        UnregisterPdu {
            priority: self.priority,
            range_subid: self.range_subid,
            subtree: self.subtree.clone(),
            upper_bound: self.upper_bound,
        }
    }
}

/// Sub-agent session with an AgentX master agent.
pub struct Session {
    transport: Box<dyn Transport>,
    config: SessionConfig,
    state: State,
    session_id: u32,
    registrations: Vec<Registration>,
    variables: VariableMap,
    /// Outstanding requests by packet ID; filled when the Response arrives.
    pending: HashMap<u32, Option<Pdu>>,
    packet_ids: Arc<PacketIdCounter>,
}

impl Session {
    /// Creates a disconnected session talking to `config.socket_path`.
    pub fn new(config: SessionConfig) -> Self {
        let transport = UnixTransport::new(&config.socket_path);
        Session::with_transport(config, Box::new(transport))
    }

    /// Creates a disconnected session over an arbitrary transport.
    pub fn with_transport(config: SessionConfig, transport: Box<dyn Transport>) -> Self {
        Session {
            transport,
            config,
            state: State::Disconnected,
            session_id: 0,
            registrations: Vec::new(),
            variables: VariableMap::new(),
            pending: HashMap::new(),
            packet_ids: PacketIdCounter::shared(),
        }
    }

    /// Replaces the process-wide packet ID counter with `counter`.
    pub fn with_packet_ids(mut self, counter: Arc<PacketIdCounter>) -> Self {
        self.packet_ids = counter;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == State::Connected
    }

    /// The master-assigned session ID, while connected.
    pub fn session_id(&self) -> Option<u32> {
        self.is_connected().then_some(self.session_id)
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn variables(&self) -> &VariableMap {
        &self.variables
    }

    // --- Lifecycle ---

    /// Opens the transport and the AgentX session. Does nothing when
    /// already connected.
    ///
    /// Registrations and variables from an earlier connection are dropped
    /// once the master has accepted the Open.
    pub fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        self.transport.connect().map_err(Error::Connect)?;

        match self.open() {
            Ok(session_id) => {
                self.session_id = session_id;
                self.registrations.clear();
                self.variables.clear();
                self.state = State::Connected;
                log::info!(
                    "AgentX session opened (session_id={}, socket={})",
                    session_id,
                    self.config.socket_path
                );
                Ok(())
            }
            Err(e) => {
                self.transport.close();
                self.pending.clear();
                log::warn!("AgentX Open failed: {}", e);
                Err(e)
            }
        }
    }

    fn open(&mut self) -> Result<u32> {
        let body = Body::Open(OpenPdu {
            timeout: self.config.default_timeout,
            id: self.config.id.clone(),
            description: self.config.description.as_bytes().to_vec(),
        });
        let pdu = Pdu::with_counter(body, &self.packet_ids);
        let packet_id = pdu.packet_id();
        self.send(&pdu)?;
        let (header, response) =
            into_response(self.wait_for_response(packet_id, self.config.response_timeout())?)?;
        check_response(response.error, &[ResponseError::OpenFailed])?;
        Ok(header.session_id)
    }

    /// Closes the session with `reason`. Does nothing when disconnected.
    ///
    /// Registrations are withdrawn first. Failures along the way are logged
    /// and the transport is closed regardless.
    pub fn disconnect(&mut self, reason: CloseReason) {
        if !self.is_connected() {
            return;
        }

        for registration in std::mem::take(&mut self.registrations) {
            let body = Body::Unregister(registration.unregister_pdu());
            if let Err(e) = self.request(body, Flags::default(), &[]) {
                log::warn!("Unregister of {} failed: {}", registration.subtree, e);
            }
        }

        let close = Body::Close(ClosePdu { reason });
        if let Err(e) = self.request(close, Flags::default(), &[]) {
            log::warn!("Close not acknowledged: {}", e);
        }

        self.transport.close();
        self.state = State::Disconnected;
        self.pending.clear();
        log::info!("AgentX session closed ({:?})", reason);
    }

    /// Disconnects with reason Other, then connects again.
    pub fn reconnect(&mut self) -> Result<()> {
        self.disconnect(CloseReason::Other);
        self.connect()
    }

    /// Drops the connection without any exchange with the master.
    fn connection_lost(&mut self) {
        if self.is_connected() {
            log::warn!("Lost connection to master agent");
        }
        self.transport.close();
        self.state = State::Disconnected;
        self.registrations.clear();
        self.pending.clear();
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::Disconnected)
        }
    }

    // --- Request/response correlation ---

    fn send(&mut self, pdu: &Pdu) -> Result<()> {
        if !self.transport.is_open() {
            return Err(Error::Disconnected);
        }
        log::debug!(
            "Sending {:?} (packet_id={}, session_id={})",
            pdu.pdu_type(),
            pdu.packet_id(),
            pdu.header.session_id
        );
        let frame = pdu.serialize()?;
        if let Err(e) = self.transport.send(&frame) {
            return Err(self.transport_failed(e));
        }
        if !matches!(pdu.body, Body::Response(_)) {
            self.pending.insert(pdu.packet_id(), None);
        }
        Ok(())
    }

    fn transport_failed(&mut self, e: io::Error) -> Error {
        self.connection_lost();
        match e.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::InvalidData => Error::Disconnected,
            _ => Error::Io(e),
        }
    }

    /// Serves inbound traffic until the Response with `packet_id` arrives.
    ///
    /// Master requests arriving in the meantime are dispatched normally.
    /// Responses nobody waits for are discarded.
    pub fn wait_for_response(&mut self, packet_id: u32, timeout: Duration) -> Result<Pdu> {
        self.pending.entry(packet_id).or_insert(None);
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(response) = self.pending.get_mut(&packet_id).and_then(Option::take) {
                self.pending.remove(&packet_id);
                return Ok(response);
            }
            if !self.transport.is_open() {
                self.pending.remove(&packet_id);
                return Err(Error::Disconnected);
            }
            let now = Instant::now();
            if now >= deadline {
                self.pending.remove(&packet_id);
                return Err(Error::Timeout);
            }
            match self.transport.recv(deadline - now) {
                Ok(Some(frame)) => self.handle_inbound(&frame),
                Ok(None) => {}
                Err(e) => return Err(self.transport_failed(e)),
            }
        }
    }

    /// Stores a Response if someone is waiting for it.
    fn correlate(&mut self, pdu: Pdu) {
        let packet_id = pdu.header.packet_id;
        match self.pending.get_mut(&packet_id) {
            Some(slot) if slot.is_none() => *slot = Some(pdu),
            _ => log::debug!("Discarding unexpected Response (packet_id={})", packet_id),
        }
    }

    /// Sends a request in this session without waiting for the answer.
    ///
    /// Returns the packet ID to hand to [`Session::wait_for_response`].
    /// Several requests may be outstanding at once.
    pub fn send_request(&mut self, body: Body, flags: Flags) -> Result<u32> {
        self.ensure_connected()?;
        let mut pdu = Pdu::with_counter(body, &self.packet_ids);
        pdu.header.session_id = self.session_id;
        pdu.header.flags = flags;
        let packet_id = pdu.packet_id();
        self.send(&pdu)?;
        Ok(packet_id)
    }

    /// Sends a request in this session and waits for a successful answer.
    ///
    /// `expected` lists the error codes that have a specific meaning for
    /// this request.
    fn request(
        &mut self,
        body: Body,
        flags: Flags,
        expected: &[ResponseError],
    ) -> Result<ResponsePdu> {
        let packet_id = self.send_request(body, flags)?;
        let (_, response) =
            into_response(self.wait_for_response(packet_id, self.config.response_timeout())?)?;
        check_response(response.error, expected)?;
        Ok(response)
    }

    // --- Registration ---

    /// Registers `subtree` with the master agent (RFC 2741 §6.2.3).
    pub fn register_subtree(&mut self, subtree: &Oid, priority: u8, timeout: u8) -> Result<()> {
        self.ensure_connected()?;
        let registration = Registration {
            subtree: subtree.clone().with_include(false),
            priority,
            range_subid: 0,
            upper_bound: 0,
            timeout,
        };
        let body = Body::Register(RegisterPdu {
            timeout,
            priority,
            range_subid: 0,
            subtree: registration.subtree.clone(),
            upper_bound: 0,
        });
        self.request(
            body,
            Flags::default(),
            &[
                ResponseError::DuplicateRegistration,
                ResponseError::RequestDenied,
            ],
        )?;
        log::info!("Registered subtree {} (priority {})", subtree, priority);
        self.registrations.push(registration);
        Ok(())
    }

    /// Registers `subtree` with the default priority and no timeout.
    pub fn register(&mut self, subtree: &Oid) -> Result<()> {
        self.register_subtree(subtree, DEFAULT_PRIORITY, 0)
    }

    /// Withdraws a registration made by [`Session::register_subtree`].
    ///
    /// Does nothing when no registration matches `subtree` and `priority`.
    pub fn unregister_subtree(&mut self, subtree: &Oid, priority: u8) -> Result<()> {
        let position = self.registrations.iter().position(|r| {
            r.subtree == *subtree && r.priority == priority && r.range_subid == 0 && r.upper_bound == 0
        });
        let Some(position) = position else {
            return Ok(());
        };
        let registration = self.registrations.remove(position);
        self.ensure_connected()?;
        self.request(
            Body::Unregister(registration.unregister_pdu()),
            Flags::default(),
            &[ResponseError::UnknownRegistration],
        )?;
        log::info!("Unregistered subtree {}", subtree);
        Ok(())
    }

    /// True if `oid` lies inside a plain registered subtree.
    pub fn is_registered(&self, oid: &Oid) -> bool {
        self.registrations
            .iter()
            .any(|r| r.is_plain() && r.subtree.contains(oid))
    }

    // --- Variables ---

    /// Serves `variable` at `oid`, replacing any previous one.
    ///
    /// Fails with [`Error::UnknownRegistration`] unless `oid` is inside a
    /// registered subtree, and with [`Error::InvalidParameter`] if `oid` is
    /// too long to be sent to the master.
    pub fn add_variable(&mut self, oid: Oid, variable: SharedVariable) -> Result<()> {
        oid.validate()?;
        if !self.is_registered(&oid) {
            return Err(Error::UnknownRegistration);
        }
        log::debug!("Adding variable {}", oid);
        self.variables.insert(oid, variable);
        Ok(())
    }

    /// Adds all variables, or none of them if any OID is unregistered or
    /// too long.
    pub fn add_variables(&mut self, variables: Vec<(Oid, SharedVariable)>) -> Result<()> {
        for (oid, _) in &variables {
            oid.validate()?;
        }
        if let Some((oid, _)) = variables.iter().find(|(oid, _)| !self.is_registered(oid)) {
            log::warn!("Rejecting variables: {} is not registered", oid);
            return Err(Error::UnknownRegistration);
        }
        for (oid, variable) in variables {
            self.variables.insert(oid, variable);
        }
        Ok(())
    }

    /// Stops serving `oid`. Unknown OIDs are ignored.
    pub fn remove_variable(&mut self, oid: &Oid) -> Option<SharedVariable> {
        self.variables.remove(oid)
    }

    pub fn remove_variables<'a>(&mut self, oids: impl IntoIterator<Item = &'a Oid>) {
        for oid in oids {
            self.variables.remove(oid);
        }
    }

    // --- Other requests ---

    /// Sends a notification (RFC 2741 §6.2.10). `snmpTrapOID.0` is put in
    /// front of `varbinds`.
    pub fn send_notification(&mut self, trap_oid: &Oid, varbinds: Vec<VarBind>) -> Result<()> {
        self.ensure_connected()?;
        let mut list = Vec::with_capacity(varbinds.len() + 1);
        list.push(VarBind::new(
            known::snmp_trap_oid().child(0),
            Value::ObjectIdentifier(trap_oid.clone()),
        ));
        list.extend(varbinds);
        self.request(Body::Notify(list), Flags::default(), &[])?;
        log::debug!("Notification {} sent", trap_oid);
        Ok(())
    }

    /// Checks that the master agent still knows this session.
    pub fn ping(&mut self) -> Result<()> {
        self.ensure_connected()?;
        self.request(Body::Ping, Flags::default(), &[])?;
        Ok(())
    }

    /// Advertises an agent capability (sysORTable entry).
    pub fn add_agent_caps(&mut self, id: &Oid, description: &str) -> Result<()> {
        self.ensure_connected()?;
        let body = Body::AddAgentCaps(AddAgentCapsPdu {
            id: id.clone(),
            description: description.as_bytes().to_vec(),
        });
        self.request(body, Flags::default(), &[])?;
        Ok(())
    }

    pub fn remove_agent_caps(&mut self, id: &Oid) -> Result<()> {
        self.ensure_connected()?;
        let body = Body::RemoveAgentCaps(RemoveAgentCapsPdu { id: id.clone() });
        self.request(body, Flags::default(), &[ResponseError::UnknownAgentCaps])?;
        Ok(())
    }

    /// Allocates index values (RFC 2741 §6.2.12) and returns the values
    /// the master assigned.
    pub fn allocate_index(
        &mut self,
        varbinds: Vec<VarBind>,
        new_index: bool,
        any_index: bool,
    ) -> Result<Vec<VarBind>> {
        self.ensure_connected()?;
        let flags = Flags {
            new_index,
            any_index,
            ..Flags::default()
        };
        let response = self.request(
            Body::IndexAllocate(varbinds),
            flags,
            &[
                ResponseError::IndexWrongType,
                ResponseError::IndexAlreadyAllocated,
                ResponseError::IndexNoneAvailable,
            ],
        )?;
        Ok(response.varbinds)
    }

    pub fn deallocate_index(&mut self, varbinds: Vec<VarBind>) -> Result<()> {
        self.ensure_connected()?;
        self.request(
            Body::IndexDeallocate(varbinds),
            Flags::default(),
            &[
                ResponseError::IndexWrongType,
                ResponseError::IndexNotAllocated,
            ],
        )?;
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.disconnect(CloseReason::Shutdown);
    }
}

fn into_response(pdu: Pdu) -> Result<(Header, ResponsePdu)> {
    match pdu.body {
        Body::Response(response) => Ok((pdu.header, response)),
        other => Err(Error::Parse(format!(
            "expected Response, got {:?}",
            other.pdu_type()
        ))),
    }
}
