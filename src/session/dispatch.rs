//! Inbound PDU handling (RFC 2741 §7.2.2).

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use super::{Session, State};
use crate::{
    error::{Error, ResponseError, Result},
    pdu::{decode_header, Body, ClosePdu, Header, Pdu, PduType, ResponsePdu},
};

/// How long [`Session::run`] blocks before re-checking for cancellation.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

impl Session {
    /// Processes one frame received from the master agent.
    ///
    /// This is the only entry point for inbound traffic. Responses are
    /// matched against outstanding requests; everything else is answered
    /// from the variable map. Nothing is ever propagated to the caller.
    pub fn handle_inbound(&mut self, frame: &[u8]) {
        let frame_header = match decode_header(frame) {
            Ok(header) => header,
            Err(e) => {
                log::warn!("Dropping malformed frame: {}", e);
                return;
            }
        };

        let pdu = match Pdu::parse(frame) {
            Ok(pdu) => pdu,
            Err(e) if frame_header.pdu_type == PduType::Response as u8 => {
                log::warn!("Dropping malformed Response: {}", e);
                return;
            }
            Err(e) => {
                log::warn!(
                    "Parse error in PDU type {} (packet_id={}): {}",
                    frame_header.pdu_type,
                    frame_header.header.packet_id,
                    e
                );
                let reply = ResponsePdu::error(ResponseError::ParseError, 0);
                self.reply(&frame_header.header, reply);
                return;
            }
        };

        log::debug!(
            "Received {:?} (packet_id={}, session_id={})",
            pdu.pdu_type(),
            pdu.header.packet_id,
            pdu.header.session_id
        );

        match pdu.body {
            Body::Response(_) => self.correlate(pdu),
            Body::Close(close) => self.closed_by_master(&pdu.header, close),
            _ => self.dispatch(pdu),
        }
    }

    fn closed_by_master(&mut self, header: &Header, close: ClosePdu) {
        if self.state != State::Connected || header.session_id != self.session_id {
            log::warn!(
                "Ignoring Close for unknown session {}",
                header.session_id
            );
            return;
        }
        log::info!("Master agent closed session ({:?})", close.reason);
        self.connection_lost();
    }

    fn dispatch(&mut self, pdu: Pdu) {
        if self.state != State::Connected || pdu.header.session_id != self.session_id {
            self.reply(&pdu.header, ResponsePdu::error(ResponseError::NotOpen, 0));
            return;
        }
        if pdu.context.is_some() {
            self.reply(
                &pdu.header,
                ResponsePdu::error(ResponseError::UnsupportedContext, 0),
            );
            return;
        }

        let response = match &pdu.body {
            Body::Get(get) => self.variables.get(&get.names),
            Body::GetNext(next) => self.variables.get_next(&next.ranges),
            Body::GetBulk(bulk) => self.variables.get_bulk(bulk),
            Body::TestSet(varbinds) => self.variables.test_set(varbinds),
            Body::CommitSet => self.variables.commit_set(),
            Body::UndoSet => self.variables.undo_set(),
            Body::CleanupSet => {
                self.variables.cleanup_set();
                return;
            }
            other => {
                log::warn!("Ignoring {:?} sent by master agent", other.pdu_type());
                return;
            }
        };
        self.reply(&pdu.header, response);
    }

    fn reply(&mut self, request: &Header, response: ResponsePdu) {
        let mut result = self.send(&Pdu::response(request, response));
        if let Err(Error::InvalidParameter(reason)) = &result {
            log::warn!("Response cannot be encoded ({}), answering genErr", reason);
            let fallback = ResponsePdu::error(ResponseError::GenErr, 0);
            result = self.send(&Pdu::response(request, fallback));
        }
        if let Err(e) = result {
            log::warn!("Failed to send Response (packet_id={}): {}", request.packet_id, e);
        }
    }

    /// Waits up to `timeout` for one frame from the master and handles it.
    ///
    /// Returns `Ok(false)` when nothing arrived.
    pub fn process_one(&mut self, timeout: Duration) -> Result<bool> {
        if !self.transport.is_open() {
            return Err(Error::Disconnected);
        }
        match self.transport.recv(timeout) {
            Ok(Some(frame)) => {
                self.handle_inbound(&frame);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => Err(self.transport_failed(e)),
        }
    }

    /// Serves master requests until `cancel` is set or the connection is
    /// lost. The session stays connected when cancelled.
    pub fn run(&mut self, cancel: &AtomicBool) -> Result<()> {
        while !cancel.load(Ordering::Relaxed) {
            self.process_one(POLL_INTERVAL)?;
        }
        Ok(())
    }
}
