//! Scripted in-memory master agent for session tests.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use agentx_subagent::{
    configuration::SessionConfig,
    error::ResponseError,
    pdu::{Body, Header, PacketIdCounter, Pdu, PduType, ResponsePdu},
    session::Session,
    transport::Transport,
};

pub const SESSION_ID: u32 = 4711;

type Responder = Box<dyn FnMut(&Pdu) -> Option<ResponsePdu> + Send>;

struct MasterState {
    open: bool,
    refuse_connect: bool,
    sent: Vec<Pdu>,
    inbox: VecDeque<Vec<u8>>,
    responder: Responder,
}

/// Shared view of the fake master; the session owns the matching
/// [`FakeTransport`].
#[derive(Clone)]
pub struct FakeMaster {
    state: Arc<Mutex<MasterState>>,
}

pub struct FakeTransport {
    state: Arc<Mutex<MasterState>>,
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

impl FakeMaster {
    /// A master that accepts every request.
    pub fn new() -> Self {
        FakeMaster {
            state: Arc::new(Mutex::new(MasterState {
                open: false,
                refuse_connect: false,
                sent: Vec::new(),
                inbox: VecDeque::new(),
                responder: Box::new(|_| Some(ResponsePdu::default())),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MasterState> {
        self.state.lock().unwrap()
    }

    pub fn transport(&self) -> Box<dyn Transport> {
        Box::new(FakeTransport {
            state: self.state.clone(),
        })
    }

    /// A disconnected session wired to this master, with its own packet
    /// ID counter.
    pub fn session(&self) -> Session {
        init_logger();
        Session::with_transport(SessionConfig::new("test sub-agent"), self.transport())
            .with_packet_ids(Arc::new(PacketIdCounter::new()))
    }

    pub fn connected_session(&self) -> Session {
        let mut session = self.session();
        session.connect().unwrap();
        session
    }

    pub fn refuse_connect(&self) {
        self.lock().refuse_connect = true;
    }

    /// Replaces how requests are answered. `None` means no answer.
    pub fn respond_with<F>(&self, responder: F)
    where
        F: FnMut(&Pdu) -> Option<ResponsePdu> + Send + 'static,
    {
        self.lock().responder = Box::new(responder);
    }

    /// Answers requests of `pdu_type` with `error`, everything else with
    /// success.
    pub fn fail(&self, pdu_type: PduType, error: ResponseError) {
        self.respond_with(move |pdu| {
            if pdu.pdu_type() == pdu_type {
                Some(ResponsePdu::error(error, 0))
            } else {
                Some(ResponsePdu::default())
            }
        });
    }

    /// Queues a raw frame for the session to receive.
    pub fn push_frame(&self, frame: Vec<u8>) {
        self.lock().inbox.push_back(frame);
    }

    /// Queues a master-originated request.
    pub fn push_request(&self, session_id: u32, packet_id: u32, body: Body) {
        let pdu = Pdu {
            header: Header {
                session_id,
                transaction_id: 9,
                packet_id,
                ..Header::default()
            },
            context: None,
            body,
        };
        self.push_frame(pdu.serialize().unwrap());
    }

    /// Everything the session has sent so far.
    pub fn sent(&self) -> Vec<Pdu> {
        self.lock().sent.clone()
    }

    pub fn sent_of(&self, pdu_type: PduType) -> Vec<Pdu> {
        self.sent()
            .into_iter()
            .filter(|pdu| pdu.pdu_type() == pdu_type)
            .collect()
    }

    pub fn last_sent(&self) -> Option<Pdu> {
        self.lock().sent.last().cloned()
    }

    pub fn clear_sent(&self) {
        self.lock().sent.clear();
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }
}

impl Transport for FakeTransport {
    fn connect(&mut self) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.refuse_connect {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "no master agent",
            ));
        }
        state.open = true;
        state.inbox.clear();
        Ok(())
    }

    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "closed"));
        }
        let pdu = Pdu::parse(frame).expect("session sent a malformed PDU");
        state.sent.push(pdu.clone());
        if pdu.pdu_type() == PduType::Response {
            return Ok(());
        }
        if let Some(response) = (state.responder)(&pdu) {
            let mut reply = Pdu::response(&pdu.header, response);
            if pdu.pdu_type() == PduType::Open {
                reply.header.session_id = SESSION_ID;
            }
            state.inbox.push_back(reply.serialize().unwrap());
        }
        Ok(())
    }

    fn recv(&mut self, timeout: Duration) -> io::Result<Option<Vec<u8>>> {
        let frame = {
            let mut state = self.state.lock().unwrap();
            if !state.open {
                return Err(io::Error::new(io::ErrorKind::NotConnected, "closed"));
            }
            state.inbox.pop_front()
        };
        if frame.is_none() {
            std::thread::sleep(timeout.min(Duration::from_millis(10)));
        }
        Ok(frame)
    }

    fn close(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.open = false;
        state.inbox.clear();
    }

    fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }
}
