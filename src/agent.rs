//! Background runner for a [`Session`] inside a tokio application.
//!
//! The session does blocking socket I/O, so it lives on a `spawn_blocking`
//! task that alternates between serving the master and running commands
//! sent from async code. The task is the only owner of the session, so
//! every mutation is serialized through it.
//!
//! ```no_run
//! # async fn example() -> agentx_subagent::Result<()> {
//! use agentx_subagent::{agent, configuration::SessionConfig, session::Session};
//!
//! let handle = agent::spawn(Session::new(SessionConfig::new("example")));
//! handle.connect().await?;
//! handle.register("1.3.6.1.4.1.8072.9999".parse()?).await?;
//! let session = handle.shutdown().await?;
//! drop(session); // sends Close
//! # Ok(())
//! # }
//! ```

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    error::{Error, Result},
    oid::Oid,
    session::Session,
    value::VarBind,
    variable::SharedVariable,
};

/// How long the loop waits for master traffic before checking commands.
const COMMAND_POLL: Duration = Duration::from_millis(100);

type Command = Box<dyn FnOnce(&mut Session) + Send>;

/// Handle to a session running on a background task.
pub struct SubagentHandle {
    commands: mpsc::UnboundedSender<Command>,
    cancel: Arc<AtomicBool>,
    task: JoinHandle<Session>,
}

/// Moves `session` onto a blocking task and starts serving requests.
///
/// Must be called from within a tokio runtime.
pub fn spawn(session: Session) -> SubagentHandle {
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_clone = cancel.clone();
    let (tx, mut rx) = mpsc::unbounded_channel::<Command>();

    let task = tokio::task::spawn_blocking(move || {
        let mut session = session;
        while !cancel_clone.load(Ordering::Relaxed) {
            loop {
                match rx.try_recv() {
                    Ok(command) => command(&mut session),
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => return session,
                }
            }

            if session.is_connected() {
                if let Err(e) = session.process_one(COMMAND_POLL) {
                    log::warn!("AgentX event loop error: {}", e);
                }
            } else {
                std::thread::sleep(COMMAND_POLL);
            }
        }
        session
    });

    SubagentHandle {
        commands: tx,
        cancel,
        task,
    }
}

impl SubagentHandle {
    /// Runs `f` on the session inside the event loop and returns its
    /// result.
    pub async fn with_session<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Session) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let command: Command = Box::new(move |session| {
            let _ = reply_tx.send(f(session));
        });
        self.commands
            .send(command)
            .map_err(|_| Error::Runtime("sub-agent event loop has stopped".to_string()))?;
        reply_rx
            .await
            .map_err(|_| Error::Runtime("sub-agent event loop dropped the request".to_string()))
    }

    pub async fn connect(&self) -> Result<()> {
        self.with_session(|session| session.connect()).await?
    }

    pub async fn is_connected(&self) -> Result<bool> {
        self.with_session(|session| session.is_connected()).await
    }

    pub async fn register(&self, subtree: Oid) -> Result<()> {
        self.with_session(move |session| session.register(&subtree))
            .await?
    }

    pub async fn add_variable(&self, oid: Oid, variable: SharedVariable) -> Result<()> {
        self.with_session(move |session| session.add_variable(oid, variable))
            .await?
    }

    pub async fn send_notification(&self, trap_oid: Oid, varbinds: Vec<VarBind>) -> Result<()> {
        self.with_session(move |session| session.send_notification(&trap_oid, varbinds))
            .await?
    }

    /// Stops the event loop and returns the session, still connected.
    pub async fn shutdown(self) -> Result<Session> {
        self.cancel.store(true, Ordering::Relaxed);
        self.task
            .await
            .map_err(|e| Error::Runtime(format!("sub-agent task failed: {}", e)))
    }
}
