//! # External command channel.
//!
//! Memory-pressure signals and listening requests come from outside the
//! runtime (system callbacks, other services). They are submitted through a
//! cloneable [`CommandHandle`] into a bounded queue and applied by one command
//! loop, so they take effect in submission order.
//!
//! ```text
//! CommandHandle ──submit/try_submit──► [mpsc] ──► CommandLoop
//!                                                   ├─ SetMemoryPressure ─► AdmissionController
//!                                                   └─ RequestListening ──► RequestListener
//! ```
//!
//! The loop ends when its cancellation token fires or every handle is dropped.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::admission::AdmissionController;
use crate::core::listener::RequestListener;
use crate::error::SubmitError;
use crate::identity::ComponentName;

/// Trigger accepted by the command loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Enter (`true`) or leave (`false`) reduced-capacity mode.
    SetMemoryPressure(bool),
    /// Ask the foreground user's tile for this component to start listening.
    RequestListening(ComponentName),
}

/// Handle for submitting commands to the runtime.
#[derive(Clone)]
pub struct CommandHandle {
    tx: mpsc::Sender<Command>,
}

impl CommandHandle {
    /// Submit a command (async, waits if queue is full).
    pub async fn submit(&self, cmd: Command) -> Result<(), SubmitError> {
        self.tx.send(cmd).await.map_err(|_| SubmitError::Closed)
    }

    /// Try to submit without blocking (fails if queue full).
    pub fn try_submit(&self, cmd: Command) -> Result<(), SubmitError> {
        self.tx.try_send(cmd).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SubmitError::Full,
            mpsc::error::TrySendError::Closed(_) => SubmitError::Closed,
        })
    }
}

/// Applies submitted commands one at a time.
pub(crate) struct CommandLoop {
    admission: Arc<AdmissionController>,
    listener: Arc<RequestListener>,
    rx: Mutex<Option<mpsc::Receiver<Command>>>,
}

impl CommandLoop {
    /// Creates the loop and its first handle (must call `.run()` to start).
    pub(crate) fn new(
        admission: Arc<AdmissionController>,
        listener: Arc<RequestListener>,
        capacity: usize,
    ) -> (Arc<Self>, CommandHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let this = Arc::new(Self {
            admission,
            listener,
            rx: Mutex::new(Some(rx)),
        });
        (this, CommandHandle { tx })
    }

    /// Starts the loop in the background.
    pub(crate) fn run(self: Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run_inner(token).await {
                tracing::error!(error = %e, "command loop failed");
            }
        })
    }

    async fn run_inner(&self, token: CancellationToken) -> anyhow::Result<()> {
        let mut rx = self
            .rx
            .lock()
            .await
            .take()
            .ok_or_else(|| anyhow::anyhow!("command loop already running"))?;

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                cmd = rx.recv() => match cmd {
                    Some(cmd) => self.apply(cmd).await,
                    None => break,
                },
            }
        }
        tracing::debug!("command loop stopped");
        Ok(())
    }

    async fn apply(&self, cmd: Command) {
        match cmd {
            Command::SetMemoryPressure(pressured) => {
                self.admission.set_capacity_mode(pressured).await;
            }
            Command::RequestListening(component) => {
                self.listener.request_listening(&component).await;
            }
        }
    }
}
