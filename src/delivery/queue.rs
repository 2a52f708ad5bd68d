//! # Delivery queue and its worker.
//!
//! ## Rules
//! - `post()` never blocks: on a full or closed queue the effect is dropped and
//!   `EventKind::DeliveryOverflow` is published.
//! - Effects are applied strictly in posting order by a single worker.
//! - A panicking [`Shell`] call is caught, reported as `EventKind::DeliveryPanicked`,
//!   and the worker moves on to the next effect.
//! - On cancellation the worker applies what is already queued, then exits.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::delivery::SideEffect;
use crate::events::{Bus, Event, EventKind};
use crate::platform::Shell;
use crate::subscribers::panic_message;

enum Job {
    Apply(SideEffect),
    Flush(oneshot::Sender<()>),
}

/// Posting handle for the delivery worker.
///
/// Cheap to clone; all clones feed the same worker.
#[derive(Clone)]
pub struct DeliveryQueue {
    tx: mpsc::Sender<Job>,
    bus: Bus,
}

impl DeliveryQueue {
    /// Spawns the worker and returns the posting handle with the worker's join handle.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(
        shell: Arc<dyn Shell>,
        capacity: usize,
        bus: Bus,
        token: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel::<Job>(capacity.max(1));
        let worker = tokio::spawn(run_worker(shell, rx, bus.clone(), token));
        (Self { tx, bus }, worker)
    }

    /// Queues an effect (fire-and-forget).
    pub fn post(&self, effect: SideEffect) {
        let label = effect.as_label();
        let cause = match self.tx.try_send(Job::Apply(effect)) {
            Ok(()) => return,
            Err(mpsc::error::TrySendError::Full(_)) => "full",
            Err(mpsc::error::TrySendError::Closed(_)) => "closed",
        };
        tracing::warn!(effect = label, cause, "side effect dropped");
        self.bus.publish(
            Event::new(EventKind::DeliveryOverflow).with_reason(format!("{label}:{cause}")),
        );
    }

    /// Waits until every effect posted before this call has been applied.
    ///
    /// Returns immediately if the worker is gone.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Job::Flush(done_tx)).await.is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn run_worker(
    shell: Arc<dyn Shell>,
    mut rx: mpsc::Receiver<Job>,
    bus: Bus,
    token: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            biased;
            job = rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
            _ = token.cancelled() => {
                rx.close();
                while let Some(job) = rx.recv().await {
                    run_job(&shell, &bus, job).await;
                }
                break;
            }
        };
        run_job(&shell, &bus, job).await;
    }
}

async fn run_job(shell: &Arc<dyn Shell>, bus: &Bus, job: Job) {
    match job {
        Job::Flush(done) => {
            let _ = done.send(());
        }
        Job::Apply(effect) => {
            let shell = Arc::clone(shell);
            let fut = async move { apply(shell.as_ref(), effect) };
            if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                bus.publish(
                    Event::new(EventKind::DeliveryPanicked).with_reason(panic_message(&*panic_err)),
                );
            }
        }
    }
}

fn apply(shell: &dyn Shell, effect: SideEffect) {
    match effect {
        SideEffect::CollapsePanels => shell.collapse_panels(),
        SideEffect::SetStatusIcon { slot, icon } => shell.set_icon_from_tile(&slot, icon),
        SideEffect::RemoveStatusIcon { slot } => shell.remove_icon_for_tile(&slot),
    }
}
