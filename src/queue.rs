//! Concurrency-limited execution of [`Operation`]s.
//!
//! Work claims its place with [`OperationQueue::reserve`] before it is ready to
//! run, and fills the [`Slot`] once prepared. Every mode change starts a new
//! generation: a fresh semaphore and a dispatcher task of its own. Within a
//! limited generation slots are started strictly in reservation order, so under
//! [`ConcurrencyMode::Serial`] operations run one at a time in submission order.
//! Work reserved before a mode change keeps the limit it was reserved under and
//! never delays work reserved afterwards.
//!
//! [`OperationQueue::cancel_all`] abandons everything reserved, queued or in
//! flight. Abandoned operations are dropped without settling, so their
//! [`Ride`]s complete with [`NetworkError::Cancelled`](crate::NetworkError::Cancelled).

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::http::BoxFuture;
use crate::operation::{Operation, Ride};

/// Maximum parallelism of the [`OperationQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ConcurrencyMode {
    /// One operation at a time, in submission order.
    Serial,
    /// No limit.
    #[default]
    Unlimited,
    /// At most `n` operations at a time. `Capped(0)` behaves like `Capped(1)`.
    Capped(usize),
}

impl ConcurrencyMode {
    pub fn max_concurrent(&self) -> Option<usize> {
        match self {
            ConcurrencyMode::Serial => Some(1),
            ConcurrencyMode::Unlimited => None,
            ConcurrencyMode::Capped(n) => Some((*n).max(1)),
        }
    }
}

impl fmt::Display for ConcurrencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcurrencyMode::Serial => write!(f, "serial"),
            ConcurrencyMode::Unlimited => write!(f, "unlimited"),
            ConcurrencyMode::Capped(n) => write!(f, "capped:{}", n),
        }
    }
}

impl FromStr for ConcurrencyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serial" => Ok(ConcurrencyMode::Serial),
            "unlimited" => Ok(ConcurrencyMode::Unlimited),
            other => other
                .strip_prefix("capped:")
                .and_then(|n| n.trim().parse().ok())
                .map(ConcurrencyMode::Capped)
                .ok_or_else(|| format!("Invalid concurrency mode: {}", s)),
        }
    }
}

impl TryFrom<String> for ConcurrencyMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConcurrencyMode> for String {
    fn from(mode: ConcurrencyMode) -> Self {
        mode.to_string()
    }
}

type Job = BoxFuture<'static, ()>;

struct PendingSlot {
    cancel: CancellationToken,
    job: oneshot::Receiver<Job>,
}

/// A place in the queue claimed ahead of the work that will occupy it.
///
/// Dropping a slot unfilled releases the place.
pub struct Slot {
    job: oneshot::Sender<Job>,
}

impl Slot {
    /// Hands `operation` to the queue and returns its outcome.
    pub fn fill(self, operation: Operation) -> Ride {
        let (completion, ride) = Ride::channel();
        let job: Job = Box::pin(async move {
            completion.settle(operation.execute().await);
        });

        // A released slot drops the job, which cancels its ride.
        if self.job.send(job).is_err() {
            trace!("Slot was abandoned before it was filled");
        }

        ride
    }
}

/// The intake of one semaphore generation.
struct Generation {
    slots: mpsc::UnboundedSender<PendingSlot>,
}

impl Generation {
    fn start(mode: ConcurrencyMode) -> Self {
        let (slots, rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatch(mode.max_concurrent().map(|n| Arc::new(Semaphore::new(n))), rx));
        Self { slots }
    }
}

struct QueueState {
    mode: ConcurrencyMode,
    generation: Generation,
    cancel: CancellationToken,
}

/// Executes operations under the active [`ConcurrencyMode`].
///
/// Must be created inside a Tokio runtime. Each generation's dispatcher
/// task exits once the generation is replaced and its slots have drained.
pub struct OperationQueue {
    state: Mutex<QueueState>,
}

impl OperationQueue {
    pub fn new(mode: ConcurrencyMode) -> Self {
        Self {
            state: Mutex::new(QueueState {
                mode,
                generation: Generation::start(mode),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn mode(&self) -> ConcurrencyMode {
        self.lock().mode
    }

    /// Switches the mode for work reserved from now on.
    pub fn set_mode(&self, mode: ConcurrencyMode) {
        let mut state = self.lock();
        if state.mode != mode {
            debug!(from:% = state.mode, to:% = mode; "Concurrency mode changed");
            state.mode = mode;
            state.generation = Generation::start(mode);
        }
    }

    /// Claims the next place in the current generation.
    pub fn reserve(&self) -> Slot {
        let (job, rx) = oneshot::channel();
        let state = self.lock();
        let pending = PendingSlot {
            cancel: state.cancel.clone(),
            job: rx,
        };

        // A closed intake drops the pending slot; filling it then cancels the ride.
        if state.generation.slots.send(pending).is_err() {
            debug!("Operation queue dispatcher is gone, dropping slot");
        }

        Slot { job }
    }

    /// Schedules `operation` behind everything already reserved.
    pub fn enqueue(&self, operation: Operation) -> Ride {
        self.reserve().fill(operation)
    }

    /// Abandons every reserved, queued and in-flight operation.
    pub fn cancel_all(&self) {
        let mut state = self.lock();
        state.cancel.cancel();
        state.cancel = CancellationToken::new();
        debug!("Cancelled all operations");
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Temporarily forces a [`ConcurrencyMode`], restoring the previous one on drop.
pub struct ModeGuard<'a> {
    queue: &'a OperationQueue,
    previous: ConcurrencyMode,
}

impl<'a> ModeGuard<'a> {
    pub fn force(queue: &'a OperationQueue, mode: ConcurrencyMode) -> Self {
        let previous = queue.mode();
        queue.set_mode(mode);
        Self { queue, previous }
    }

    pub fn previous(&self) -> ConcurrencyMode {
        self.previous
    }
}

impl Drop for ModeGuard<'_> {
    fn drop(&mut self) {
        self.queue.set_mode(self.previous);
    }
}

async fn dispatch(permits: Option<Arc<Semaphore>>, mut rx: mpsc::UnboundedReceiver<PendingSlot>) {
    while let Some(PendingSlot { cancel, job }) = rx.recv().await {
        let Some(semaphore) = &permits else {
            tokio::spawn(async move {
                if let Some(job) = wait_for_job(&cancel, job).await {
                    run(job, cancel, None).await;
                }
            });
            continue;
        };

        let Some(job) = wait_for_job(&cancel, job).await else {
            continue;
        };

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                trace!("Queued operation cancelled before start");
                continue;
            }
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => continue,
            },
        };

        tokio::spawn(run(job, cancel, Some(permit)));
    }
}

async fn wait_for_job(cancel: &CancellationToken, job: oneshot::Receiver<Job>) -> Option<Job> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            trace!("Reserved slot cancelled before it was filled");
            None
        }
        job = job => job.ok(),
    }
}

async fn run(job: Job, cancel: CancellationToken, permit: Option<OwnedSemaphorePermit>) {
    let _permit = permit;
    if cancel.is_cancelled() {
        trace!("Queued operation cancelled before start");
        return;
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => trace!("In-flight operation cancelled"),
        _ = job => {},
    }
}
