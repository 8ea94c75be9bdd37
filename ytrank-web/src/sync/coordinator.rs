//! Sync coordinator
//!
//! Owns the single active sync task, its cancellation token, and the set of
//! progress observers.
//!
//! Observer registration, deregistration and event delivery are all sent as
//! commands to one dedicated OS thread (`sync-event-hub`). That thread is the
//! only owner of the observer set. Each observer gets its own bounded channel;
//! delivery uses `try_send`, and an observer whose channel is full or closed is
//! dropped from the set.

use chrono::Utc;
use futures::Stream;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;
use ytrank_common::models::{SyncStatus, SyncTask, TaskUpdate};
use ytrank_common::{Error, Result, SyncEvent};

use crate::db::sync_tasks;

pub const CONFLICT_MESSAGE: &str = "Another sync is already in progress";

enum HubCommand {
    Subscribe {
        id: Uuid,
        sink: mpsc::Sender<SyncEvent>,
    },
    Unsubscribe {
        id: Uuid,
    },
    Broadcast(SyncEvent),
}

struct CurrentTask {
    task_id: i64,
    cancel: CancellationToken,
}

struct CoordinatorInner {
    db: SqlitePool,
    hub: mpsc::UnboundedSender<HubCommand>,
    observer_count: Arc<AtomicUsize>,
    observer_capacity: usize,
    current: Mutex<Option<CurrentTask>>,
}

/// Cloneable handle to the process-wide sync coordinator
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl SyncCoordinator {
    /// Create the coordinator and start its event hub thread
    pub fn new(db: SqlitePool, observer_capacity: usize) -> Result<Self> {
        let (hub, commands) = mpsc::unbounded_channel();
        let observer_count = Arc::new(AtomicUsize::new(0));

        let hub_count = Arc::clone(&observer_count);
        std::thread::Builder::new()
            .name("sync-event-hub".to_string())
            .spawn(move || run_hub(commands, hub_count))?;

        Ok(Self {
            inner: Arc::new(CoordinatorInner {
                db,
                hub,
                observer_count,
                observer_capacity: observer_capacity.max(1),
                current: Mutex::new(None),
            }),
        })
    }

    /// The current non-terminal task, if any
    pub async fn get_active_task(&self) -> Result<Option<SyncTask>> {
        sync_tasks::get_active_task(&self.inner.db).await
    }

    pub async fn get_task(&self, task_id: i64) -> Result<Option<SyncTask>> {
        sync_tasks::get_task(&self.inner.db, task_id).await
    }

    /// Persist a new `started` task and make it current
    ///
    /// Fails with `Conflict` while another task is active. The check and the
    /// insert happen under the coordinator lock.
    pub async fn create_task(&self, total: i64) -> Result<i64> {
        let mut current = self.inner.current.lock().await;

        if let Some(active) = sync_tasks::get_active_task(&self.inner.db).await? {
            debug!(active_task = active.id, "Rejecting sync request");
            return Err(Error::Conflict(CONFLICT_MESSAGE.to_string()));
        }

        let task = sync_tasks::insert_task(&self.inner.db, total, Utc::now()).await?;
        *current = Some(CurrentTask {
            task_id: task.id,
            cancel: CancellationToken::new(),
        });

        info!(task_id = task.id, total, "Sync task created");
        Ok(task.id)
    }

    /// Merge fields into a stored task
    pub async fn update_task(&self, task_id: i64, update: TaskUpdate) -> Result<SyncTask> {
        sync_tasks::update_task(&self.inner.db, task_id, &update, Utc::now()).await
    }

    /// Request cancellation of a task
    ///
    /// Fires the task's cancellation token when it is the current task and
    /// marks it `aborted` when it is still non-terminal. Calling it again, or on
    /// a finished task, changes nothing.
    pub async fn abort_task(&self, task_id: i64) -> Result<SyncTask> {
        let task = sync_tasks::get_task(&self.inner.db, task_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Sync task {} not found", task_id)))?;

        {
            let current = self.inner.current.lock().await;
            if let Some(current) = current.as_ref().filter(|c| c.task_id == task_id) {
                current.cancel.cancel();
            }
        }

        if task.status.is_terminal() {
            debug!(task_id, status = %task.status, "Abort requested for finished task");
            return Ok(task);
        }

        info!(task_id, "Sync task abort requested");
        self.update_task(task_id, TaskUpdate::status(SyncStatus::Aborted))
            .await
    }

    /// Cancellation token of a task
    ///
    /// A task that is not current gets an already-cancelled token.
    pub async fn cancellation_token(&self, task_id: i64) -> CancellationToken {
        let current = self.inner.current.lock().await;
        match current.as_ref().filter(|c| c.task_id == task_id) {
            Some(current) => current.cancel.clone(),
            None => {
                let token = CancellationToken::new();
                token.cancel();
                token
            }
        }
    }

    /// Clear the current-task pointer if it still refers to `task_id`
    pub async fn finish_task(&self, task_id: i64) {
        let mut current = self.inner.current.lock().await;
        if current.as_ref().map(|c| c.task_id) == Some(task_id) {
            *current = None;
            debug!(task_id, "Sync task released");
        }
    }

    /// Id of the task the coordinator is currently running
    pub async fn current_task_id(&self) -> Option<i64> {
        self.inner.current.lock().await.as_ref().map(|c| c.task_id)
    }

    /// Every task, most recent first
    pub async fn list_tasks(&self) -> Result<Vec<SyncTask>> {
        sync_tasks::list_tasks(&self.inner.db).await
    }

    /// Register a new observer
    pub fn subscribe(&self) -> Subscription {
        let (sink, receiver) = mpsc::channel(self.inner.observer_capacity);
        let id = Uuid::new_v4();
        if self
            .inner
            .hub
            .send(HubCommand::Subscribe { id, sink })
            .is_err()
        {
            warn!("Event hub stopped; observer will receive nothing");
        }
        Subscription {
            id,
            receiver,
            hub: self.inner.hub.clone(),
        }
    }

    /// Deregister an observer
    pub fn unsubscribe(&self, subscription: &Subscription) {
        let _ = self
            .inner
            .hub
            .send(HubCommand::Unsubscribe { id: subscription.id });
    }

    /// Deliver an event to every registered observer, without waiting
    pub fn broadcast(&self, event: SyncEvent) {
        if self.inner.hub.send(HubCommand::Broadcast(event)).is_err() {
            warn!("Event hub stopped; event dropped");
        }
    }

    /// Number of observers currently registered with the hub
    pub fn observer_count(&self) -> usize {
        self.inner.observer_count.load(Ordering::SeqCst)
    }
}

/// Hub thread body; exits when every command sender is gone
fn run_hub(mut commands: mpsc::UnboundedReceiver<HubCommand>, count: Arc<AtomicUsize>) {
    let mut observers: HashMap<Uuid, mpsc::Sender<SyncEvent>> = HashMap::new();

    while let Some(command) = commands.blocking_recv() {
        match command {
            HubCommand::Subscribe { id, sink } => {
                observers.insert(id, sink);
                debug!(observer = %id, observers = observers.len(), "Observer subscribed");
            }
            HubCommand::Unsubscribe { id } => {
                if observers.remove(&id).is_some() {
                    debug!(observer = %id, observers = observers.len(), "Observer unsubscribed");
                }
            }
            HubCommand::Broadcast(event) => {
                observers.retain(|id, sink| match sink.try_send(event.clone()) {
                    Ok(()) => true,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(observer = %id, "Observer lagging, dropping it");
                        false
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        debug!(observer = %id, "Observer gone");
                        false
                    }
                });
            }
        }
        count.store(observers.len(), Ordering::SeqCst);
    }

    debug!("Event hub stopped");
}

/// One observer's view of the event feed
///
/// Dropping it deregisters the observer.
pub struct Subscription {
    id: Uuid,
    receiver: mpsc::Receiver<SyncEvent>,
    hub: mpsc::UnboundedSender<HubCommand>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next delivered event; `None` once the hub has dropped this observer
    pub async fn recv(&mut self) -> Option<SyncEvent> {
        self.receiver.recv().await
    }

    /// Next delivered event, or a heartbeat when nothing arrives in `heartbeat`
    pub async fn next_event(&mut self, heartbeat: Duration) -> Option<SyncEvent> {
        match tokio::time::timeout(heartbeat, self.receiver.recv()).await {
            Ok(event) => event,
            Err(_) => Some(SyncEvent::Heartbeat {}),
        }
    }

    /// Endless event stream with heartbeats on silence
    ///
    /// Ends only when the hub drops this observer.
    pub fn into_stream(self, heartbeat: Duration) -> impl Stream<Item = SyncEvent> {
        async_stream::stream! {
            let mut subscription = self;
            while let Some(event) = subscription.next_event(heartbeat).await {
                yield event;
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.hub.send(HubCommand::Unsubscribe { id: self.id });
    }
}
