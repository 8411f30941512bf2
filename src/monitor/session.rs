//! Monitoring session: one control task per connected account
//!
//! States: idle -> running <-> stopped. The control task only ticks while
//! the session is running and at least one subscriber is attached. Dropping
//! the session closes its control channel, which ends the task.

use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info};

use super::engine::{InjectQueue, Monitor};
use crate::account::Account;
use crate::config::MonitorConfig;
use crate::notification::NotificationEvent;
use crate::preferences::PreferenceStore;
use crate::scanner::ScanContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Stopped,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

/// What the control task watches; `run` increments on every start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Control {
    state: SessionState,
    run: u64,
}

pub type EventStream = UnboundedReceiverStream<NotificationEvent>;

/// Attached consumers; a closed consumer is dropped on the next emit
#[derive(Debug, Clone, Default)]
pub struct Subscribers {
    senders: Arc<Mutex<Vec<mpsc::UnboundedSender<NotificationEvent>>>>,
}

impl Subscribers {
    pub fn attach(&self) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap_or_else(PoisonError::into_inner).push(tx);
        UnboundedReceiverStream::new(rx)
    }

    /// Drop consumers that went away, returns how many remain
    pub fn prune(&self) -> usize {
        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        senders.retain(|tx| !tx.is_closed());
        senders.len()
    }

    pub fn len(&self) -> usize {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver every event to every consumer, returns the consumers reached
    pub fn emit(&self, events: &[NotificationEvent]) -> usize {
        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        if events.is_empty() {
            return senders.len();
        }
        senders.retain(|tx| events.iter().all(|event| tx.send(event.clone()).is_ok()));
        senders.len()
    }
}

pub struct Session {
    account: Arc<Account>,
    ctx: ScanContext,
    store: Arc<dyn PreferenceStore>,
    control: watch::Sender<Control>,
    subscribers: Subscribers,
    injected: InjectQueue,
    task: JoinHandle<()>,
}

impl Session {
    /// Create the session and spawn its control task, initially idle
    pub fn spawn(ctx: ScanContext, store: Arc<dyn PreferenceStore>, config: &MonitorConfig) -> Self {
        let (control, control_rx) = watch::channel(Control {
            state: SessionState::Idle,
            run: 0,
        });
        let subscribers = Subscribers::default();
        let injected = InjectQueue::default();
        let monitor = Monitor::new(ctx.clone(), store.clone(), injected.clone(), config);
        let task = tokio::spawn(control_loop(monitor, control_rx, subscribers.clone()));

        Self {
            account: ctx.account.clone(),
            ctx,
            store,
            control,
            subscribers,
            injected,
            task,
        }
    }

    pub fn account(&self) -> &Arc<Account> {
        &self.account
    }

    /// Scan context for one-off reads outside the control loop
    pub fn context(&self) -> &ScanContext {
        &self.ctx
    }

    pub fn store(&self) -> &Arc<dyn PreferenceStore> {
        &self.store
    }

    pub fn state(&self) -> SessionState {
        self.control.borrow().state
    }

    /// idle/stopped -> running; a no-op while already running
    pub fn start(&self) {
        self.control.send_if_modified(|control| {
            if control.state == SessionState::Running {
                return false;
            }
            control.state = SessionState::Running;
            control.run += 1;
            true
        });
    }

    /// running -> stopped
    pub fn stop(&self) {
        self.control.send_if_modified(|control| {
            if control.state != SessionState::Running {
                return false;
            }
            control.state = SessionState::Stopped;
            true
        });
    }

    pub fn subscribe(&self) -> EventStream {
        let stream = self.subscribers.attach();
        // wake the control task in case it was waiting for a consumer
        self.control.send_modify(|_| {});
        stream
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.prune()
    }

    pub fn inject(&self, events: impl IntoIterator<Item = NotificationEvent>) -> usize {
        self.injected.push_all(events)
    }

    /// Resolves once the session is dropped
    pub fn closed(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut control_rx = self.control.subscribe();
        async move { while control_rx.changed().await.is_ok() {} }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!(account = %self.account.account_id, "Session dropped");
    }
}

async fn control_loop(
    mut monitor: Monitor,
    mut control_rx: watch::Receiver<Control>,
    subscribers: Subscribers,
) {
    let mut active_run = 0u64;

    loop {
        let control = *control_rx.borrow_and_update();
        let running = control.state == SessionState::Running;
        if running && control.run != active_run {
            active_run = control.run;
            monitor.start();
        }

        if !running || subscribers.prune() == 0 {
            if control_rx.changed().await.is_err() {
                break;
            }
            continue;
        }

        let outcome = monitor.tick().await;
        let reached = subscribers.emit(&outcome.events);
        if reached == 0 && !outcome.events.is_empty() {
            debug!(account = %monitor.account_id(), "All subscribers gone, pausing");
        }

        tokio::select! {
            _ = tokio::time::sleep(monitor.pacer().interval()) => {}
            changed = control_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!(account = %monitor.account_id(), "Session closed");
}
