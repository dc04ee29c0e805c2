//! The inventory session: one task that owns the deals view model.
//!
//! Refresh ticks, push notices, finished page loads and handle commands are
//! all processed on that task, one at a time. Consumers only ever see
//! [`Snapshot`]s published through a `watch` channel.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use lastcall_common::product::{Product, ProductId};

use crate::api::ProductSource;
use crate::config::ClientConfig;
use crate::error::LoadError;
use crate::inventory::{InventoryView, LoadState, TrackedProduct};
use crate::push::{PushNotice, PushSubscription};

/// Source of "now" for refresh ticks.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum RefreshState {
    #[default]
    Idle,
    Running,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    LoadMore,
    Reload,
    Remove(ProductId),
}

/// Everything a screen needs to render the deals list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub sampled_at: Option<DateTime<Utc>>,
    pub revision: u64,
    pub entries: Vec<TrackedProduct>,
    pub load: LoadState,
    pub has_more: bool,
    pub push_connected: bool,
    pub refresh: RefreshState,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            sampled_at: None,
            revision: 0,
            entries: Vec::new(),
            load: LoadState::Idle,
            has_more: true,
            push_connected: false,
            refresh: RefreshState::Idle,
        }
    }
}

/// Control surface of a running session.
#[derive(Debug)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<Snapshot>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn load_more(&self) {
        self.send(Command::LoadMore);
    }

    /// Restart from page 1. Also the retry after a failed load.
    ///
    /// A reload sent while a page is still loading runs as soon as that load
    /// finishes; repeated reloads in that window collapse into one.
    /// `load_more` during a load is ignored.
    pub fn reload(&self) {
        self.send(Command::Reload);
    }

    pub fn remove(&self, id: ProductId) {
        self.send(Command::Remove(id));
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("Session already stopped; command dropped");
        }
    }

    /// A receiver that observes every snapshot published from now on.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Stop the session and wait for its task to finish. No snapshot is
    /// published once this returns.
    pub async fn shutdown(mut self) -> Result<(), JoinError> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        (&mut self.task).await
    }
}

type PageResult = (u32, Result<Vec<Product>, LoadError>);

pub struct InventorySession<S, C> {
    config: ClientConfig,
    source: S,
    clock: C,
    view: InventoryView,
    push: Option<PushSubscription>,
    push_connected: bool,
    refresh: RefreshState,
    loads: JoinSet<PageResult>,
    reload_pending: bool,
    snapshots: watch::Sender<Snapshot>,
}

impl<S: ProductSource, C: Clock> InventorySession<S, C> {
    /// Start a session on the current Tokio runtime. The first page is
    /// requested immediately.
    pub fn spawn(
        config: ClientConfig,
        source: S,
        push: Option<PushSubscription>,
        clock: C,
    ) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());
        let (stop_tx, stop_rx) = oneshot::channel();

        let session = Self {
            config,
            source,
            clock,
            view: InventoryView::new(),
            push,
            push_connected: false,
            refresh: RefreshState::Idle,
            loads: JoinSet::new(),
            reload_pending: false,
            snapshots: snapshot_tx,
        };
        let task = tokio::spawn(session.run(command_rx, stop_rx));

        SessionHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            stop: Some(stop_tx),
            task,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut stop: oneshot::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(self.config.refresh_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.refresh = RefreshState::Running;
        info!("Inventory session started");
        self.start_load(true);
        self.publish();

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => self.tick(),
                notice = next_notice(&mut self.push) => self.on_notice(notice),
                Some(joined) = self.loads.join_next(), if !self.loads.is_empty() => {
                    match joined {
                        Ok((page, result)) => self.on_page(page, result),
                        Err(e) => self.on_load_aborted(e),
                    }
                }
                command = commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
            }
        }

        self.loads.abort_all();
        self.push = None;
        self.refresh = RefreshState::Idle;
        self.publish();
        info!("Inventory session stopped");
    }

    fn tick(&mut self) {
        let outcome = self.view.refresh(self.clock.now());
        if outcome.membership_changed {
            info!("Pruned {} expired product(s)", outcome.expired.len());
        }
        self.publish();
    }

    fn on_notice(&mut self, notice: Option<PushNotice>) {
        match notice {
            Some(PushNotice::Connected) => {
                self.push_connected = true;
            }
            Some(PushNotice::Disconnected) => {
                warn!("Push channel dropped; waiting for reconnect");
                self.push_connected = false;
            }
            Some(PushNotice::Event(event)) => {
                debug!("Push event: {event:?}");
                if !self.view.apply_event(event) {
                    return;
                }
            }
            None => {
                info!("Push channel closed");
                self.push = None;
                self.push_connected = false;
            }
        }
        self.publish();
    }

    fn on_page(&mut self, page: u32, result: Result<Vec<Product>, LoadError>) {
        let result = match result {
            Ok(items) => {
                info!("Loaded page {page}: {} product(s)", items.len());
                Ok(items)
            }
            Err(e) => {
                warn!("Loading page {page} failed: {e}");
                Err(e.to_string())
            }
        };
        self.view.finish_load(page, result, self.config.page_size);
        self.after_load();
    }

    /// A load task that panicked or was cancelled still has to release the
    /// `Loading` state, or no later load could start.
    fn on_load_aborted(&mut self, error: JoinError) {
        warn!("Product load task failed: {error}");
        if let LoadState::Loading { page } = *self.view.load_state() {
            self.view.finish_load(
                page,
                Err(format!("load task failed: {error}")),
                self.config.page_size,
            );
        }
        self.after_load();
    }

    fn after_load(&mut self) {
        if std::mem::take(&mut self.reload_pending) {
            debug!("Running reload queued during the previous load");
            self.start_load(true);
        }
        self.publish();
    }

    fn on_command(&mut self, command: Command) {
        debug!("Session command: {command:?}");
        match command {
            Command::LoadMore => self.start_load(false),
            Command::Reload if self.view.is_loading() => {
                debug!("Reload queued behind the load in flight");
                self.reload_pending = true;
                return;
            }
            Command::Reload => self.start_load(true),
            Command::Remove(id) => {
                if self.view.remove(id).is_none() {
                    return;
                }
            }
        }
        self.publish();
    }

    fn start_load(&mut self, reload: bool) {
        let Some(page) = self.view.begin_load(reload) else {
            debug!("Load skipped: in flight or nothing left");
            return;
        };
        let source = self.source.clone();
        let limit = self.config.page_size;
        self.loads
            .spawn(async move { (page, source.fetch_page(page, limit).await) });
    }

    fn publish(&self) {
        self.snapshots.send_replace(Snapshot {
            sampled_at: self.view.sampled_at(),
            revision: self.view.revision(),
            entries: self.view.tracked(),
            load: self.view.load_state().clone(),
            has_more: self.view.has_more(),
            push_connected: self.push_connected,
            refresh: self.refresh,
        });
    }
}

async fn next_notice(push: &mut Option<PushSubscription>) -> Option<PushNotice> {
    match push {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}
