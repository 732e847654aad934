//! `TimeWheel`: the public face of the scheduler.
//!
//! Construction validates the geometry and builds an idle loop. Until
//! `start()` the wheel's own calls apply to the idle store in place; after
//! it spawns the loop onto the current tokio runtime, every mutation goes
//! through the command channel.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use timewheel_core::config::WheelConfig;
use timewheel_core::id::{IdGenerator, UuidGenerator};
use timewheel_core::Result;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::engine::{Command, Engine};
use crate::handle::TimerHandle;
use crate::slots::SlotStore;
use crate::stats::WheelStats;
use crate::task::{Task, TaskId};

/// Commands that may queue before a sender has to wait.
pub const DEFAULT_COMMAND_BUFFER: usize = 1024;

enum Lifecycle {
    Idle(Engine),
    Running(JoinHandle<()>),
    Stopped,
}

/// Hashed timing wheel driven by a single owner task.
///
/// Not `Clone`: construct one per scheduler and share it by reference or `Arc`.
pub struct TimeWheel {
    interval: Duration,
    slot_count: usize,
    commands: mpsc::Sender<Command>,
    ids: Arc<dyn IdGenerator>,
    lifecycle: Mutex<Lifecycle>,
}

impl TimeWheel {
    /// Build an idle wheel. Fails with `InvalidArgument` on a zero interval or slot count.
    pub fn new(interval: Duration, slot_count: usize) -> Result<Self> {
        Self::with_buffer(interval, slot_count, DEFAULT_COMMAND_BUFFER)
    }

    pub fn from_config(config: &WheelConfig) -> Result<Self> {
        config.validate()?;
        Self::with_buffer(config.interval(), config.slot_count, config.command_buffer)
    }

    fn with_buffer(interval: Duration, slot_count: usize, buffer: usize) -> Result<Self> {
        let store = SlotStore::new(interval, slot_count)?;
        let (tx, rx) = mpsc::channel(buffer.max(1));
        Ok(Self {
            interval,
            slot_count,
            commands: tx,
            ids: Arc::new(UuidGenerator),
            lifecycle: Mutex::new(Lifecycle::Idle(Engine::new(store, rx, interval))),
        })
    }

    /// Replace the id source used to mint timer ids.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn is_running(&self) -> bool {
        matches!(&*self.lifecycle.lock(), Lifecycle::Running(handle) if !handle.is_finished())
    }

    /// Spawn the tick source and command loop on the current tokio runtime.
    ///
    /// Starting twice, or after `stop()`, does nothing.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn start(&self) {
        let mut lifecycle = self.lifecycle.lock();
        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Idle(engine) => {
                *lifecycle = Lifecycle::Running(tokio::spawn(engine.run()));
            }
            running @ Lifecycle::Running(_) => {
                tracing::warn!("Time wheel already started");
                *lifecycle = running;
            }
            Lifecycle::Stopped => {
                tracing::warn!("Time wheel already stopped; start ignored");
            }
        }
    }

    /// Stop the loop and wait until it has exited.
    ///
    /// Callbacks already dispatched keep running; they are not awaited.
    /// Calling `stop()` again is a no-op.
    pub async fn stop(&self) {
        let previous = std::mem::replace(&mut *self.lifecycle.lock(), Lifecycle::Stopped);
        let Lifecycle::Running(join) = previous else {
            return;
        };

        let (ack, done) = oneshot::channel();
        if self.commands.send(Command::Stop(ack)).await.is_ok() {
            let _ = done.await;
        }
        if let Err(e) = join.await {
            tracing::warn!("Time wheel loop ended abnormally: {e}");
        }
    }

    /// Schedule `callback` after `delay`, re-arming every `delay` if `repeat`.
    ///
    /// Returns `None` for a zero delay or a stopped wheel. Delays shorter than
    /// the tick interval are rounded up to one interval.
    pub async fn add_timer<F>(&self, delay: Duration, callback: F, repeat: bool) -> Option<TimerHandle>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if delay.is_zero() {
            return None;
        }
        let delay = delay.max(self.interval);
        let task = Task::new(TaskId::new(self.ids.next_id()), delay, repeat, Arc::new(callback));

        if !self.submit(Command::Add(task.clone())).await {
            tracing::warn!(timer = %task.id(), "Time wheel stopped; timer dropped");
            return None;
        }
        Some(TimerHandle::new(task, self.commands.clone()))
    }

    /// One-shot timer.
    pub async fn add_once<F>(&self, delay: Duration, callback: F) -> Option<TimerHandle>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.add_timer(delay, callback, false).await
    }

    /// Repeating timer.
    pub async fn add_repeat<F>(&self, delay: Duration, callback: F) -> Option<TimerHandle>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.add_timer(delay, callback, true).await
    }

    /// Cancel by id. Unknown, fired, and empty ids are ignored.
    pub async fn remove_timer(&self, id: &TaskId) {
        if id.is_empty() {
            return;
        }
        if !self.submit(Command::Remove(id.clone())).await {
            tracing::debug!(timer = %id, "Remove ignored: time wheel stopped");
        }
    }

    /// Snapshot of the loop's counters, or `None` once the wheel has stopped.
    pub async fn stats(&self) -> Option<WheelStats> {
        if let Some(stats) = self.idle_stats() {
            return Some(stats);
        }
        let (reply, rx) = oneshot::channel();
        self.commands.send(Command::Stats(reply)).await.ok()?;
        rx.await.ok()
    }

    /// Returns `false` once the wheel has stopped.
    async fn submit(&self, cmd: Command) -> bool {
        match self.apply_if_idle(cmd) {
            Some(cmd) => self.commands.send(cmd).await.is_ok(),
            None => true,
        }
    }

    /// Apply `cmd` to the idle store, behind anything handles queued. Hands the
    /// command back once the loop owns the store.
    fn apply_if_idle(&self, cmd: Command) -> Option<Command> {
        match &mut *self.lifecycle.lock() {
            Lifecycle::Idle(engine) => {
                engine.drain_queued();
                engine.handle(cmd);
                None
            }
            _ => Some(cmd),
        }
    }

    fn idle_stats(&self) -> Option<WheelStats> {
        match &mut *self.lifecycle.lock() {
            Lifecycle::Idle(engine) => {
                engine.drain_queued();
                Some(engine.stats())
            }
            _ => None,
        }
    }
}

impl Drop for TimeWheel {
    fn drop(&mut self) {
        if let Lifecycle::Running(join) = &*self.lifecycle.lock() {
            join.abort();
        }
    }
}

impl std::fmt::Debug for TimeWheel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeWheel")
            .field("interval", &self.interval)
            .field("slot_count", &self.slot_count)
            .field("running", &self.is_running())
            .finish()
    }
}
