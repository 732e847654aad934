//! Scheduler loop: the single owner of the slot store.
//!
//! Ticks and client commands arrive on two sources and are handled one at a
//! time. `tokio::select!` picks among ready branches at random, so a tick and
//! a command that become ready together have no fixed order.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::dispatch::Dispatcher;
use crate::slots::SlotStore;
use crate::stats::WheelStats;
use crate::task::{Task, TaskId};

/// Requests accepted by the loop.
pub(crate) enum Command {
    Add(Task),
    Remove(TaskId),
    Stats(oneshot::Sender<WheelStats>),
    Stop(oneshot::Sender<()>),
}

pub(crate) struct Engine {
    store: SlotStore,
    commands: mpsc::Receiver<Command>,
    dispatcher: Dispatcher,
    interval: Duration,
    ticks: u64,
    fired: u64,
    cancelled: u64,
}

impl Engine {
    pub fn new(store: SlotStore, commands: mpsc::Receiver<Command>, interval: Duration) -> Self {
        Self {
            store,
            commands,
            dispatcher: Dispatcher::new(),
            interval,
            ticks: 0,
            fired: 0,
            cancelled: 0,
        }
    }

    /// Run until a stop request arrives or every sender is gone.
    pub async fn run(mut self) {
        // First tick one interval after start, then every interval; late ticks are replayed.
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        tracing::info!(
            interval = ?self.interval,
            slots = self.store.slot_count(),
            "⏱️ Time wheel started"
        );

        let ack = loop {
            tokio::select! {
                _ = ticker.tick() => self.tick(),
                cmd = self.commands.recv() => {
                    let Some(cmd) = cmd else {
                        break None;
                    };
                    if let Some(ack) = self.handle(cmd) {
                        break Some(ack);
                    }
                }
            }
        };

        tracing::info!(
            ticks = self.ticks,
            fired = self.fired,
            pending = self.store.len(),
            "Time wheel stopped"
        );
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
    }

    /// Apply commands that queued before the loop was spawned.
    pub fn drain_queued(&mut self) {
        while let Ok(cmd) = self.commands.try_recv() {
            self.handle(cmd);
        }
    }

    /// Apply one command. Returns the acknowledgement channel of a stop request.
    pub fn handle(&mut self, cmd: Command) -> Option<oneshot::Sender<()>> {
        match cmd {
            Command::Add(task) => {
                tracing::debug!(timer = %task.id(), delay = ?task.delay(), repeat = task.repeat(), "Timer scheduled");
                self.store.insert(task);
            }
            Command::Remove(id) => {
                if self.store.remove(&id) {
                    self.cancelled += 1;
                    tracing::debug!(timer = %id, "Timer cancelled");
                }
            }
            Command::Stats(reply) => {
                let _ = reply.send(self.stats());
            }
            Command::Stop(ack) => return Some(ack),
        }
        None
    }

    fn tick(&mut self) {
        self.ticks += 1;
        for due in self.store.advance() {
            tracing::debug!(timer = %due.id, "Timer fired");
            self.fired += 1;
            self.dispatcher.dispatch(due);
        }
    }

    pub fn stats(&self) -> WheelStats {
        WheelStats {
            interval_us: u64::try_from(self.interval.as_micros()).unwrap_or(u64::MAX),
            slot_count: self.store.slot_count(),
            cursor: self.store.cursor(),
            pending: self.store.len(),
            ticks: self.ticks,
            fired: self.fired,
            cancelled: self.cancelled,
            callback_panics: self.dispatcher.panics(),
            max_slot_depth: self.store.max_slot_depth(),
        }
    }
}
