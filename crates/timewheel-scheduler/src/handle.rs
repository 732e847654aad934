//! Client-side token for a scheduled timer.

use std::fmt;

use tokio::sync::mpsc;

use crate::engine::Command;
use crate::task::{Task, TaskId};

/// Refers to a timer by id. Cancel and restart go through the wheel's command
/// channel; the handle never touches task state itself.
///
/// Before the wheel starts, handle commands wait in the channel until the
/// next call on the wheel (or `start()`) applies them. A handle that issues
/// more than `command_buffer` of them on an idle wheel waits for that call.
#[derive(Clone)]
pub struct TimerHandle {
    task: Task,
    commands: mpsc::Sender<Command>,
}

impl TimerHandle {
    pub(crate) fn new(task: Task, commands: mpsc::Sender<Command>) -> Self {
        Self { task, commands }
    }

    pub fn id(&self) -> &TaskId {
        self.task.id()
    }

    pub fn delay(&self) -> std::time::Duration {
        self.task.delay()
    }

    pub fn is_repeating(&self) -> bool {
        self.task.repeat()
    }

    /// Cancel the timer. A no-op if it already fired, was already cancelled,
    /// or the wheel has stopped.
    pub async fn remove(&self) {
        if self.commands.send(Command::Remove(self.id().clone())).await.is_err() {
            tracing::debug!(timer = %self.id(), "Remove ignored: time wheel stopped");
        }
    }

    /// Cancel any pending instance and schedule the same timer again, so the
    /// countdown starts over from now. The id and delay are kept.
    pub async fn restart(&self) {
        self.remove().await;
        if self.commands.send(Command::Add(self.task.clone())).await.is_err() {
            tracing::warn!(timer = %self.id(), "Restart ignored: time wheel stopped");
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("id", self.id())
            .field("delay", &self.delay())
            .field("repeat", &self.is_repeating())
            .finish()
    }
}
