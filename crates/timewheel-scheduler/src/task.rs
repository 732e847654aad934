//! Timer task descriptors.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Zero-argument action run when a timer fires. Shared so repeating timers
/// and restarted handles can invoke the same closure again.
pub type Callback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Opaque unique identity of a scheduled timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Immutable part of a timer: what to run, after how long, and whether to re-arm.
///
/// The remaining rotation count lives in the slot store entry, which the
/// scheduler loop owns; a `Task` never changes once built.
#[derive(Clone)]
pub struct Task {
    id: TaskId,
    delay: Duration,
    repeat: bool,
    callback: Callback,
}

impl Task {
    pub fn new(id: TaskId, delay: Duration, repeat: bool, callback: Callback) -> Self {
        Self {
            id,
            delay,
            repeat,
            callback,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn callback(&self) -> &Callback {
        &self.callback
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("delay", &self.delay)
            .field("repeat", &self.repeat)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_conversions() {
        let a = TaskId::from("abc");
        let b = TaskId::new(String::from("abc"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "abc");
        assert_eq!(a.to_string(), "abc");
        assert!(TaskId::from("").is_empty());
    }

    #[test]
    fn test_task_debug_hides_callback() {
        let task = Task::new("t1".into(), Duration::from_millis(30), true, Arc::new(|| {}));
        let dbg = format!("{task:?}");
        assert!(dbg.contains("t1"));
        assert!(dbg.contains("repeat: true"));
        assert!(!dbg.contains("callback"));
    }
}
