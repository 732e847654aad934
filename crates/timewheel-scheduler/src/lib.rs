//! # TimeWheel Scheduler
//!
//! Hashed timing wheel for delayed and periodic callbacks.
//!
//! ## Architecture
//! ```text
//! TimeWheel ──(add / remove / stats / stop)──┐
//! TimerHandle ──(remove / restart)───────────┤ bounded mpsc
//!                                            ▼
//!                     Engine (single owner, tokio::select!)
//!                       ├── tokio interval → tick: scan slot[cursor]
//!                       │      circle > 0 → circle -= 1
//!                       │      circle = 0 → Dispatcher (spawn_blocking)
//!                       │                   repeat? re-enqueue : drop
//!                       └── SlotStore
//!                              slots: [VecDeque<TaskId>; N]
//!                              entries: TaskId → { task, slot, circle }
//! ```
//!
//! A delay of `d` on a wheel with tick `i` and `N` slots lands in slot
//! `(cursor + d / i) % N` and waits out `(d / i) / N` full rotations.

mod dispatch;
mod engine;
pub mod handle;
mod slots;
pub mod stats;
pub mod task;
pub mod wheel;

pub use handle::TimerHandle;
pub use stats::WheelStats;
pub use task::{Callback, Task, TaskId};
pub use wheel::{DEFAULT_COMMAND_BUFFER, TimeWheel};
