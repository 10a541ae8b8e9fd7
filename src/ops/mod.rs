pub mod echo;
pub mod overdue;
pub mod recurrence;
pub mod task_ops;
pub mod views;

pub use echo::EchoScheduler;
pub use overdue::{is_missed, is_task_missed};
pub use recurrence::next_occurrence;
pub use task_ops::{Completion, Engine, EngineError};
