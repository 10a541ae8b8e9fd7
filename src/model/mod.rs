pub mod config;
pub mod deadline;
pub mod list;
pub mod task;

pub use config::*;
pub use deadline::*;
pub use list::*;
pub use task::*;
