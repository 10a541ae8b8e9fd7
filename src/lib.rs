//! Task lifecycle engine: deadlines, recurrence, overdue detection, the
//! completion echo in the today view, and the derived task views.

pub mod cli;
pub mod io;
pub mod model;
pub mod ops;
pub mod util;
