//! Process records and their placement (ready / blocked / running).

pub mod process;
pub mod queues;

pub use process::{PendingIo, Process, ProcessState};
pub use queues::ProcessTable;
