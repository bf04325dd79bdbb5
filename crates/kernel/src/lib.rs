//! Kernel control plane for the simulated machine.
//!
//! The [`Kernel`] receives every hardware interrupt through
//! [`vm::InterruptHandler`], services system calls and page faults, and
//! decides which process runs next. State is single-writer: nothing outside
//! the interrupt path mutates it.

pub mod error;
pub mod frames;
pub mod metrics;
pub mod mmu;
pub mod report;
pub mod sched;
pub mod syscall;
pub mod system;
pub mod task;
pub mod trap;

pub use error::KernelError;
pub use frames::{Frame, FrameOwner, FrameTable};
pub use metrics::{ProcessMetrics, ProcessReport, SystemMetrics, SystemReport};
pub use mmu::{FaultOutcome, VmManager};
pub use report::ReportSink;
pub use sched::{RoundRobin, Scheduler, ShortestBurst};
pub use system::Kernel;
pub use task::{PendingIo, Process, ProcessState, ProcessTable};
