//! Primitives shared between the simulated hardware and the kernel.
//!
//! These live in `types` so the `vm` and `kernel` crates agree on register
//! widths, error codes and interrupt causes without depending on each other.

pub mod primitives;
pub use primitives::*;

pub mod result;
pub use result::HwError;

pub mod interrupt;
pub use interrupt::{InterruptCause, syscall};

pub mod config;
pub use config::{Config, ConfigError, EvictionKind, ReportFormat, SchedulerKind};

pub mod log;
pub use log::{BufferWriter, ConsoleWriter, FileWriter, Level, Logger};
