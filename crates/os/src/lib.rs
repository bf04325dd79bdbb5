//! Boot glue for the simulated computer.
//!
//! This crate wires the pieces together:
//! - builds a [`vm::Machine`] from a [`types::Config`],
//! - boots the [`kernel::Kernel`] on it with a program loader,
//! - runs the hardware loop until the kernel halts or a tick budget runs out.
//!
//! A handful of demo programs are built in so the runner works without any
//! program files.

pub mod bootloader;
pub mod demos;

pub use bootloader::Bootloader;
pub use demos::demo_programs;
