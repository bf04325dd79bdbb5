use core::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{ProgramId, Tick};

/// Process selection policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulerKind {
    #[default]
    RoundRobin,
    /// Shortest estimated burst first.
    Shortest,
}

/// Victim selection when no physical frame is free.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvictionKind {
    /// Evict the frame that was filled longest ago.
    #[default]
    Fifo,
    Random,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// System configuration, fixed at construction time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Physical memory size, in words.
    pub memory_size: usize,
    /// Frame (and page) size, in words.
    pub frame_size: usize,
    /// Round-robin quantum and initial burst estimate, in timer interrupts.
    pub max_quantum: u32,
    /// Clock ticks between two timer interrupts.
    pub timer_interval: Tick,
    pub scheduler: SchedulerKind,
    pub eviction: EvictionKind,
    /// Program loaded into the first process at boot.
    pub init_program: ProgramId,
    /// Where process and system reports are written. `None` keeps them in memory only.
    pub report_dir: Option<PathBuf>,
    pub report_format: ReportFormat,
    /// Seed for the random eviction policy.
    pub rng_seed: u64,
}

impl Config {
    pub const DEFAULT_MEMORY_SIZE: usize = 2000;
    pub const DEFAULT_FRAME_SIZE: usize = 100;
    pub const DEFAULT_MAX_QUANTUM: u32 = 5;
    pub const DEFAULT_TIMER_INTERVAL: Tick = 50;

    pub fn frame_count(&self) -> usize {
        if self.frame_size == 0 {
            return 0;
        }
        self.memory_size / self.frame_size
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_size == 0 {
            return Err(ConfigError::ZeroFrameSize);
        }
        if self.memory_size == 0 {
            return Err(ConfigError::ZeroMemory);
        }
        if self.memory_size % self.frame_size != 0 {
            return Err(ConfigError::UnevenFrames {
                memory_size: self.memory_size,
                frame_size: self.frame_size,
            });
        }
        if self.max_quantum == 0 {
            return Err(ConfigError::ZeroQuantum);
        }
        if self.timer_interval == 0 {
            return Err(ConfigError::ZeroTimerInterval);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_size: Self::DEFAULT_MEMORY_SIZE,
            frame_size: Self::DEFAULT_FRAME_SIZE,
            max_quantum: Self::DEFAULT_MAX_QUANTUM,
            timer_interval: Self::DEFAULT_TIMER_INTERVAL,
            scheduler: SchedulerKind::default(),
            eviction: EvictionKind::default(),
            init_program: 0,
            report_dir: None,
            report_format: ReportFormat::default(),
            rng_seed: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    ZeroFrameSize,
    ZeroMemory,
    UnevenFrames { memory_size: usize, frame_size: usize },
    ZeroQuantum,
    ZeroTimerInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroFrameSize => write!(f, "frame size must be non-zero"),
            ConfigError::ZeroMemory => write!(f, "memory size must be non-zero"),
            ConfigError::UnevenFrames {
                memory_size,
                frame_size,
            } => write!(
                f,
                "memory size {} is not a multiple of frame size {}",
                memory_size, frame_size
            ),
            ConfigError::ZeroQuantum => write!(f, "quantum must be at least one tick"),
            ConfigError::ZeroTimerInterval => write!(f, "timer interval must be non-zero"),
        }
    }
}

impl std::error::Error for ConfigError {}
