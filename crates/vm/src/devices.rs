use core::fmt;
use std::any::Any;
use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use types::{AccessMode, HwError, Tick, Word};

/// Device id of the random number generator in [`Devices::standard`].
pub const DEV_RANDOM: Word = 0;
/// Device id of the terminal in [`Devices::standard`].
pub const DEV_TERMINAL: Word = 1;

/// A simulated I/O device.
///
/// The kernel polls `ready` before every transfer; `read`/`write` are only
/// attempted once the device reports ready.
pub trait IoDevice: fmt::Debug {
    fn ready(&self, now: Tick, mode: AccessMode) -> bool;
    fn read(&mut self, now: Tick) -> Result<Word, HwError>;
    fn write(&mut self, now: Tick, value: Word) -> Result<(), HwError>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Device table indexed by device id.
#[derive(Debug, Default)]
pub struct Devices {
    devices: Vec<Box<dyn IoDevice>>,
}

impl Devices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Random generator at [`DEV_RANDOM`] and terminal at [`DEV_TERMINAL`].
    pub fn standard(seed: u64) -> Self {
        let mut devices = Self::new();
        devices.attach(Box::new(RandomDevice::new(seed)));
        devices.attach(Box::new(Terminal::new()));
        devices
    }

    /// Install a device, returning its id.
    pub fn attach(&mut self, device: Box<dyn IoDevice>) -> Word {
        self.devices.push(device);
        (self.devices.len() - 1) as Word
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Unknown devices report ready so the request completes with `InvalidDevice`.
    pub fn ready(&self, id: Word, mode: AccessMode, now: Tick) -> bool {
        match self.device(id) {
            Some(dev) => dev.ready(now, mode),
            None => true,
        }
    }

    pub fn read(&mut self, id: Word, now: Tick) -> Result<Word, HwError> {
        self.device_mut(id)
            .ok_or(HwError::InvalidDevice)?
            .read(now)
    }

    pub fn write(&mut self, id: Word, value: Word, now: Tick) -> Result<(), HwError> {
        self.device_mut(id)
            .ok_or(HwError::InvalidDevice)?
            .write(now, value)
    }

    pub fn get<T: IoDevice + 'static>(&self, id: Word) -> Option<&T> {
        self.device(id)?.as_any().downcast_ref::<T>()
    }

    pub fn get_mut<T: IoDevice + 'static>(&mut self, id: Word) -> Option<&mut T> {
        self.device_mut(id)?.as_any_mut().downcast_mut::<T>()
    }

    fn device(&self, id: Word) -> Option<&dyn IoDevice> {
        let idx = usize::try_from(id).ok()?;
        self.devices.get(idx).map(|d| d.as_ref())
    }

    fn device_mut(&mut self, id: Word) -> Option<&mut Box<dyn IoDevice>> {
        let idx = usize::try_from(id).ok()?;
        self.devices.get_mut(idx)
    }
}

/// Output-only terminal. Collects every written word.
#[derive(Debug, Default)]
pub struct Terminal {
    output: Vec<Word>,
}

impl Terminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> &[Word] {
        &self.output
    }
}

impl IoDevice for Terminal {
    fn ready(&self, _now: Tick, _mode: AccessMode) -> bool {
        true
    }

    fn read(&mut self, _now: Tick) -> Result<Word, HwError> {
        Err(HwError::InvalidOp)
    }

    fn write(&mut self, _now: Tick, value: Word) -> Result<(), HwError> {
        self.output.push(value);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Random number generator that stays busy for a while after every read.
#[derive(Debug)]
pub struct RandomDevice {
    rng: StdRng,
    busy_ticks: Tick,
    last_read: Option<Tick>,
    max: Word,
}

impl RandomDevice {
    pub const BUSY_TICKS: Tick = 30;
    pub const MAX_VALUE: Word = 1000;

    pub fn new(seed: u64) -> Self {
        Self::with_busy_ticks(seed, Self::BUSY_TICKS)
    }

    pub fn with_busy_ticks(seed: u64, busy_ticks: Tick) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            busy_ticks,
            last_read: None,
            max: Self::MAX_VALUE,
        }
    }
}

impl IoDevice for RandomDevice {
    fn ready(&self, now: Tick, mode: AccessMode) -> bool {
        match (mode, self.last_read) {
            (AccessMode::Write, _) | (AccessMode::Read, None) => true,
            (AccessMode::Read, Some(at)) => now.saturating_sub(at) >= self.busy_ticks,
        }
    }

    fn read(&mut self, now: Tick) -> Result<Word, HwError> {
        self.last_read = Some(now);
        Ok(self.rng.gen_range(0..self.max))
    }

    fn write(&mut self, _now: Tick, _value: Word) -> Result<(), HwError> {
        Err(HwError::InvalidOp)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Device whose readiness and input are controlled from outside.
/// Reads are ready only while it is ready and has input queued.
#[derive(Debug, Default)]
pub struct ScriptedDevice {
    ready: bool,
    inputs: VecDeque<Word>,
    outputs: Vec<Word>,
    read_error: Option<HwError>,
}

impl ScriptedDevice {
    pub fn new(ready: bool) -> Self {
        Self {
            ready,
            ..Self::default()
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn push_input(&mut self, value: Word) {
        self.inputs.push_back(value);
    }

    /// Make the next read fail with `err` instead of returning input.
    pub fn fail_next_read(&mut self, err: HwError) {
        self.read_error = Some(err);
    }

    pub fn outputs(&self) -> &[Word] {
        &self.outputs
    }
}

impl IoDevice for ScriptedDevice {
    fn ready(&self, _now: Tick, mode: AccessMode) -> bool {
        match mode {
            AccessMode::Read => self.ready && (!self.inputs.is_empty() || self.read_error.is_some()),
            AccessMode::Write => self.ready,
        }
    }

    fn read(&mut self, _now: Tick) -> Result<Word, HwError> {
        if let Some(err) = self.read_error.take() {
            return Err(err);
        }
        self.inputs.pop_front().ok_or(HwError::InvalidOp)
    }

    fn write(&mut self, _now: Tick, value: Word) -> Result<(), HwError> {
        self.outputs.push(value);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
