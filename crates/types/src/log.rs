//! Kernel and machine logging.
//!
//! A [`Logger`] is a cheap, cloneable handle over a shared `fmt::Write` sink.
//! Components keep their own clone (scoped with a tag) and log through the
//! [`log!`](crate::log!) and [`trace!`](crate::trace!) macros.

use core::cell::RefCell;
use core::fmt::{self, Write};
use std::fs::File;
use std::io::Write as IoWrite;
use std::path::Path;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Off,
    Info,
    Trace,
}

#[derive(Clone)]
pub struct Logger {
    writer: Rc<RefCell<dyn Write>>,
    level: Level,
    tag: &'static str,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("tag", &self.tag)
            .finish()
    }
}

impl Logger {
    pub fn new(writer: Rc<RefCell<dyn Write>>, level: Level) -> Self {
        Self {
            writer,
            level,
            tag: "",
        }
    }

    /// Logger writing to stderr.
    pub fn console(level: Level) -> Self {
        Self::new(Rc::new(RefCell::new(ConsoleWriter)), level)
    }

    /// Logger that discards everything.
    pub fn off() -> Self {
        Self::console(Level::Off)
    }

    /// Logger writing to an in-memory buffer; the returned handle reads it back.
    pub fn buffered(level: Level) -> (Self, BufferWriter) {
        let buffer = BufferWriter::default();
        let logger = Self::new(Rc::new(RefCell::new(buffer.clone())), level);
        (logger, buffer)
    }

    /// Same sink, different tag.
    pub fn scoped(&self, tag: &'static str) -> Self {
        Self {
            writer: Rc::clone(&self.writer),
            level: self.level,
            tag,
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level != Level::Off && level <= self.level
    }

    pub fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        let mut writer = self.writer.borrow_mut();
        let _ = if self.tag.is_empty() {
            writeln!(writer, "{}", args)
        } else {
            writeln!(writer, "[{}] {}", self.tag, args)
        };
    }
}

#[macro_export]
macro_rules! log {
    ($logger:expr, $($arg:tt)+) => {
        $logger.emit($crate::log::Level::Info, format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $logger.emit($crate::log::Level::Trace, format_args!($($arg)+))
    };
}

/// Writes to stderr.
pub struct ConsoleWriter;

impl Write for ConsoleWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        eprint!("{}", s);
        Ok(())
    }
}

/// Writes to a file, flushing on every write.
pub struct FileWriter {
    file: File,
}

impl FileWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(FileWriter {
            file: File::create(path)?,
        })
    }
}

impl Write for FileWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.file.write_all(s.as_bytes()).map_err(|_| fmt::Error)?;
        self.file.flush().map_err(|_| fmt::Error)?;
        Ok(())
    }
}

/// Shared in-memory sink.
#[derive(Clone, Default)]
pub struct BufferWriter {
    buf: Rc<RefCell<String>>,
}

impl BufferWriter {
    pub fn contents(&self) -> String {
        self.buf.borrow().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.buf.borrow().contains(needle)
    }
}

impl Write for BufferWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buf.borrow_mut().push_str(s);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respects_level_and_tag() {
        let (logger, buffer) = Logger::buffered(Level::Info);
        let kernel = logger.scoped("kernel");
        crate::log!(kernel, "process {} created", 3);
        crate::trace!(kernel, "hidden");
        assert_eq!(buffer.contents(), "[kernel] process 3 created\n");
    }

    #[test]
    fn file_writer_flushes_each_line() {
        let path = std::env::temp_dir().join(format!("types-log-{}.txt", std::process::id()));
        let file = FileWriter::create(&path).unwrap();
        let logger = Logger::new(Rc::new(RefCell::new(file)), Level::Info).scoped("vm");
        crate::log!(logger, "tick {}", 7);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[vm] tick 7\n");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn off_logs_nothing() {
        let (logger, buffer) = Logger::buffered(Level::Off);
        crate::log!(logger, "nothing");
        assert!(buffer.contents().is_empty());
    }
}
