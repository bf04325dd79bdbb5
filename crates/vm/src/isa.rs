//! Instruction set of the simulated CPU.
//!
//! Every instruction occupies two consecutive words: the opcode and one
//! argument (ignored by instructions that take none). Memory operands are
//! virtual addresses, translated by the MMU while the CPU is in user mode.

use core::fmt;
use std::collections::HashMap;

use types::Word;

/// Width of every encoded instruction, in words. The kernel advances a
/// caller's PC by this amount when it completes a system call.
pub const INSTRUCTION_WIDTH: Word = 2;

#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    Nop = 0,
    /// A = arg
    LoadI = 1,
    /// A = mem[arg]
    LoadM = 2,
    /// mem[arg] = A
    StoreM = 3,
    /// A += mem[arg]
    Add = 4,
    /// A -= mem[arg]
    Sub = 5,
    Inc = 6,
    Dec = 7,
    /// Swap A and X.
    SwapX = 8,
    Jmp = 9,
    /// Jump to arg when A == 0.
    Jz = 10,
    /// Jump to arg when A != 0.
    Jnz = 11,
    /// Trap into the kernel with syscall number arg.
    Syscall = 12,
}

impl Opcode {
    const ALL: [Opcode; 13] = [
        Opcode::Nop,
        Opcode::LoadI,
        Opcode::LoadM,
        Opcode::StoreM,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Inc,
        Opcode::Dec,
        Opcode::SwapX,
        Opcode::Jmp,
        Opcode::Jz,
        Opcode::Jnz,
        Opcode::Syscall,
    ];

    pub fn from_word(word: Word) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| *op as Word == word)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "nop",
            Opcode::LoadI => "loadi",
            Opcode::LoadM => "loadm",
            Opcode::StoreM => "storem",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Inc => "inc",
            Opcode::Dec => "dec",
            Opcode::SwapX => "swapx",
            Opcode::Jmp => "jmp",
            Opcode::Jz => "jz",
            Opcode::Jnz => "jnz",
            Opcode::Syscall => "syscall",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.mnemonic())
    }
}

/// Instruction argument: a literal word or a label resolved at `finish`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Value(Word),
    Label(String),
}

impl From<Word> for Operand {
    fn from(value: Word) -> Self {
        Operand::Value(value)
    }
}

impl From<&str> for Operand {
    fn from(label: &str) -> Self {
        Operand::Label(label.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AsmError {
    UnknownLabel(String),
    DuplicateLabel(String),
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmError::UnknownLabel(l) => write!(f, "unknown label `{}`", l),
            AsmError::DuplicateLabel(l) => write!(f, "label `{}` defined twice", l),
        }
    }
}

impl std::error::Error for AsmError {}

/// Builds program images word by word, resolving labels at the end.
///
/// ```
/// use vm::Assembler;
/// use types::syscall;
///
/// let mut asm = Assembler::new();
/// asm.loadi(3)
///     .label("loop")
///     .dec()
///     .jnz("loop")
///     .syscall(syscall::EXIT);
/// let image = asm.finish().unwrap();
/// assert_eq!(image.len(), 8);
/// ```
#[derive(Debug, Default)]
pub struct Assembler {
    words: Vec<Word>,
    labels: HashMap<String, Word>,
    fixups: Vec<(usize, String)>,
    duplicate: Option<String>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address of the next emitted word.
    pub fn here(&self) -> Word {
        self.words.len() as Word
    }

    pub fn label(&mut self, name: &str) -> &mut Self {
        let here = self.here();
        if self.labels.insert(name.to_string(), here).is_some() && self.duplicate.is_none() {
            self.duplicate = Some(name.to_string());
        }
        self
    }

    pub fn emit(&mut self, op: Opcode, arg: impl Into<Operand>) -> &mut Self {
        self.words.push(op as Word);
        self.push_operand(arg.into());
        self
    }

    /// Labeled data word.
    pub fn word(&mut self, name: &str, value: Word) -> &mut Self {
        self.label(name);
        self.words.push(value);
        self
    }

    /// `count` zeroed words, e.g. to pad a program across several pages.
    pub fn reserve(&mut self, count: usize) -> &mut Self {
        self.words.extend(std::iter::repeat(0).take(count));
        self
    }

    pub fn nop(&mut self) -> &mut Self {
        self.emit(Opcode::Nop, 0)
    }

    pub fn loadi(&mut self, value: impl Into<Operand>) -> &mut Self {
        self.emit(Opcode::LoadI, value)
    }

    pub fn loadm(&mut self, addr: impl Into<Operand>) -> &mut Self {
        self.emit(Opcode::LoadM, addr)
    }

    pub fn storem(&mut self, addr: impl Into<Operand>) -> &mut Self {
        self.emit(Opcode::StoreM, addr)
    }

    pub fn add(&mut self, addr: impl Into<Operand>) -> &mut Self {
        self.emit(Opcode::Add, addr)
    }

    pub fn sub(&mut self, addr: impl Into<Operand>) -> &mut Self {
        self.emit(Opcode::Sub, addr)
    }

    pub fn inc(&mut self) -> &mut Self {
        self.emit(Opcode::Inc, 0)
    }

    pub fn dec(&mut self) -> &mut Self {
        self.emit(Opcode::Dec, 0)
    }

    pub fn swapx(&mut self) -> &mut Self {
        self.emit(Opcode::SwapX, 0)
    }

    pub fn jmp(&mut self, target: impl Into<Operand>) -> &mut Self {
        self.emit(Opcode::Jmp, target)
    }

    pub fn jz(&mut self, target: impl Into<Operand>) -> &mut Self {
        self.emit(Opcode::Jz, target)
    }

    pub fn jnz(&mut self, target: impl Into<Operand>) -> &mut Self {
        self.emit(Opcode::Jnz, target)
    }

    pub fn syscall(&mut self, number: Word) -> &mut Self {
        self.emit(Opcode::Syscall, number)
    }

    pub fn finish(self) -> Result<Vec<Word>, AsmError> {
        if let Some(name) = self.duplicate {
            return Err(AsmError::DuplicateLabel(name));
        }
        let mut words = self.words;
        for (slot, name) in self.fixups {
            let addr = self
                .labels
                .get(&name)
                .copied()
                .ok_or_else(|| AsmError::UnknownLabel(name.clone()))?;
            words[slot] = addr;
        }
        Ok(words)
    }

    fn push_operand(&mut self, operand: Operand) {
        match operand {
            Operand::Value(v) => self.words.push(v),
            Operand::Label(name) => {
                self.fixups.push((self.words.len(), name));
                self.words.push(0);
            }
        }
    }
}
