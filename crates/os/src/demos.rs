use types::syscall;
use vm::{AsmError, Assembler, DEV_RANDOM, DEV_TERMINAL, ProgramTable};

/// Program 0: start programs 1, 2 and 3, then exit.
pub fn init() -> Result<Vec<i32>, AsmError> {
    let mut asm = Assembler::new();
    for program in 1..=3 {
        asm.loadi(program).syscall(syscall::CREATE);
    }
    asm.syscall(syscall::EXIT);
    asm.finish()
}

/// Program 1: write 10 down to 1 to the terminal.
pub fn countdown() -> Result<Vec<i32>, AsmError> {
    let mut asm = Assembler::new();
    asm.loadi(10)
        .storem("n")
        .label("loop")
        .loadm("n")
        .swapx()
        .loadi(DEV_TERMINAL)
        .syscall(syscall::WRITE)
        .loadm("n")
        .dec()
        .storem("n")
        .jnz("loop")
        .syscall(syscall::EXIT)
        .word("n", 0);
    asm.finish()
}

/// Program 2: copy three random numbers to the terminal. The random device
/// is slow, so this one spends most of its life blocked.
pub fn dice() -> Result<Vec<i32>, AsmError> {
    let mut asm = Assembler::new();
    asm.loadi(3)
        .storem("left")
        .label("loop")
        .loadi(DEV_RANDOM)
        .syscall(syscall::READ)
        .loadi(DEV_TERMINAL)
        .syscall(syscall::WRITE)
        .loadm("left")
        .dec()
        .storem("left")
        .jnz("loop")
        .syscall(syscall::EXIT)
        .word("left", 0);
    asm.finish()
}

/// Program 3: sum 1..=20 with its variables a few pages away from the code,
/// then write the result (210).
pub fn sum() -> Result<Vec<i32>, AsmError> {
    let mut asm = Assembler::new();
    asm.loadi(0)
        .storem("total")
        .loadi(20)
        .storem("n")
        .label("loop")
        .loadm("total")
        .add("n")
        .storem("total")
        .loadm("n")
        .dec()
        .storem("n")
        .jnz("loop")
        .loadm("total")
        .swapx()
        .loadi(DEV_TERMINAL)
        .syscall(syscall::WRITE)
        .syscall(syscall::EXIT)
        .reserve(240)
        .word("total", 0)
        .word("n", 0);
    asm.finish()
}

/// The built-in program set, indexed as documented on each program.
pub fn demo_programs() -> Result<ProgramTable, AsmError> {
    Ok(ProgramTable::from_programs(vec![
        init()?,
        countdown()?,
        dice()?,
        sum()?,
    ]))
}
