use kernel::Kernel;
use types::{Config, EvictionKind, Logger, Pid, SchedulerKind, Word, syscall};
use vm::{
    Assembler, DEV_RANDOM, DEV_TERMINAL, Devices, Machine, ProgramTable, RunOutcome, Terminal,
};

/// Starts program 1, then writes 5, 4, 3, 2, 1 to the terminal.
fn countdown() -> Vec<Word> {
    let mut asm = Assembler::new();
    asm.loadi(1)
        .syscall(syscall::CREATE)
        .loadi(5)
        .storem("count")
        .label("loop")
        .loadm("count")
        .swapx()
        .loadi(DEV_TERMINAL)
        .syscall(syscall::WRITE)
        .loadm("count")
        .dec()
        .storem("count")
        .jnz("loop")
        .syscall(syscall::EXIT)
        .word("count", 0);
    asm.finish().unwrap()
}

/// Reads the random device twice, then writes 100.
fn reader() -> Vec<Word> {
    let mut asm = Assembler::new();
    asm.loadi(DEV_RANDOM)
        .syscall(syscall::READ)
        .loadi(DEV_RANDOM)
        .syscall(syscall::READ)
        .loadi(100)
        .swapx()
        .loadi(DEV_TERMINAL)
        .syscall(syscall::WRITE)
        .syscall(syscall::EXIT);
    asm.finish().unwrap()
}

fn small_machine(scheduler: SchedulerKind, eviction: EvictionKind) -> Config {
    Config {
        memory_size: 16,
        frame_size: 4,
        max_quantum: 2,
        timer_interval: 5,
        scheduler,
        eviction,
        ..Config::default()
    }
}

fn run(config: Config, programs: Vec<Vec<Word>>) -> (Machine, Kernel, RunOutcome) {
    let mut machine = Machine::new(&config, Devices::standard(3), Logger::off());
    let loader = Box::new(ProgramTable::from_programs(programs));
    let mut kernel = Kernel::boot(config, loader, Logger::off(), &mut machine).unwrap();
    let outcome = machine.run(&mut kernel, Some(100_000));
    (machine, kernel, outcome)
}

fn terminal(machine: &Machine) -> Vec<Word> {
    machine
        .devices
        .get::<Terminal>(DEV_TERMINAL)
        .unwrap()
        .output()
        .to_vec()
}

#[test]
fn programs_run_to_completion_under_memory_pressure() {
    for scheduler in [SchedulerKind::RoundRobin, SchedulerKind::Shortest] {
        for eviction in [EvictionKind::Fifo, EvictionKind::Random] {
            let (machine, kernel, outcome) =
                run(small_machine(scheduler, eviction), vec![countdown(), reader()]);

            assert!(matches!(outcome, RunOutcome::Halted(_)), "{outcome:?}");
            let output = terminal(&machine);
            let counted: Vec<Word> = output.iter().copied().filter(|&v| v <= 5).collect();
            assert_eq!(counted, vec![5, 4, 3, 2, 1]);
            assert_eq!(output.iter().filter(|&&v| v == 100).count(), 1);

            let report = kernel.system_report().unwrap();
            assert_eq!(report.reason, "no processes left");
            assert_eq!(report.processes_terminated, 2);
            assert!(report.evictions > 0);
            assert_eq!(report.active_time + report.idle_time, report.total_time);
            for process in kernel.process_reports() {
                assert_eq!(
                    process.lifetime,
                    process.blocked_time + process.cpu_time + process.wait_time
                );
            }
        }
    }
}

#[test]
fn faulting_program_does_not_take_down_the_system() {
    let bad = vec![99, 0];
    let (machine, kernel, outcome) = run(
        small_machine(SchedulerKind::RoundRobin, EvictionKind::Fifo),
        vec![countdown(), bad],
    );

    assert!(matches!(outcome, RunOutcome::Halted(_)));
    assert_eq!(terminal(&machine), vec![5, 4, 3, 2, 1]);
    let pids: Vec<Pid> = kernel.process_reports().iter().map(|r| r.pid).collect();
    assert!(pids.contains(&Pid(2)));
    assert!(kernel.system_report().unwrap().interrupts_by_cause["timer"] > 0);
}

#[test]
fn tick_limit_leaves_kernel_running_until_shutdown() {
    let mut spin = Assembler::new();
    spin.label("spin").jmp("spin");
    let config = small_machine(SchedulerKind::RoundRobin, EvictionKind::Fifo);
    let mut machine = Machine::new(&config, Devices::standard(1), Logger::off());
    let loader = Box::new(ProgramTable::from_programs(vec![spin.finish().unwrap()]));
    let mut kernel = Kernel::boot(config, loader, Logger::off(), &mut machine).unwrap();

    assert_eq!(machine.run(&mut kernel, Some(50)), RunOutcome::TickLimit(50));
    assert!(kernel.is_running());
    assert_eq!(kernel.current_pid(), Some(Pid(1)));

    kernel.shutdown(&mut machine);
    assert!(!kernel.is_running());
    assert_eq!(kernel.system_report().unwrap().total_time, 50);
}
