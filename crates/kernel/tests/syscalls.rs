mod common;

use common::{Rig, SPIN, config};
use kernel::{PendingIo, ProcessState};
use types::{AccessMode, CpuMode, HwError, Pid, syscall};
use vm::{Devices, ScriptedDevice};

fn rig_with_device(device: ScriptedDevice) -> (Rig, i32) {
    let mut devices = Devices::new();
    let id = devices.attach(Box::new(device));
    let rig = Rig::boot_with(config(4, 10), vec![SPIN.clone(), SPIN.clone()], devices);
    (rig, id)
}

#[test]
fn read_from_ready_device_completes_at_once() {
    let mut device = ScriptedDevice::new(true);
    device.push_input(42);
    let (mut rig, id) = rig_with_device(device);

    rig.syscall(syscall::READ, id, 0);

    assert_eq!(rig.current(), Some(Pid(1)));
    let regs = rig.kernel.process(Pid(1)).unwrap().registers();
    assert_eq!((regs.a, regs.x, regs.pc), (0, 42, 2));
    assert_eq!(rig.machine.cpu.x(), 42);
    assert_eq!(rig.machine.cpu.err(), HwError::Ok);
}

#[test]
fn read_blocks_until_device_is_ready() {
    let (mut rig, id) = rig_with_device(ScriptedDevice::new(false));

    rig.syscall(syscall::READ, id, 0);

    assert_eq!(rig.current(), None);
    assert_eq!(rig.kernel.blocked_pids(), vec![Pid(1)]);
    let process = rig.kernel.process(Pid(1)).unwrap();
    assert_eq!(process.state(), ProcessState::Blocked);
    assert_eq!(
        process.pending_io(),
        Some(PendingIo {
            device: id,
            mode: AccessMode::Read
        })
    );
    assert_eq!(process.registers().pc, 0);
    assert!(rig.kernel.is_running());
    assert_eq!(rig.machine.cpu.mode(), CpuMode::Idle);

    rig.timer();
    assert_eq!(rig.current(), None);

    let device = rig.scripted(id);
    device.push_input(7);
    device.set_ready(true);
    rig.timer();

    assert_eq!(rig.current(), Some(Pid(1)));
    let process = rig.kernel.process(Pid(1)).unwrap();
    let regs = process.registers();
    assert_eq!((regs.a, regs.x, regs.pc), (0, 7, 2));
    assert_eq!(process.pending_io(), None);
    assert_eq!(process.metrics().blocks, 1);
    assert_eq!(process.metrics().blocked_time, 2);
    assert_eq!(rig.kernel.metrics().idle_time, 2);
    assert_eq!(rig.machine.cpu.x(), 7);
}

#[test]
fn device_errors_reach_the_caller() {
    let mut device = ScriptedDevice::new(true);
    device.fail_next_read(HwError::InvalidOp);
    let (mut rig, id) = rig_with_device(device);

    rig.syscall(syscall::READ, id, 0);
    let regs = *rig.kernel.process(Pid(1)).unwrap().registers();
    assert_eq!(regs.a, HwError::InvalidOp.code());
    assert_eq!(regs.pc, 2);

    rig.syscall(syscall::READ, 9, 0);
    let regs = *rig.kernel.process(Pid(1)).unwrap().registers();
    assert_eq!(regs.a, HwError::InvalidDevice.code());
    assert_eq!(regs.pc, 4);
    assert_eq!(rig.current(), Some(Pid(1)));
}

#[test]
fn write_sends_x_to_the_device() {
    let (mut rig, id) = rig_with_device(ScriptedDevice::new(true));

    rig.syscall(syscall::WRITE, id, 99);
    rig.syscall(syscall::WRITE, id, -4);

    assert_eq!(rig.scripted(id).outputs(), &[99, -4]);
    assert_eq!(rig.machine.cpu.a(), 0);
    assert_eq!(rig.kernel.metrics().syscalls, 2);
}

#[test]
fn blocked_write_completes_once_device_is_ready() {
    let (mut rig, id) = rig_with_device(ScriptedDevice::new(false));

    rig.syscall(syscall::WRITE, id, 5);
    assert_eq!(rig.kernel.blocked_pids(), vec![Pid(1)]);
    assert!(rig.scripted(id).outputs().is_empty());

    rig.scripted(id).set_ready(true);
    rig.timer();

    assert_eq!(rig.scripted(id).outputs(), &[5]);
    let process = rig.kernel.process(Pid(1)).unwrap();
    assert_eq!(process.state(), ProcessState::Running);
    assert_eq!(process.pending_io(), None);
    let regs = process.registers();
    assert_eq!((regs.a, regs.x, regs.pc), (0, 5, 2));
    assert_eq!(rig.current(), Some(Pid(1)));
}

#[test]
fn create_queues_child_and_returns_its_pid() {
    let mut rig = Rig::boot(config(4, 10), vec![SPIN.clone(), SPIN.clone()]);

    assert_eq!(rig.create(1), 2);

    assert_eq!(rig.current(), Some(Pid(1)));
    assert_eq!(rig.kernel.ready_pids(), vec![Pid(2)]);
    assert_eq!(rig.kernel.process(Pid(1)).unwrap().registers().pc, 2);
    let child = rig.kernel.process(Pid(2)).unwrap();
    assert_eq!(child.program(), 1);
    assert_eq!(child.state(), ProcessState::Ready);
    assert_eq!(child.frame_of(0), None);
}

#[test]
fn failed_create_is_not_fatal_to_the_caller() {
    let mut rig = Rig::boot(config(4, 10), vec![SPIN.clone(), SPIN.clone()]);

    assert_eq!(rig.create(9), -1);
    assert_eq!(rig.current(), Some(Pid(1)));
    assert_eq!(rig.kernel.metrics().failed_creations, 1);
    assert!(rig.log.contains("process 2 terminated at creation"));

    // The failed child's pid is not handed out again.
    assert_eq!(rig.create(1), 3);
}

#[test]
fn unknown_syscall_terminates_only_the_caller() {
    let mut rig = Rig::boot(config(4, 10), vec![SPIN.clone(), SPIN.clone()]);
    rig.create(1);

    rig.syscall(42, 0, 0);

    assert!(rig.kernel.process(Pid(1)).is_none());
    assert_eq!(rig.current(), Some(Pid(2)));
    assert!(rig.kernel.is_running());
    assert_eq!(rig.kernel.process_reports()[0].pid, Pid(1));
    assert!(rig.log.contains("unknown syscall 42"));
}

#[test]
fn exit_hands_the_cpu_to_the_next_process() {
    let mut rig = Rig::boot(config(4, 10), vec![SPIN.clone(), SPIN.clone()]);
    rig.create(1);

    rig.syscall(syscall::EXIT, 0, 0);

    assert_eq!(rig.current(), Some(Pid(2)));
    assert!(rig.kernel.ready_pids().is_empty());
    assert_eq!(rig.kernel.process_reports().len(), 1);
    assert!(rig.kernel.is_running());
}
