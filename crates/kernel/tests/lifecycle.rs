mod common;

use std::fs;
use std::path::PathBuf;

use common::{Rig, SPIN, config};
use kernel::{Kernel, KernelError};
use types::{ConfigError, Level, Logger, Pid, ReportFormat, syscall};
use vm::{Devices, Machine, ProgramTable, ScriptedDevice};

fn report_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("kernel-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

#[test]
fn lifetime_is_blocked_plus_cpu_plus_wait() {
    let mut devices = Devices::new();
    let dev = devices.attach(Box::new(ScriptedDevice::new(false)));
    let mut rig = Rig::boot_with(config(4, 10), vec![SPIN.clone(), SPIN.clone()], devices);
    rig.create(1);

    rig.timer();
    rig.timer();
    assert_eq!(rig.current(), Some(Pid(2)));
    rig.syscall(syscall::READ, dev, 0);
    rig.timer();
    rig.advance(5);
    let device = rig.scripted(dev);
    device.push_input(1);
    device.set_ready(true);
    for _ in 0..5 {
        rig.timer();
    }
    rig.syscall(syscall::EXIT, 0, 0);
    rig.advance(3);
    rig.syscall(syscall::EXIT, 0, 0);

    assert!(!rig.kernel.is_running());
    let reports = rig.kernel.process_reports();
    assert_eq!(reports.len(), 2);
    for report in reports {
        assert_eq!(
            report.lifetime,
            report.blocked_time + report.cpu_time + report.wait_time,
            "{report}"
        );
        assert_eq!(report.lifetime, report.terminated_at - report.created_at);
    }
    let child = reports.iter().find(|r| r.pid == Pid(2)).unwrap();
    assert_eq!(child.blocks, 1);
    assert!(child.blocked_time >= 6);
    assert!(child.avg_turnaround > 0.0);
}

#[test]
fn text_reports_are_written_per_process_and_system() {
    let dir = report_dir("text");
    let mut cfg = config(4, 10);
    cfg.report_dir = Some(dir.clone());
    let mut rig = Rig::boot(cfg, vec![SPIN.clone()]);

    rig.timer();
    rig.syscall(syscall::EXIT, 0, 0);

    let process = fs::read_to_string(dir.join("proc-1.txt")).unwrap();
    assert!(process.contains("total lifetime:"));
    assert!(process.contains("page faults:"));
    let system = fs::read_to_string(dir.join("system.txt")).unwrap();
    assert!(system.contains("system halted: no processes left"));
    assert!(system.contains("interrupts:"));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn json_reports_parse_back() {
    let dir = report_dir("json");
    let mut cfg = config(4, 10);
    cfg.report_dir = Some(dir.clone());
    cfg.report_format = ReportFormat::Json;
    let mut rig = Rig::boot(cfg, vec![SPIN.clone()]);

    rig.timer();
    rig.timer();
    rig.syscall(syscall::EXIT, 0, 0);

    let text = fs::read_to_string(dir.join("proc-1.json")).unwrap();
    let process: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(process["pid"], 1);
    assert_eq!(process["cpu_time"], 2);

    let text = fs::read_to_string(dir.join("system.json")).unwrap();
    let system: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(system["processes_terminated"], 1);
    assert_eq!(system["interrupts_by_cause"]["timer"], 2);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn shutdown_terminates_everything() {
    let mut rig = Rig::boot(config(4, 10), vec![SPIN.clone(), SPIN.clone()]);
    rig.create(1);
    rig.create(1);
    rig.timer();

    rig.kernel.shutdown(&mut rig.machine);

    assert!(!rig.kernel.is_running());
    assert_eq!(rig.kernel.process_reports().len(), 3);
    let report = rig.kernel.system_report().unwrap();
    assert_eq!(report.reason, "shutdown requested");
    assert_eq!(report.processes_created, 3);
    assert_eq!(report.total_time, 1);
    assert!(rig.log.contains("halt at tick 1: shutdown requested"));
}

#[test]
fn missing_init_program_halts_at_boot() {
    let cfg = config(4, 10);
    let mut machine = Machine::new(&cfg, Devices::new(), Logger::off());
    let kernel = Kernel::boot(cfg, Box::new(ProgramTable::new()), Logger::off(), &mut machine)
        .unwrap();

    assert!(!kernel.is_running());
    let report = kernel.system_report().unwrap();
    assert_eq!(report.failed_creations, 1);
    assert_eq!(report.processes_created, 0);
}

#[test]
fn boot_rejects_bad_configuration() {
    let machine_cfg = config(4, 10);
    let mut machine = Machine::new(&machine_cfg, Devices::new(), Logger::off());
    let programs = || Box::new(ProgramTable::from_programs(vec![SPIN.clone()]));

    let err = Kernel::boot(config(2, 10), programs(), Logger::off(), &mut machine).unwrap_err();
    assert_eq!(
        err,
        KernelError::HardwareMismatch {
            memory_size: 40,
            frame_size: 10
        }
    );

    let mut cfg = machine_cfg.clone();
    cfg.frame_size = 0;
    let err = Kernel::boot(cfg, programs(), Logger::off(), &mut machine).unwrap_err();
    assert_eq!(err, KernelError::Config(ConfigError::ZeroFrameSize));
}

#[test]
fn transitions_are_logged() {
    let (logger, log) = Logger::buffered(Level::Info);
    let cfg = config(4, 10);
    let mut machine = Machine::new(&cfg, Devices::new(), logger.clone());
    let loader = Box::new(ProgramTable::from_programs(vec![SPIN.clone()]));
    let kernel = Kernel::boot(cfg, loader, logger, &mut machine).unwrap();

    assert!(kernel.is_running());
    assert!(log.contains("[kernel] booting: 4 frames of 10 words, round-robin scheduler"));
    assert!(log.contains("[kernel] process 1 created: program 0, 1 pages"));
}
