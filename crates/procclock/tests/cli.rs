//! End-to-end tests of the `procclock` binary.

#![cfg(target_os = "linux")]

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io::Read;
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};

fn procclock() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_procclock"));
    cmd.env_remove("PROCCLOCK_CONFIG_PATH")
        .env("RUST_LOG", "info")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

fn run(args: &[&str]) -> Output {
    procclock().args(args).output().expect("failed to run procclock")
}

fn spawn_sleep() -> Child {
    Command::new("sleep").arg("30").spawn().expect("failed to spawn sleep")
}

fn pid_of(child: &Child) -> Pid {
    Pid::from_raw(i32::try_from(child.id()).unwrap())
}

fn is_stopped(pid: Pid) -> bool {
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .ok()
        .and_then(|stat| {
            let rest = &stat[stat.rfind(')')? + 1..];
            rest.trim_start().chars().next()
        })
        == Some('T')
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Option<std::process::ExitStatus> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Ok(Some(status)) = child.try_wait() {
            return Some(status);
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    None
}

#[test]
fn test_missing_arguments_exit_1() {
    let output = run(&["1234", "100"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
}

#[test]
fn test_non_positive_values_exit_1() {
    let own = std::process::id().to_string();
    assert_eq!(run(&[&own, "0", "10"]).status.code(), Some(1));
    assert_eq!(run(&[&own, "100", "-3"]).status.code(), Some(1));
}

#[test]
fn test_frequency_bound() {
    let mut sleeper = spawn_sleep();
    let pid = sleeper.id().to_string();

    let rejected = run(&[&pid, "1", "500000"]);
    assert_eq!(rejected.status.code(), Some(1));
    // Rejected before calibration
    assert!(!String::from_utf8_lossy(&rejected.stderr).contains("Clock calibrated"));

    let accepted = run(&[&pid, "1", "499999", "--iterations", "10", "--max-ticks", "20"]);
    assert_eq!(accepted.status.code(), Some(0));

    let _ = sleeper.kill();
    let _ = sleeper.wait();
}

#[test]
fn test_missing_process_exit_1() {
    let output = run(&[&(i32::MAX - 1).to_string(), "100", "10"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn test_log_output_is_plain_when_piped() {
    let output = run(&[&(i32::MAX - 1).to_string(), "100", "10"]);
    assert!(!output.stderr.contains(&0x1b), "ANSI escape in piped output");
}

#[test]
fn test_target_exit_ends_run_with_success() {
    let mut sleeper = Command::new("sleep").arg("0.3").spawn().unwrap();
    let pid = sleeper.id().to_string();

    // 50% duty cycle at 20 Hz: the child still finishes, just slower
    let mut throttler = procclock()
        .args([pid.as_str(), "25000", "20", "--iterations", "10"])
        .spawn()
        .unwrap();

    // Reap the child so its pid disappears once it exits
    let child_status = wait_with_timeout(&mut sleeper, Duration::from_secs(10));
    assert!(child_status.is_some(), "throttled child never finished");

    let status = wait_with_timeout(&mut throttler, Duration::from_secs(5));
    let status = status.expect("procclock did not notice the lost process");
    assert_eq!(status.code(), Some(0));

    let mut stderr = String::new();
    throttler
        .stderr
        .take()
        .unwrap()
        .read_to_string(&mut stderr)
        .unwrap();
    assert!(stderr.contains("Lost process"), "stderr: {stderr}");
}

#[test]
fn test_interrupt_leaves_target_running() {
    let mut sleeper = spawn_sleep();
    let pid = pid_of(&sleeper);

    // 1ms on per 100ms period: stopped almost all the time
    let mut throttler = procclock()
        .args([pid.to_string().as_str(), "1000", "10", "--iterations", "10"])
        .spawn()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while !is_stopped(pid) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(is_stopped(pid), "target never got suspended");

    kill(pid_of(&throttler), Signal::SIGINT).unwrap();
    let status = wait_with_timeout(&mut throttler, Duration::from_secs(5)).expect("procclock ignored SIGINT");
    assert_eq!(status.code(), Some(0));

    std::thread::sleep(Duration::from_millis(50));
    assert!(!is_stopped(pid), "target left suspended after interrupt");

    let _ = sleeper.kill();
    let _ = sleeper.wait();
}
