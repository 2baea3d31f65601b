#![cfg(unix)]

use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use process_gopher::error::TerminateError;
use process_gopher::system::kill::terminate;

fn spawn_long_lived_child() -> Child {
    Command::new("sh")
        .args(["-c", "sleep 30"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn child process")
}

fn wait_for_exit(child: &mut Child, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return true,
            Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(50)),
            _ => return false,
        }
    }
}

#[test]
fn non_positive_pids_never_reach_the_os() {
    assert_eq!(terminate(0), Err(TerminateError::Invalid(0)));
    assert_eq!(terminate(-1), Err(TerminateError::Invalid(-1)));
}

#[test]
fn missing_pid_is_not_found() {
    let mut child = spawn_long_lived_child();
    let pid = i64::from(child.id());
    let _ = child.kill();
    let _ = child.wait();

    assert_eq!(terminate(pid), Err(TerminateError::NotFound(pid)));
}

#[test]
fn terminating_spawned_child_makes_it_exit() {
    let mut child = spawn_long_lived_child();
    let pid = i64::from(child.id());

    match terminate(pid) {
        Ok(()) => {
            if !wait_for_exit(&mut child, Duration::from_secs(5)) {
                let _ = child.kill();
                panic!("child {pid} did not exit after SIGTERM");
            }
        }
        Err(err) => {
            let _ = child.kill();
            panic!("terminate reported failure: {err}");
        }
    }
}
