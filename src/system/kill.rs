use crate::error::TerminateError;

/// Sends SIGTERM to `pid`.
///
/// Non-positive pids never reach the OS: on unix they would address a
/// process group or every process the caller may signal.
pub fn terminate(pid: i64) -> Result<(), TerminateError> {
    if pid <= 0 {
        return Err(TerminateError::Invalid(pid));
    }
    send_term(pid)
}

#[cfg(unix)]
fn send_term(pid: i64) -> Result<(), TerminateError> {
    let raw = libc::pid_t::try_from(pid).map_err(|_| TerminateError::Invalid(pid))?;
    // SAFETY: kill(2) has no memory-safety preconditions; raw is a positive pid.
    let rc = unsafe { libc::kill(raw, libc::SIGTERM) };
    if rc == 0 {
        tracing::info!(pid, "sent SIGTERM");
        return Ok(());
    }

    let err = std::io::Error::last_os_error();
    tracing::warn!(pid, error = %err, "SIGTERM failed");
    match err.raw_os_error() {
        Some(libc::ESRCH) => Err(TerminateError::NotFound(pid)),
        Some(libc::EINVAL) => Err(TerminateError::Invalid(pid)),
        _ => Err(TerminateError::Denied(pid)),
    }
}

#[cfg(not(unix))]
fn send_term(pid: i64) -> Result<(), TerminateError> {
    use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, Signal, System};

    let raw = u32::try_from(pid).map_err(|_| TerminateError::Invalid(pid))?;
    let sys_pid = Pid::from_u32(raw);
    let mut sys = System::new();
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[sys_pid]),
        true,
        ProcessRefreshKind::nothing(),
    );
    let Some(process) = sys.process(sys_pid) else {
        return Err(TerminateError::NotFound(pid));
    };
    match process.kill_with(Signal::Term) {
        Some(true) => Ok(()),
        Some(false) => Err(TerminateError::Denied(pid)),
        None if process.kill() => Ok(()),
        None => Err(TerminateError::Denied(pid)),
    }
}
