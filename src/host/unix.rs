// kill(2) with errno mapped onto HostError.

#[cfg(unix)]
use crate::error::HostError;

/// Sends `signal` to `pid`. Pids that are not positive `pid_t`s are reported as
/// not found, since kill(0) and kill(-n) would target process groups.
#[cfg(unix)]
pub(super) fn send_signal(pid: u32, signal: libc::c_int) -> Result<(), HostError> {
    let raw = match libc::pid_t::try_from(pid) {
        Ok(raw) if raw > 0 => raw,
        _ => return Err(HostError::NotFound { pid }),
    };
    // SAFETY: kill has no memory-safety preconditions.
    let rc = unsafe { libc::kill(raw, signal) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    Err(map_errno(pid, err))
}

#[cfg(unix)]
fn map_errno(pid: u32, err: std::io::Error) -> HostError {
    match err.raw_os_error() {
        Some(libc::ESRCH) => HostError::NotFound { pid },
        Some(libc::EPERM) => HostError::PermissionDenied { pid },
        _ => HostError::Io { pid, source: err },
    }
}
