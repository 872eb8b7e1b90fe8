// Host process control: live name lookup, polite termination and forced kill

mod unix;

use crate::error::HostError;
use crate::sampler::display_name;
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use tracing::instrument;

/// The host-level primitives remediation is delegated to.
pub trait HostControl: Send + Sync {
    /// Current display name of `pid`, or `None` if it is gone (zombies count as gone).
    fn process_name(&self, pid: u32) -> Option<String>;

    /// Asks `pid` to exit (SIGTERM). `Unsupported` when the platform has no such request.
    fn signal_terminate(&self, pid: u32) -> Result<(), HostError>;

    /// Kills `pid` outright (SIGKILL).
    fn signal_kill(&self, pid: u32) -> Result<(), HostError>;
}

/// The real host: sysinfo for lookups, kill(2) on unix, sysinfo's kill elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

impl HostControl for SystemHost {
    fn process_name(&self, pid: u32) -> Option<String> {
        let pid = Pid::from_u32(pid);
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        sys.process(pid)
            .filter(|p| p.status() != ProcessStatus::Zombie)
            .map(|p| display_name(&p.name().to_string_lossy(), pid.as_u32()))
    }

    #[instrument(skip(self), fields(operation = "signal_terminate"))]
    fn signal_terminate(&self, pid: u32) -> Result<(), HostError> {
        #[cfg(unix)]
        {
            unix::send_signal(pid, libc::SIGTERM)
        }
        #[cfg(not(unix))]
        {
            sysinfo_signal(pid, Some(sysinfo::Signal::Term))
        }
    }

    #[instrument(skip(self), fields(operation = "signal_kill"))]
    fn signal_kill(&self, pid: u32) -> Result<(), HostError> {
        #[cfg(unix)]
        {
            unix::send_signal(pid, libc::SIGKILL)
        }
        #[cfg(not(unix))]
        {
            sysinfo_signal(pid, None)
        }
    }
}

/// `signal` of `None` means sysinfo's unconditional kill.
#[cfg(not(unix))]
fn sysinfo_signal(pid: u32, signal: Option<sysinfo::Signal>) -> Result<(), HostError> {
    let sys_pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[sys_pid]), true);
    let Some(process) = sys.process(sys_pid) else {
        return Err(HostError::NotFound { pid });
    };
    let sent = match signal {
        Some(signal) => process.kill_with(signal).ok_or(HostError::Unsupported)?,
        None => process.kill(),
    };
    if sent {
        Ok(())
    } else {
        Err(HostError::PermissionDenied { pid })
    }
}
