//! Process-group helpers for reliable child process cleanup.
//!
//! Children are spawned as leaders of their own process group so a timeout
//! can take down everything the shell started, not just the shell itself.
//! On non-Unix platforms these helpers are no-ops.

use std::io;

/// Send SIGKILL to a process group (best-effort).
///
/// A group that no longer exists is not an error.
#[cfg(unix)]
pub fn kill_process_group(process_group_id: u32) -> io::Result<()> {
    let Ok(pgid) = libc::pid_t::try_from(process_group_id) else {
        return Err(io::Error::other("process group id out of range"));
    };

    #[allow(unsafe_code)]
    let result = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if result == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }

    Ok(())
}

/// No-op on non-Unix platforms.
#[cfg(not(unix))]
pub fn kill_process_group(_process_group_id: u32) -> io::Result<()> {
    Ok(())
}
