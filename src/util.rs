//! Small OS-level helpers shared by the builder and CLI.

#[cfg(unix)]
use libc::{getrlimit, rlimit, setrlimit, RLIMIT_NOFILE};

/// Current soft limit on open file descriptors for this process.
#[cfg(unix)]
pub fn get_file_limit() -> usize {
    let mut limits = rlimit { rlim_cur: 0, rlim_max: 0 };
    let result = unsafe { getrlimit(RLIMIT_NOFILE, &mut limits) };
    if result == 0 {
        limits.rlim_cur as usize
    } else {
        0
    }
}

#[cfg(unix)]
pub fn set_fd_limit(new_limit: u64) -> std::io::Result<()> {
    let rlim = rlimit { rlim_cur: new_limit, rlim_max: new_limit };
    let ret = unsafe { setrlimit(RLIMIT_NOFILE, &rlim) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(windows)]
pub fn get_file_limit() -> usize {
    8192
}

#[cfg(windows)]
pub fn set_fd_limit(_new_limit: u64) -> std::io::Result<()> {
    Ok(())
}

/// Raises the process fd limit if `needed` exceeds the current soft limit,
/// so a reference set spanning many per-file readers doesn't hit `EMFILE`.
/// Best-effort: failures are logged and otherwise ignored, since the builder
/// opens one file at a time rather than holding them all open concurrently.
pub fn ensure_fd_limit(needed: usize) {
    let current = get_file_limit();
    if needed > current {
        if let Err(e) = set_fd_limit(needed as u64) {
            log::warn!("could not raise file descriptor limit to {}: {}", needed, e);
        }
    }
}
