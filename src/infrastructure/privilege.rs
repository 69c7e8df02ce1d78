use tracing::{debug, info};

use crate::domain::Capabilities;

/// Decide once whether the process runs elevated.
pub fn detect_capabilities() -> Capabilities {
    let elevated = is_elevated();
    info!(elevated, "Privilege check complete");
    Capabilities { elevated }
}

#[cfg(unix)]
fn is_elevated() -> bool {
    let uid = nix::unistd::Uid::effective();
    debug!(uid = uid.as_raw(), "Effective uid");
    uid.is_root()
}

#[cfg(windows)]
fn is_elevated() -> bool {
    use std::process::{Command, Stdio};

    // `net session` only succeeds for members of the elevated Administrators token
    let elevated = Command::new("net")
        .arg("session")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    debug!(elevated, "Elevation from net session");
    elevated
}

#[cfg(not(any(unix, windows)))]
fn is_elevated() -> bool {
    false
}
