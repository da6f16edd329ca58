//! Reachability probe
//!
//! One ICMP echo through the system `ping` binary. The result is shown to
//! the operator next to the device address and nothing else: protocol and
//! retry logic never consult it, since a device can answer pings while its
//! controller firmware is wedged and vice versa.

use std::net::IpAddr;
use std::process::{Command, Stdio};

/// True when one ping to `ip` succeeds
pub fn is_online(ip: IpAddr) -> bool {
    match Command::new("ping")
        .arg("-c")
        .arg("1")
        .arg(ip.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) => status.success(),
        Err(e) => {
            log::debug!("ping {} failed to run: {}", ip, e);
            false
        }
    }
}

/// "Online" or "Offline" for display
pub fn online_label(ip: IpAddr) -> &'static str {
    if is_online(ip) {
        "Online"
    } else {
        "Offline"
    }
}
