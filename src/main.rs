//! cs800-io - interactive control client for the Cryostream 800
//!
//! ## Ports
//!
//! - 30303 UDP: identification packets (not used)
//! - 30304 UDP: status packets (received)
//! - 30305 UDP: commands (sent)

use cs800_io::app::App;
use cs800_io::config::AppConfig;
use cs800_io::error::{Error, Result};
use cs800_io::session::DeviceSession;
use cs800_io::transport::UdpTransport;
use std::env;
use std::net::IpAddr;

/// Parse config path from command line arguments.
///
/// Supports:
/// - `cs800-io <path>` (positional)
/// - `cs800-io --config <path>` (flag-based)
/// - `cs800-io -c <path>` (short flag)
///
/// Defaults to `/etc/cs800io.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    // Look for --config or -c flag
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    // Fall back to first positional argument (if it doesn't start with -)
    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    // Default path
    "/etc/cs800io.toml".to_string()
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("cs800-io starting...");

    let config_path = parse_config_path();
    log::info!("Using config: {}", config_path);
    let config = AppConfig::from_file(&config_path)?;

    let device_ip: IpAddr = config
        .device
        .ip
        .parse()
        .map_err(|_| Error::InvalidParameter(format!("device ip {:?}", config.device.ip)))?;
    log::info!("Device: Cryostream 800 at {}", device_ip);

    let session = DeviceSession::new(UdpTransport::new(), device_ip);
    let mut app = App::new(session);
    app.run()?;

    log::info!("cs800-io stopped");
    Ok(())
}
