use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::session::SESSION_DURATION;

/// Dataset read when nothing else is configured.
pub const DEFAULT_DATA_PATH: &str = "jakarta.xlsx";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_ALLOWED_IDS: [&str; 1] = ["kimdonghyun"];
pub const MAX_SESSION_HOURS: u64 = 365 * 24;

/// Runtime settings shared by the binaries.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    pub static_dir: PathBuf,
    pub bind: SocketAddr,
    pub allowed_ids: Vec<String>,
    pub session_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            allowed_ids: DEFAULT_ALLOWED_IDS.iter().map(|s| s.to_string()).collect(),
            session_ttl: SESSION_DURATION,
        }
    }
}

/// Command-line and environment overrides for [`Config`].
#[cfg(feature = "web")]
#[derive(Debug, Clone, clap::Args)]
pub struct ConfigArgs {
    /// Shipment spreadsheet (xlsx, xls, ods or csv)
    #[arg(long = "data", env = "DASHBOARD_DATA", default_value = DEFAULT_DATA_PATH)]
    pub data_path: PathBuf,

    /// Directory served under /static
    #[arg(long = "static-dir", env = "DASHBOARD_STATIC", default_value = DEFAULT_STATIC_DIR)]
    pub static_dir: PathBuf,

    /// Address the web server listens on
    #[arg(long, env = "DASHBOARD_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Ids allowed to log in (comma separated)
    #[arg(
        long = "allow",
        env = "DASHBOARD_ALLOWED_IDS",
        value_delimiter = ',',
        default_values_t = DEFAULT_ALLOWED_IDS.map(String::from)
    )]
    pub allowed_ids: Vec<String>,

    /// Session lifetime in hours (at most one year)
    #[arg(
        long = "session-hours",
        env = "DASHBOARD_SESSION_HOURS",
        default_value_t = 24,
        value_parser = clap::value_parser!(u64).range(1..=MAX_SESSION_HOURS)
    )]
    pub session_hours: u64,
}

#[cfg(feature = "web")]
impl From<ConfigArgs> for Config {
    fn from(args: ConfigArgs) -> Self {
        Config {
            data_path: args.data_path,
            static_dir: args.static_dir,
            bind: args.bind,
            allowed_ids: args.allowed_ids,
            session_ttl: Duration::from_secs(
                args.session_hours.min(MAX_SESSION_HOURS).saturating_mul(60 * 60),
            ),
        }
    }
}
