//! Command Line Interface (CLI) arguments.

use clap::Parser;

/// Geoslice command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the service should listen
    #[arg(long, default_value = "0.0.0.0", env = "GEOSLICE_HOST")]
    pub host: String,
    /// The port to which the service should bind
    #[arg(long, default_value_t = 8080, env = "GEOSLICE_PORT")]
    pub port: u16,
    /// Path to the JSON configuration document describing clusters and geo-arrays
    #[arg(
        long,
        default_value = "~/.config/geoslice/config.json",
        env = "GEOSLICE_CONFIG_FILE"
    )]
    pub config_file: String,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "GEOSLICE_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/geoslice/certs/cert.pem",
        env = "GEOSLICE_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/geoslice/certs/key.pem",
        env = "GEOSLICE_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for requests to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "GEOSLICE_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
