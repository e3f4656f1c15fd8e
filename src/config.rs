use anyhow::{Context, Result, anyhow};
use chrono_tz::Tz;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_OUTPUT: &str = "/usr/local/telescope/archive/logs/wxd.dat";
const DEFAULT_TIMEZONE: &str = "Europe/Madrid";

#[derive(Debug, Parser)]
#[command(name = "wxpoll", version, about = "Weather station telemetry poller")]
pub struct Cli {
    #[command(subcommand)]
    pub source: SourceCommand,
}

#[derive(Debug, Subcommand)]
pub enum SourceCommand {
    /// Read the station status blob from a TCP socket
    #[command(disable_help_flag = true)]
    Socket(SocketArgs),
    /// Query the station values from an SNMP agent
    #[command(disable_help_flag = true)]
    Agent(AgentArgs),
}

/// Flags shared by both station variants. `-h` is the host, so help is `--help` only.
#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Record file to append to
    #[arg(short = 'f', long = "file", default_value = DEFAULT_OUTPUT)]
    pub file: PathBuf,
    /// Seconds to wait between polls
    #[arg(short = 'd', long = "delay", default_value_t = 1)]
    pub delay: u64,
    /// Echo records to standard output (0 disables)
    #[arg(short = 'e', long = "echo", default_value_t = 1)]
    pub echo: u8,
    /// IANA timezone used for the record timestamp
    #[arg(long = "tz", default_value = DEFAULT_TIMEZONE)]
    pub timezone: String,
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

#[derive(Debug, Args)]
pub struct SocketArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Station host
    #[arg(short = 'h', long = "host", default_value = "rebei")]
    pub host: String,
    /// Station port
    #[arg(short = 'p', long = "port", default_value_t = 6666)]
    pub port: u16,
    /// Connect and read timeout in seconds (transport default when unset)
    #[arg(long = "timeout")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Args)]
pub struct AgentArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Agent host
    #[arg(short = 'h', long = "host", default_value = "rebei.oadm.cat")]
    pub host: String,
    /// Agent UDP port
    #[arg(long = "port", default_value_t = 161)]
    pub port: u16,
    /// Read-only community string
    #[arg(long = "community", default_value = "public")]
    pub community: String,
    /// Per-query timeout in seconds
    #[arg(long = "timeout", default_value_t = 1)]
    pub timeout: u64,
    /// Skip samples with any empty agent reply instead of recording zeros
    #[arg(long = "strict")]
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    Socket {
        host: String,
        port: u16,
        timeout: Option<Duration>,
    },
    Agent {
        host: String,
        port: u16,
        community: String,
        timeout: Duration,
        strict: bool,
    },
}

/// Process-wide settings, fixed once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    pub output: PathBuf,
    pub delay: Duration,
    pub echo: bool,
    pub timezone: Tz,
    pub source: SourceConfig,
}

impl PollerConfig {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let (common, source) = match cli.source {
            SourceCommand::Socket(args) => (
                args.common,
                SourceConfig::Socket {
                    host: args.host,
                    port: args.port,
                    timeout: args.timeout.map(Duration::from_secs),
                },
            ),
            SourceCommand::Agent(args) => (
                args.common,
                SourceConfig::Agent {
                    host: args.host,
                    port: args.port,
                    community: args.community,
                    timeout: Duration::from_secs(args.timeout),
                    strict: args.strict,
                },
            ),
        };

        let timezone = common
            .timezone
            .parse::<Tz>()
            .map_err(|err| anyhow!("{err}"))
            .with_context(|| format!("unknown timezone {}", common.timezone))?;

        Ok(Self {
            output: common.file,
            delay: Duration::from_secs(common.delay),
            echo: common.echo != 0,
            timezone,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<PollerConfig> {
        let cli = Cli::try_parse_from(std::iter::once("wxpoll").chain(args.iter().copied()))?;
        PollerConfig::from_cli(cli)
    }

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_socket_defaults() {
        let config = parse(&["socket"]).unwrap();
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(config.delay, Duration::from_secs(1));
        assert!(config.echo);
        assert_eq!(config.timezone, chrono_tz::Europe::Madrid);
        assert_eq!(
            config.source,
            SourceConfig::Socket {
                host: "rebei".to_string(),
                port: 6666,
                timeout: None,
            }
        );
    }

    #[test]
    fn test_socket_flags() {
        let config = parse(&[
            "socket", "-f", "/tmp/wx.dat", "-d", "5", "-h", "station", "-p", "7000", "-e", "0",
        ])
        .unwrap();
        assert_eq!(config.output, PathBuf::from("/tmp/wx.dat"));
        assert_eq!(config.delay, Duration::from_secs(5));
        assert!(!config.echo);
        assert_eq!(
            config.source,
            SourceConfig::Socket {
                host: "station".to_string(),
                port: 7000,
                timeout: None,
            }
        );
    }

    #[test]
    fn test_agent_flags() {
        let config = parse(&["agent", "-h", "wx.local", "--strict", "--tz", "UTC"]).unwrap();
        assert_eq!(config.timezone, chrono_tz::UTC);
        assert_eq!(
            config.source,
            SourceConfig::Agent {
                host: "wx.local".to_string(),
                port: 161,
                community: "public".to_string(),
                timeout: Duration::from_secs(1),
                strict: true,
            }
        );
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let err = Cli::try_parse_from(["wxpoll", "socket", "-x", "1"]).unwrap_err();
        assert!(err.to_string().contains("-x"));
        assert!(Cli::try_parse_from(["wxpoll", "agent", "-p", "1"]).is_err());
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        assert!(parse(&["socket", "--tz", "Mars/Olympus"]).is_err());
    }
}
