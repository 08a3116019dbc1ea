//! Command line arguments of the broker binary
//!
//! Every flag is optional; unset flags fall back to the configuration file
//! and then to built-in defaults (see [`Args::resolve`]).

use crate::app::cli::config::{BrokerConfig, ConfigError, LogConfig};
use crate::broker::BrokerSettings;
use crate::client::default_port;
use crate::core::logging::{LogFormat, LogSettings};
use crate::queue::{QueueOptions, QueueOptionsPatch};
use clap::Parser;
use std::io::IsTerminal;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "memsqs")]
#[command(about = "In-memory FIFO queue broker with group leasing and long-poll receive")]
#[command(version, long_version = crate::core::version::banner())]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Address to listen on
    #[arg(short = 'b', long = "bind", value_name = "ADDR")]
    pub bind: Option<IpAddr>,

    /// Port to listen on (default: $MEMSQS_PORT or 80)
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// How long an empty receive stays parked
    #[arg(long = "longpoll-window-ms", value_name = "MS")]
    pub longpoll_window_ms: Option<u64>,

    /// Interval of the long-poll timeout check
    #[arg(long = "longpoll-tick-ms", value_name = "MS")]
    pub longpoll_tick_ms: Option<u64>,

    /// Interval of the expiration sweep
    #[arg(long = "sweep-interval-ms", value_name = "MS")]
    pub sweep_interval_ms: Option<u64>,

    /// Default lease duration of new queues
    #[arg(long = "visibility-timeout-ms", value_name = "MS")]
    pub visibility_timeout_ms: Option<u64>,

    /// Default maximum message age of new queues
    #[arg(long = "message-dead-timeout-ms", value_name = "MS")]
    pub message_dead_timeout_ms: Option<u64>,

    /// Default idle time before an empty queue is dropped
    #[arg(long = "queue-dead-timeout-ms", value_name = "MS")]
    pub queue_dead_timeout_ms: Option<u64>,

    /// Default maximum messages per receive
    #[arg(long = "receive-limit", value_name = "COUNT")]
    pub receive_limit: Option<usize>,

    /// Answer empty receives immediately instead of parking them
    #[arg(long = "no-longpoll")]
    pub no_longpoll: bool,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "simple", "ext", "json"])]
    pub log_format: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<String>,

    /// Force colored log output
    #[arg(short = 'g', long = "color", conflicts_with = "no_color")]
    pub color: bool,

    /// Disable colored log output
    #[arg(long = "no-color")]
    pub no_color: bool,
}

/// Fully resolved runtime settings of the broker process
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind_addr: SocketAddr,
    pub broker: BrokerSettings,
    pub queue_defaults: QueueOptions,
    pub log: LogSettings,
}

impl Args {
    /// Queue option overrides given on the command line
    fn queue_patch(&self) -> QueueOptionsPatch {
        QueueOptionsPatch {
            visibility_timeout: self.visibility_timeout_ms,
            message_dead_timeout: self.message_dead_timeout_ms,
            queue_dead_timeout: self.queue_dead_timeout_ms,
            receive_limit: self.receive_limit,
            longpoll: self.no_longpoll.then_some(false),
            owner_only: None,
        }
    }

    /// Merge with `config`; flags win over file values, file values over defaults
    pub fn resolve(&self, config: &BrokerConfig) -> Result<ServerSettings, ConfigError> {
        let ip = self
            .bind
            .or(config.bind)
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let port = self.port.or(config.port).unwrap_or_else(default_port);

        let defaults = BrokerSettings::default();
        let broker = BrokerSettings {
            longpoll_window: pick_ms(
                self.longpoll_window_ms,
                config.longpoll_window_ms,
                defaults.longpoll_window,
            ),
            longpoll_tick: pick_ms(
                self.longpoll_tick_ms,
                config.longpoll_tick_ms,
                defaults.longpoll_tick,
            ),
            sweep_interval: pick_ms(
                self.sweep_interval_ms,
                config.sweep_interval_ms,
                defaults.sweep_interval,
            ),
        };
        if broker.longpoll_tick.is_zero() {
            return Err(ConfigError::invalid("longpoll_tick_ms must be greater than zero"));
        }
        if broker.sweep_interval.is_zero() {
            return Err(ConfigError::invalid("sweep_interval_ms must be greater than zero"));
        }

        let mut queue_defaults = QueueOptions::default();
        config.queue.apply(&mut queue_defaults);
        self.queue_patch().apply(&mut queue_defaults);

        Ok(ServerSettings {
            bind_addr: SocketAddr::new(ip, port),
            broker,
            queue_defaults,
            log: self.log_settings(&config.log)?,
        })
    }

    fn log_settings(&self, config: &LogConfig) -> Result<LogSettings, ConfigError> {
        let format = match self.log_format.as_deref().or(config.format.as_deref()) {
            Some(name) => name.parse::<LogFormat>().map_err(ConfigError::invalid)?,
            None => LogFormat::default(),
        };
        let file = self
            .log_file
            .clone()
            .or_else(|| config.file.clone())
            .filter(|path| !path.eq_ignore_ascii_case("none"));
        let color = if self.no_color {
            false
        } else if self.color {
            true
        } else {
            config
                .color
                .unwrap_or_else(|| file.is_none() && std::io::stderr().is_terminal())
        };

        Ok(LogSettings {
            level: self
                .log_level
                .clone()
                .or_else(|| config.level.clone())
                .unwrap_or_else(|| "info".to_string()),
            format,
            file,
            color,
        })
    }
}

fn pick_ms(flag: Option<u64>, file: Option<u64>, default: Duration) -> Duration {
    flag.or(file).map(Duration::from_millis).unwrap_or(default)
}
