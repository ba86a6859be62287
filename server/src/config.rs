use std::time::Duration;

use clap::Parser;

use crate::server::ServerOptions;

#[derive(Debug, Clone, Parser)]
#[command(name = "board-server", about = "Realtime collaborative board relay", version)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "BOARD_BIND", default_value = "127.0.0.1:8080")]
    pub bind: String,

    /// How long an empty session is kept before it is removed
    #[arg(long, env = "BOARD_GRACE_PERIOD_SECS", default_value_t = 60)]
    pub grace_period_secs: u64,

    /// Outbound events buffered per connection before new ones are dropped
    #[arg(long, env = "BOARD_CONNECTION_BUFFER", default_value_t = 32)]
    pub connection_buffer: usize,

    /// Capacity of the server command channel
    #[arg(long, env = "BOARD_SERVER_BUFFER", default_value_t = 64)]
    pub server_buffer: usize,
}

impl Config {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            grace_period: self.grace_period(),
            command_buffer: self.server_buffer.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_overrides_defaults_from_arguments() {
        let config = Config::try_parse_from([
            "board-server",
            "--bind",
            "0.0.0.0:9000",
            "--grace-period-secs",
            "5",
            "--server-buffer",
            "0",
        ])
        .expect("valid arguments");
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.server_options().grace_period, Duration::from_secs(5));
        assert_eq!(config.server_options().command_buffer, 1);
    }

    #[test]
    fn it_rejects_non_numeric_grace_period() {
        assert!(Config::try_parse_from(["board-server", "--grace-period-secs", "soon"]).is_err());
    }
}
