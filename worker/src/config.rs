use std::{env, time::Duration};

use log::warn;

use crate::error::{Result, WorkerErr};

const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
const SERVER_ENV: &str = "PS_ADDR";

/// The client configuration, built from a `-key=value` argument list.
///
/// | flag                    | default              |
/// |-------------------------|----------------------|
/// | `-server=<host:port>`   | `PS_ADDR` env var    |
/// | `-connect_timeout_ms=n` | `10000`              |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server: String,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Parses the process arguments, falling back to the environment for the server address.
    ///
    /// Arguments that aren't flags (such as the program name) are skipped, unknown flags are
    /// logged and ignored.
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::parse(args, env::var(SERVER_ENV).ok())
    }

    fn parse<I, S>(args: I, fallback: Option<String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut server = fallback;
        let mut connect_timeout = Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS);

        for arg in args {
            let arg = arg.as_ref();
            let Some(flag) = arg.strip_prefix('-') else {
                continue;
            };

            let flag = flag.trim_start_matches('-');
            let (key, value) = flag.split_once('=').unwrap_or((flag, ""));

            match key {
                "server" => server = Some(value.to_string()),
                "connect_timeout_ms" => {
                    let ms = value.parse().map_err(|e| {
                        WorkerErr::Initialization(format!("invalid {arg}: {e}"))
                    })?;
                    connect_timeout = Duration::from_millis(ms);
                }
                _ => warn!("ignoring unknown flag {arg}"),
            }
        }

        let server = server
            .filter(|addr| !addr.is_empty())
            .ok_or_else(|| {
                WorkerErr::Initialization(format!("no -server flag given and {SERVER_ENV} unset"))
            })?;

        Ok(Self {
            server,
            connect_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let config = ClientConfig::parse(
            ["prog", "-server=10.0.0.1:9000", "-connect_timeout_ms=250"],
            None,
        )
        .unwrap();

        assert_eq!(config.server, "10.0.0.1:9000");
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
    }

    #[test]
    fn falls_back_to_env_and_defaults() {
        let config = ClientConfig::parse(["prog", "-sync=true"], Some("host:1".into())).unwrap();

        assert_eq!(config.server, "host:1");
        assert_eq!(
            config.connect_timeout,
            Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS)
        );
    }

    #[test]
    fn flag_overrides_env() {
        let config = ClientConfig::parse(["--server=a:2"], Some("host:1".into())).unwrap();
        assert_eq!(config.server, "a:2");
    }

    #[test]
    fn missing_server_is_an_init_error() {
        let err = ClientConfig::parse(["prog"], None).unwrap_err();
        assert!(matches!(err, WorkerErr::Initialization(_)));

        let err = ClientConfig::parse(["-server=x:1", "-connect_timeout_ms=soon"], None).unwrap_err();
        assert!(matches!(err, WorkerErr::Initialization(_)));
    }
}
