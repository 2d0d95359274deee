use std::{env, io, num::NonZeroUsize};

use comms::specs::server::{ServerSpec, SyncMode};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_SHARD_SIZE: usize = 4096;

/// The startup configuration of a server process, read from the environment.
///
/// | variable     | default     |
/// |--------------|-------------|
/// | `HOST`       | `127.0.0.1` |
/// | `PORT`       | required    |
/// | `WORKERS`    | required    |
/// | `SERVER_ID`  | `0`         |
/// | `SYNC`       | `false`     |
/// | `SHARD_SIZE` | `4096`      |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: String,
    pub spec: ServerSpec,
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> io::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through `var`, which maps a variable name to its value.
    pub fn from_lookup<F>(var: F) -> io::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port: u16 = parse(&var, "PORT")?.ok_or_else(|| missing("PORT"))?;

        let workers = parse::<NonZeroUsize, _>(&var, "WORKERS")?
            .ok_or_else(|| missing("WORKERS"))?;
        let server_id = parse(&var, "SERVER_ID")?.unwrap_or_default();
        let mode = parse(&var, "SYNC")?.unwrap_or(SyncMode::Async);
        let shard_size = parse(&var, "SHARD_SIZE")?.unwrap_or(DEFAULT_SHARD_SIZE);
        let shard_size = NonZeroUsize::new(shard_size).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "SHARD_SIZE must be positive")
        })?;

        Ok(Self {
            addr: format!("{host}:{port}"),
            spec: ServerSpec {
                server_id,
                workers,
                shard_size,
                mode,
            },
        })
    }
}

fn parse<T, F>(var: &F, key: &str) -> io::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| {
            raw.trim().parse().map_err(|e| {
                io::Error::new(io::ErrorKind::InvalidInput, format!("invalid {key}={raw}: {e}"))
            })
        })
        .transpose()
}

fn missing(key: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("{key} must be set"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::from_lookup(lookup(&[("PORT", "9000"), ("WORKERS", "2")])).unwrap();

        assert_eq!(config.addr, "127.0.0.1:9000");
        assert_eq!(config.spec.workers.get(), 2);
        assert_eq!(config.spec.server_id, 0);
        assert_eq!(config.spec.shard_size.get(), DEFAULT_SHARD_SIZE);
        assert_eq!(config.spec.mode, SyncMode::Async);
    }

    #[test]
    fn overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "9000"),
            ("WORKERS", "4"),
            ("SERVER_ID", "1"),
            ("SYNC", "true"),
            ("SHARD_SIZE", "128"),
        ]))
        .unwrap();

        assert_eq!(config.addr, "0.0.0.0:9000");
        assert_eq!(config.spec.server_id, 1);
        assert_eq!(config.spec.shard_size.get(), 128);
        assert_eq!(config.spec.mode, SyncMode::Sync);
    }

    #[test]
    fn missing_or_invalid_values() {
        assert!(ServerConfig::from_lookup(lookup(&[("WORKERS", "2")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("PORT", "9000")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("PORT", "9000"), ("WORKERS", "0")])).is_err());
        assert!(
            ServerConfig::from_lookup(lookup(&[("PORT", "9000"), ("WORKERS", "1"), ("SYNC", "maybe")]))
                .is_err()
        );
    }
}
