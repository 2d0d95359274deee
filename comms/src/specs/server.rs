use std::{fmt, num::NonZeroUsize, str::FromStr};

use serde::{Deserialize, Serialize};

/// How the store merges the additions received between two barriers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Additions are applied as soon as they arrive.
    #[default]
    Async,
    /// Additions are staged and become visible together when the group passes a barrier.
    Sync,
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "sync" => Ok(Self::Sync),
            "false" | "0" | "async" => Ok(Self::Async),
            other => Err(format!("invalid sync mode {other:?}, expected true or false")),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Async => f.write_str("async"),
            Self::Sync => f.write_str("sync"),
        }
    }
}

/// The specification for a parameter store process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSpec {
    pub server_id: usize,
    pub workers: NonZeroUsize,
    pub shard_size: NonZeroUsize,
    pub mode: SyncMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sync_flag() {
        assert_eq!("true".parse::<SyncMode>(), Ok(SyncMode::Sync));
        assert_eq!(" False ".parse::<SyncMode>(), Ok(SyncMode::Async));
        assert_eq!("sync".parse::<SyncMode>(), Ok(SyncMode::Sync));
        assert!("maybe".parse::<SyncMode>().is_err());
    }

    #[test]
    fn spec_json_shape() {
        let spec = ServerSpec {
            server_id: 0,
            workers: NonZeroUsize::new(2).unwrap(),
            shard_size: NonZeroUsize::new(64).unwrap(),
            mode: SyncMode::Sync,
        };

        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains(r#""mode":"sync""#));

        let back: ServerSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back.workers.get(), 2);
        assert_eq!(back.mode, SyncMode::Sync);
    }
}
