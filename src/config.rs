//! Runtime settings read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `8080` |
//! | `QUESTIONS_PER_MATCH` | `5` |
//! | `QUEUE_STALE_SECS` | `120` |
//! | `FINISHED_MATCH_TTL_SECS` | `3600` |
//! | `DATA_FILE` | unset (in-memory only) |

use crate::logic::DEFAULT_QUESTIONS_PER_MATCH;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub questions_per_match: usize,
    /// Waiting players not seen for this long are dropped from queues.
    pub queue_stale_after: Duration,
    /// Matches untouched for this long are deleted.
    pub match_ttl: Duration,
    /// JSON snapshot of the store; `None` keeps everything in memory.
    pub data_file: Option<PathBuf>,
    /// Buffered change events per subscriber.
    pub sync_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            questions_per_match: DEFAULT_QUESTIONS_PER_MATCH,
            queue_stale_after: Duration::from_secs(120),
            match_ttl: Duration::from_secs(3600),
            data_file: None,
            sync_capacity: 256,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT").unwrap_or(defaults.port),
            questions_per_match: parse_var::<usize>(&lookup, "QUESTIONS_PER_MATCH")
                .unwrap_or(defaults.questions_per_match)
                .max(1),
            queue_stale_after: parse_var(&lookup, "QUEUE_STALE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.queue_stale_after),
            match_ttl: parse_var(&lookup, "FINISHED_MATCH_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.match_ttl),
            data_file: lookup("DATA_FILE").filter(|p| !p.is_empty()).map(PathBuf::from),
            sync_capacity: defaults.sync_capacity,
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("Ignoring invalid {}={:?}", key, raw);
            None
        }
    }
}
