use clap::Parser;
use core::time::Duration;
use std::path::PathBuf;
use wavecache::{Error, WorkerConfig};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Runtime configuration for the `wavecache-worker` binary.
///
/// All values are parsed from CLI arguments or environment variables.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "wavecache-worker",
    version,
    about = "Background waveform data plane over newline-delimited JSON"
)]
pub struct CliArgs {
    /// Directory holding the durable result table.
    ///
    /// Environment variable: `WAVECACHE_CACHE_DIR`
    #[arg(long, env = "WAVECACHE_CACHE_DIR", default_value = ".wavecache")]
    pub cache_dir: PathBuf,

    /// Keep results in memory for this session only.
    ///
    /// Environment variable: `WAVECACHE_NO_PERSIST`
    #[arg(long, env = "WAVECACHE_NO_PERSIST", default_value_t = false)]
    pub no_persist: bool,

    /// Free-space threshold (MiB) below which the in-memory tier is flushed
    /// before each new entry.
    ///
    /// Environment variable: `WAVECACHE_CAPACITY_THRESHOLD_MB`
    #[arg(long, env = "WAVECACHE_CAPACITY_THRESHOLD_MB", default_value_t = 64)]
    pub capacity_threshold_mb: u64,

    /// Byte budget (MiB) for the in-memory tier. Unbounded when unset.
    ///
    /// Environment variable: `WAVECACHE_MEMORY_BUDGET_MB`
    #[arg(long, env = "WAVECACHE_MEMORY_BUDGET_MB")]
    pub memory_budget_mb: Option<u64>,

    /// Timeout applied to every outbound HTTP request.
    ///
    /// Environment variable: `WAVECACHE_REQUEST_TIMEOUT_SECS`
    #[arg(long, env = "WAVECACHE_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Capacity of the request channel into the worker thread.
    ///
    /// Environment variable: `WAVECACHE_CHANNEL_CAPACITY`
    #[arg(long, env = "WAVECACHE_CHANNEL_CAPACITY", default_value_t = 64)]
    pub channel_capacity: usize,

    /// How long shutdown waits for the worker to acknowledge.
    ///
    /// Environment variable: `WAVECACHE_SHUTDOWN_TIMEOUT_SECS`
    #[arg(long, env = "WAVECACHE_SHUTDOWN_TIMEOUT_SECS", default_value_t = 3)]
    pub shutdown_timeout_secs: u64,
}

fn megabytes(name: &str, value: u64) -> Result<u64, Error> {
    value
        .checked_mul(BYTES_PER_MB)
        .ok_or_else(|| Error::InvalidRequest {
            reason: format!("{name} ({value} MiB) overflows a byte count"),
        })
}

fn positive<T: PartialOrd + Default + core::fmt::Display>(name: &str, value: T) -> Result<T, Error> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(Error::InvalidRequest {
            reason: format!("{name} must be greater than 0, was {value}"),
        })
    }
}

impl TryFrom<CliArgs> for WorkerConfig {
    type Error = Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let capacity_threshold_bytes = megabytes(
            "WAVECACHE_CAPACITY_THRESHOLD_MB",
            positive("WAVECACHE_CAPACITY_THRESHOLD_MB", args.capacity_threshold_mb)?,
        )?;
        let memory_budget_bytes = args
            .memory_budget_mb
            .map(|mb| {
                megabytes(
                    "WAVECACHE_MEMORY_BUDGET_MB",
                    positive("WAVECACHE_MEMORY_BUDGET_MB", mb)?,
                )
            })
            .transpose()?;

        Ok(Self {
            cache_dir: args.cache_dir,
            use_persistence: !args.no_persist,
            capacity_threshold_bytes,
            memory_budget_bytes,
            request_timeout: Duration::from_secs(positive(
                "WAVECACHE_REQUEST_TIMEOUT_SECS",
                args.request_timeout_secs,
            )?),
            channel_capacity: positive("WAVECACHE_CHANNEL_CAPACITY", args.channel_capacity)?,
            shutdown_timeout: Duration::from_secs(positive(
                "WAVECACHE_SHUTDOWN_TIMEOUT_SECS",
                args.shutdown_timeout_secs,
            )?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("wavecache-worker").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_match_worker_defaults() {
        let config = WorkerConfig::try_from(parse(&[])).unwrap();
        let defaults = WorkerConfig::default();
        assert_eq!(config.capacity_threshold_bytes, defaults.capacity_threshold_bytes);
        assert_eq!(config.request_timeout, defaults.request_timeout);
        assert_eq!(config.channel_capacity, defaults.channel_capacity);
        assert!(config.use_persistence);
        assert_eq!(config.memory_budget_bytes, None);
    }

    #[test]
    fn converts_megabytes_and_flags() {
        let config = WorkerConfig::try_from(parse(&[
            "--cache-dir",
            "/tmp/wave",
            "--no-persist",
            "--capacity-threshold-mb",
            "2",
            "--memory-budget-mb",
            "8",
        ]))
        .unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/wave"));
        assert!(!config.use_persistence);
        assert_eq!(config.capacity_threshold_bytes, 2 * BYTES_PER_MB);
        assert_eq!(config.memory_budget_bytes, Some(8 * BYTES_PER_MB));
    }

    #[test]
    fn rejects_zero_values() {
        let err = WorkerConfig::try_from(parse(&["--channel-capacity", "0"])).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));

        let err = WorkerConfig::try_from(parse(&["--request-timeout-secs", "0"])).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));
    }

    #[test]
    fn rejects_overflowing_budget() {
        let max = u64::MAX.to_string();
        let err = WorkerConfig::try_from(parse(&["--memory-budget-mb", max.as_str()])).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));
    }
}
