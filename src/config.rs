//! Queue configuration, validated once at `build()` rather than checked on every operation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use snafu::{ensure, Snafu};

const DEFAULT_MAX_BYTES_PER_FILE: u64 = 100 * 1024 * 1024;
const DEFAULT_MIN_MSG_SIZE: i32 = 1;
const DEFAULT_MAX_MSG_SIZE: i32 = 8 * 1024 * 1024;
const DEFAULT_SYNC_EVERY: u64 = 2_500;
const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors returned by [`ConfigBuilder::build`].
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum ConfigError {
    #[snafu(display("name must not be empty"))]
    EmptyName,

    #[snafu(display("min_msg_size ({}) must be at least 1", min_msg_size))]
    MinMsgSizeTooSmall { min_msg_size: i32 },

    #[snafu(display("min_msg_size ({}) must not exceed max_msg_size ({})", min, max))]
    MinExceedsMax { min: i32, max: i32 },

    #[snafu(display(
        "max_bytes_per_file ({}) must be large enough to hold one max_msg_size record ({} + {} header bytes)",
        max_bytes_per_file,
        max_msg_size,
        header_len
    ))]
    FileTooSmallForMaxRecord {
        max_bytes_per_file: u64,
        max_msg_size: i32,
        header_len: u64,
    },

    #[snafu(display("sync_every must be nonzero"))]
    SyncEveryIsZero,
}

/// Validated configuration for one [`DiskQueue`](crate::DiskQueue) instance.
///
/// Construct with [`ConfigBuilder`]; there is no public way to obtain a `Config` whose fields
/// violate the invariants `ConfigBuilder::build` checks.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) name: String,
    pub(crate) data_dir: PathBuf,
    pub(crate) max_bytes_per_file: u64,
    pub(crate) min_msg_size: i32,
    pub(crate) max_msg_size: i32,
    pub(crate) sync_every: u64,
    pub(crate) sync_timeout: Duration,
}

impl Config {
    pub fn builder(name: impl Into<String>, data_dir: impl Into<PathBuf>) -> ConfigBuilder {
        ConfigBuilder::new(name, data_dir)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn max_bytes_per_file(&self) -> u64 {
        self.max_bytes_per_file
    }

    pub fn min_msg_size(&self) -> i32 {
        self.min_msg_size
    }

    pub fn max_msg_size(&self) -> i32 {
        self.max_msg_size
    }

    pub fn sync_every(&self) -> u64 {
        self.sync_every
    }

    pub fn sync_timeout(&self) -> Duration {
        self.sync_timeout
    }
}

/// Builds a [`Config`]: set what you need, defaults fill in the rest, and `build()` is the single
/// place invariants are checked.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    name: String,
    data_dir: PathBuf,
    max_bytes_per_file: u64,
    min_msg_size: i32,
    max_msg_size: i32,
    sync_every: u64,
    sync_timeout: Duration,
}

impl ConfigBuilder {
    pub fn new(name: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            data_dir: data_dir.into(),
            max_bytes_per_file: DEFAULT_MAX_BYTES_PER_FILE,
            min_msg_size: DEFAULT_MIN_MSG_SIZE,
            max_msg_size: DEFAULT_MAX_MSG_SIZE,
            sync_every: DEFAULT_SYNC_EVERY,
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
        }
    }

    pub fn max_bytes_per_file(mut self, max_bytes_per_file: u64) -> Self {
        self.max_bytes_per_file = max_bytes_per_file;
        self
    }

    pub fn min_msg_size(mut self, min_msg_size: i32) -> Self {
        self.min_msg_size = min_msg_size;
        self
    }

    pub fn max_msg_size(mut self, max_msg_size: i32) -> Self {
        self.max_msg_size = max_msg_size;
        self
    }

    pub fn sync_every(mut self, sync_every: u64) -> Self {
        self.sync_every = sync_every;
        self
    }

    pub fn sync_timeout(mut self, sync_timeout: Duration) -> Self {
        self.sync_timeout = sync_timeout;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        ensure!(!self.name.is_empty(), EmptyNameSnafu);
        ensure!(self.min_msg_size >= 1, MinMsgSizeTooSmallSnafu { min_msg_size: self.min_msg_size });
        ensure!(
            self.min_msg_size <= self.max_msg_size,
            MinExceedsMaxSnafu { min: self.min_msg_size, max: self.max_msg_size }
        );
        ensure!(self.sync_every != 0, SyncEveryIsZeroSnafu);

        let header_len = crate::record::HEADER_LEN;
        let min_file_size = self.max_msg_size as u64 + header_len;
        ensure!(
            self.max_bytes_per_file >= min_file_size,
            FileTooSmallForMaxRecordSnafu {
                max_bytes_per_file: self.max_bytes_per_file,
                max_msg_size: self.max_msg_size,
                header_len,
            }
        );

        Ok(Config {
            name: self.name,
            data_dir: self.data_dir,
            max_bytes_per_file: self.max_bytes_per_file,
            min_msg_size: self.min_msg_size,
            max_msg_size: self.max_msg_size,
            sync_every: self.sync_every,
            sync_timeout: self.sync_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_successfully() {
        Config::builder("q", "/tmp/q").build().unwrap();
    }

    #[test]
    fn rejects_empty_name() {
        assert_eq!(Config::builder("", "/tmp/q").build().unwrap_err(), ConfigError::EmptyName);
    }

    #[test]
    fn rejects_min_greater_than_max() {
        let err = Config::builder("q", "/tmp/q")
            .min_msg_size(10)
            .max_msg_size(5)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MinExceedsMax { min: 10, max: 5 });
    }

    #[test]
    fn rejects_file_too_small_for_max_record() {
        let err = Config::builder("q", "/tmp/q")
            .max_msg_size(1024)
            .max_bytes_per_file(100)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileTooSmallForMaxRecord { .. }));
    }

    #[test]
    fn rejects_zero_sync_every() {
        assert_eq!(
            Config::builder("q", "/tmp/q").sync_every(0).build().unwrap_err(),
            ConfigError::SyncEveryIsZero
        );
    }
}
