//! Integration-style tests against the public `DiskQueue` API, organized by concern the way
//! `disk_v2`'s own `tests` module is: one file per testable property grouping rather than one
//! flat module.

use std::path::Path;

use crate::{Config, DiskQueue};

mod basic;
mod known_errors;
mod size_limits;

/// A small-file-size config so rolling, quarantine, and bisection all exercise multiple files
/// without writing megabytes of fixture data.
fn test_config(dir: &Path) -> Config {
    Config::builder("q", dir)
        .max_bytes_per_file(64)
        .min_msg_size(1)
        .max_msg_size(16)
        .sync_every(1)
        .build()
        .unwrap()
}

fn open(dir: &Path) -> DiskQueue {
    DiskQueue::new(test_config(dir))
}
