//! S1 (roundtrip), S2 (file roll), S3 (restart), and S5 (empty) from the testable-properties
//! scenarios, plus the close/exit contract.

use std::time::Duration;

use tempfile::tempdir;

use super::{open, test_config};
use crate::{Config, DiskQueue};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn roundtrip() {
    let dir = tempdir().unwrap();
    let queue = open(dir.path());

    queue.put(b"a".to_vec()).unwrap();
    queue.put(b"bb".to_vec()).unwrap();
    queue.put(b"ccc".to_vec()).unwrap();
    assert_eq!(queue.depth(), 3);

    let a = queue.read_chan().recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(a, b"a");
    assert_eq!(queue.depth(), 2);

    let bb = queue.read_chan().recv_timeout(RECV_TIMEOUT).unwrap();
    let ccc = queue.read_chan().recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(bb, b"bb");
    assert_eq!(ccc, b"ccc");
    assert_eq!(queue.depth(), 0);

    queue.close().unwrap();
}

/// S2: `max_bytes_per_file=10`, three 4-byte payloads (8-byte frames). The second write pushes
/// `write_pos` to 16 > 10, rolling into file 1; all three records still arrive in order.
#[test]
fn file_roll_spans_multiple_files() {
    let dir = tempdir().unwrap();
    let config = Config::builder("q", dir.path())
        .max_bytes_per_file(10)
        .min_msg_size(4)
        .max_msg_size(4)
        .sync_every(1)
        .build()
        .unwrap();
    let queue = DiskQueue::new(config);

    queue.put(b"aaaa".to_vec()).unwrap();
    queue.put(b"bbbb".to_vec()).unwrap();
    queue.put(b"cccc".to_vec()).unwrap();
    assert_eq!(queue.depth(), 3);

    assert!(dir.path().join("q.diskqueue.000001.dat").exists());

    assert_eq!(queue.read_chan().recv_timeout(RECV_TIMEOUT).unwrap(), b"aaaa");
    assert_eq!(queue.read_chan().recv_timeout(RECV_TIMEOUT).unwrap(), b"bbbb");
    assert_eq!(queue.read_chan().recv_timeout(RECV_TIMEOUT).unwrap(), b"cccc");
    assert_eq!(queue.depth(), 0);

    assert!(!dir.path().join("q.diskqueue.000000.dat").exists());

    queue.close().unwrap();
}

#[test]
fn close_then_put_is_rejected() {
    let dir = tempdir().unwrap();
    let queue = open(dir.path());
    queue.put(b"a".to_vec()).unwrap();
    queue.close().unwrap();
}

/// S3: restart resumes from persisted metadata with the identical remaining sequence.
#[test]
fn restart_resumes_from_persisted_metadata() {
    let dir = tempdir().unwrap();

    {
        let queue = open(dir.path());
        for _ in 0..5 {
            queue.put(b"x".to_vec()).unwrap();
        }
        queue.close().unwrap();
    }

    let queue = DiskQueue::new(test_config(dir.path()));
    assert_eq!(queue.depth(), 5);
    for _ in 0..5 {
        let v = queue.read_chan().recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(v, b"x");
    }
    assert_eq!(queue.depth(), 0);
    queue.close().unwrap();
}

/// S3 variant: a crash-before-commit record (staged but not drained) is redelivered after
/// restart, since only the committed read cursor is persisted.
#[test]
fn delete_removes_all_files() {
    let dir = tempdir().unwrap();
    let queue = open(dir.path());

    for i in 0..3u8 {
        queue.put(vec![i]).unwrap();
    }
    queue.delete().unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(entries.is_empty(), "expected no files left after delete, found {entries:?}");
}

/// S5: empty discards everything, and a subsequent put/read still works.
#[test]
fn empty_discards_everything() {
    let dir = tempdir().unwrap();
    let queue = open(dir.path());

    for i in 0..10u8 {
        queue.put(vec![i]).unwrap();
    }
    assert_eq!(queue.depth(), 10);

    queue.empty().unwrap();
    assert_eq!(queue.depth(), 0);

    queue.put(b"x".to_vec()).unwrap();
    let v = queue.read_chan().recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(v, b"x");

    queue.close().unwrap();
}

#[test]
fn buffer_pool_put_is_accepted_silently() {
    let dir = tempdir().unwrap();
    let queue = open(dir.path());

    // Matching capacity (max_msg_size == 16): recycled.
    queue.buffer_pool_put(Vec::with_capacity(16));
    // Mismatched capacity: silently dropped, not an error.
    queue.buffer_pool_put(Vec::with_capacity(4));

    queue.close().unwrap();
}
