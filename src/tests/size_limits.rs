//! Testable property 4: size validation never mutates state.

use tempfile::tempdir;

use super::open;
use crate::QueueError;

#[test]
fn rejects_oversized_messages() {
    let dir = tempdir().unwrap();
    let queue = open(dir.path());

    let err = queue.put(vec![0u8; 64]).unwrap_err();
    assert!(matches!(err, QueueError::InvalidMessageSize { .. }));
    assert_eq!(queue.depth(), 0);

    queue.close().unwrap();
}

#[test]
fn rejects_undersized_messages() {
    let dir = tempdir().unwrap();
    let queue = open(dir.path());

    let err = queue.put(Vec::new()).unwrap_err();
    assert!(matches!(err, QueueError::InvalidMessageSize { .. }));
    assert_eq!(queue.depth(), 0);

    queue.close().unwrap();
}

#[test]
fn rejected_put_does_not_touch_disk() {
    let dir = tempdir().unwrap();
    let queue = open(dir.path());

    queue.put(b"ok".to_vec()).unwrap();
    let _ = queue.put(vec![0u8; 64]);
    assert_eq!(queue.depth(), 1);

    queue.close().unwrap();
}
