//! Testable property 7 / scenario S4: corruption at the read frontier quarantines the offending
//! file and advances past it instead of panicking or wedging the queue.

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::time::Duration;

use tempfile::tempdir;

use super::{open, test_config};
use crate::DiskQueue;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn corrupted_length_prefix_quarantines_file_and_advances() {
    // Install a real subscriber for this run so the `warn!`/`error!` calls along the corruption
    // path actually execute their formatting machinery instead of hitting the no-op default.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let dir = tempdir().unwrap();

    {
        let queue = open(dir.path());
        queue.put(b"a".to_vec()).unwrap();
        queue.put(b"bb".to_vec()).unwrap();
        queue.put(b"ccc".to_vec()).unwrap();
        queue.close().unwrap();
    }

    let data_file = dir.path().join("q.diskqueue.000000.dat");
    assert!(data_file.exists());
    {
        let mut file = OpenOptions::new().write(true).open(&data_file).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.write_all(&[0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
    }

    let queue = DiskQueue::new(test_config(dir.path()));

    // The corrupt record is unreadable; since it was also the only file (and the active write
    // file), the whole tail is quarantined and depth settles back to zero rather than wedging.
    assert!(queue.read_chan().recv_timeout(Duration::from_millis(200)).is_err());
    assert_eq!(queue.depth(), 0);

    assert!(!data_file.exists());
    assert!(dir.path().join("q.diskqueue.000000.dat.bad").exists());

    queue.put(b"x".to_vec()).unwrap();
    let v = queue.read_chan().recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(v, b"x");

    queue.close().unwrap();
}

#[test]
fn corruption_in_earlier_file_does_not_affect_later_files() {
    let dir = tempdir().unwrap();

    {
        // Force a roll after each record so each one lands in its own file.
        let config = crate::Config::builder("q", dir.path())
            .max_bytes_per_file(1)
            .min_msg_size(1)
            .max_msg_size(16)
            .sync_every(1)
            .build()
            .unwrap();
        let queue = DiskQueue::new(config);
        queue.put(b"first".to_vec()).unwrap();
        queue.put(b"second".to_vec()).unwrap();
        queue.close().unwrap();
    }

    let file0 = dir.path().join("q.diskqueue.000000.dat");
    {
        let mut file = OpenOptions::new().write(true).open(&file0).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.write_all(&[0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
    }

    let queue = DiskQueue::new(test_config(dir.path()));
    let v = queue.read_chan().recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(v, b"second");
    assert_eq!(queue.depth(), 0);

    assert!(dir.path().join("q.diskqueue.000000.dat.bad").exists());

    queue.close().unwrap();
}
