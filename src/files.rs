//! Opens, positions, rolls, removes, and renames the numbered data files and the metadata file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Seek, SeekFrom, Write};
use std::path::PathBuf;

use rand::Rng;
use tracing::warn;

use crate::metadata::{LoadMetadataError, Metadata};

/// Owns the naming scheme and low-level file operations for one queue's data directory.
///
/// `FileStore` holds no cursor state of its own -- it is a stateless collection of path-building
/// and file-opening helpers that the I/O loop calls into while it owns the actual file handles.
#[derive(Debug, Clone)]
pub struct FileStore {
    name: String,
    data_dir: PathBuf,
}

impl FileStore {
    pub fn new(name: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            data_dir: data_dir.into(),
        }
    }

    pub fn data_file_path(&self, file_num: u64) -> PathBuf {
        self.data_dir
            .join(format!("{}.diskqueue.{:06}.dat", self.name, file_num))
    }

    pub fn meta_file_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.diskqueue.meta.dat", self.name))
    }

    fn bad_file_path(&self, file_num: u64) -> PathBuf {
        let mut path = self.data_file_path(file_num).into_os_string();
        path.push(".bad");
        PathBuf::from(path)
    }

    /// Opens a data file read-only, seeked to `pos`.
    pub fn open_for_read(&self, file_num: u64, pos: u64) -> io::Result<BufReader<File>> {
        let mut file = File::open(self.data_file_path(file_num))?;
        file.seek(SeekFrom::Start(pos))?;
        Ok(BufReader::new(file))
    }

    /// Opens (creating if necessary) a data file read-write, seeked to `pos`.
    pub fn open_for_write(&self, file_num: u64, pos: u64) -> io::Result<File> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(self.data_file_path(file_num))?;
        file.seek(SeekFrom::Start(pos))?;
        Ok(file)
    }

    /// Removes data files in `[from, to_exclusive)`. A missing file is not an error; other
    /// failures are logged and the last one encountered is returned.
    pub fn remove_range(&self, from: u64, to_exclusive: u64) -> Option<io::Error> {
        let mut last_err = None;
        for file_num in from..to_exclusive {
            match fs::remove_file(self.data_file_path(file_num)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(file_num, error = %e, "failed to remove data file");
                    last_err = Some(e);
                }
            }
        }
        last_err
    }

    /// Renames file `file_num`'s data file to its `.bad` quarantine name. Failures are logged
    /// but never propagated -- quarantine is a best-effort operator aid, not a correctness step.
    pub fn quarantine(&self, file_num: u64) {
        let from = self.data_file_path(file_num);
        let to = self.bad_file_path(file_num);
        match fs::rename(&from, &to) {
            Ok(()) => warn!(file_num, quarantined_as = %to.display(), "quarantined unreadable data file"),
            Err(e) => warn!(file_num, error = %e, "failed to quarantine data file"),
        }
    }

    /// Atomically rewrites the metadata file via a randomly-named temp file plus rename.
    pub fn persist_metadata(&self, meta: &Metadata) -> io::Result<()> {
        let suffix: u32 = rand::thread_rng().gen();
        let tmp_path = self
            .data_dir
            .join(format!("{}.diskqueue.meta.dat.{:08x}.tmp", self.name, suffix));

        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(meta.format().as_bytes())?;
            tmp.flush()?;
            tmp.sync_all()?;
        }

        fs::rename(&tmp_path, self.meta_file_path())
    }

    /// Loads and parses the metadata file, if present.
    pub fn load_metadata(&self) -> Result<Metadata, LoadMetadataError> {
        use snafu::ResultExt;

        let content = match fs::read_to_string(self.meta_file_path()) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(LoadMetadataError::NotFound),
            Err(e) => return Err(e).context(crate::metadata::IoSnafu),
        };
        Metadata::parse(&content)
    }

    /// Removes the metadata file. Absence is not an error.
    pub fn remove_metadata(&self) -> io::Result<()> {
        match fs::remove_file(self.meta_file_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
