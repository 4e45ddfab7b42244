//! Operator tool: inspect a queue's persisted metadata, and optionally bump the read cursor
//! forward by one record. Run this only against a queue directory that no `DiskQueue` currently
//! has open -- it reads and rewrites the metadata file directly, bypassing the I/O loop.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use diskqueue::Config;

#[derive(Debug, Parser)]
#[clap(version)]
struct Args {
    /// Actually advance the read cursor by one record. Without this flag, this program only
    /// prints the current metadata.
    #[clap(long)]
    doit: bool,

    /// Name the queue was created with.
    name: String,

    /// Directory in which the queue's data and metadata files reside.
    data_dir: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::builder(args.name, args.data_dir)
        .build()
        .context("could not build queue config")?;

    match diskqueue::load_snapshot(&config).context("could not read queue metadata")? {
        None => {
            println!("no metadata file found; queue has never been synced");
            return Ok(());
        }
        Some(snapshot) => {
            println!("depth: {}", snapshot.depth);
            println!("read cursor: file {}, pos {}", snapshot.read_file_num, snapshot.read_pos);
            println!("write cursor: file {}, pos {}", snapshot.write_file_num, snapshot.write_pos);
        }
    }

    if args.doit {
        let snapshot =
            diskqueue::advance_read_cursor_by_one(&config).context("could not advance read cursor")?;
        println!(
            "read cursor advanced to file {}, pos {} (depth now {})",
            snapshot.read_file_num, snapshot.read_pos, snapshot.depth
        );
    }

    Ok(())
}
