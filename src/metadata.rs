//! Parsing and formatting for the three-line ASCII metadata file.

use std::io;
use std::num::ParseIntError;

use snafu::{OptionExt, ResultExt, Snafu};

/// The persisted cursors and depth for a queue instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metadata {
    pub depth: i64,
    pub read_file_num: u64,
    pub read_pos: u64,
    pub write_file_num: u64,
    pub write_pos: u64,
}

/// Errors encountered while loading a queue's metadata file.
#[derive(Debug, Snafu)]
pub enum LoadMetadataError {
    /// The metadata file does not exist, which simply means the queue is starting fresh.
    #[snafu(display("metadata file not found"))]
    NotFound,

    #[snafu(display("failed to read metadata file: {}", source))]
    Io { source: io::Error },

    #[snafu(display("metadata file is truncated or malformed"))]
    Malformed,

    #[snafu(display("failed to parse metadata integer: {}", source))]
    ParseInt { source: ParseIntError },
}

impl Metadata {
    /// Formats this metadata as a three-line ASCII block: depth, read cursor, write cursor.
    pub fn format(&self) -> String {
        format!(
            "{}\n{},{}\n{},{}\n",
            self.depth, self.read_file_num, self.read_pos, self.write_file_num, self.write_pos
        )
    }

    /// Parses a metadata block previously produced by [`Metadata::format`].
    pub fn parse(input: &str) -> Result<Self, LoadMetadataError> {
        let mut lines = input.lines();

        let depth = lines
            .next()
            .context(MalformedSnafu)?
            .trim()
            .parse::<i64>()
            .context(ParseIntSnafu)?;

        let (read_file_num, read_pos) = parse_pair(lines.next().context(MalformedSnafu)?)?;
        let (write_file_num, write_pos) = parse_pair(lines.next().context(MalformedSnafu)?)?;

        Ok(Self {
            depth,
            read_file_num,
            read_pos,
            write_file_num,
            write_pos,
        })
    }
}

fn parse_pair(line: &str) -> Result<(u64, u64), LoadMetadataError> {
    let (a, b) = line.trim().split_once(',').context(MalformedSnafu)?;
    let a = a.parse::<u64>().context(ParseIntSnafu)?;
    let b = b.parse::<u64>().context(ParseIntSnafu)?;
    Ok((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let meta = Metadata {
            depth: 42,
            read_file_num: 1,
            read_pos: 128,
            write_file_num: 3,
            write_pos: 4096,
        };
        let formatted = meta.format();
        assert_eq!(formatted, "42\n1,128\n3,4096\n");
        assert_eq!(Metadata::parse(&formatted).unwrap(), meta);
    }

    #[test]
    fn negative_depth_parses() {
        let formatted = "-3\n0,0\n0,0\n";
        let meta = Metadata::parse(formatted).unwrap();
        assert_eq!(meta.depth, -3);
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(Metadata::parse("not a number\n0,0\n0,0\n").is_err());
        assert!(Metadata::parse("0\n0\n0,0\n").is_err());
        assert!(Metadata::parse("0\n").is_err());
    }
}
