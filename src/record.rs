//! On-disk record framing: `[4-byte big-endian length][payload]`.
//!
//! No checksum, no padding, no zero-copy archive format -- this queue deliberately trusts the
//! filesystem and treats the length prefix as the only sanity check, so a plain big-endian length
//! prefix (via `byteorder`) is the whole wire format.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use snafu::{ResultExt, Snafu};

/// Size, in bytes, of the length prefix that precedes every record.
pub const HEADER_LEN: u64 = 4;

/// Errors encountered while encoding or decoding a single record.
#[derive(Debug, Snafu)]
pub enum CodecError {
    #[snafu(display("failed to read record length: {}", source))]
    ReadLength { source: io::Error },

    #[snafu(display("invalid message read size: {} is outside [{}, {}]", len, min, max))]
    InvalidSize { len: i32, min: i32, max: i32 },

    #[snafu(display("failed to read {}-byte payload: {}", len, source))]
    ReadPayload { len: i32, source: io::Error },

    #[snafu(display("failed to write record: {}", source))]
    Write { source: io::Error },
}

impl From<CodecError> for io::Error {
    fn from(err: CodecError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }
}

/// Writes a single record (length prefix plus payload) to `w`.
pub fn encode<W: Write>(w: &mut W, payload: &[u8]) -> Result<(), CodecError> {
    // Payload sizes are bounded by `max_msg_size`, which is validated to fit an `i32` at
    // `Config` build time, so this cast never truncates in practice.
    let len = i32::try_from(payload.len()).unwrap_or(i32::MAX);
    w.write_i32::<BigEndian>(len).context(WriteSnafu)?;
    w.write_all(payload).context(WriteSnafu)?;
    Ok(())
}

/// Reads a single record from `r` into `buf`, returning the record's length.
///
/// `buf` is resized up if it is too small to hold the payload, but is never shrunk; callers that
/// hand in a pooled, max-size buffer will see no allocation at all on the common path.
pub fn decode<R: Read>(r: &mut R, min: i32, max: i32, buf: &mut Vec<u8>) -> Result<usize, CodecError> {
    let len = r.read_i32::<BigEndian>().context(ReadLengthSnafu)?;
    if len < min || len > max {
        return Err(CodecError::InvalidSize { len, min, max });
    }

    let len = len as usize;
    if buf.len() < len {
        buf.resize(len, 0);
    }
    r.read_exact(&mut buf[..len]).context(ReadPayloadSnafu { len: len as i32 })?;
    Ok(len)
}
