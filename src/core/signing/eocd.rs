//! Locating the ZIP End of Central Directory record.
//!
//! ```text
//! Offset  Bytes  Description
//!  0      4      End of central directory signature = 0x06054b50
//!  4      2      Number of this disk
//!  6      2      Disk where central directory starts
//!  8      2      Number of central directory records on this disk
//! 10      2      Total number of central directory records
//! 12      4      Size of central directory
//! 16      4      Offset of start of central directory
//! 20      2      Comment length (n)
//! 22      n      Comment
//! ```

use super::error::{ApkError, Result};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

pub const CENTRAL_DIRECTORY_END_SIGNATURE: u32 = 0x06054b50;
pub const HEADER_SIZE: u64 = 22;
const COMMENT_LENGTH_FIELD: usize = 20;
/// Comment length field (2) plus central directory offset field (4).
const CD_OFFSET_FROM_COMMENT: u64 = 6;

/// Finds the EOCD record and returns the length of the archive comment.
///
/// The comment is free-form and may itself contain the EOCD signature, so a
/// candidate is only accepted when its stored comment length reaches exactly
/// to the end of the file.
pub fn find_comment_length<R: Read + Seek>(r: &mut R) -> Result<u16> {
    let file_length = r.seek(SeekFrom::End(0))?;
    if file_length < HEADER_SIZE {
        return Err(ApkError::TooSmall { size: file_length });
    }
    let max_comment_length = (file_length - HEADER_SIZE).min(u16::MAX as u64);

    // The record plus the longest possible comment, read in one go.
    let window = max_comment_length + HEADER_SIZE;
    let window_start = file_length - window;
    r.seek(SeekFrom::Start(window_start))?;
    let mut buffer = vec![0u8; window as usize];
    r.read_exact(&mut buffer)?;

    let empty_comment_pos = buffer.len() - HEADER_SIZE as usize;
    for expected in 0..=max_comment_length as usize {
        let pos = empty_comment_pos - expected;
        if LittleEndian::read_u32(&buffer[pos..pos + 4]) != CENTRAL_DIRECTORY_END_SIGNATURE {
            continue;
        }
        let field = pos + COMMENT_LENGTH_FIELD;
        let actual = LittleEndian::read_u16(&buffer[field..field + 2]);
        if actual as usize == expected {
            log::debug!(
                "EOCD at offset {} with {} byte comment",
                window_start + pos as u64,
                actual
            );
            return Ok(actual);
        }
        log::debug!(
            "ignoring EOCD signature at offset {}: comment length {} != {}",
            window_start + pos as u64,
            actual,
            expected
        );
    }
    Err(ApkError::TrailerNotFound { scanned: window })
}

/// Reads the central directory start offset stored in the EOCD record.
pub fn read_central_directory_offset<R: Read + Seek>(
    r: &mut R,
    comment_length: u16,
) -> Result<u64> {
    let distance = comment_length as u64 + CD_OFFSET_FROM_COMMENT;
    r.seek(SeekFrom::End(-(distance as i64)))?;
    let cd_start = r.read_u32::<LittleEndian>()? as u64;
    log::debug!("central directory starts at offset {}", cd_start);
    Ok(cd_start)
}

/// Position of the central directory offset field for a file of `file_length` bytes.
pub fn central_directory_offset_field(file_length: u64, comment_length: u16) -> u64 {
    file_length - comment_length as u64 - CD_OFFSET_FROM_COMMENT
}

#[cfg(test)]
pub(crate) fn eocd_record(cd_start: u32, comment: &[u8]) -> Vec<u8> {
    use byteorder::WriteBytesExt;

    let mut record = vec![];
    record
        .write_u32::<LittleEndian>(CENTRAL_DIRECTORY_END_SIGNATURE)
        .unwrap();
    record.extend_from_slice(&[0; 8]);
    record.write_u32::<LittleEndian>(0).unwrap();
    record.write_u32::<LittleEndian>(cd_start).unwrap();
    record
        .write_u16::<LittleEndian>(comment.len() as u16)
        .unwrap();
    record.extend_from_slice(comment);
    record
}
