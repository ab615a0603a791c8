//! The APK Signing Block sits immediately before the ZIP central directory:
//!
//! ```text
//! size of block (u64, excludes this field)
//! ID-value pairs (u64 length-prefixed)
//! size of block (u64, same as the first field)
//! magic "APK Sig Block 42" (16 bytes)
//! ```

use super::error::{ApkError, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::io::{Read, Seek, SeekFrom};

/// "APK Sig Block 42", as two little-endian words.
pub const APK_SIGNING_BLOCK_MAGIC_LO: u64 = 0x20676953204b5041;
pub const APK_SIGNING_BLOCK_MAGIC_HI: u64 = 0x3234206b636f6c42;
pub const APK_SIGNING_BLOCK_MIN_SIZE: u64 = 32;
/// Trailing size copy plus magic.
pub const FOOTER_SIZE: u64 = 24;
const SIZE_FIELD: u64 = 8;

#[derive(Debug)]
pub struct SigningBlock {
    /// Absolute offset of the leading size field.
    pub offset: u64,
    /// The whole block, both size fields and the magic included.
    pub bytes: Vec<u8>,
}

impl SigningBlock {
    pub fn total_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Reads and validates the signing block that ends at `cd_start`.
pub fn find_signing_block<R: Read + Seek>(r: &mut R, cd_start: u64) -> Result<SigningBlock> {
    if cd_start < APK_SIGNING_BLOCK_MIN_SIZE {
        return Err(ApkError::SigningBlockTooSmall { offset: cd_start });
    }

    let mut footer = [0u8; FOOTER_SIZE as usize];
    r.seek(SeekFrom::Start(cd_start - FOOTER_SIZE))?;
    r.read_exact(&mut footer)?;
    let magic_lo = LittleEndian::read_u64(&footer[8..16]);
    let magic_hi = LittleEndian::read_u64(&footer[16..24]);
    if magic_lo != APK_SIGNING_BLOCK_MAGIC_LO || magic_hi != APK_SIGNING_BLOCK_MAGIC_HI {
        return Err(ApkError::MagicMismatch {
            offset: cd_start - FOOTER_SIZE,
        });
    }

    let size_in_footer = LittleEndian::read_u64(&footer[..8]);
    if size_in_footer < FOOTER_SIZE || size_in_footer > u32::MAX as u64 - SIZE_FIELD {
        return Err(ApkError::SizeOutOfRange {
            size: size_in_footer,
        });
    }

    let total_size = size_in_footer + SIZE_FIELD;
    // A block claiming more bytes than precede the central directory.
    let offset = cd_start
        .checked_sub(total_size)
        .ok_or(ApkError::SizeOutOfRange {
            size: size_in_footer,
        })?;

    let mut bytes = vec![0u8; total_size as usize];
    r.seek(SeekFrom::Start(offset))?;
    r.read_exact(&mut bytes)?;

    let size_in_header = LittleEndian::read_u64(&bytes[..8]);
    if size_in_header != size_in_footer {
        return Err(ApkError::SizeMismatch {
            header: size_in_header,
            footer: size_in_footer,
        });
    }

    log::debug!(
        "APK Signing Block at offset {} ({} bytes)",
        offset,
        total_size
    );
    Ok(SigningBlock { offset, bytes })
}

#[cfg(test)]
pub(crate) fn signing_block(entries: &[(u32, &[u8])]) -> Vec<u8> {
    use byteorder::WriteBytesExt;
    use std::io::Write;

    let mut pairs = vec![];
    for (id, value) in entries {
        pairs
            .write_u64::<LittleEndian>(value.len() as u64 + 4)
            .unwrap();
        pairs.write_u32::<LittleEndian>(*id).unwrap();
        pairs.write_all(value).unwrap();
    }
    let size = pairs.len() as u64 + FOOTER_SIZE;
    let mut block = vec![];
    block.write_u64::<LittleEndian>(size).unwrap();
    block.extend(pairs);
    block.write_u64::<LittleEndian>(size).unwrap();
    block
        .write_u64::<LittleEndian>(APK_SIGNING_BLOCK_MAGIC_LO)
        .unwrap();
    block
        .write_u64::<LittleEndian>(APK_SIGNING_BLOCK_MAGIC_HI)
        .unwrap();
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const V2: u32 = 0x7109871a;

    fn layout(prefix: usize, block: &[u8]) -> (Cursor<Vec<u8>>, u64) {
        let mut bytes = vec![0x11; prefix];
        bytes.extend_from_slice(block);
        let cd_start = bytes.len() as u64;
        bytes.extend_from_slice(b"central directory");
        (Cursor::new(bytes), cd_start)
    }

    #[test]
    fn magic_spells_block_name() {
        let mut magic = APK_SIGNING_BLOCK_MAGIC_LO.to_le_bytes().to_vec();
        magic.extend_from_slice(&APK_SIGNING_BLOCK_MAGIC_HI.to_le_bytes());
        assert_eq!(magic, b"APK Sig Block 42");
    }

    #[test]
    fn reads_block_before_central_directory() {
        let block = signing_block(&[(V2, b"signature")]);
        let (mut r, cd_start) = layout(40, &block);
        let found = find_signing_block(&mut r, cd_start).unwrap();
        assert_eq!(found.offset, 40);
        assert_eq!(found.bytes, block);
        assert_eq!(found.total_size(), block.len() as u64);
    }

    #[test]
    fn rejects_offset_below_minimum() {
        let (mut r, _) = layout(0, &[0; 64]);
        assert!(matches!(
            find_signing_block(&mut r, 31),
            Err(ApkError::SigningBlockTooSmall { offset: 31 })
        ));
    }

    #[test]
    fn rejects_missing_magic() {
        let (mut r, cd_start) = layout(100, &[]);
        assert!(matches!(
            find_signing_block(&mut r, cd_start),
            Err(ApkError::MagicMismatch { offset: 76 })
        ));
    }

    #[test]
    fn rejects_small_size_field() {
        let mut block = signing_block(&[]);
        let len = block.len();
        block[len - 24..len - 16].copy_from_slice(&23u64.to_le_bytes());
        let (mut r, cd_start) = layout(10, &block);
        assert!(matches!(
            find_signing_block(&mut r, cd_start),
            Err(ApkError::SizeOutOfRange { size: 23 })
        ));
    }

    #[test]
    fn rejects_huge_size_field() {
        let mut block = signing_block(&[]);
        let len = block.len();
        block[len - 24..len - 16].copy_from_slice(&(u32::MAX as u64).to_le_bytes());
        let (mut r, cd_start) = layout(10, &block);
        assert!(matches!(
            find_signing_block(&mut r, cd_start),
            Err(ApkError::SizeOutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_block_reaching_before_file_start() {
        let block = signing_block(&[(V2, &[7; 16])]);
        // Drop the leading size field and part of the entry so the footer
        // claims more bytes than precede the central directory.
        let (mut r, cd_start) = layout(0, &block[20..]);
        assert!(matches!(
            find_signing_block(&mut r, cd_start),
            Err(ApkError::SizeOutOfRange { size: 52 })
        ));
    }

    #[test]
    fn rejects_header_footer_disagreement() {
        let mut block = signing_block(&[(V2, b"abcd")]);
        block[..8].copy_from_slice(&99u64.to_le_bytes());
        let (mut r, cd_start) = layout(8, &block);
        assert!(matches!(
            find_signing_block(&mut r, cd_start),
            Err(ApkError::SizeMismatch {
                header: 99,
                footer: 40
            })
        ));
    }
}
