use super::eocd::central_directory_offset_field;
use super::error::{ApkError, Result};
use super::pairs::{write_signing_block, IdValues};
use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

/// Random access storage that can also be cut short.
pub trait Container: Read + Write + Seek {
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl Container for File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

impl Container for Cursor<Vec<u8>> {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.get_mut().truncate(len as usize);
        Ok(())
    }
}

/// Replaces the signing block at `block_offset` with one holding `id_values`,
/// moves the central directory and EOCD behind it and patches the central
/// directory offset stored in the EOCD. Returns the new central directory offset.
///
/// Not atomic: the container is truncated before the replacement is written.
pub fn rewrite_signing_block<C: Container>(
    c: &mut C,
    cd_start: u64,
    block_offset: u64,
    comment_length: u16,
    id_values: &IdValues,
) -> Result<u64> {
    let mut block = vec![];
    let size = write_signing_block(&mut block, id_values)?;

    let old_total_size = cd_start - block_offset;
    let new_total_size = size + 8;
    let new_cd_start = cd_start - old_total_size + new_total_size;
    let patched = u32::try_from(new_cd_start).map_err(|_| ApkError::SizeOutOfRange {
        size: new_total_size,
    })?;

    // Central directory and EOCD only move, their bytes stay the same.
    let file_length = c.seek(SeekFrom::End(0))?;
    let mut tail = Vec::with_capacity((file_length - cd_start) as usize);
    c.seek(SeekFrom::Start(cd_start))?;
    c.read_to_end(&mut tail)?;

    c.truncate(block_offset)?;
    c.seek(SeekFrom::Start(block_offset))?;
    c.write_all(&block)?;
    c.write_all(&tail)?;
    let file_length = c.stream_position()?;
    c.truncate(file_length)?;

    c.seek(SeekFrom::Start(central_directory_offset_field(
        file_length,
        comment_length,
    )))?;
    c.write_u32::<LittleEndian>(patched)?;
    c.flush()?;

    log::info!(
        "rewrote APK Signing Block at offset {}: {} -> {} bytes, central directory {} -> {}",
        block_offset,
        old_total_size,
        new_total_size,
        cd_start,
        new_cd_start
    );
    Ok(new_cd_start)
}
