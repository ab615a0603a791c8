use super::block::{find_signing_block, SigningBlock};
use super::eocd::{find_comment_length, read_central_directory_offset};
use super::error::{ApkError, Result};
use super::pairs::{merge_id_values, parse_id_values, IdValues};
use super::rewrite::{rewrite_signing_block, Container};
use std::io::{Read, Seek, SeekFrom};

/// Snapshot of the structures needed to read or rewrite the signing block of
/// one APK. Rebuilt for every operation.
#[derive(Debug)]
pub struct ApkAttribute {
    pub comment_length: u16,
    pub cd_start: u64,
    pub signing_block: SigningBlock,
    pub id_values: IdValues,
}

impl ApkAttribute {
    pub fn parse<R: Read + Seek>(r: &mut R) -> Result<Self> {
        let comment_length = find_comment_length(r)?;
        let cd_start = read_central_directory_offset(r, comment_length)?;
        let file_length = r.seek(SeekFrom::End(0))?;
        if cd_start >= file_length {
            return Err(ApkError::DirectoryOffsetOutOfRange {
                offset: cd_start,
                size: file_length,
            });
        }
        let signing_block = find_signing_block(r, cd_start)?;
        let id_values = parse_id_values(&signing_block.bytes)?;
        Ok(Self {
            comment_length,
            cd_start,
            signing_block,
            id_values,
        })
    }

    /// Overlays `updates` on the parsed entries and writes the resulting block
    /// back into `c`, which must be the container this snapshot was parsed from.
    pub fn rewrite<C: Container>(&self, c: &mut C, updates: &IdValues) -> Result<u64> {
        let merged = merge_id_values(updates, &self.id_values);
        rewrite_signing_block(
            c,
            self.cd_start,
            self.signing_block.offset,
            self.comment_length,
            &merged,
        )
    }
}
