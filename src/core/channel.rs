//! Reading and writing custom entries of the APK Signing Block by path.
//!
//! Signature Scheme v2+ verifiers only check the entry stored under their own
//! id, so sibling entries can be added or replaced without re-signing.

use crate::core::signing::attribute::ApkAttribute;
use crate::core::signing::error::{ApkError, Result};
use crate::core::signing::pairs::{
    IdValues, APK_CHANNEL_BLOCK_ID, APK_SIGNATURE_SCHEME_V2_BLOCK_ID,
};
use crate::core::signing::rewrite::Container;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader};
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WriteOptions {
    /// Rewrite a scratch copy next to the APK and rename it over the original.
    ///
    /// Symlinks are followed and the file they point at is replaced. The
    /// replacement is a new inode: hard links to the old file keep the old
    /// contents, and only the permission bits are carried over, not the owner.
    pub atomic: bool,
    /// Flush the rewritten file to disk before returning.
    pub sync: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            atomic: true,
            sync: true,
        }
    }
}

/// All entries of the APK Signing Block.
pub fn read_id_values(path: &Path) -> Result<IdValues> {
    let mut r = BufReader::new(File::open(path)?);
    Ok(ApkAttribute::parse(&mut r)?.id_values)
}

pub fn read_payload(path: &Path, id: u32) -> Result<Vec<u8>> {
    read_id_values(path)?
        .remove(&id)
        .ok_or(ApkError::EntryNotFound { id })
}

pub fn read_channel_payload(path: &Path) -> Result<Vec<u8>> {
    read_payload(path, APK_CHANNEL_BLOCK_ID)
}

pub fn write_channel_payload(path: &Path, payload: &[u8]) -> Result<()> {
    write_payload(path, APK_CHANNEL_BLOCK_ID, payload, &WriteOptions::default())
}

pub fn write_payload(path: &Path, id: u32, payload: &[u8], opts: &WriteOptions) -> Result<()> {
    write_id_values(path, &IdValues::from([(id, payload.to_vec())]), opts)
}

/// Inserts or replaces `updates` in the APK Signing Block of `path`.
///
/// The file is fully parsed before anything is modified, so a malformed APK
/// is left untouched.
pub fn write_id_values(path: &Path, updates: &IdValues, opts: &WriteOptions) -> Result<()> {
    if updates.contains_key(&APK_SIGNATURE_SCHEME_V2_BLOCK_ID) {
        return Err(ApkError::ReservedId {
            id: APK_SIGNATURE_SCHEME_V2_BLOCK_ID,
        });
    }
    if opts.atomic {
        write_through_scratch_file(path, updates, opts)
    } else {
        let mut f = OpenOptions::new().read(true).write(true).open(path)?;
        update(&mut f, updates)?;
        if opts.sync {
            f.sync_all()?;
        }
        Ok(())
    }
}

fn update<C: Container>(c: &mut C, updates: &IdValues) -> Result<u64> {
    let attr = ApkAttribute::parse(c)?;
    attr.rewrite(c, updates)
}

fn write_through_scratch_file(path: &Path, updates: &IdValues, opts: &WriteOptions) -> Result<()> {
    // Rename over the link target, never over the link itself.
    let path = fs::canonicalize(path)?;
    // Same directory, so the final rename cannot cross filesystems.
    let dir = path.parent().unwrap_or_else(|| Path::new("/"));
    let mut src = File::open(&path)?;
    let permissions = src.metadata()?.permissions();

    let mut scratch = NamedTempFile::new_in(dir)?;
    io::copy(&mut src, scratch.as_file_mut())?;
    drop(src);
    update(scratch.as_file_mut(), updates)?;
    scratch.as_file().set_permissions(permissions)?;
    if opts.sync {
        scratch.as_file().sync_all()?;
    }
    log::debug!(
        "replacing {} with {}",
        path.display(),
        scratch.path().display()
    );
    scratch.persist(&path).map_err(|err| err.error)?;
    Ok(())
}
