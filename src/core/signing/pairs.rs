use super::block::{APK_SIGNING_BLOCK_MAGIC_HI, APK_SIGNING_BLOCK_MAGIC_LO, FOOTER_SIZE};
use super::error::{ApkError, Result};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Entry id of the APK Signature Scheme v2 block.
pub const APK_SIGNATURE_SCHEME_V2_BLOCK_ID: u32 = 0x7109871a;
/// Entry id under which the channel payload is stored.
pub const APK_CHANNEL_BLOCK_ID: u32 = 0x71777777;

/// ID-value pairs of a signing block, kept sorted so serialization is reproducible.
pub type IdValues = BTreeMap<u32, Vec<u8>>;

/// u64 length prefix plus u32 id.
const PAIR_HEADER_SIZE: u64 = 12;

/// Parses the ID-value pairs of a complete signing block as returned by
/// [`find_signing_block`](super::block::find_signing_block).
///
/// Values are copied out of `block`. A trailing remainder shorter than a
/// length prefix is ignored.
pub fn parse_id_values(block: &[u8]) -> Result<IdValues> {
    let end = block.len().saturating_sub(FOOTER_SIZE as usize);
    let mut pairs = block.get(8..end).unwrap_or_default();

    let mut id_values = IdValues::new();
    let mut entry = 0;
    while pairs.len() >= 8 {
        entry += 1;
        let length = LittleEndian::read_u64(&pairs[..8]);
        pairs = &pairs[8..];
        if length < 4 || length > u32::MAX as u64 || length > pairs.len() as u64 {
            return Err(ApkError::EntrySizeOutOfRange {
                entry,
                size: length,
                available: pairs.len(),
            });
        }
        let length = length as usize;
        let id = LittleEndian::read_u32(&pairs[..4]);
        log::debug!("entry #{} id 0x{:08x}: {} bytes", entry, id, length - 4);
        id_values.insert(id, pairs[4..length].to_vec());
        pairs = &pairs[length..];
    }
    Ok(id_values)
}

/// Overlays `updates` on a copy of `base`. Entries are never removed.
pub fn merge_id_values(updates: &IdValues, base: &IdValues) -> IdValues {
    let mut merged = base.clone();
    merged.extend(updates.iter().map(|(id, value)| (*id, value.clone())));
    merged
}

/// Value of the size fields of a block holding `id_values`: every block
/// byte except the leading size field itself.
pub fn signing_block_size(id_values: &IdValues) -> u64 {
    FOOTER_SIZE
        + id_values
            .values()
            .map(|value| PAIR_HEADER_SIZE + value.len() as u64)
            .sum::<u64>()
}

/// Writes a complete signing block holding `id_values` in ascending id order
/// and returns the value of its size fields.
pub fn write_signing_block<W: Write>(w: &mut W, id_values: &IdValues) -> io::Result<u64> {
    let size = signing_block_size(id_values);
    w.write_u64::<LittleEndian>(size)?;
    for (id, value) in id_values {
        w.write_u64::<LittleEndian>(value.len() as u64 + 4)?;
        w.write_u32::<LittleEndian>(*id)?;
        w.write_all(value)?;
    }
    w.write_u64::<LittleEndian>(size)?;
    w.write_u64::<LittleEndian>(APK_SIGNING_BLOCK_MAGIC_LO)?;
    w.write_u64::<LittleEndian>(APK_SIGNING_BLOCK_MAGIC_HI)?;
    Ok(size)
}
