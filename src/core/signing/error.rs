use std::io;

pub type Result<T, E = ApkError> = std::result::Result<T, E>;

/// Everything that can go wrong while locating or rewriting the signing block.
///
/// All variants except [`ApkError::Io`] are format validation failures on
/// malformed or foreign input; none of them is worth retrying.
#[derive(Debug, thiserror::Error)]
pub enum ApkError {
    #[error("APK too small for ZIP End of Central Directory record: {size} bytes")]
    TooSmall { size: u64 },

    #[error("ZIP End of Central Directory record not found in the last {scanned} bytes")]
    TrailerNotFound { scanned: u64 },

    #[error("ZIP Central Directory offset {offset} out of range for {size} byte file")]
    DirectoryOffsetOutOfRange { offset: u64, size: u64 },

    #[error("APK too small for APK Signing Block. ZIP Central Directory offset: {offset}")]
    SigningBlockTooSmall { offset: u64 },

    #[error("No APK Signing Block before ZIP Central Directory at offset {offset}")]
    MagicMismatch { offset: u64 },

    /// Also raised when the block would start before the beginning of the file.
    #[error("APK Signing Block size out of range: {size}")]
    SizeOutOfRange { size: u64 },

    #[error("APK Signing Block sizes in header and footer do not match: {header} vs {footer}")]
    SizeMismatch { header: u64, footer: u64 },

    #[error("APK Signing Block entry #{entry} size out of range: {size}, available: {available}")]
    EntrySizeOutOfRange {
        entry: usize,
        size: u64,
        available: usize,
    },

    #[error("no entry with id 0x{id:08x} in APK Signing Block")]
    EntryNotFound { id: u32 },

    #[error("entry id 0x{id:08x} is reserved for the signature scheme")]
    ReservedId { id: u32 },

    #[error(transparent)]
    Io(#[from] io::Error),
}
