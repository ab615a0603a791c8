//! Read and write custom entries of the APK Signing Block without
//! invalidating the APK signature.

pub mod core;

pub use crate::core::channel::{read_channel_payload, write_channel_payload};
pub use crate::core::signing::error::{ApkError, Result};
