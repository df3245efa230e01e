//! Archive construction, upload and progress reporting.

pub mod archive;
pub mod progress;
pub mod upload;

pub use archive::{build_archive, ArchiveBlob};
pub use upload::{upload, UploadReceipt};
