//! Local file system access.

pub mod walker;
