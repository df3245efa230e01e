//! Change detection: fingerprints, remote markers and the sync decision.

pub mod fingerprint;
pub mod marker;
pub mod policy;

pub use fingerprint::{fingerprint, fingerprint_files, Fingerprint};
pub use marker::{archive_key, lookup_marker, marker_key, read_marker, MarkerLookup};
pub use policy::{decide, plan, Action, RunMode, Step};
