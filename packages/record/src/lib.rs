//! File records and backup metadata documents.
//!
//! A backup run produces two JSON documents: a flat list of directory paths
//! and a list of [`FileRecord`]s serialized as
//! `{path, modified, size, md5}`. Restore reads them back verbatim.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

mod error;
mod metadata;
mod record;

pub use error::RecordError;
pub use metadata::{read_directories, read_records, write_directories, write_records};
pub use record::{FileRecord, modified_secs};
