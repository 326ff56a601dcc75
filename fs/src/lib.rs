//! bundle-fs
//!
//! File-backed data items and bundles over `bundle-core`.
//! Every operation opens its own handle, reads or writes only the byte
//! ranges it needs, and drops the handle before returning.

#![forbid(unsafe_code)]

pub mod config;
pub mod io;
pub mod file_item;
pub mod builder;
pub mod file_bundle;
pub mod writer;

pub use config::FsConfig;
pub use io::Payload;
pub use file_item::FileDataItem;
pub use builder::create_data;
pub use file_bundle::{FileBundle, HEADER_FILE_NAME};
pub use writer::FileBundleWriter;
