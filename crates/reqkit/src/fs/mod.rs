//! Filesystem helpers: directory provisioning and static file downloads.

mod directory;
mod download;

pub use directory::ensure_dir;
pub use download::send_static_file;
