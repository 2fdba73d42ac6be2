//! Multipart file uploads streamed to disk.
//!
//! The pipeline is exposed through [`Toolkit::upload_files`] and
//! [`Toolkit::upload_one_file`]. Each file part is:
//!
//! 1. sniffed from its first 512 bytes (the declared part type is ignored)
//! 2. checked against [`ToolkitConfig::allowed_file_types`]
//! 3. given a stored name, either sanitized or randomly generated
//! 4. streamed into a newly created file while counting bytes against
//!    [`ToolkitConfig::max_upload_size`]
//!
//! [`Toolkit::upload_files`]: crate::Toolkit::upload_files
//! [`Toolkit::upload_one_file`]: crate::Toolkit::upload_one_file
//! [`ToolkitConfig::allowed_file_types`]: crate::ToolkitConfig::allowed_file_types
//! [`ToolkitConfig::max_upload_size`]: crate::ToolkitConfig::max_upload_size

mod filename;
mod processor;
mod sniff;
mod uploaded_file;

pub(crate) use filename::is_single_component;
pub use uploaded_file::UploadedFile;
