//! Request body encoders.
//!
//! - [`json`]: JSON bodies with extension data merged beside declared fields.
//! - [`multipart`]: `multipart/form-data` bodies flattened from the request DTO.

pub mod json;
pub mod multipart;

pub use multipart::{FileUpload, FilePart, FormField, MultipartRequest};
