pub mod get_upload;
pub mod list_uploads;

pub use list_uploads::{ListUploadsQuery, ListUploadsResponse};
