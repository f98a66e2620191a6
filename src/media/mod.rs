pub mod content_id;
pub mod entry;
pub mod mime;
