//! Conversion from Podman records to Docker records.
//!
//! Every function here is pure apart from `warn` logging for fields that
//! degrade instead of failing the request. Filters always run against the
//! raw Podman record, before any sentinel substitution.

pub mod filters;
pub mod image;
pub mod inspect;
pub mod reference;
pub mod system;

pub use filters::Filters;
pub use image::{history_item, image_summary, search_result};
pub use inspect::decode_inspect;
pub use system::system_info;
