// ABOUTME: Validated domain types shared across the updater.
// ABOUTME: Image tags, image references and compose service names.

mod image_ref;
mod service_name;
mod tag;

pub use image_ref::{ImageRef, ParseImageRefError, tag_of};
pub use service_name::{ServiceName, ServiceNameError};
pub use tag::{ImageTag, ParseImageTagError};
