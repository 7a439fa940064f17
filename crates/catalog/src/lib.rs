//! # Catalog
//!
//! Target catalog and payload construction.
//!
//! - `TargetCatalog`: validated, read-only list of targets
//! - `Template`: `{{name}}` placeholder templates
//! - `PayloadBuilder`: descriptor + runtime params -> (body, headers)

mod builder;
mod catalog;
pub mod template;

pub use builder::{PayloadBuilder, RenderedPayload};
pub use catalog::{validate_descriptor, TargetCatalog};
pub use template::{Template, TemplateError};
