//! Form handling shared by every endpoint.
//!
//! - [`descriptor`] - What differs between forms
//! - [`settings`] - Per-form recipients, lists and templates from the environment
//! - [`extract`] - Request body extractor
//! - [`pipeline`] - Configuration guard and the three side effects
//! - [`render`] - Hand-built fallback emails

pub mod descriptor;
pub mod extract;
pub mod pipeline;
pub mod render;
pub mod settings;

pub use descriptor::{FormDescriptor, descriptor};
pub use extract::SubmissionBody;
pub use pipeline::{ContactStatus, FormReceipt, check_config, process};
pub use settings::{FormSettings, FormsConfig};
