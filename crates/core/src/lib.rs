//! Brightpath Core - Shared types and form validation.
//!
//! This crate provides the pieces of the lead-capture backend that do not
//! touch the network:
//! - [`types`] - Newtype wrappers for emails, phone numbers and provider ids
//! - [`forms`] - Submission envelopes, per-form schemas and validation errors
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no provider SDKs. The `site` crate turns raw request bodies into
//! [`forms::Envelope`]s and everything downstream works on the typed
//! [`forms::Submission`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod forms;
pub mod types;

pub use forms::{Envelope, FormType, Issue, Submission, ValidationError};
pub use types::*;
