//! Core types for Brightpath.
//!
//! This module provides type-safe wrappers for the values that cross the
//! provider boundary.

pub mod email;
pub mod id;
pub mod name;
pub mod phone;

pub use email::{Email, EmailError};
pub use id::*;
pub use name::split_name;
pub use phone::{Phone, PhoneError};
