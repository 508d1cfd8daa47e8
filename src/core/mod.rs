//! Core types and functionality for Capsule.
//!
//! This module is the foundation of Capsule's type system: the strongly-typed
//! error enumeration used across the packaging pipeline, the user-facing
//! error context for CLI display, and the pluggable package-identifier
//! validator invoked before every save.
//!
//! # Error Management
//!
//! Capsule uses a two-layer error system:
//! - **Strongly-typed errors** ([`CapsuleError`]) for precise handling in code
//! - **User-friendly contexts** ([`ErrorContext`]) with actionable suggestions
//!   for CLI users, produced by [`user_friendly_error`]
//!
//! # Identifier Validation
//!
//! [`IdValidator`] is a trait so callers can inject their own grammar; the
//! [`DefaultIdValidator`] enforces the standard package-id rules (alphanumeric
//! plus `.`, `-`, `_`, at most 100 characters).

pub mod error;
pub mod id;

pub use error::{CapsuleError, ErrorContext, user_friendly_error};
pub use id::{DefaultIdValidator, IdValidator, is_valid_package_id};
