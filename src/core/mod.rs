//! Core types shared across pget: the error taxonomy and its user-facing rendering.

pub mod error;

pub use error::{ErrorContext, ErrorKind, PgetError, user_friendly_error};
