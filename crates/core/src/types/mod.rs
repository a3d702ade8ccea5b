//! Core types for Vitrine.
//!
//! Type-safe wrappers for identifiers, money, emails and the backend's enums.

pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::Price;
pub use status::*;
