//! Session-scoped models.

pub mod session;

pub use session::{CurrentUser, Flash, FlashKind, GuestCart, GuestCartLine, keys as session_keys};
