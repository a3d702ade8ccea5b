//! Vitrine Core - shared types and client-side pricing rules.
//!
//! The storefront is a thin client over an external REST backend, which owns
//! every entity and has the final word on validation. This crate holds the
//! few pieces of logic the client computes on its own:
//!
//! - [`pricing`] - order subtotal, coupon discount, shipping and total
//! - [`coupon`] - coupon eligibility preview and discount computation
//! - [`pack`] - pack slot selection, recomputed price and composite image layout
//! - [`custom_pack`] - custom pack selection bounds and pricing
//! - [`promo`] - announcement bar, countdown timer and visitor counter widgets
//! - [`variant`] - product variant types, combinations and their validation
//! - [`types`] - typed IDs, prices, emails and status enums
//!
//! # Architecture
//!
//! No I/O, no HTTP clients. Everything here is a pure function of its inputs
//! (randomness and the clock are passed in), so it is trivially testable.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod coupon;
pub mod custom_pack;
pub mod pack;
pub mod pricing;
pub mod promo;
pub mod types;
pub mod variant;

pub use types::*;
