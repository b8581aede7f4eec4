//! # Services Module
//!
//! Account operations and the request payloads they accept.

pub mod accounts;
pub mod validation;

pub use accounts::AccountService;
