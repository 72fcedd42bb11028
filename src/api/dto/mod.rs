//! Data Transfer Objects for REST request/response serialization.
//!
//! Request fields are optional at the serde level so that missing or null
//! values surface as itemized validation errors instead of parse failures.

pub mod points_dto;

pub use points_dto::*;
