//! Core value types.

pub mod api_type;

pub use api_type::ApiType;
