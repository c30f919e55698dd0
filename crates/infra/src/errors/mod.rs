//! Conversions from external error types into [`crate::api::ApiError`]

mod conversions;
