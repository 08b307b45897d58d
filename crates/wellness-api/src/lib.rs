pub mod client;
pub mod error;

pub use client::{AdminApi, AuthApi, ChatApi, HttpPortalApi};
pub use error::ApiError;
