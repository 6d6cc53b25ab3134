mod auth;
pub mod client;
pub mod types;

pub use auth::{Authenticator, Credentials};
pub use client::{ApiClient, ApiError};
