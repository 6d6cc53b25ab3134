//! Google Drive as the sync destination.
//!
//! `oauth` runs the one-time browser authorization, `token` persists the
//! resulting refresh token, and `client` does folder lookups and uploads.

pub mod client;
pub mod oauth;
pub mod token;

use thiserror::Error;

pub use client::DriveClient;
pub use token::DriveTokenStore;

#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Not authorized. Run 'recsync drive init' first.")]
    NotAuthorized,

    #[error("Drive rejected the access token (401). Run 'recsync drive init' again.")]
    Unauthorized,

    #[error("Drive API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid Drive response: {0}")]
    InvalidResponse(String),

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type DriveResult<T> = Result<T, DriveError>;
