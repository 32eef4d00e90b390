use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Ssh(#[from] russh::Error),

    #[error(transparent)]
    Sftp(#[from] russh_sftp::client::error::Error),

    #[error("Authentication failed for user '{user}' on {host}")]
    Auth { user: String, host: String },

    #[error("Connection to {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },

    #[error(transparent)]
    Remote(#[from] crate::remote::RemoteError),

    #[error("server did not report permissions for {0}")]
    MissingPermissions(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
