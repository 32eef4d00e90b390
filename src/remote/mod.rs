use crate::error::Result;
use crate::mode::Mode;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

pub mod memory;

pub use memory::{MemoryConnector, MemoryRemote};

/// Status-style errors reported by a remote filesystem that is not an
/// SFTP server (SFTP failures keep the library's own error type)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("No such file")]
    NotFound,
    #[error("Permission denied")]
    PermissionDenied,
    #[error("File already exists")]
    AlreadyExists,
    #[error("Not a directory")]
    NotADirectory,
    #[error("Is a directory")]
    IsADirectory,
    #[error("Directory not empty")]
    DirectoryNotEmpty,
    #[error("{0}")]
    Other(String),
}

/// Kind of a remote filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

/// What the remote reports about a path
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub kind: EntryKind,
    pub size: Option<u64>,
    /// Raw mode including file-type bits, if the server sent it
    pub permissions: Option<u32>,
}

impl FileInfo {
    pub fn mode(&self) -> Option<Mode> {
        self.permissions.map(Mode::from_raw)
    }
}

/// Directory entry returned by list_dir
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub info: FileInfo,
}

/// Where and as whom to log in
#[derive(Clone, PartialEq, Eq)]
pub struct Login {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl Login {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for Login {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Login")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One open session on a remote filesystem
///
/// Every method is a single remote call. Paths are passed through to the
/// server as given.
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// List directory contents, excluding "." and ".."
    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>>;

    /// Get file or directory information
    async fn stat(&self, path: &str) -> Result<FileInfo>;

    /// Replace the permission bits of `path`
    async fn set_permissions(&self, path: &str, mode: Mode) -> Result<()>;

    /// Create a directory. Parent directories must exist.
    async fn make_dir(&self, path: &str) -> Result<()>;

    /// Delete an empty directory
    async fn del_dir(&self, path: &str) -> Result<()>;

    /// Delete a file
    async fn delete(&self, path: &str) -> Result<()>;

    /// Read entire file contents
    async fn read_file(&self, path: &str) -> Result<Bytes>;

    /// Create or truncate the file at `path` and write `content` to it
    async fn write_file(&self, path: &str, content: Bytes) -> Result<()>;

    /// End the session
    async fn close(&self) -> Result<()>;
}

/// Opens authenticated sessions
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: RemoteFs;

    async fn connect(&self, login: &Login) -> Result<Self::Session>;
}

/// Normalize a path: collapse repeated and trailing slashes, keep a leading one
pub fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let joined = path
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
