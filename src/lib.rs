//! # sftpctl
//!
//! Run a single SFTP operation against a remote server: upload, download,
//! mkdir, rmdir, remove a file, query or change permissions, or list a
//! directory.
//!
//! ## Library use
//!
//! ```rust,no_run
//! use sftpctl::{execute, Action, Login, Request, SftpConnector};
//!
//! #[tokio::main]
//! async fn main() {
//!     let request = Request {
//!         login: Login {
//!             host: "sftp.example.com".into(),
//!             port: 22,
//!             username: "user".into(),
//!             password: "pass".into(),
//!         },
//!         action: Action::List { path: "/srv".into() },
//!     };
//!
//!     println!("{}", execute(&SftpConnector::new(), &request).await);
//! }
//! ```
//!
//! ## Testing without a server
//!
//! `MemoryConnector` hands out sessions on an in-memory tree and records
//! every call made against it:
//!
//! ```rust
//! use sftpctl::{execute, Action, Login, MemoryConnector, MemoryRemote, Request};
//!
//! # tokio_test::block_on(async {
//! let connector = MemoryConnector::new(MemoryRemote::new().with_file("/etc/motd", "hi"));
//! let request = Request {
//!     login: Login {
//!         host: "localhost".into(),
//!         port: 22,
//!         username: "user".into(),
//!         password: "pass".into(),
//!     },
//!     action: Action::QueryPermissions { path: "/etc/motd".into() },
//! };
//!
//! assert_eq!(execute(&connector, &request).await, "Permissions for /etc/motd: 644");
//! # });
//! ```

pub mod client;
pub mod command;
pub mod error;
pub mod local;
pub mod mode;
pub mod ops;
pub mod remote;
pub mod sftp;
pub mod ssh_handler;

// Re-exports for convenience
pub use client::{ClientConfig, SftpConnector};
pub use command::{Action, ActionKind, Args, Rejection, Request};
pub use mode::{Mode, ModeError};
pub use ops::execute;
pub use remote::{Connector, Login, MemoryConnector, MemoryRemote, RemoteFs};

pub use error::Error;
