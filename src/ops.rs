//! The eight operations. Each one opens a session, makes one remote call,
//! closes the session and renders a single message.

use crate::command::{Action, Request};
use crate::error::{Error, Result};
use crate::local::{read_source, write_destination};
use crate::remote::{Connector, EntryKind, RemoteFs};
use tracing::{debug, warn};

/// Run the request and return the text to print, success or failure
pub async fn execute<C: Connector>(connector: &C, request: &Request) -> String {
    let kind = request.action.kind();
    match run(connector, request).await {
        Ok(message) => message,
        Err(e) => {
            warn!(action = ?kind, error = %e, "Operation failed");
            format!("{}: {}", kind.failure_prefix(), e)
        }
    }
}

/// Connect, apply, then close whether or not the action succeeded
async fn run<C: Connector>(connector: &C, request: &Request) -> Result<String> {
    let session = connector.connect(&request.login).await?;
    let result = apply(&session, &request.action).await;
    if let Err(e) = session.close().await {
        debug!(error = %e, "Error closing session");
    }
    result
}

async fn apply<R: RemoteFs>(fs: &R, action: &Action) -> Result<String> {
    match action {
        Action::Upload { local, remote } => {
            let content = read_source(local).await?;
            fs.write_file(remote, content).await?;
            Ok("File uploaded successfully!".to_string())
        }
        Action::Download { remote, local } => {
            let content = fs.read_file(remote).await?;
            write_destination(local, &content).await?;
            Ok("File downloaded successfully!".to_string())
        }
        Action::MakeDir { path } => {
            fs.make_dir(path).await?;
            Ok("Directory created successfully!".to_string())
        }
        Action::RemoveDir { path } => {
            fs.del_dir(path).await?;
            Ok("Directory removed successfully!".to_string())
        }
        Action::RemoveFile { path } => {
            fs.delete(path).await?;
            Ok("File removed successfully!".to_string())
        }
        Action::QueryPermissions { path } => {
            let mode = fs
                .stat(path)
                .await?
                .mode()
                .ok_or_else(|| Error::MissingPermissions(path.clone()))?;
            Ok(format!("Permissions for {}: {}", path, mode))
        }
        Action::ChangePermissions { path, mode } => {
            fs.set_permissions(path, *mode).await?;
            Ok(format!("Permissions for {} changed to: {}", path, mode))
        }
        Action::List { path } => {
            let mut files = Vec::new();
            let mut directories = Vec::new();
            for entry in fs.list_dir(path).await? {
                match entry.info.kind {
                    EntryKind::File => files.push(entry.name),
                    EntryKind::Directory => directories.push(entry.name),
                    EntryKind::Symlink | EntryKind::Other => {}
                }
            }
            Ok(format!(
                "Files at {path}:\n{}\n\nDirectories at {path}:\n{}",
                files.join("\n"),
                directories.join("\n"),
            ))
        }
    }
}
