use crate::error::Result;
use crate::mode::Mode;
use crate::remote::{DirEntry, EntryKind, FileInfo, RemoteFs};
use crate::ssh_handler::ClientHandler;
use async_trait::async_trait;
use bytes::Bytes;
use russh::client::Handle;
use russh::Disconnect;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::FileAttributes;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Convert russh_sftp FileAttributes to FileInfo
fn to_file_info(attrs: &FileAttributes) -> FileInfo {
    let file_type = attrs.file_type();
    let kind = if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::File
    } else if file_type.is_symlink() {
        EntryKind::Symlink
    } else {
        EntryKind::Other
    };

    FileInfo {
        kind,
        size: attrs.size,
        permissions: attrs.permissions,
    }
}

/// Remote filesystem backed by a live SFTP session
///
/// Owns the SSH connection; [`RemoteFs::close`] ends the SFTP channel and
/// then disconnects.
pub struct SftpRemote {
    handle: Handle<ClientHandler>,
    sftp: SftpSession,
}

impl SftpRemote {
    pub fn new(handle: Handle<ClientHandler>, sftp: SftpSession) -> Self {
        Self { handle, sftp }
    }
}

#[async_trait]
impl RemoteFs for SftpRemote {
    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        debug!(path = %path, "Reading directory");
        let entries = self.sftp.read_dir(path).await?;

        Ok(entries
            .filter(|entry| {
                let name = entry.file_name();
                name != "." && name != ".."
            })
            .map(|entry| DirEntry {
                name: entry.file_name(),
                info: to_file_info(&entry.metadata()),
            })
            .collect())
    }

    async fn stat(&self, path: &str) -> Result<FileInfo> {
        debug!(path = %path, "Getting file stats");
        let attrs = self.sftp.metadata(path).await?;
        Ok(to_file_info(&attrs))
    }

    async fn set_permissions(&self, path: &str, mode: Mode) -> Result<()> {
        debug!(path = %path, mode = %mode, "Setting permissions");
        // SETSTAT with only the permissions attribute present
        let attrs = FileAttributes {
            permissions: Some(mode.bits()),
            ..FileAttributes::empty()
        };
        self.sftp.set_metadata(path, attrs).await?;
        Ok(())
    }

    async fn make_dir(&self, path: &str) -> Result<()> {
        debug!(path = %path, "Creating directory");
        self.sftp.create_dir(path).await?;
        Ok(())
    }

    async fn del_dir(&self, path: &str) -> Result<()> {
        debug!(path = %path, "Removing directory");
        self.sftp.remove_dir(path).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        debug!(path = %path, "Removing file");
        self.sftp.remove_file(path).await?;
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<Bytes> {
        debug!(path = %path, "Reading file");
        let content = self.sftp.read(path).await?;
        Ok(Bytes::from(content))
    }

    async fn write_file(&self, path: &str, content: Bytes) -> Result<()> {
        debug!(path = %path, len = content.len(), "Writing file");
        // create() opens with CREATE | TRUNCATE | WRITE
        let mut file = self.sftp.create(path).await?;
        file.write_all(&content).await?;
        file.shutdown().await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        debug!("Closing SFTP session");
        self.sftp.close().await?;
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}
