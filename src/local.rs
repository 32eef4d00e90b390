//! Local side of a transfer: the file being uploaded and the file a
//! download lands in.

use crate::error::Result;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Local file name for a download: the last segment of the remote path
///
/// A trailing slash is ignored. Returns `None` when no usable segment is
/// left (`"/"`, `""`, `".."`).
pub fn download_name(remote: &str) -> Option<PathBuf> {
    let name = remote.trim_end_matches('/').rsplit('/').next()?;
    match name {
        "" | "." | ".." => None,
        name => Some(PathBuf::from(name)),
    }
}

/// Read the whole file to upload
pub async fn read_source(path: &Path) -> Result<Bytes> {
    let content = fs::read(path).await?;
    debug!(path = %path.display(), size = content.len(), "Read local file");
    Ok(Bytes::from(content))
}

/// Write downloaded contents, replacing any existing file
pub async fn write_destination(path: &Path, content: &[u8]) -> Result<()> {
    fs::write(path, content).await?;
    debug!(path = %path.display(), size = content.len(), "Wrote local file");
    Ok(())
}
