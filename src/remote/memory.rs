use super::{normalize_path, Connector, DirEntry, EntryKind, FileInfo, Login, RemoteError, RemoteFs};
use crate::error::{Error, Result};
use crate::mode::Mode;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;

const S_IFREG: u32 = 0o100000;
const S_IFDIR: u32 = 0o040000;
const S_IFLNK: u32 = 0o120000;

/// Node stored in memory, keyed by absolute normalized path
#[derive(Debug, Clone)]
enum Node {
    File { content: Bytes, mode: u32 },
    Dir { mode: u32 },
    Symlink { target: String },
}

impl Node {
    fn info(&self) -> FileInfo {
        match self {
            Node::File { content, mode } => FileInfo {
                kind: EntryKind::File,
                size: Some(content.len() as u64),
                permissions: Some(S_IFREG | mode),
            },
            Node::Dir { mode } => FileInfo {
                kind: EntryKind::Directory,
                size: Some(4096),
                permissions: Some(S_IFDIR | mode),
            },
            Node::Symlink { target } => FileInfo {
                kind: EntryKind::Symlink,
                size: Some(target.len() as u64),
                permissions: Some(S_IFLNK | 0o777),
            },
        }
    }
}

/// A remote call as seen by the in-memory filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    ListDir(String),
    Stat(String),
    SetPermissions(String, u32),
    MakeDir(String),
    DelDir(String),
    Delete(String),
    ReadFile(String),
    WriteFile(String),
    Close,
}

#[derive(Debug)]
struct State {
    nodes: RwLock<BTreeMap<String, Node>>,
    calls: Mutex<Vec<RemoteCall>>,
    closed: Mutex<bool>,
}

/// In-memory remote filesystem for testing and development
///
/// Clones share the same tree and call log.
#[derive(Debug, Clone)]
pub struct MemoryRemote {
    state: Arc<State>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

fn key(path: &str) -> String {
    let normalized = normalize_path(path);
    if normalized == "." {
        "/".to_string()
    } else if normalized.starts_with('/') {
        normalized
    } else {
        format!("/{}", normalized)
    }
}

fn parent(key: &str) -> Option<&str> {
    match key.rsplit_once('/') {
        _ if key == "/" => None,
        Some(("", _)) => Some("/"),
        Some((parent, _)) => Some(parent),
        None => None,
    }
}

fn name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

impl MemoryRemote {
    /// Empty filesystem containing only "/"
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir { mode: 0o755 });
        Self {
            state: Arc::new(State {
                nodes: RwLock::new(nodes),
                calls: Mutex::new(Vec::new()),
                closed: Mutex::new(false),
            }),
        }
    }

    /// Add a regular file with mode 644, creating missing parents
    pub fn with_file(self, path: &str, content: impl Into<Bytes>) -> Self {
        self.with_file_mode(path, content, 0o644)
    }

    /// Add a regular file with the given permission bits
    pub fn with_file_mode(self, path: &str, content: impl Into<Bytes>, mode: u32) -> Self {
        self.insert(
            path,
            Node::File {
                content: content.into(),
                mode,
            },
        );
        self
    }

    /// Add a directory with mode 755, creating missing parents
    pub fn with_dir(self, path: &str) -> Self {
        self.insert(path, Node::Dir { mode: 0o755 });
        self
    }

    /// Add a symbolic link pointing at `target`
    pub fn with_symlink(self, path: &str, target: &str) -> Self {
        self.insert(
            path,
            Node::Symlink {
                target: key(target),
            },
        );
        self
    }

    fn insert(&self, path: &str, node: Node) {
        let key = key(path);
        let mut nodes = self.state.nodes.write();
        let mut ancestor = parent(&key);
        while let Some(dir) = ancestor {
            nodes
                .entry(dir.to_string())
                .or_insert(Node::Dir { mode: 0o755 });
            ancestor = parent(dir);
        }
        nodes.insert(key, node);
    }

    /// Contents of a regular file
    pub fn file(&self, path: &str) -> Option<Bytes> {
        match self.state.nodes.read().get(&key(path)) {
            Some(Node::File { content, .. }) => Some(content.clone()),
            _ => None,
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.state.nodes.read().contains_key(&key(path))
    }

    pub fn is_dir(&self, path: &str) -> bool {
        matches!(self.state.nodes.read().get(&key(path)), Some(Node::Dir { .. }))
    }

    /// Permission bits of a file or directory
    pub fn mode(&self, path: &str) -> Option<u32> {
        match self.state.nodes.read().get(&key(path)) {
            Some(Node::File { mode, .. }) | Some(Node::Dir { mode }) => Some(*mode),
            _ => None,
        }
    }

    /// Every remote call made so far, in order
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.calls.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.state.closed.lock()
    }

    fn record(&self, call: RemoteCall) {
        self.state.calls.lock().push(call);
    }

    /// Resolve a symlink once; other nodes resolve to themselves
    fn follow(nodes: &BTreeMap<String, Node>, key: String) -> String {
        match nodes.get(&key) {
            Some(Node::Symlink { target }) => target.clone(),
            _ => key,
        }
    }

    fn require_dir(nodes: &BTreeMap<String, Node>, key: &str) -> std::result::Result<(), RemoteError> {
        match nodes.get(key) {
            Some(Node::Dir { .. }) => Ok(()),
            Some(_) => Err(RemoteError::NotADirectory),
            None => Err(RemoteError::NotFound),
        }
    }
}

#[async_trait]
impl RemoteFs for MemoryRemote {
    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        self.record(RemoteCall::ListDir(path.to_string()));
        let nodes = self.state.nodes.read();
        let dir = Self::follow(&nodes, key(path));
        Self::require_dir(&nodes, &dir)?;

        let entries = nodes
            .iter()
            .filter(|(k, _)| k.as_str() != "/" && parent(k) == Some(dir.as_str()))
            .map(|(k, node)| DirEntry {
                name: name(k).to_string(),
                info: node.info(),
            })
            .collect();
        Ok(entries)
    }

    async fn stat(&self, path: &str) -> Result<FileInfo> {
        self.record(RemoteCall::Stat(path.to_string()));
        let nodes = self.state.nodes.read();
        let resolved = Self::follow(&nodes, key(path));
        nodes
            .get(&resolved)
            .map(Node::info)
            .ok_or_else(|| RemoteError::NotFound.into())
    }

    async fn set_permissions(&self, path: &str, mode: Mode) -> Result<()> {
        self.record(RemoteCall::SetPermissions(path.to_string(), mode.bits()));
        let mut nodes = self.state.nodes.write();
        let resolved = Self::follow(&nodes, key(path));
        match nodes.get_mut(&resolved) {
            Some(Node::File { mode: current, .. }) | Some(Node::Dir { mode: current }) => {
                *current = mode.bits();
                Ok(())
            }
            Some(Node::Symlink { .. }) | None => Err(RemoteError::NotFound.into()),
        }
    }

    async fn make_dir(&self, path: &str) -> Result<()> {
        self.record(RemoteCall::MakeDir(path.to_string()));
        let key = key(path);
        let mut nodes = self.state.nodes.write();
        if nodes.contains_key(&key) {
            return Err(RemoteError::AlreadyExists.into());
        }
        let parent = parent(&key).ok_or(RemoteError::AlreadyExists)?;
        Self::require_dir(&nodes, parent)?;
        nodes.insert(key, Node::Dir { mode: 0o755 });
        Ok(())
    }

    async fn del_dir(&self, path: &str) -> Result<()> {
        self.record(RemoteCall::DelDir(path.to_string()));
        let key = key(path);
        if key == "/" {
            return Err(RemoteError::PermissionDenied.into());
        }
        let mut nodes = self.state.nodes.write();
        Self::require_dir(&nodes, &key)?;
        if nodes.keys().any(|k| parent(k) == Some(key.as_str()) && k != "/") {
            return Err(RemoteError::DirectoryNotEmpty.into());
        }
        nodes.remove(&key);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.record(RemoteCall::Delete(path.to_string()));
        let key = key(path);
        let mut nodes = self.state.nodes.write();
        match nodes.get(&key) {
            Some(Node::Dir { .. }) => Err(RemoteError::IsADirectory.into()),
            Some(_) => {
                nodes.remove(&key);
                Ok(())
            }
            None => Err(RemoteError::NotFound.into()),
        }
    }

    async fn read_file(&self, path: &str) -> Result<Bytes> {
        self.record(RemoteCall::ReadFile(path.to_string()));
        let nodes = self.state.nodes.read();
        let resolved = Self::follow(&nodes, key(path));
        match nodes.get(&resolved) {
            Some(Node::File { content, .. }) => Ok(content.clone()),
            Some(Node::Dir { .. }) => Err(RemoteError::IsADirectory.into()),
            _ => Err(RemoteError::NotFound.into()),
        }
    }

    async fn write_file(&self, path: &str, content: Bytes) -> Result<()> {
        self.record(RemoteCall::WriteFile(path.to_string()));
        let key = key(path);
        let mut nodes = self.state.nodes.write();
        let parent = parent(&key).ok_or(RemoteError::IsADirectory)?;
        Self::require_dir(&nodes, parent)?;

        let mode = match nodes.get(&key) {
            Some(Node::Dir { .. }) => return Err(RemoteError::IsADirectory.into()),
            Some(Node::File { mode, .. }) => *mode,
            _ => 0o644,
        };
        nodes.insert(key, Node::File { content, mode });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record(RemoteCall::Close);
        *self.state.closed.lock() = true;
        Ok(())
    }
}

/// Connector handing out sessions on a shared [`MemoryRemote`]
#[derive(Debug)]
pub struct MemoryConnector {
    remote: MemoryRemote,
    users: Option<Vec<(String, String)>>,
    refuse: bool,
    attempts: Mutex<Vec<Login>>,
}

impl MemoryConnector {
    /// Accepts any credentials
    pub fn new(remote: MemoryRemote) -> Self {
        Self {
            remote,
            users: None,
            refuse: false,
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Only accept the given user/password pairs
    pub fn with_users(mut self, users: Vec<(String, String)>) -> Self {
        self.users = Some(users);
        self
    }

    /// Fail every connection attempt as if the host were down
    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    pub fn remote(&self) -> &MemoryRemote {
        &self.remote
    }

    /// Logins passed to `connect`, accepted or not
    pub fn attempts(&self) -> Vec<Login> {
        self.attempts.lock().clone()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Session = MemoryRemote;

    async fn connect(&self, login: &Login) -> Result<MemoryRemote> {
        self.attempts.lock().push(login.clone());

        if self.refuse {
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Connection refused",
            )
            .into());
        }

        if let Some(ref users) = self.users {
            let accepted = users
                .iter()
                .any(|(u, p)| *u == login.username && *p == login.password);
            if !accepted {
                return Err(Error::Auth {
                    user: login.username.clone(),
                    host: login.addr(),
                });
            }
        }

        Ok(self.remote.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read_file() {
        let remote = MemoryRemote::new();
        let content = Bytes::from_static(b"hello world");

        remote.write_file("/test.txt", content.clone()).await.unwrap();
        let read = remote.read_file("/test.txt").await.unwrap();

        assert_eq!(read, content);
        assert_eq!(remote.mode("/test.txt"), Some(0o644));
    }

    #[tokio::test]
    async fn test_write_keeps_existing_mode() {
        let remote = MemoryRemote::new().with_file_mode("/run.sh", "old", 0o755);

        remote
            .write_file("/run.sh", Bytes::from_static(b"new"))
            .await
            .unwrap();

        assert_eq!(remote.file("/run.sh").unwrap(), Bytes::from_static(b"new"));
        assert_eq!(remote.mode("/run.sh"), Some(0o755));
    }

    #[tokio::test]
    async fn test_write_needs_parent() {
        let remote = MemoryRemote::new();
        let result = remote
            .write_file("/missing/a.txt", Bytes::from_static(b"a"))
            .await;
        assert!(matches!(result, Err(Error::Remote(RemoteError::NotFound))));
    }

    #[tokio::test]
    async fn test_list_dir_classifies_entries() {
        let remote = MemoryRemote::new()
            .with_file("/data/a.txt", "a")
            .with_file("/data/b.txt", "b")
            .with_dir("/data/sub")
            .with_file("/data/sub/nested.txt", "n")
            .with_symlink("/data/link", "/data/a.txt");

        let entries = remote.list_dir("/data").await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "link", "sub"]);

        let kinds: Vec<_> = entries.iter().map(|e| e.info.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EntryKind::File,
                EntryKind::File,
                EntryKind::Symlink,
                EntryKind::Directory
            ]
        );
    }

    #[tokio::test]
    async fn test_list_root() {
        let remote = MemoryRemote::new()
            .with_file("/file1.txt", "a")
            .with_dir("/home");

        let entries = remote.list_dir("/").await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["file1.txt", "home"]);
    }

    #[tokio::test]
    async fn test_make_dir_is_not_recursive() {
        let remote = MemoryRemote::new();

        let result = remote.make_dir("/a/b").await;
        assert!(matches!(result, Err(Error::Remote(RemoteError::NotFound))));

        remote.make_dir("/a").await.unwrap();
        remote.make_dir("/a/b").await.unwrap();
        assert!(remote.is_dir("/a/b"));

        let again = remote.make_dir("/a").await;
        assert!(matches!(again, Err(Error::Remote(RemoteError::AlreadyExists))));
    }

    #[tokio::test]
    async fn test_del_dir() {
        let remote = MemoryRemote::new().with_file("/full/x", "x").with_dir("/empty");

        let result = remote.del_dir("/full").await;
        assert!(matches!(
            result,
            Err(Error::Remote(RemoteError::DirectoryNotEmpty))
        ));

        remote.del_dir("/empty").await.unwrap();
        assert!(!remote.exists("/empty"));

        let file = remote.del_dir("/full/x").await;
        assert!(matches!(file, Err(Error::Remote(RemoteError::NotADirectory))));
    }

    #[tokio::test]
    async fn test_delete_file() {
        let remote = MemoryRemote::new().with_file("/test.txt", "data").with_dir("/d");

        remote.delete("/test.txt").await.unwrap();
        let result = remote.read_file("/test.txt").await;
        assert!(matches!(result, Err(Error::Remote(RemoteError::NotFound))));

        let dir = remote.delete("/d").await;
        assert!(matches!(dir, Err(Error::Remote(RemoteError::IsADirectory))));
    }

    #[tokio::test]
    async fn test_stat_and_set_permissions() {
        let remote = MemoryRemote::new().with_file("/test.txt", "12345");

        let info = remote.stat("/test.txt").await.unwrap();
        assert_eq!(info.kind, EntryKind::File);
        assert_eq!(info.size, Some(5));
        assert_eq!(info.permissions, Some(0o100644));

        remote
            .set_permissions("/test.txt", "600".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(remote.mode("/test.txt"), Some(0o600));

        let root = remote.stat("/").await.unwrap();
        assert_eq!(root.kind, EntryKind::Directory);
    }

    #[tokio::test]
    async fn test_calls_are_recorded() {
        let remote = MemoryRemote::new();
        let _ = remote.stat("/nope").await;
        remote.close().await.unwrap();

        assert_eq!(
            remote.calls(),
            vec![RemoteCall::Stat("/nope".into()), RemoteCall::Close]
        );
        assert!(remote.is_closed());
    }

    #[tokio::test]
    async fn test_connector_checks_users() {
        let connector = MemoryConnector::new(MemoryRemote::new())
            .with_users(vec![("user".into(), "pass".into())]);
        let mut login = Login {
            host: "localhost".into(),
            port: 22,
            username: "user".into(),
            password: "pass".into(),
        };

        assert!(connector.connect(&login).await.is_ok());

        login.password = "wrong".into();
        let result = connector.connect(&login).await;
        assert!(matches!(result, Err(Error::Auth { .. })));
        assert_eq!(connector.attempts().len(), 2);
    }
}
