//! Command-line flags and their resolution into a single [`Request`].

use crate::local::download_name;
use crate::mode::{Mode, ModeError};
use crate::remote::Login;
use clap::{ArgAction, ArgGroup, Parser};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sftpctl", version)]
#[command(about = "Run one SFTP operation against a remote server", long_about = None)]
#[command(disable_help_flag = true)]
#[command(group(ArgGroup::new("action").multiple(false)))]
pub struct Args {
    /// Upload FILE via SFTP (destination given by --remote)
    #[arg(short = 'u', long, value_name = "FILE", group = "action")]
    pub upload: Option<PathBuf>,

    /// Download file from REMOTE_PATH into the current directory
    #[arg(short = 'd', long, value_name = "REMOTE_PATH", group = "action")]
    pub download: Option<String>,

    /// Create directory on the SFTP server
    #[arg(short = 'm', long, value_name = "DIRECTORY_PATH", group = "action")]
    pub mkdir: Option<String>,

    /// Remove directory from the SFTP server
    #[arg(long, value_name = "DIRECTORY_PATH", group = "action")]
    pub rmdir: Option<String>,

    /// Remove file from the SFTP server
    #[arg(long, value_name = "FILE_PATH", group = "action")]
    pub rmfile: Option<String>,

    /// Query permissions of a file/directory on the SFTP server
    #[arg(short = 'q', long, value_name = "REMOTE_PATH", group = "action")]
    pub queryperm: Option<String>,

    /// Change permissions (octal, e.g. 755) of the path given by --remote
    #[arg(short = 'c', long, value_name = "PERMISSIONS", group = "action")]
    pub chmod: Option<String>,

    /// List files and directories at REMOTE_PATH
    #[arg(short = 'l', long, value_name = "REMOTE_PATH", group = "action")]
    pub list: Option<String>,

    /// SFTP host
    #[arg(short = 'h', long, value_name = "HOST")]
    pub host: Option<String>,

    /// SFTP username
    #[arg(short = 'U', long, value_name = "USERNAME")]
    pub username: Option<String>,

    /// SFTP password
    #[arg(short = 'p', long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Remote path on the SFTP server
    #[arg(short = 'r', long = "remote", value_name = "REMOTE_PATH")]
    pub remote: Option<String>,

    /// SSH port
    #[arg(short = 'P', long, default_value_t = 22)]
    pub port: u16,

    /// Give up connecting after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

/// The eight operations, in dispatch priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Upload,
    Download,
    MakeDir,
    RemoveDir,
    RemoveFile,
    QueryPermissions,
    ChangePermissions,
    List,
}

impl ActionKind {
    /// Used in "Please provide all the required options for ..."
    pub fn gerund(self) -> &'static str {
        match self {
            ActionKind::Upload => "uploading",
            ActionKind::Download => "downloading",
            ActionKind::MakeDir => "creating a directory",
            ActionKind::RemoveDir => "removing a directory",
            ActionKind::RemoveFile => "removing a file",
            ActionKind::QueryPermissions => "querying permissions",
            ActionKind::ChangePermissions => "changing permissions",
            ActionKind::List => "listing files and directories",
        }
    }

    /// Prefix of the message printed when the operation fails
    pub fn failure_prefix(self) -> &'static str {
        match self {
            ActionKind::Upload => "Error uploading file",
            ActionKind::Download => "Error downloading file",
            ActionKind::MakeDir => "Error creating directory",
            ActionKind::RemoveDir => "Error removing directory",
            ActionKind::RemoveFile => "Error removing file",
            ActionKind::QueryPermissions => "Error querying permissions",
            ActionKind::ChangePermissions => "Error changing permissions",
            ActionKind::List => "Error listing files and directories",
        }
    }
}

/// One operation with everything it needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Upload { local: PathBuf, remote: String },
    Download { remote: String, local: PathBuf },
    MakeDir { path: String },
    RemoveDir { path: String },
    RemoveFile { path: String },
    QueryPermissions { path: String },
    ChangePermissions { path: String, mode: Mode },
    List { path: String },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Upload { .. } => ActionKind::Upload,
            Action::Download { .. } => ActionKind::Download,
            Action::MakeDir { .. } => ActionKind::MakeDir,
            Action::RemoveDir { .. } => ActionKind::RemoveDir,
            Action::RemoveFile { .. } => ActionKind::RemoveFile,
            Action::QueryPermissions { .. } => ActionKind::QueryPermissions,
            Action::ChangePermissions { .. } => ActionKind::ChangePermissions,
            Action::List { .. } => ActionKind::List,
        }
    }
}

/// A fully validated invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub login: Login,
    pub action: Action,
}

/// Why no request could be built from the flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NoAction,
    MissingOptions(ActionKind),
    InvalidMode(ModeError),
    NoDownloadName(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NoAction => write!(f, "Usage: sftpctl [--help]"),
            Rejection::MissingOptions(kind) => write!(
                f,
                "Please provide all the required options for {}.",
                kind.gerund()
            ),
            Rejection::InvalidMode(e) => {
                write!(f, "{}: {}", ActionKind::ChangePermissions.failure_prefix(), e)
            }
            Rejection::NoDownloadName(remote) => write!(
                f,
                "{}: cannot derive a local file name from '{}'",
                ActionKind::Download.failure_prefix(),
                remote
            ),
        }
    }
}

/// Empty values count as absent
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl Args {
    /// The action flag that was given, if any
    pub fn action_kind(&self) -> Option<ActionKind> {
        let flags = [
            (self.upload.is_some(), ActionKind::Upload),
            (self.download.is_some(), ActionKind::Download),
            (self.mkdir.is_some(), ActionKind::MakeDir),
            (self.rmdir.is_some(), ActionKind::RemoveDir),
            (self.rmfile.is_some(), ActionKind::RemoveFile),
            (self.queryperm.is_some(), ActionKind::QueryPermissions),
            (self.chmod.is_some(), ActionKind::ChangePermissions),
            (self.list.is_some(), ActionKind::List),
        ];
        flags
            .into_iter()
            .find(|(given, _)| *given)
            .map(|(_, kind)| kind)
    }

    /// Check prerequisites and build the request, without touching the network
    pub fn into_request(self) -> Result<Request, Rejection> {
        let kind = self.action_kind().ok_or(Rejection::NoAction)?;
        let missing = || Rejection::MissingOptions(kind);

        let login = Login {
            host: present(self.host).ok_or_else(missing)?,
            port: self.port,
            username: present(self.username).ok_or_else(missing)?,
            password: present(self.password).ok_or_else(missing)?,
        };
        let remote = present(self.remote);

        let action = match kind {
            ActionKind::Upload => Action::Upload {
                local: self
                    .upload
                    .filter(|p| !p.as_os_str().is_empty())
                    .ok_or_else(missing)?,
                remote: remote.ok_or_else(missing)?,
            },
            ActionKind::Download => {
                let remote = present(self.download).ok_or_else(missing)?;
                let local = download_name(&remote)
                    .ok_or_else(|| Rejection::NoDownloadName(remote.clone()))?;
                Action::Download { remote, local }
            }
            ActionKind::MakeDir => Action::MakeDir {
                path: present(self.mkdir).ok_or_else(missing)?,
            },
            ActionKind::RemoveDir => Action::RemoveDir {
                path: present(self.rmdir).ok_or_else(missing)?,
            },
            ActionKind::RemoveFile => Action::RemoveFile {
                path: present(self.rmfile).ok_or_else(missing)?,
            },
            ActionKind::QueryPermissions => Action::QueryPermissions {
                path: present(self.queryperm).ok_or_else(missing)?,
            },
            ActionKind::ChangePermissions => {
                let permissions = present(self.chmod).ok_or_else(missing)?;
                let path = remote.ok_or_else(missing)?;
                let mode = permissions.parse().map_err(Rejection::InvalidMode)?;
                Action::ChangePermissions { path, mode }
            }
            ActionKind::List => Action::List {
                path: present(self.list).ok_or_else(missing)?,
            },
        };

        Ok(Request { login, action })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    const CREDS: [&str; 6] = ["-h", "sftp.example.com", "-U", "alice", "-p", "secret"];

    fn parse(extra: &[&str]) -> Args {
        let argv = std::iter::once("sftpctl")
            .chain(CREDS.iter().copied())
            .chain(extra.iter().copied());
        Args::try_parse_from(argv).unwrap()
    }

    fn resolve(extra: &[&str]) -> Result<Request, Rejection> {
        parse(extra).into_request()
    }

    #[test]
    fn test_upload() {
        let request = resolve(&["-u", "local.txt", "-r", "/srv/upload.txt"]).unwrap();
        assert_eq!(request.login.host, "sftp.example.com");
        assert_eq!(request.login.port, 22);
        assert_eq!(request.login.username, "alice");
        assert_eq!(request.login.password, "secret");
        assert_eq!(
            request.action,
            Action::Upload {
                local: PathBuf::from("local.txt"),
                remote: "/srv/upload.txt".into(),
            }
        );
    }

    #[test]
    fn test_upload_needs_remote() {
        assert_eq!(
            resolve(&["-u", "local.txt"]),
            Err(Rejection::MissingOptions(ActionKind::Upload))
        );
    }

    #[test]
    fn test_download_derives_local_name() {
        let request = resolve(&["-d", "/home/user/report.pdf"]).unwrap();
        assert_eq!(
            request.action,
            Action::Download {
                remote: "/home/user/report.pdf".into(),
                local: PathBuf::from("report.pdf"),
            }
        );
    }

    #[test]
    fn test_download_without_name() {
        let rejection = resolve(&["--download", "/"]).unwrap_err();
        assert_eq!(rejection, Rejection::NoDownloadName("/".into()));
        assert_eq!(
            rejection.to_string(),
            "Error downloading file: cannot derive a local file name from '/'"
        );
    }

    #[test]
    fn test_path_actions() {
        let cases: [(&[&str], Action); 5] = [
            (&["-m", "/new"][..], Action::MakeDir { path: "/new".into() }),
            (&["--rmdir", "/old"][..], Action::RemoveDir { path: "/old".into() }),
            (&["--rmfile", "/f"][..], Action::RemoveFile { path: "/f".into() }),
            (&["-q", "/q"][..], Action::QueryPermissions { path: "/q".into() }),
            (&["-l", "/srv"][..], Action::List { path: "/srv".into() }),
        ];
        for (flags, expected) in cases {
            assert_eq!(resolve(flags).unwrap().action, expected);
        }
    }

    #[test]
    fn test_chmod() {
        let request = resolve(&["-c", "755", "-r", "/srv/run.sh"]).unwrap();
        match request.action {
            Action::ChangePermissions { path, mode } => {
                assert_eq!(path, "/srv/run.sh");
                assert_eq!(mode.bits(), 493);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_chmod_needs_remote() {
        assert_eq!(
            resolve(&["-c", "755"]),
            Err(Rejection::MissingOptions(ActionKind::ChangePermissions))
        );
    }

    #[test]
    fn test_chmod_rejects_bad_mode() {
        let rejection = resolve(&["--chmod", "rwx", "-r", "/f"]).unwrap_err();
        assert!(matches!(rejection, Rejection::InvalidMode(_)));
        assert_eq!(
            rejection.to_string(),
            "Error changing permissions: invalid octal digit 'r' in permission string 'rwx'"
        );
    }

    #[test]
    fn test_missing_credentials() {
        let args = Args::try_parse_from(["sftpctl", "-l", "/srv", "-h", "host", "-U", "bob"]).unwrap();
        let rejection = args.into_request().unwrap_err();
        assert_eq!(rejection, Rejection::MissingOptions(ActionKind::List));
        assert_eq!(
            rejection.to_string(),
            "Please provide all the required options for listing files and directories."
        );
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        assert_eq!(
            resolve(&["-m", ""]),
            Err(Rejection::MissingOptions(ActionKind::MakeDir))
        );
    }

    #[test]
    fn test_no_action() {
        let args = Args::try_parse_from(["sftpctl", "-h", "host"]).unwrap();
        let rejection = args.into_request().unwrap_err();
        assert_eq!(rejection, Rejection::NoAction);
        assert_eq!(rejection.to_string(), "Usage: sftpctl [--help]");
    }

    #[test]
    fn test_two_actions_conflict() {
        let err = Args::try_parse_from(["sftpctl", "-l", "/a", "-m", "/b"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_unknown_flag() {
        let err = Args::try_parse_from(["sftpctl", "--frobnicate"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_help_is_long_only() {
        let err = Args::try_parse_from(["sftpctl", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_port_and_timeout() {
        let args = parse(&["-l", "/", "-P", "2222", "--timeout", "5"]);
        assert_eq!(args.timeout, Some(5));
        assert_eq!(args.into_request().unwrap().login.port, 2222);
    }

    #[test]
    fn test_missing_options_messages() {
        let expected = [
            (ActionKind::Upload, "uploading"),
            (ActionKind::Download, "downloading"),
            (ActionKind::MakeDir, "creating a directory"),
            (ActionKind::RemoveDir, "removing a directory"),
            (ActionKind::RemoveFile, "removing a file"),
            (ActionKind::QueryPermissions, "querying permissions"),
            (ActionKind::ChangePermissions, "changing permissions"),
            (ActionKind::List, "listing files and directories"),
        ];
        for (kind, gerund) in expected {
            assert_eq!(
                Rejection::MissingOptions(kind).to_string(),
                format!("Please provide all the required options for {}.", gerund)
            );
        }
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
