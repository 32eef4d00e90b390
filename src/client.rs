use crate::error::{Error, Result};
use crate::remote::{Connector, Login};
use crate::sftp::SftpRemote;
use crate::ssh_handler::ClientHandler;
use async_trait::async_trait;
use russh::client::{self, Config as SshConfig};
use russh_sftp::client::SftpSession;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Client configuration
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Limit on connecting, authenticating and starting the SFTP subsystem
    pub connect_timeout: Option<Duration>,
    /// Drop the connection after this long without traffic
    pub inactivity_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = Some(timeout);
        self
    }
}

/// Opens password-authenticated SFTP sessions over russh
#[derive(Debug, Clone, Default)]
pub struct SftpConnector {
    config: ClientConfig,
}

impl SftpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    async fn establish(&self, login: &Login) -> Result<SftpRemote> {
        let ssh_config = Arc::new(SshConfig {
            inactivity_timeout: self.config.inactivity_timeout,
            ..Default::default()
        });
        let handler = ClientHandler::new(login.addr());

        let mut handle =
            client::connect(ssh_config, (login.host.as_str(), login.port), handler).await?;
        debug!(addr = %login.addr(), "SSH transport established");

        let authenticated = handle
            .authenticate_password(&login.username, &login.password)
            .await?;
        if !authenticated {
            info!(user = %login.username, "Password authentication failed");
            return Err(Error::Auth {
                user: login.username.clone(),
                host: login.addr(),
            });
        }
        debug!(user = %login.username, "Password authentication successful");

        let channel = handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream()).await?;

        info!(addr = %login.addr(), "SFTP session ready");
        Ok(SftpRemote::new(handle, sftp))
    }
}

#[async_trait]
impl Connector for SftpConnector {
    type Session = SftpRemote;

    async fn connect(&self, login: &Login) -> Result<SftpRemote> {
        info!(addr = %login.addr(), user = %login.username, "Connecting");

        match self.config.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, self.establish(login))
                .await
                .map_err(|_| Error::Timeout {
                    addr: login.addr(),
                    timeout: limit,
                })?,
            None => self.establish(login).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new()
            .connect_timeout(Duration::from_secs(10))
            .inactivity_timeout(Duration::from_secs(60));

        assert_eq!(config.connect_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.inactivity_timeout, Some(Duration::from_secs(60)));
        assert_eq!(ClientConfig::default().connect_timeout, None);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop a listener so the port is known to be closed.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let connector = SftpConnector::new()
            .config(ClientConfig::new().connect_timeout(Duration::from_secs(5)));
        let login = Login {
            host: "127.0.0.1".into(),
            port,
            username: "user".into(),
            password: "pass".into(),
        };

        let result = connector.connect(&login).await;
        assert!(matches!(result, Err(Error::Ssh(_))));
    }

    #[tokio::test]
    async fn test_connect_timeout() {
        // A listener that never speaks SSH stalls the version exchange.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let connector = SftpConnector::new()
            .config(ClientConfig::new().connect_timeout(Duration::from_millis(200)));
        let login = Login {
            host: "127.0.0.1".into(),
            port,
            username: "user".into(),
            password: "pass".into(),
        };

        let result = connector.connect(&login).await;
        assert!(matches!(result, Err(Error::Timeout { .. })));
        drop(listener);
    }
}
