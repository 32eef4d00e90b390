use async_trait::async_trait;
use russh::keys::ssh_key::HashAlg;
use russh::keys::PublicKey;
use tracing::{debug, info};

/// Client-side SSH event handler for one connection
///
/// Host keys are accepted without verification; the key's fingerprint is
/// logged so it can be compared by hand.
pub struct ClientHandler {
    addr: String,
}

impl ClientHandler {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl russh::client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        info!(
            addr = %self.addr,
            key_type = ?server_public_key.algorithm(),
            fingerprint = %server_public_key.fingerprint(HashAlg::Sha256),
            "Server host key"
        );
        debug!(addr = %self.addr, "Accepting host key without verification");
        Ok(true)
    }
}
