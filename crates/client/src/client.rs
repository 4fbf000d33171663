//! Client and session lifecycle

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use workdesk_core::catalog::{self, LoginOutcome, ResponseShape};
use workdesk_core::marshal::{self, FromFields};
use workdesk_core::{ClientConfig, Command, CommandGate, Connection, CoreError, LineCodec, Record, Result, User};

/// Authenticated user plus the gate their commands go through
///
/// Both halves exist together or not at all.
struct Session {
    user: User,
    gate: CommandGate,
}

/// Owned client for the Workdesk data server
pub struct Client {
    config: ClientConfig,
    codec: LineCodec,
    session: RwLock<Option<Arc<Session>>>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        let codec = LineCodec::new(config.tokens.clone());
        Self {
            config,
            codec,
            session: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connect and authenticate, establishing the session
    ///
    /// On rejection the connection is closed and the client stays logged
    /// out; the error carries the server's message. The handshake runs
    /// without holding the session slot, so the accessors answer while a
    /// login is pending. Of two concurrent logins, the later one to finish
    /// closes its connection and fails with `AlreadyConnected`.
    pub async fn login(&self, user: &str, password: &str) -> Result<User> {
        if self.session.read().await.is_some() {
            return Err(CoreError::AlreadyConnected);
        }

        self.config.validate()?;
        let spec = catalog::require(catalog::LOGIN)?;
        let cmd = self.build(spec, [user, password])?;

        info!("Connecting to {}:{}", self.config.host, self.config.port);
        let conn = Connection::connect(self.config.host.clone(), self.config.port)
            .await?
            .with_max_line_bytes(self.config.max_line_bytes);
        let gate = CommandGate::new(conn, self.codec.clone()).with_timeout(self.config.command_timeout());

        let outcome = match gate.execute(&cmd).await {
            Ok(block) => catalog::decode_login(&block, &self.codec),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(LoginOutcome::Accepted(session_user)) => {
                let mut slot = self.session.write().await;
                if slot.is_some() {
                    drop(slot);
                    warn!("Another login finished first; dropping this connection");
                    gate.close().await;
                    return Err(CoreError::AlreadyConnected);
                }
                info!("Logged in as {} ({})", session_user.name, session_user.role);
                *slot = Some(Arc::new(Session {
                    user: session_user.clone(),
                    gate,
                }));
                Ok(session_user)
            }
            Ok(LoginOutcome::Rejected(message)) => {
                warn!("Login rejected: {}", message);
                gate.close().await;
                Err(CoreError::AuthFailed { message })
            }
            Err(e) => {
                gate.close().await;
                Err(e)
            }
        }
    }

    /// End the session, closing its connection
    ///
    /// Waits for an in-flight command to finish first. Logging out while
    /// logged out does nothing.
    pub async fn logout(&self) {
        let session = self.session.write().await.take();
        if let Some(session) = session {
            session.gate.close().await;
            info!("Logged out {}", session.user.name);
        }
    }

    /// Run a catalog command by name and decode its response
    ///
    /// Mutation commands return no records. `LOGIN` is refused here; use
    /// [`Client::login`].
    pub async fn execute<I, S>(&self, name: &str, args: I) -> Result<Vec<Record>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spec = catalog::require(name)?;
        if spec.response == ResponseShape::Login {
            return Err(CoreError::InvalidArgument(format!("{} is only sent by login", name)));
        }
        let cmd = self.build(spec, args)?;
        let session = self.session().await?;
        let block = session.gate.execute(&cmd).await?;
        spec.decode(&block, &self.codec)
    }

    /// Run a record command, decoding rows straight into `T`
    pub(crate) async fn query<T, I, S>(&self, name: &str, args: I) -> Result<Vec<T>>
    where
        T: FromFields,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spec = catalog::require(name)?;
        if spec.response != ResponseShape::Records(T::KIND) {
            return Err(CoreError::InvalidArgument(format!("{} does not return {} rows", name, T::KIND)));
        }
        let cmd = self.build(spec, args)?;
        let session = self.session().await?;
        let block = session.gate.execute(&cmd).await?;
        Ok(marshal::decode_rows(&self.codec.rows(&block)))
    }

    /// The logged-in user, if any
    pub async fn current_user(&self) -> Option<User> {
        self.session.read().await.as_ref().map(|s| s.user.clone())
    }

    /// True while logged in
    ///
    /// Stays true after a transport failure until [`Client::logout`].
    pub async fn is_logged_in(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// True while logged in over a connection that is still open
    pub async fn is_connected(&self) -> bool {
        match self.session.read().await.as_ref() {
            Some(session) => session.gate.is_connected(),
            None => false,
        }
    }

    async fn session(&self) -> Result<Arc<Session>> {
        self.session.read().await.clone().ok_or(CoreError::NotConnected)
    }

    fn build<I, S>(&self, spec: &catalog::CommandSpec, args: I) -> Result<Command>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cmd = if self.config.reject_unsafe_arguments {
            spec.build_strict(args, &self.codec)?
        } else {
            spec.build(args)?
        };
        debug!("Built {} with {} args", cmd.name(), cmd.args().len());
        Ok(cmd)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_requires_login() {
        let client = Client::new(ClientConfig::default());
        let err = client.execute(catalog::ALL_USERS, Vec::<String>::new()).await.unwrap_err();
        assert!(matches!(err, CoreError::NotConnected));
        assert!(!client.is_logged_in().await);
        assert!(!client.is_connected().await);
        assert!(client.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_execute_validates_before_touching_session() {
        let client = Client::new(ClientConfig::default());
        assert!(matches!(
            client.execute("NOPE", Vec::<String>::new()).await,
            Err(CoreError::UnknownCommand(_))
        ));
        assert!(matches!(
            client.execute(catalog::MY_TASKS, Vec::<String>::new()).await,
            Err(CoreError::ArgumentCount { expected: 1, got: 0, .. })
        ));
        assert!(matches!(
            client.execute(catalog::LOGIN, ["a", "b"]).await,
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_login_unreachable_server() {
        // Port 0 is rejected before any socket is opened
        let client = Client::new(ClientConfig::with_server("127.0.0.1", 0));
        let err = client.login("alice", "secret").await.unwrap_err();
        assert!(err.is_transport_failure());
        assert!(!client.is_logged_in().await);
    }

    #[tokio::test]
    async fn test_logout_when_logged_out_is_noop() {
        let client = Client::new(ClientConfig::default());
        client.logout().await;
        assert!(!client.is_logged_in().await);
    }
}
