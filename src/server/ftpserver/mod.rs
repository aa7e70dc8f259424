//! Contains the [`Server`] type: the builder-style front that binds the
//! control port, accepts connections and hands each one to a control loop.

use crate::auth::{AnonymousAuthenticator, Authenticator, DefaultUser, UserDetail};
use crate::server::controlchan::control_loop::{self, Config};
use crate::server::shutdown;
use crate::server::switchboard::Switchboard;
use crate::storage::StorageBackend;

use std::future::Future;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// An FTP server, driven by the engine in this crate and pluggable
/// [`Authenticator`] and [`StorageBackend`] collaborators.
///
/// Construct with [`Server::new`] (anonymous logins) or
/// [`Server::with_authenticator`], chain the options you need and call
/// [`Server::listen`].
pub struct Server<Storage, User = DefaultUser>
where
    Storage: StorageBackend<User>,
    User: UserDetail,
{
    storage: Arc<Storage>,
    greeting: &'static str,
    authenticator: Arc<dyn Authenticator<User>>,
    passive_ports: RangeInclusive<u16>,
    idle_session_timeout: Duration,
    data_transfer_timeout: Duration,
    logger: slog::Logger,
    shutdown: Arc<shutdown::Notifier>,
}

impl<Storage> Server<Storage, DefaultUser>
where
    Storage: StorageBackend<DefaultUser> + 'static,
{
    /// Creates a server that accepts any login (anonymous mode).
    pub fn new(storage: Arc<Storage>) -> Self {
        Server::with_authenticator(storage, Arc::new(AnonymousAuthenticator))
    }
}

impl<Storage, User> Server<Storage, User>
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    /// Creates a server with the given authentication backend.
    pub fn with_authenticator(storage: Arc<Storage>, authenticator: Arc<dyn Authenticator<User>>) -> Self {
        Server {
            storage,
            greeting: "Welcome to the ftpcore FTP server",
            authenticator,
            passive_ports: 49152..=65535,
            idle_session_timeout: Duration::from_secs(600),
            data_transfer_timeout: Duration::from_secs(300),
            logger: slog::Logger::root(slog::Discard, slog::o!()),
            shutdown: Arc::new(shutdown::Notifier::new()),
        }
    }

    /// Sets the greeting sent in the 220 welcome.
    pub fn greeting(mut self, greeting: &'static str) -> Self {
        self.greeting = greeting;
        self
    }

    /// Sets the port range 227 replies advertise and passive binds use.
    pub fn passive_ports(mut self, passive_ports: RangeInclusive<u16>) -> Self {
        self.passive_ports = passive_ports;
        self
    }

    /// Sets how long a session may sit idle before it is disconnected
    /// with 421.
    pub fn idle_session_timeout(mut self, timeout: Duration) -> Self {
        self.idle_session_timeout = timeout;
        self
    }

    /// Sets the inactivity window after which a transfer is aborted.
    pub fn data_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.data_transfer_timeout = timeout;
        self
    }

    /// Sets the root logger; per-session children carry trace-id and
    /// source address.
    pub fn logger(mut self, logger: slog::Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Starts a graceful shutdown once the given future resolves: new
    /// connections stop being accepted and every session gets a 421.
    pub fn shutdown_indicator<F>(self, indicator: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let notifier = Arc::clone(&self.shutdown);
        tokio::spawn(async move {
            indicator.await;
            notifier.notify();
        });
        self
    }

    /// Binds the control port and serves until shutdown is signalled.
    pub async fn listen(self, bind_address: &str) -> std::io::Result<()> {
        let listener = TcpListener::bind(bind_address).await?;
        slog::info!(self.logger, "Listening on {}", listener.local_addr()?);
        let switchboard: Arc<Switchboard<Storage, User>> = Arc::new(Switchboard::new());
        let mut shutdown_listener = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_listener.listen() => {
                    slog::info!(self.logger, "Stopped accepting connections; shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (socket, source) = accepted?;
                    let local_addr = socket.local_addr()?;
                    let config = Config {
                        storage: Arc::clone(&self.storage),
                        greeting: self.greeting,
                        authenticator: Arc::clone(&self.authenticator),
                        passive_ports: self.passive_ports.clone(),
                        idle_session_timeout: self.idle_session_timeout,
                        data_transfer_timeout: self.data_transfer_timeout,
                        logger: self.logger.clone(),
                    };
                    let result = control_loop::spawn(
                        config,
                        socket,
                        source,
                        local_addr,
                        Arc::clone(&switchboard),
                        self.shutdown.subscribe(),
                    )
                    .await;
                    if let Err(error) = result {
                        slog::error!(self.logger, "Could not start control loop for {}: {}", source, error);
                    }
                }
            }
        }
    }
}
