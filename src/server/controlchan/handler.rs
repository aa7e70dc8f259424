use crate::{
    auth::{Authenticator, UserDetail},
    server::{
        controlchan::{command::Command, error::ControlChanError, Reply},
        session::SharedSession,
        switchboard::Switchboard,
        ControlChanMsg,
    },
    storage::StorageBackend,
};

use async_trait::async_trait;
use std::{net::SocketAddr, ops::RangeInclusive, sync::Arc};
use tokio::sync::mpsc::Sender;

// Common interface for all handlers of `Command`s
#[async_trait]
pub(crate) trait CommandHandler<Storage, User>: Send + Sync + std::fmt::Debug
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError>;
}

/// Represents arguments passed to a `CommandHandler`
pub(crate) struct CommandContext<Storage, User>
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    pub parsed_command: Command,
    pub session: SharedSession<Storage, User>,
    pub authenticator: Arc<dyn Authenticator<User>>,
    pub passive_ports: RangeInclusive<u16>,
    pub local_addr: SocketAddr,
    pub switchboard: Arc<Switchboard<Storage, User>>,
    pub tx_control_chan: Sender<ControlChanMsg>,
    pub logger: slog::Logger,
}

impl<Storage, User> std::fmt::Debug for CommandContext<Storage, User>
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("parsed_command", &self.parsed_command)
            .field("local_addr", &self.local_addr)
            .field("passive_ports", &self.passive_ports)
            .finish()
    }
}
