//! The RFC 959 Data Port (`PORT`) command
//
// The client advertises the endpoint it is listening on; the server
// connects out to it when the next transfer verb arrives.

use crate::{
    auth::UserDetail,
    server::controlchan::{
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
        Reply, ReplyCode,
    },
    storage::StorageBackend,
};

use async_trait::async_trait;
use std::net::{Ipv4Addr, SocketAddrV4};

#[derive(Debug)]
pub struct Port {
    host: Ipv4Addr,
    port: u16,
}

impl Port {
    pub fn new(host: Ipv4Addr, port: u16) -> Self {
        Port { host, port }
    }
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Port
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        if session.source.ip() != std::net::IpAddr::V4(self.host) {
            slog::warn!(
                args.logger,
                "PORT endpoint {} differs from control source {}",
                self.host,
                session.source
            );
        }
        session.install_data_channels();
        session.transfer.set_active_target(SocketAddrV4::new(self.host, self.port));
        Ok(Reply::new(ReplyCode::CommandOkay, "PORT command successful"))
    }
}
