//! The RFC 959 Passive (`PASV`) command
//
// This command requests the server-DTP to "listen" on a data port and to
// wait for a connection rather than initiate one upon receipt of a
// transfer command. The response includes the host and port the server is
// listening on, in h1,h2,h3,h4,p1,p2 form.

use crate::{
    auth::UserDetail,
    server::{
        controlchan::{
            error::{ControlChanError, ControlChanErrorKind},
            handler::{CommandContext, CommandHandler},
            Reply, ReplyCode,
        },
        datachan,
        switchboard::SwitchboardKey,
    },
    storage::StorageBackend,
};

use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const BIND_RETRIES: u8 = 10;

#[derive(Debug)]
pub struct Pasv;

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Pasv
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        // The 227 reply format is IPv4-only.
        let conn_addr = match args.local_addr {
            SocketAddr::V4(addr) => addr,
            SocketAddr::V6(_) => {
                slog::error!(args.logger, "PASV on an IPv6 control connection is not supported");
                return Err(ControlChanErrorKind::InternalServerError.into());
            }
        };

        let source_ip = {
            let session = args.session.lock().await;
            session.source.ip()
        };

        // Pick a random port in the configured range, claim it in the
        // switchboard so inbound connections can be matched back to this
        // session, then try to actually bind it.
        let range = args.passive_ports.clone();
        let span = u32::from(range.end() - range.start()) + 1;
        let mut claimed: Option<(SwitchboardKey, TcpListener)> = None;
        for _ in 0..BIND_RETRIES {
            let port = range.start() + (rand::random::<u32>() % span) as u16;
            let key = SwitchboardKey::new(source_ip, port);
            if args.switchboard.claim(key, args.session.clone()).is_err() {
                continue;
            }
            match TcpListener::bind(SocketAddr::new(args.local_addr.ip(), port)).await {
                Ok(listener) => {
                    claimed = Some((key, listener));
                    break;
                }
                Err(_) => args.switchboard.release(&key),
            }
        }

        let (key, listener) = match claimed {
            Some(parts) => parts,
            None => return Ok(Reply::new(ReplyCode::CantOpenDataConnection, "No data connection established")),
        };
        let addr = listener.local_addr()?;

        let (cancel_tx, cancel_rx) = oneshot::channel();
        {
            let mut session = args.session.lock().await;
            session.install_data_channels();
            // Replacing the bind drops the previous cancel latch, which
            // stops the old acceptor and releases its switchboard claim.
            session.transfer.bound_passive(addr, cancel_tx);
        }
        datachan::spawn_passive_acceptor(args.logger.clone(), args.switchboard.clone(), key, listener, cancel_rx);

        let octets = conn_addr.ip().octets();
        let port = addr.port();
        let p1 = port >> 8;
        let p2 = port & 0xFF;
        Ok(Reply::new_with_string(
            ReplyCode::EnteringPassiveMode,
            format!(
                "Entering Passive Mode ({},{},{},{},{},{})",
                octets[0], octets[1], octets[2], octets[3], p1, p2
            ),
        ))
    }
}
