//! The RFC 959 Abort (`ABOR`) command
//
// This command tells the server to abort the previous FTP service command
// and any associated transfer of data. No action is taken if the previous
// command has completed. The control connection stays open; the data
// connection must be closed.

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

#[derive(Debug)]
pub struct Abor;

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Abor
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        if session.transfer.in_progress() {
            // 426 now; the data loop closes the channel and reports back,
            // which renders the trailing 226.
            session.transfer.set_transfer_aborted();
            if let Some(abort) = &session.data_abort_tx {
                let _ = abort.try_send(());
            }
            Ok(Reply::new(ReplyCode::ConnectionClosed, "Connection closed; transfer aborted"))
        } else {
            // Nothing in flight; close an idle data channel if one is open.
            if let Some(abort) = &session.data_abort_tx {
                let _ = abort.try_send(());
            }
            Ok(Reply::new(ReplyCode::ClosingDataConnection, "No transfer to abort"))
        }
    }
}
