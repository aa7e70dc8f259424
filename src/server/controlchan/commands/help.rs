//! The RFC 959 Help (`HELP`) command

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
pub struct Help;

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Help
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, _args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        let lines = vec![
            "The following commands are recognized:".to_string(),
            "USER PASS ACCT CWD  CDUP QUIT REIN PORT PASV TYPE".to_string(),
            "STRU MODE RETR STOR STOU APPE ALLO REST RNFR RNTO".to_string(),
            "ABOR DELE RMD  MKD  PWD  LIST NLST SITE SYST STAT".to_string(),
            "HELP NOOP FEAT OPTS".to_string(),
            "Help OK".to_string(),
        ];
        Ok(Reply::new_multiline(ReplyCode::HelpMessage, lines))
    }
}
