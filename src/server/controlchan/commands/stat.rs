//! The RFC 959 Status (`STAT`) command
//
// Without an argument: the state of the session, over the control
// channel. With a path: a listing, also over the control channel, so it
// works mid-transfer.

use super::storage_error_reply;
use crate::{
    auth::UserDetail,
    server::controlchan::{
        commands::{ModeParam, StruParam, TypeParam},
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
        Reply, ReplyCode,
    },
    storage::StorageBackend,
};

use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug)]
pub struct Stat {
    path: Option<String>,
}

impl Stat {
    pub fn new(path: Option<String>) -> Self {
        Stat { path }
    }
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Stat
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        match &self.path {
            None => {
                let session = args.session.lock().await;
                let type_ = match session.codec_config.data_type {
                    TypeParam::Ascii => "ASCII",
                    TypeParam::Ebcdic => "EBCDIC",
                    TypeParam::Image => "IMAGE",
                    TypeParam::Local(_) => "LOCAL 8",
                };
                let mode = match session.codec_config.mode {
                    ModeParam::Stream => "Stream",
                    ModeParam::Block => "Block",
                    ModeParam::Compressed => "Compressed",
                };
                let structure = match session.codec_config.structure {
                    StruParam::File => "File",
                    StruParam::Record => "Record",
                    StruParam::Page => "Page",
                };
                let lines = vec![
                    format!("Connected from {}", session.source),
                    match &session.username {
                        Some(username) => format!("Logged in as {}", username),
                        None => String::from("Not logged in"),
                    },
                    format!("TYPE: {}, MODE: {}, STRU: {}", type_, mode, structure),
                    format!("Data side: {:?}", session.transfer.state()),
                    String::from("End of status"),
                ];
                Ok(Reply::new_multiline(ReplyCode::SystemStatus, lines))
            }
            Some(path) => {
                let (storage, user, full_path) = {
                    let session = args.session.lock().await;
                    (Arc::clone(&session.storage), session.user.clone(), session.cwd.join(path))
                };
                match storage.list(&user, &full_path).await {
                    Ok(mut lines) => {
                        lines.insert(0, format!("Status of {}:", path));
                        lines.push(String::from("End of status"));
                        Ok(Reply::new_multiline(ReplyCode::FileStatus, lines))
                    }
                    Err(err) => Ok(storage_error_reply(&err)),
                }
            }
        }
    }
}
