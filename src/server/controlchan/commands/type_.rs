//! The RFC 959 Representation Type (`TYPE`) command
//
// The type applies to the data that flows over the data connection: ASCII
// and EBCDIC translate text conventions, IMAGE and LOCAL are transparent.

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

/// The parameter that can be given to the `TYPE` command.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TypeParam {
    /// Network ASCII: CRLF on the wire, the local convention on disk.
    Ascii,
    /// EBCDIC text, translated through a fixed codepage table.
    Ebcdic,
    /// Transparent bytes.
    Image,
    /// Local byte size; only the 8-bit flavour is supported.
    Local(u8),
}

#[derive(Debug)]
pub struct Type {
    type_: TypeParam,
}

impl Type {
    pub fn new(type_: TypeParam) -> Self {
        Type { type_ }
    }
}

#[async_trait]
impl<Storage, User> CommandHandler<Storage, User> for Type
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&self, args: CommandContext<Storage, User>) -> Result<Reply, ControlChanError> {
        if let TypeParam::Local(bits) = self.type_ {
            if bits != 8 {
                return Ok(Reply::new(
                    ReplyCode::CommandNotImplementedForParameter,
                    "Only LOCAL with logical byte size 8 is supported",
                ));
            }
        }
        let mut session = args.session.lock().await;
        session.codec_config.data_type = self.type_;
        let text = match self.type_ {
            TypeParam::Ascii => "Switching to ASCII type",
            TypeParam::Ebcdic => "Switching to EBCDIC type",
            TypeParam::Image => "Switching to binary (IMAGE) type",
            TypeParam::Local(_) => "Switching to LOCAL 8 type",
        };
        Ok(Reply::new(ReplyCode::CommandOkay, text))
    }
}
