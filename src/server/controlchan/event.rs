use super::command::Command;
use crate::server::chancomms::ControlChanMsg;

/// An `Event` for the per-client event loop: either a command from the
/// client, or a status message from the data channel loop.
#[derive(Debug)]
pub enum Event {
    /// A command from a client (e.g. `USER` or `PASV`)
    Command(Command),
    /// A status message from the data channel loop
    InternalMsg(ControlChanMsg),
}
