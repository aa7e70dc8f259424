//! Contains the engine itself: per-connection control-channel processing,
//! the data transfer controller with its codec pipeline, and the glue
//! between the two.

pub(crate) mod chancomms;
pub(crate) mod controlchan;
pub(crate) mod datachan;
pub(crate) mod ftpserver;
pub(crate) mod password;
pub(crate) mod session;
pub(crate) mod shutdown;
pub(crate) mod switchboard;

pub(crate) use chancomms::ControlChanMsg;
pub(crate) use controlchan::{Command, Event, Reply, ReplyCode};
pub(crate) use session::{Session, SessionState, SharedSession};
