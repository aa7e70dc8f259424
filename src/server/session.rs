//! The session module implements per-connection session state: who is
//! logged in, where they are, what was commanded last, and the handles to
//! the data side.

use crate::auth::UserDetail;
use crate::server::chancomms::{ControlChanMsg, DataCommand};
use crate::server::controlchan::sequence::CommandCode;
use crate::server::datachan::codec::CodecConfig;
use crate::server::datachan::transfer::TransferControl;
use crate::storage::StorageBackend;

use std::fmt::{self, Debug, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{Receiver, Sender};

// TraceId is an identifier used to correlate log statements of one session.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct TraceId(u64);

impl TraceId {
    pub fn new() -> Self {
        TraceId(rand::random())
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Where the session is in the USER/PASS/ACCT login sequence.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum SessionState {
    New,
    WaitPass,
    WaitAcct,
    WaitCmd,
}

// The session, shared between the control loop and the data loop via an
// asynchronous lock.
pub type SharedSession<S, U> = Arc<tokio::sync::Mutex<Session<S, U>>>;

// This is where we keep the state for one FTP session.
pub struct Session<Storage, User>
where
    Storage: StorageBackend<User>,
    User: UserDetail,
{
    pub trace_id: TraceId,
    pub source: SocketAddr,
    pub storage: Arc<Storage>,
    // Set once the login sequence completed.
    pub user: Arc<Option<User>>,
    // The username given with USER. None before that.
    pub username: Option<String>,
    // Holds the identity between a 332 reply and the ACCT that answers it.
    pub pending_user: Option<User>,
    pub state: SessionState,
    pub cwd: PathBuf,
    // The byte offset for the next RETR/STOR, set by REST. Consumed by
    // exactly one transfer and cleared by any non-transfer command.
    pub restart: Option<u64>,
    // After a RNFR command this holds the source path for the RNTO.
    pub rename_from: Option<PathBuf>,
    // The sequencing window: the command being executed and the one before
    // it. Admissibility of the next command is judged against `current`.
    pub current_command: CommandCode,
    pub previous_command: CommandCode,
    // A one-shot widening of the admissible set, e.g. RNFR arms RNTO.
    pub extra_next: Option<CommandCode>,
    // The MODE/TYPE/STRU settings the next data connection will use. A
    // fresh codec stack is built from this at every transfer.
    pub codec_config: CodecConfig,
    // The transfer-lifecycle state machine.
    pub transfer: TransferControl,
    // The control loop uses this to hand transfers to the data loop.
    pub data_cmd_tx: Option<Sender<DataCommand<Storage::File>>>,
    // Taken by the data loop when a data connection is established.
    pub data_cmd_rx: Option<Receiver<DataCommand<Storage::File>>>,
    // The control loop uses this to ask the data loop to stop.
    pub data_abort_tx: Option<Sender<()>>,
    // Taken by the data loop alongside data_cmd_rx.
    pub data_abort_rx: Option<Receiver<()>>,
    // True while a transfer runs; used for the single-transfer rule and to
    // suppress the control idle timeout.
    pub data_busy: bool,
    pub data_timeout: Duration,
    // The data loop reports outcomes to the control loop through this.
    pub control_msg_tx: Option<Sender<ControlChanMsg>>,
    // Message recorded when the service tears the session down.
    pub exit_error: Option<String>,
}

impl<Storage, User> Session<Storage, User>
where
    Storage: StorageBackend<User>,
    User: UserDetail,
{
    pub fn new(storage: Arc<Storage>, source: SocketAddr) -> Self {
        Session {
            trace_id: TraceId::new(),
            source,
            storage,
            user: Arc::new(None),
            username: None,
            pending_user: None,
            state: SessionState::New,
            cwd: "/".into(),
            restart: None,
            rename_from: None,
            current_command: CommandCode::Connection,
            previous_command: CommandCode::Connection,
            extra_next: None,
            codec_config: CodecConfig::default(),
            transfer: TransferControl::new(),
            data_cmd_tx: None,
            data_cmd_rx: None,
            data_abort_tx: None,
            data_abort_rx: None,
            data_busy: false,
            data_timeout: Duration::from_secs(300),
            control_msg_tx: None,
            exit_error: None,
        }
    }

    pub fn control_msg_tx(mut self, sender: Sender<ControlChanMsg>) -> Self {
        self.control_msg_tx = Some(sender);
        self
    }

    pub fn data_timeout(mut self, timeout: Duration) -> Self {
        self.data_timeout = timeout;
        self
    }

    /// Rotates the command window: the command that was current becomes
    /// previous, `code` becomes current.
    pub fn set_current_command(&mut self, code: CommandCode) {
        self.previous_command = self.current_command;
        self.current_command = code;
    }

    /// Rolls the window back after a rejected command: the previous command
    /// is restored as current and the restart marker is dropped.
    pub fn invalidate_current_command(&mut self) {
        self.current_command = self.previous_command;
        self.restart = None;
    }

    /// Installs a fresh pair of control-to-data channels. Called at
    /// PORT/PASV and again after every finished transfer, so each data
    /// connection gets its own.
    pub fn install_data_channels(&mut self) {
        let (cmd_tx, cmd_rx) = tokio::sync::mpsc::channel(1);
        let (abort_tx, abort_rx) = tokio::sync::mpsc::channel(1);
        self.data_cmd_tx = Some(cmd_tx);
        self.data_cmd_rx = Some(cmd_rx);
        self.data_abort_tx = Some(abort_tx);
        self.data_abort_rx = Some(abort_rx);
    }

    /// Drops every data-side handle and resets the transfer machine.
    /// Used by REIN and at control-loop teardown.
    pub fn reset_data_side(&mut self) {
        self.data_cmd_tx = None;
        self.data_cmd_rx = None;
        if let Some(abort) = self.data_abort_tx.take() {
            let _ = abort.try_send(());
        }
        self.data_abort_rx = None;
        self.data_busy = false;
        self.transfer = TransferControl::new();
    }

    /// Puts the session back in its freshly-connected state (REIN).
    pub fn reinitialize(&mut self) {
        self.user = Arc::new(None);
        self.username = None;
        self.pending_user = None;
        self.state = SessionState::New;
        self.cwd = "/".into();
        self.restart = None;
        self.rename_from = None;
        self.current_command = CommandCode::Connection;
        self.previous_command = CommandCode::Connection;
        self.extra_next = None;
        self.codec_config = CodecConfig::default();
        self.reset_data_side();
    }
}

impl<Storage, User> Debug for Session<Storage, User>
where
    Storage: StorageBackend<User>,
    User: UserDetail,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Session")
            .field("trace_id", &self.trace_id)
            .field("source", &self.source)
            .field("username", &self.username)
            .field("state", &self.state)
            .field("cwd", &self.cwd)
            .field("current_command", &self.current_command)
            .field("previous_command", &self.previous_command)
            .field("codec_config", &self.codec_config)
            .field("data_busy", &self.data_busy)
            .field("exit_error", &self.exit_error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mem::Mem;

    fn session() -> Session<Mem, crate::auth::DefaultUser> {
        Session::new(Arc::new(Mem::new()), "127.0.0.1:40000".parse().unwrap())
    }

    #[test]
    fn command_window_rotates() {
        let mut session = session();
        session.set_current_command(CommandCode::User);
        session.set_current_command(CommandCode::Pass);
        assert_eq!(session.previous_command, CommandCode::User);
        assert_eq!(session.current_command, CommandCode::Pass);
    }

    #[test]
    fn invalidate_restores_previous_and_clears_restart() {
        let mut session = session();
        session.set_current_command(CommandCode::Rest);
        session.restart = Some(100);
        session.set_current_command(CommandCode::Retr);
        session.invalidate_current_command();
        assert_eq!(session.current_command, CommandCode::Rest);
        assert_eq!(session.restart, None);
    }

    #[test]
    fn reinitialize_resets_everything() {
        let mut session = session();
        session.username = Some("ada".into());
        session.state = SessionState::WaitCmd;
        session.cwd = "/sub".into();
        session.restart = Some(7);
        session.reinitialize();
        assert_eq!(session.username, None);
        assert_eq!(session.state, SessionState::New);
        assert_eq!(session.cwd, PathBuf::from("/"));
        assert_eq!(session.restart, None);
        assert_eq!(session.current_command, CommandCode::Connection);
    }
}
