//! The per-connection control loop: reads command lines, runs them through
//! the middleware chain (logging, sequencing, authentication, execution)
//! and writes the replies, interleaved with status messages coming back
//! from the data side.

use crate::{
    auth::{Authenticator, UserDetail},
    server::{
        chancomms::ControlChanMsg,
        controlchan::{
            auth::AuthMiddleware,
            codecs::FtpCodec,
            command::Command,
            commands,
            error::{ControlChanError, ControlChanErrorKind},
            handler::{CommandContext, CommandHandler},
            log::LoggingMiddleware,
            middleware::ControlChanMiddleware,
            sequence::SequenceMiddleware,
            Event, Reply, ReplyCode,
        },
        session::SharedSession,
        shutdown,
        switchboard::Switchboard,
        Session,
    },
    storage::{ErrorKind, StorageBackend},
};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::{net::SocketAddr, ops::RangeInclusive, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{
        mpsc::{channel, Receiver, Sender},
        Mutex,
    },
};
use tokio_util::codec::Decoder;

/// Everything a control loop needs to serve one connection.
pub struct Config<Storage, User>
where
    Storage: StorageBackend<User>,
    User: UserDetail,
{
    pub storage: Arc<Storage>,
    pub greeting: &'static str,
    pub authenticator: Arc<dyn Authenticator<User>>,
    pub passive_ports: RangeInclusive<u16>,
    pub idle_session_timeout: Duration,
    pub data_transfer_timeout: Duration,
    pub logger: slog::Logger,
}

/// Starts processing for a freshly accepted control connection. Returns
/// after the greeting went out; the loop itself runs as its own task.
pub async fn spawn<Storage, User, Io>(
    config: Config<Storage, User>,
    io: Io,
    source: SocketAddr,
    local_addr: SocketAddr,
    switchboard: Arc<Switchboard<Storage, User>>,
    mut shutdown: shutdown::Listener,
) -> Result<(), ControlChanError>
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
    Io: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let Config {
        storage,
        greeting,
        authenticator,
        passive_ports,
        idle_session_timeout,
        data_transfer_timeout,
        logger,
    } = config;

    let (control_msg_tx, mut control_msg_rx): (Sender<ControlChanMsg>, Receiver<ControlChanMsg>) = channel(8);
    let session: Session<Storage, User> = Session::new(storage, source)
        .control_msg_tx(control_msg_tx.clone())
        .data_timeout(data_transfer_timeout);

    let logger = logger.new(slog::o!("trace-id" => format!("{}", session.trace_id), "source" => format!("{}", source)));
    let shared_session: SharedSession<Storage, User> = Arc::new(Mutex::new(session));

    let event_chain = PrimaryEventHandler {
        logger: logger.clone(),
        session: shared_session.clone(),
        authenticator,
        passive_ports,
        local_addr,
        switchboard,
        tx_control_chan: control_msg_tx,
    };
    let event_chain = AuthMiddleware {
        session: shared_session.clone(),
        next: event_chain,
    };
    let event_chain = SequenceMiddleware {
        session: shared_session.clone(),
        next: event_chain,
    };
    let mut event_chain = LoggingMiddleware {
        logger: logger.clone(),
        sequence_nr: 0,
        next: event_chain,
    };

    let codec = FtpCodec::new();
    let (mut reply_sink, mut command_source) = codec.framed(io).split();
    reply_sink.send(Reply::new(ReplyCode::ServiceReady, greeting)).await?;

    tokio::spawn(async move {
        slog::info!(logger, "Starting control loop");
        loop {
            let incoming = tokio::select! {
                next = command_source.next() => match next {
                    Some(outcome) => Some(outcome.map(Event::Command)),
                    None => {
                        slog::info!(logger, "Client closed the control connection");
                        teardown(&shared_session, None).await;
                        return;
                    }
                },
                Some(msg) = control_msg_rx.recv() => Some(Ok(Event::InternalMsg(msg))),
                _ = tokio::time::sleep(idle_session_timeout) => {
                    let busy = shared_session.lock().await.data_busy;
                    if busy {
                        // A running transfer keeps the session alive.
                        None
                    } else {
                        Some(Err(ControlChanError::new(ControlChanErrorKind::ControlChannelTimeout)))
                    }
                },
                _ = shutdown.listen() => {
                    slog::info!(logger, "Shutting down control loop");
                    let goodbye = "Service is going down: disconnect";
                    let _ = reply_sink.send(Reply::new(ReplyCode::ServiceNotAvailable, goodbye)).await;
                    teardown(&shared_session, Some(goodbye)).await;
                    return;
                }
            };

            match incoming {
                None => {}
                Some(Ok(Event::InternalMsg(ControlChanMsg::ExitControlLoop))) => {
                    slog::info!(logger, "Exiting control loop");
                    teardown(&shared_session, None).await;
                    return;
                }
                Some(Ok(event)) => match event_chain.handle(event).await {
                    Ok(reply) => {
                        let preliminary = reply.is_preliminary();
                        if reply_sink.send(reply).await.is_err() {
                            slog::warn!(logger, "Could not send reply to client");
                            teardown(&shared_session, None).await;
                            return;
                        }
                        if preliminary {
                            // The 150 is flushed; the data side may flow.
                            let mut session = shared_session.lock().await;
                            session.transfer.unlock_codecs();
                        }
                    }
                    Err(error) => {
                        let (reply, close_connection) = render_error(&logger, &error);
                        if reply_sink.send(reply).await.is_err() {
                            slog::warn!(logger, "Could not send error reply to client");
                            teardown(&shared_session, None).await;
                            return;
                        }
                        if close_connection {
                            teardown(&shared_session, None).await;
                            return;
                        }
                    }
                },
                Some(Err(error)) => {
                    let (reply, close_connection) = render_error(&logger, &error);
                    if reply_sink.send(reply).await.is_err() {
                        slog::warn!(logger, "Could not send error reply to client");
                        teardown(&shared_session, None).await;
                        return;
                    }
                    if close_connection {
                        teardown(&shared_session, None).await;
                        return;
                    }
                }
            }
        }
    });

    Ok(())
}

// Stops the data side and records why the session ended.
async fn teardown<Storage, User>(shared_session: &SharedSession<Storage, User>, exit_error: Option<&str>)
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    let mut session = shared_session.lock().await;
    if let Some(text) = exit_error {
        session.exit_error = Some(text.to_string());
    }
    session.transfer.shutdown();
    session.reset_data_side();
}

// Maps a control-channel error to the reply to send and tells whether the
// connection is beyond saving. Reply-bearing failures render their code;
// everything else is a 451 followed by teardown.
fn render_error(logger: &slog::Logger, error: &ControlChanError) -> (Reply, bool) {
    slog::warn!(logger, "Control channel error: {}", error);
    match error.kind() {
        ControlChanErrorKind::UnknownCommand { .. } => (Reply::new(ReplyCode::CommandSyntaxError, "Command not implemented"), false),
        ControlChanErrorKind::InvalidCommand => (Reply::new(ReplyCode::ParameterSyntaxError, "Invalid parameter"), false),
        ControlChanErrorKind::Utf8Error => (Reply::new(ReplyCode::CommandSyntaxError, "Invalid UTF-8 in command"), true),
        ControlChanErrorKind::ControlChannelTimeout => (
            Reply::new(ReplyCode::ServiceNotAvailable, "Session timed out. Closing control connection"),
            true,
        ),
        ControlChanErrorKind::IoError | ControlChanErrorKind::InternalServerError => {
            (Reply::new(ReplyCode::LocalError, "Internal server error, please try again later"), true)
        }
    }
}

struct PrimaryEventHandler<Storage, User>
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    logger: slog::Logger,
    session: SharedSession<Storage, User>,
    authenticator: Arc<dyn Authenticator<User>>,
    passive_ports: RangeInclusive<u16>,
    local_addr: SocketAddr,
    switchboard: Arc<Switchboard<Storage, User>>,
    tx_control_chan: Sender<ControlChanMsg>,
}

impl<Storage, User> PrimaryEventHandler<Storage, User>
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle_internal_msg(&self, msg: ControlChanMsg) -> Result<Reply, ControlChanError> {
        use ControlChanMsg::*;

        match msg {
            SentData { .. } => Ok(Reply::new(ReplyCode::ClosingDataConnection, "Closing data connection, transfer complete")),
            // The path matters here: STOU clients learn the server-chosen
            // name from this reply.
            WrittenData { path, .. } => Ok(Reply::new_with_string(
                ReplyCode::ClosingDataConnection,
                format!("File successfully written: {}", path),
            )),
            DirectorySuccessfullyListed => Ok(Reply::new(ReplyCode::ClosingDataConnection, "Listed the directory")),
            TransferAborted => Ok(Reply::new(ReplyCode::ClosingDataConnection, "Data channel closed")),
            ConnectionReset => Ok(Reply::new(ReplyCode::ConnectionClosed, "Data connection unexpectedly closed")),
            TransferTimeout => Ok(Reply::new(ReplyCode::ConnectionClosed, "Data connection timed out; transfer aborted")),
            CantOpenDataConnection => Ok(Reply::new(ReplyCode::CantOpenDataConnection, "Can't open data connection")),
            StorageError(error) => match error.kind() {
                ErrorKind::TransientFileNotAvailable => Ok(Reply::new(ReplyCode::TransientFileError, "File not available right now")),
                ErrorKind::PermanentFileNotAvailable => Ok(Reply::new(ReplyCode::FileError, "File not found")),
                ErrorKind::PermissionDenied => Ok(Reply::new(ReplyCode::FileError, "Permission denied")),
                ErrorKind::LocalError => Ok(Reply::new(ReplyCode::LocalError, "Local error")),
                ErrorKind::PageTypeUnknown => Ok(Reply::new(ReplyCode::PageTypeUnknown, "Page type unknown")),
                ErrorKind::InsufficientStorageSpaceError => Ok(Reply::new(ReplyCode::OutOfSpace, "Insufficient storage space")),
                ErrorKind::ExceededStorageAllocationError => Ok(Reply::new(ReplyCode::ExceededStorageAllocation, "Exceeded storage allocation")),
                ErrorKind::FileNameNotAllowedError => Ok(Reply::new(ReplyCode::BadFileName, "File name not allowed")),
            },
            CommandChannelReply(reply) => Ok(reply),
            // Caught in the loop before this handler runs.
            ExitControlLoop => Ok(Reply::new(ReplyCode::ClosingControlConnection, "Bye!")),
        }
    }

    async fn handle_command(&self, command: Command) -> Result<Reply, ControlChanError> {
        let args = CommandContext {
            parsed_command: command.clone(),
            session: self.session.clone(),
            authenticator: self.authenticator.clone(),
            passive_ports: self.passive_ports.clone(),
            local_addr: self.local_addr,
            switchboard: self.switchboard.clone(),
            tx_control_chan: self.tx_control_chan.clone(),
            logger: self.logger.clone(),
        };

        let handler: Box<dyn CommandHandler<Storage, User>> = match command {
            Command::User { username } => Box::new(commands::User::new(username)),
            Command::Pass { password } => Box::new(commands::Pass::new(password)),
            Command::Acct { account } => Box::new(commands::Acct::new(account)),
            Command::Syst => Box::new(commands::Syst),
            Command::Stat { path } => Box::new(commands::Stat::new(path)),
            Command::Type { type_ } => Box::new(commands::Type::new(type_)),
            Command::Stru { structure } => Box::new(commands::Stru::new(structure)),
            Command::Mode { mode } => Box::new(commands::Mode::new(mode)),
            Command::Help => Box::new(commands::Help),
            Command::Noop => Box::new(commands::Noop),
            Command::Pasv => Box::new(commands::Pasv),
            Command::Port { host, port } => Box::new(commands::Port::new(host, port)),
            Command::Retr { path } => Box::new(commands::Retr::new(path)),
            Command::Stor { path } => Box::new(commands::Stor::new(path)),
            Command::Stou => Box::new(commands::Stou),
            Command::Appe { path } => Box::new(commands::Appe::new(path)),
            Command::Allo { .. } => Box::new(commands::Allo),
            Command::Rest { offset } => Box::new(commands::Rest::new(offset)),
            Command::Rnfr { file } => Box::new(commands::Rnfr::new(file)),
            Command::Rnto { file } => Box::new(commands::Rnto::new(file)),
            Command::Abor => Box::new(commands::Abor),
            Command::Dele { path } => Box::new(commands::Dele::new(path)),
            Command::Rmd { path } => Box::new(commands::Rmd::new(path)),
            Command::Mkd { path } => Box::new(commands::Mkd::new(path)),
            Command::Pwd => Box::new(commands::Pwd),
            Command::Cwd { path } => Box::new(commands::Cwd::new(path)),
            Command::Cdup => Box::new(commands::Cdup),
            Command::List { path, .. } => Box::new(commands::List::new(path)),
            Command::Nlst { path } => Box::new(commands::Nlst::new(path)),
            Command::Site { .. } => Box::new(commands::Site),
            Command::Quit => Box::new(commands::Quit),
            Command::Rein => Box::new(commands::Rein),
            Command::Feat => Box::new(commands::Feat),
            Command::Opts { option } => Box::new(commands::Opts::new(option)),
            Command::Other { command_name, .. } => {
                return Err(ControlChanErrorKind::UnknownCommand { command: command_name }.into());
            }
        };

        handler.handle(args).await
    }
}

#[async_trait]
impl<Storage, User> ControlChanMiddleware for PrimaryEventHandler<Storage, User>
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    async fn handle(&mut self, event: Event) -> Result<Reply, ControlChanError> {
        match event {
            Event::Command(command) => self.handle_command(command).await,
            Event::InternalMsg(msg) => self.handle_internal_msg(msg).await,
        }
    }
}
