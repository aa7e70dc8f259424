//! Contains the code pertaining to the FTP *data* channel: the per-session
//! data loop, the transfer executor pumping [`DataBlock`]s through the
//! codec pipeline, the passive acceptor and the active connector.

pub(crate) mod codec;
pub(crate) mod transfer;

use crate::auth::UserDetail;
use crate::server::chancomms::{ControlChanMsg, DataChanCmd, DataCommand};
use crate::server::session::SharedSession;
use crate::server::switchboard::{Switchboard, SwitchboardKey};
use crate::storage::{DataBlock, FtpFile, StorageBackend};
use codec::DataCodec;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::oneshot;
use tokio_util::codec::Framed;

// How much we ask the storage backend for per block on the way out.
const READ_CHUNK: usize = 16 * 1024;

// Why a transfer stopped before completing.
enum TransferFault {
    // ABOR or session teardown.
    Aborted,
    // No progress within the configured window.
    Timeout,
    // The channel itself broke or the peer sent garbage framing.
    Reset,
    // The storage collaborator failed.
    Storage(crate::storage::Error),
}

/// Takes ownership of a freshly established data connection and runs the
/// data loop for it: wait for the transfer command from the control side,
/// execute it, tear down, re-arm the session for the next connection.
pub(super) async fn spawn_processing<Storage, User>(logger: slog::Logger, session_arc: SharedSession<Storage, User>, socket: TcpStream)
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    let mut socket = socket;
    let grabbed = {
        let mut session = session_arc.lock().await;
        let username = session.username.clone().unwrap_or_else(|| String::from("unknown"));
        let logger = logger.new(slog::o!("username" => username));
        match (session.control_msg_tx.clone(), session.data_cmd_rx.take(), session.data_abort_rx.take()) {
            (Some(tx), Some(cmd_rx), Some(abort_rx)) => {
                session.transfer.set_opened_data_channel();
                Some((logger, tx, cmd_rx, abort_rx, session.data_timeout))
            }
            _ => {
                slog::warn!(logger, "Data loop plumbing missing; closing surplus data connection");
                None
            }
        }
    };
    let (logger, control_msg_tx, cmd_rx, abort_rx, timeout) = match grabbed {
        Some(parts) => parts,
        None => {
            let _ = socket.shutdown().await;
            return;
        }
    };
    tokio::spawn(data_loop(logger, session_arc, socket, cmd_rx, abort_rx, control_msg_tx, timeout));
}

async fn data_loop<Storage, User>(
    logger: slog::Logger,
    session_arc: SharedSession<Storage, User>,
    mut socket: TcpStream,
    mut cmd_rx: Receiver<DataCommand<Storage::File>>,
    mut abort_rx: Receiver<()>,
    control_msg_tx: Sender<ControlChanMsg>,
    timeout: Duration,
) where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    tokio::select! {
        command = cmd_rx.recv() => match command {
            Some(command) => {
                execute(&logger, &session_arc, socket, command, &mut abort_rx, &control_msg_tx, timeout).await;
                return;
            }
            None => {
                let _ = socket.shutdown().await;
            }
        },
        _ = abort_rx.recv() => {
            slog::info!(logger, "Data channel closed before a transfer was commanded");
            let _ = socket.shutdown().await;
        }
        _ = tokio::time::sleep(timeout) => {
            slog::warn!(logger, "Data channel timed out waiting for a transfer command");
            let _ = socket.shutdown().await;
        }
    }

    rearm(&session_arc).await;
}

// Puts the session back in shape for the next data connection. Must happen
// before the outcome message: the client acts on the completion reply, and
// by then the fresh channels have to be in place.
async fn rearm<Storage, User>(session_arc: &SharedSession<Storage, User>)
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    let mut session = session_arc.lock().await;
    session.data_busy = false;
    session.transfer.set_closed_data_channel();
    session.install_data_channels();
}

async fn execute<Storage, User>(
    logger: &slog::Logger,
    session_arc: &SharedSession<Storage, User>,
    mut socket: TcpStream,
    command: DataCommand<Storage::File>,
    abort_rx: &mut Receiver<()>,
    control_msg_tx: &Sender<ControlChanMsg>,
    timeout: Duration,
) where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    let DataCommand { cmd, codec_config, start } = command;

    // The barrier ordering the 150 reply before the first data byte: the
    // control loop fires this after flushing the reply. A dropped latch
    // means the transfer was cancelled before it started.
    if start.await.is_err() {
        slog::info!(logger, "Transfer start latch dropped; closing data channel");
        let _ = socket.shutdown().await;
        rearm(session_arc).await;
        return;
    }

    {
        let mut session = session_arc.lock().await;
        session.transfer.set_transferring();
    }
    slog::debug!(logger, "Data channel command received"; "path" => cmd.path().unwrap_or("-"));

    let mut pipeline = DataCodec::new(codec_config);
    pipeline.set_ready();
    let mut framed = Framed::new(socket, pipeline);

    let msg = match cmd {
        DataChanCmd::Retr { path, file } => match send_file(&mut framed, file, abort_rx, timeout).await {
            Ok(bytes) => {
                pre_end(session_arc).await;
                slog::info!(logger, "Sent {} bytes for RETR {}", bytes, path);
                ControlChanMsg::SentData { path, bytes }
            }
            Err(fault) => fault_to_msg(logger, session_arc, fault).await,
        },
        DataChanCmd::Stor { path, file } => match recv_file(&mut framed, file, abort_rx, timeout).await {
            Ok(bytes) => {
                pre_end(session_arc).await;
                slog::info!(logger, "Stored {} bytes for STOR {}", bytes, path);
                ControlChanMsg::WrittenData { path, bytes }
            }
            Err(fault) => fault_to_msg(logger, session_arc, fault).await,
        },
        DataChanCmd::List { text } => match send_listing(&mut framed, text, abort_rx, timeout).await {
            Ok(_) => {
                pre_end(session_arc).await;
                ControlChanMsg::DirectorySuccessfullyListed
            }
            Err(fault) => fault_to_msg(logger, session_arc, fault).await,
        },
    };

    // Close first, report second: the completion reply must trail the FIN
    // on the data channel.
    let mut socket = framed.into_inner();
    let _ = socket.shutdown().await;
    drop(socket);

    rearm(session_arc).await;

    if let Err(err) = control_msg_tx.send(msg).await {
        slog::warn!(logger, "Could not report transfer outcome to the control loop: {}", err);
    }
}

async fn pre_end<Storage, User>(session_arc: &SharedSession<Storage, User>)
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    let mut session = session_arc.lock().await;
    session.transfer.set_pre_end_of_transfer();
}

async fn fault_to_msg<Storage, User>(logger: &slog::Logger, session_arc: &SharedSession<Storage, User>, fault: TransferFault) -> ControlChanMsg
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    {
        let mut session = session_arc.lock().await;
        session.transfer.set_transfer_aborted();
    }
    match fault {
        TransferFault::Aborted => {
            slog::info!(logger, "Transfer aborted on request");
            ControlChanMsg::TransferAborted
        }
        TransferFault::Timeout => {
            slog::warn!(logger, "Transfer aborted: inactivity timeout");
            ControlChanMsg::TransferTimeout
        }
        TransferFault::Reset => {
            slog::warn!(logger, "Transfer aborted: data connection reset");
            ControlChanMsg::ConnectionReset
        }
        TransferFault::Storage(err) => {
            slog::warn!(logger, "Transfer aborted by storage backend: {}", err);
            ControlChanMsg::StorageError(err)
        }
    }
}

async fn send_file<File>(
    framed: &mut Framed<TcpStream, DataCodec>,
    mut file: File,
    abort_rx: &mut Receiver<()>,
    timeout: Duration,
) -> Result<u64, TransferFault>
where
    File: FtpFile,
{
    let mut sent: u64 = 0;
    loop {
        tokio::select! {
            biased;
            _ = abort_rx.recv() => return Err(TransferFault::Aborted),
            step = async {
                let block = file.read_block(READ_CHUNK).await.map_err(TransferFault::Storage)?;
                let eof = block.eof;
                let n = block.len() as u64;
                framed.send(block).await.map_err(|_| TransferFault::Reset)?;
                Ok::<(u64, bool), TransferFault>((n, eof))
            } => match step {
                Ok((n, true)) => return Ok(sent + n),
                Ok((n, false)) => sent += n,
                Err(fault) => return Err(fault),
            },
            _ = tokio::time::sleep(timeout) => return Err(TransferFault::Timeout),
        }
    }
}

async fn recv_file<File>(
    framed: &mut Framed<TcpStream, DataCodec>,
    mut file: File,
    abort_rx: &mut Receiver<()>,
    timeout: Duration,
) -> Result<u64, TransferFault>
where
    File: FtpFile,
{
    let mut received: u64 = 0;
    loop {
        tokio::select! {
            biased;
            _ = abort_rx.recv() => return Err(TransferFault::Aborted),
            next = framed.next() => match next {
                Some(Ok(block)) => {
                    let eof = block.eof;
                    received += file.write_block(block).await.map_err(TransferFault::Storage)?;
                    if eof {
                        file.close().await.map_err(TransferFault::Storage)?;
                        return Ok(received);
                    }
                }
                Some(Err(_)) => return Err(TransferFault::Reset),
                // The peer closed without signalling end-of-data.
                None => return Err(TransferFault::Reset),
            },
            _ = tokio::time::sleep(timeout) => return Err(TransferFault::Timeout),
        }
    }
}

async fn send_listing(
    framed: &mut Framed<TcpStream, DataCodec>,
    text: Bytes,
    abort_rx: &mut Receiver<()>,
    timeout: Duration,
) -> Result<u64, TransferFault> {
    let block = DataBlock::last(text);
    let bytes = block.len() as u64;
    tokio::select! {
        biased;
        _ = abort_rx.recv() => Err(TransferFault::Aborted),
        sent = framed.send(block) => match sent {
            Ok(()) => Ok(bytes),
            Err(_) => Err(TransferFault::Reset),
        },
        _ = tokio::time::sleep(timeout) => Err(TransferFault::Timeout),
    }
}

/// Spawns the acceptor loop behind a passive bind. Every accepted
/// connection is matched back to its session through the switchboard; an
/// unmatched or wrong-peer connection is dropped. The loop ends when the
/// cancel latch drops, which happens when the bind is replaced or the
/// session goes away.
pub(super) fn spawn_passive_acceptor<Storage, User>(
    logger: slog::Logger,
    switchboard: Arc<Switchboard<Storage, User>>,
    key: SwitchboardKey,
    listener: TcpListener,
    mut cancel: oneshot::Receiver<()>,
) where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut cancel => break,
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        if peer.ip() != key.source {
                            slog::warn!(logger, "Data connection from unexpected peer {}; closing", peer);
                            continue;
                        }
                        match switchboard.lookup_with_retry(&key).await {
                            Some(session) => spawn_processing(logger.clone(), session, socket).await,
                            None => {
                                slog::warn!(logger, "No session matched the data connection on port {}; closing", key.port);
                            }
                        }
                    }
                    Err(err) => {
                        slog::warn!(logger, "Passive accept failed: {}", err);
                        break;
                    }
                }
            }
        }
        switchboard.release(&key);
    });
}

/// Connects to the endpoint the client advertised with PORT and hands the
/// socket to the data loop. A failed connect reports 425 material back to
/// the control loop.
pub(super) async fn connect_active<Storage, User>(logger: slog::Logger, session_arc: SharedSession<Storage, User>)
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
{
    let target = {
        let session = session_arc.lock().await;
        session.transfer.active_target()
    };
    let target = match target {
        Some(target) => target,
        None => return,
    };
    match TcpStream::connect(SocketAddr::V4(target)).await {
        Ok(socket) => spawn_processing(logger, session_arc, socket).await,
        Err(err) => {
            slog::warn!(logger, "Could not connect to client data endpoint {}: {}", target, err);
            let control_msg_tx = {
                let mut session = session_arc.lock().await;
                session.data_busy = false;
                session.transfer.set_closed_data_channel();
                session.install_data_channels();
                session.control_msg_tx.clone()
            };
            if let Some(tx) = control_msg_tx {
                let _ = tx.send(ControlChanMsg::CantOpenDataConnection).await;
            }
        }
    }
}
