//! The per-session transfer controller: one state machine tracking the
//! data-connection bind, the open channel and the running transfer, plus
//! the latches that keep the control channel and the data channel in step.

use std::net::{SocketAddr, SocketAddrV4};
use tokio::sync::oneshot;

/// Where the data side of a session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// No bind, no channel.
    Idle,
    /// A local endpoint is listening (post-PASV).
    BoundPassive,
    /// A connect to the client's advertised endpoint is in flight.
    ConnectingActive,
    /// Data channel established, no transfer started.
    Open,
    /// A transfer is in progress.
    Transferring,
    /// The data side saw end-of-data; the 226 has not been sent yet.
    PreEnd,
    /// The channel is tearing down.
    Closing,
    /// An abort was observed; blocks are discarded until closing is done.
    Aborted,
}

#[derive(Debug)]
pub struct TransferControl {
    state: TransferState,
    // The endpoint the client advertised with PORT.
    active_target: Option<SocketAddrV4>,
    // The endpoint we advertised with 227.
    passive_addr: Option<SocketAddr>,
    // Dropping this stops the passive acceptor loop.
    passive_cancel: Option<oneshot::Sender<()>>,
    // Fires when the 150 reply is on the wire; the data task holds the
    // receiving end inside the pending DataCommand and arms the codec
    // pipeline when it resolves.
    start_tx: Option<oneshot::Sender<()>>,
}

impl TransferControl {
    pub fn new() -> Self {
        TransferControl {
            state: TransferState::Idle,
            active_target: None,
            passive_addr: None,
            passive_cancel: None,
            start_tx: None,
        }
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// One transfer per session at a time; a second transfer verb while
    /// this holds gets 425.
    pub fn in_progress(&self) -> bool {
        matches!(
            self.state,
            TransferState::ConnectingActive | TransferState::Transferring | TransferState::PreEnd
        )
    }

    /// True once PORT or PASV gave the session a data endpoint.
    pub fn has_endpoint(&self) -> bool {
        self.active_target.is_some() || self.passive_addr.is_some()
    }

    pub fn active_target(&self) -> Option<SocketAddrV4> {
        self.active_target
    }

    pub fn passive_addr(&self) -> Option<SocketAddr> {
        self.passive_addr
    }

    /// PASV succeeded: a listener is bound. Replaces (and thereby cancels)
    /// any previous passive bind and forgets a previous PORT target.
    pub fn bound_passive(&mut self, addr: SocketAddr, cancel: oneshot::Sender<()>) {
        self.passive_cancel = Some(cancel);
        self.passive_addr = Some(addr);
        self.active_target = None;
        self.state = TransferState::BoundPassive;
    }

    /// PORT succeeded: remember where to connect when a transfer verb
    /// arrives. Supersedes a passive bind.
    pub fn set_active_target(&mut self, target: SocketAddrV4) {
        self.unbind_passive();
        self.active_target = Some(target);
        self.state = TransferState::Idle;
    }

    /// A transfer verb was dispatched; `start` is the latch the control
    /// loop fires after flushing the 150.
    pub fn begin(&mut self, start: oneshot::Sender<()>) {
        self.start_tx = Some(start);
        self.state = if self.state != TransferState::Open && self.active_target.is_some() {
            TransferState::ConnectingActive
        } else {
            TransferState::Transferring
        };
    }

    /// The 150 reply is on the wire; let data flow. This is the barrier
    /// that orders the reply before the first data byte.
    pub fn unlock_codecs(&mut self) {
        if let Some(start) = self.start_tx.take() {
            let _ = start.send(());
        }
    }

    /// The data channel is established (reported by the data task).
    pub fn set_opened_data_channel(&mut self) {
        if matches!(self.state, TransferState::BoundPassive | TransferState::ConnectingActive | TransferState::Idle) {
            self.state = TransferState::Open;
        }
    }

    /// The data task is streaming.
    pub fn set_transferring(&mut self) {
        self.state = TransferState::Transferring;
    }

    /// End-of-data was seen but the channel has not closed yet.
    pub fn set_pre_end_of_transfer(&mut self) {
        if self.state == TransferState::Transferring {
            self.state = TransferState::PreEnd;
        }
    }

    /// An abort was observed (ABOR, timeout or internal error); whatever
    /// is still in flight gets discarded.
    pub fn set_transfer_aborted(&mut self) {
        self.state = TransferState::Aborted;
        self.start_tx = None;
    }

    /// The data channel has fully closed. Back to the bound state while
    /// the passive listener lives, idle otherwise.
    pub fn set_closed_data_channel(&mut self) {
        self.active_target = None;
        self.state = if self.passive_addr.is_some() {
            TransferState::BoundPassive
        } else {
            TransferState::Idle
        };
    }

    /// Stops the passive acceptor and forgets the bind.
    pub fn unbind_passive(&mut self) {
        self.passive_cancel = None;
        self.passive_addr = None;
    }

    /// Full teardown (QUIT, REIN, shutdown).
    pub fn shutdown(&mut self) {
        self.unbind_passive();
        self.active_target = None;
        self.start_tx = None;
        self.state = TransferState::Closing;
    }
}

impl Default for TransferControl {
    fn default() -> Self {
        TransferControl::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cancel() -> oneshot::Sender<()> {
        oneshot::channel().0
    }

    #[test]
    fn passive_retrieve_lifecycle() {
        let mut control = TransferControl::new();
        assert_eq!(control.state(), TransferState::Idle);
        assert!(!control.has_endpoint());

        control.bound_passive("127.0.0.1:50000".parse().unwrap(), cancel());
        assert_eq!(control.state(), TransferState::BoundPassive);
        assert!(control.has_endpoint());

        // Client connects before the transfer verb.
        control.set_opened_data_channel();
        assert_eq!(control.state(), TransferState::Open);

        let (start_tx, mut start_rx) = oneshot::channel();
        control.begin(start_tx);
        assert!(control.in_progress() || control.state() == TransferState::Transferring);
        assert!(start_rx.try_recv().is_err());
        control.unlock_codecs();
        assert!(start_rx.try_recv().is_ok());

        control.set_transferring();
        control.set_pre_end_of_transfer();
        assert_eq!(control.state(), TransferState::PreEnd);
        control.set_closed_data_channel();
        // The listener is still bound, ready for the next transfer.
        assert_eq!(control.state(), TransferState::BoundPassive);
    }

    #[test]
    fn active_transfer_connects_on_demand() {
        let mut control = TransferControl::new();
        control.set_active_target("127.0.0.1:4242".parse().unwrap());
        assert_eq!(control.state(), TransferState::Idle);
        assert!(control.has_endpoint());

        let (start_tx, _start_rx) = oneshot::channel();
        control.begin(start_tx);
        assert_eq!(control.state(), TransferState::ConnectingActive);
        assert!(control.in_progress());

        control.set_opened_data_channel();
        control.set_transferring();
        assert_eq!(control.state(), TransferState::Transferring);
        control.set_pre_end_of_transfer();
        control.set_closed_data_channel();
        assert_eq!(control.state(), TransferState::Idle);
        assert!(!control.has_endpoint());
    }

    #[test]
    fn abort_discards_the_start_latch() {
        let mut control = TransferControl::new();
        control.bound_passive("127.0.0.1:50000".parse().unwrap(), cancel());
        let (start_tx, mut start_rx) = oneshot::channel();
        control.begin(start_tx);
        control.set_transfer_aborted();
        assert_eq!(control.state(), TransferState::Aborted);
        // The latch never fires after an abort; the receiver sees closure.
        control.unlock_codecs();
        assert!(matches!(start_rx.try_recv(), Err(oneshot::error::TryRecvError::Closed)));
        control.set_closed_data_channel();
        assert_eq!(control.state(), TransferState::BoundPassive);
    }

    #[test]
    fn new_port_supersedes_passive_bind() {
        let mut control = TransferControl::new();
        control.bound_passive("127.0.0.1:50000".parse().unwrap(), cancel());
        control.set_active_target("10.0.0.1:2000".parse().unwrap());
        assert_eq!(control.passive_addr(), None);
        assert!(control.active_target().is_some());
    }
}
