//! Connection adapter
//!
//! A [`Connection`] wraps one persistent, bidirectional message channel and
//! hides its timing from the state machines. The transport side (see
//! [`crate::ws`]) only ever enqueues through an [`Inbox`]; the owning session
//! pulls from the queue with [`Connection::poll`] once per tick. Nothing in
//! here blocks: sends are fire-and-forget and polling an empty queue simply
//! returns `None`.
//!
//! ```text
//!  transport task                         tick loop
//!  ──────────────                         ─────────
//!  Inbox::opened()   ──┐               ┌── Connection::poll()
//!  Inbox::received() ──┼── FIFO queue ─┤
//!  Inbox::closed()   ──┘               └── Connection::send() ──► Outgoing queue
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use derive_where::derive_where;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};

use crate::{
    codec::{self, Message},
    protocol::Command,
};

/// Lifecycle of the underlying channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No channel, either never opened or already torn down
    #[default]
    Closed,
    /// The transport is establishing the channel
    Opening,
    /// Messages can flow both ways
    Open,
}

/// Items delivered to the owning session, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal<E> {
    /// The channel finished opening
    Opened,
    /// A decoded inbound message
    Message(E),
    /// The channel closed, gracefully or not
    Closed {
        /// Human readable cause
        reason: String,
    },
}

/// Items handed to the transport for transmission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// An encoded message
    Frame(String),
    /// Request to close the channel
    Close,
}

/// Errors recorded when a send cannot be carried out
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// A send was attempted while the channel was not open
    #[error("cannot send `{kind}`: connection is not open")]
    NotOpen {
        /// Kind of the dropped command
        kind: &'static str,
    },
    /// The transport stopped reading outbound frames
    #[error("cannot send `{kind}`: transport is gone")]
    TransportGone {
        /// Kind of the dropped command
        kind: &'static str,
    },
    /// The command could not be encoded
    #[error("cannot encode `{kind}`: {reason}")]
    Encode {
        /// Kind of the dropped command
        kind: &'static str,
        /// Serializer error message
        reason: String,
    },
}

/// Producer half of the inbound queue, owned by the transport
///
/// Cloning is cheap; reader and writer tasks can each hold one. Only the
/// first [`Inbox::closed`] call is delivered, so a transport that notices the
/// channel ending on both halves still reports a single close.
#[derive_where(Clone)]
pub struct Inbox<E> {
    sender: UnboundedSender<Signal<E>>,
    closed: Arc<AtomicBool>,
}

impl<E: Message> Inbox<E> {
    /// Reports that the channel is open
    pub fn opened(&self) {
        self.push(Signal::Opened);
    }

    /// Decodes and enqueues one inbound text message
    ///
    /// Messages that cannot be decoded, including unknown kinds, are logged
    /// and dropped; they never reach the state machine.
    pub fn received(&self, text: &str) {
        match codec::decode::<E>(text) {
            Ok(message) => self.push(Signal::Message(message)),
            Err(codec::DecodeError::UnknownKind(kind)) => {
                tracing::warn!(kind, "ignoring message of unknown kind");
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable message");
            }
        }
    }

    /// Enqueues an already decoded message
    pub fn deliver(&self, message: E) {
        self.push(Signal::Message(message));
    }

    /// Reports that the channel has closed
    pub fn closed(&self, reason: impl Into<String>) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.push(Signal::Closed {
                reason: reason.into(),
            });
        }
    }

    fn push(&self, signal: Signal<E>) {
        if self.sender.send(signal).is_err() {
            tracing::trace!("connection dropped before inbound signal was delivered");
        }
    }
}

/// The transport's view of a connection
pub struct Link<E> {
    /// Where the transport reports inbound traffic
    pub inbox: Inbox<E>,
    /// Where the transport picks up frames to transmit
    pub outbox: UnboundedReceiver<Outgoing>,
}

/// The session's view of a connection
#[derive(Debug)]
pub struct Connection<E> {
    state: ConnectionState,
    inbound: UnboundedReceiver<Signal<E>>,
    outbound: UnboundedSender<Outgoing>,
    last_error: Option<ConnectionError>,
    closed_locally: bool,
}

impl<E: Message> Connection<E> {
    /// Creates a closed connection together with the transport's half
    pub fn new() -> (Self, Link<E>) {
        let (inbound_sender, inbound) = mpsc::unbounded_channel();
        let (outbound, outbox) = mpsc::unbounded_channel();

        (
            Self {
                state: ConnectionState::Closed,
                inbound,
                outbound,
                last_error: None,
                closed_locally: false,
            },
            Link {
                inbox: Inbox {
                    sender: inbound_sender,
                    closed: Arc::new(AtomicBool::new(false)),
                },
                outbox,
            },
        )
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The most recent send failure, if any
    pub fn last_error(&self) -> Option<&ConnectionError> {
        self.last_error.as_ref()
    }

    /// Marks the connection as opening
    ///
    /// Called by whoever asked the transport to connect.
    pub fn opening(&mut self) {
        if self.state == ConnectionState::Closed {
            self.state = ConnectionState::Opening;
        }
    }

    /// Encodes and transmits a command without waiting
    ///
    /// Failures are logged and recorded in [`Connection::last_error`] as well
    /// as returned, so the owner can reset its state machine.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionError`] if the channel is not open, the command
    /// cannot be encoded, or the transport stopped reading.
    pub fn send(&mut self, command: &Command) -> Result<(), ConnectionError> {
        let kind = command.kind();

        if self.state != ConnectionState::Open {
            return Err(self.fail(ConnectionError::NotOpen { kind }));
        }

        let frame = codec::encode(command).map_err(|e| {
            self.fail(ConnectionError::Encode {
                kind,
                reason: e.to_string(),
            })
        })?;

        tracing::debug!(kind, "sending command");

        self.outbound
            .send(Outgoing::Frame(frame))
            .map_err(|_| self.fail(ConnectionError::TransportGone { kind }))
    }

    /// Asks the transport to close the channel
    ///
    /// The connection counts as closed immediately; the transport's own close
    /// notification still arrives through [`Connection::poll`].
    pub fn close(&mut self) {
        self.closed_locally = true;
        if self.state != ConnectionState::Closed {
            self.state = ConnectionState::Closed;
            let _ = self.outbound.send(Outgoing::Close);
        }
    }

    /// Takes the next inbound signal, if one is queued
    ///
    /// Updates the lifecycle state for `Opened` and `Closed` signals before
    /// returning them. An `Opened` that arrives after [`Connection::close`]
    /// is dropped.
    pub fn poll(&mut self) -> Option<Signal<E>> {
        loop {
            let signal = match self.inbound.try_recv() {
                Ok(signal) => signal,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            };

            match &signal {
                Signal::Opened if self.closed_locally => {
                    tracing::debug!("dropping open notification after close");
                    continue;
                }
                Signal::Opened => self.state = ConnectionState::Open,
                Signal::Closed { .. } => self.state = ConnectionState::Closed,
                Signal::Message(_) => {}
            }
            return Some(signal);
        }
    }

    fn fail(&mut self, error: ConnectionError) -> ConnectionError {
        tracing::warn!(%error, "send failed");
        self.last_error = Some(error.clone());
        error
    }
}
