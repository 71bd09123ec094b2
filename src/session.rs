//! Client session
//!
//! A [`Session`] owns everything one client needs: its [`Connection`], the
//! state machine for its role and the [`RenderBridge`] it draws through.
//! Nothing is shared between sessions. The owner calls [`Session::tick`]
//! once per frame (or once per inbound message for a client without a
//! render loop); that is the only place state changes.
//!
//! Each tick drains queued signals first and polls the machine's clock
//! second, so an explicit server signal that arrives in the same tick as a
//! deadline always wins.

use thiserror::Error;
use web_time::Instant;

use crate::{
    codec::Message,
    connection::{Connection, ConnectionError, ConnectionState, Link, Signal},
    protocol::Command,
    render::{PhaseData, PhaseName, RenderBridge},
};

/// Something a state machine wants done after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Transmit a command
    Send(Command),
    /// Draw a phase
    Render(PhaseData),
    /// Show an error message
    RenderError(String),
    /// Close the connection
    Close,
}

/// Reasons a local action was refused
///
/// A refused action never changes state or sends anything.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ActionError {
    /// The action does not exist in the current phase
    #[error("cannot {action} while {phase}")]
    Unavailable {
        /// The refused action
        action: &'static str,
        /// The phase the client was in
        phase: PhaseName,
    },
    /// The previous submission has not been acknowledged yet
    #[error("still waiting for the previous submission to be acknowledged")]
    SubmissionPending,
}

/// A role's state machine, driven by a [`Session`]
///
/// Every method returns the effects of the transition it performed, in the
/// order they must be carried out.
pub trait Machine {
    /// The inbound events this role understands
    type Event: Message;

    /// The connection finished opening
    fn on_open(&mut self, now: Instant) -> Vec<Effect>;

    /// The connection closed
    ///
    /// # Arguments
    ///
    /// * `reason` - Human readable cause reported by the transport
    ///
    /// The returned effects must not send anything.
    fn on_close(&mut self, reason: &str) -> Vec<Effect>;

    /// Applies one inbound event
    fn apply(&mut self, event: Self::Event, now: Instant) -> Vec<Effect>;

    /// Advances time-driven behaviour
    ///
    /// Called once per tick after all queued events were applied.
    fn tick(&mut self, _now: Instant) -> Vec<Effect> {
        Vec::new()
    }

    /// The view to draw before anything has happened
    fn initial_view(&self) -> PhaseData;
}

/// One client session
pub struct Session<M: Machine, R> {
    connection: Connection<M::Event>,
    machine: M,
    bridge: R,
    max_messages_per_tick: usize,
}

impl<M: Machine, R: RenderBridge> Session<M, R> {
    /// Creates a session and the transport half of its connection
    ///
    /// # Arguments
    ///
    /// * `machine` - State machine for the client's role
    /// * `bridge` - Where views are drawn
    /// * `max_messages_per_tick` - Upper bound on signals applied per tick
    ///
    /// # Returns
    ///
    /// The session and the [`Link`] a transport feeds
    pub fn new(machine: M, bridge: R, max_messages_per_tick: usize) -> (Self, Link<M::Event>) {
        let (connection, link) = Connection::new();
        (
            Self {
                connection,
                machine,
                bridge,
                max_messages_per_tick: max_messages_per_tick.max(1),
            },
            link,
        )
    }

    /// Draws the initial view and marks the connection as opening
    ///
    /// Call once, right before handing the [`Link`] to a transport.
    pub fn start(&mut self) {
        let view = self.machine.initial_view();
        self.bridge.render_phase(view.name(), &view);
        self.connection.opening();
    }

    /// Runs one tick
    ///
    /// Applies up to the per-tick budget of queued signals in arrival order,
    /// then lets the machine check its clock.
    ///
    /// # Returns
    ///
    /// The number of signals applied
    pub fn tick(&mut self, now: Instant) -> usize {
        let mut applied = 0;

        while applied < self.max_messages_per_tick {
            let Some(signal) = self.connection.poll() else {
                break;
            };
            applied += 1;

            let effects = match signal {
                Signal::Opened => {
                    tracing::info!("connection open");
                    self.machine.on_open(now)
                }
                Signal::Message(event) => self.machine.apply(event, now),
                Signal::Closed { reason } => {
                    tracing::info!(%reason, "connection closed");
                    self.machine.on_close(&reason)
                }
            };
            self.execute(effects);
        }

        let effects = self.machine.tick(now);
        self.execute(effects);

        applied
    }

    /// Performs a local action on the machine
    ///
    /// # Errors
    ///
    /// Returns the machine's [`ActionError`] if the action is refused; no
    /// effect is carried out in that case.
    pub fn act<F>(&mut self, action: F) -> Result<(), ActionError>
    where
        F: FnOnce(&mut M) -> Result<Vec<Effect>, ActionError>,
    {
        let effects = action(&mut self.machine).inspect_err(|e| {
            tracing::debug!(error = %e, "action refused");
        })?;
        self.execute(effects);
        Ok(())
    }

    /// The role's state machine
    pub fn machine(&self) -> &M {
        &self.machine
    }

    /// The render bridge
    pub fn bridge(&self) -> &R {
        &self.bridge
    }

    /// The connection
    pub fn connection(&self) -> &Connection<M::Event> {
        &self.connection
    }

    /// Whether the connection is closed
    pub fn is_closed(&self) -> bool {
        self.connection.state() == ConnectionState::Closed
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send(command) => {
                    if let Err(error) = self.connection.send(&command) {
                        self.reset(&error);
                        return;
                    }
                }
                Effect::Render(data) => self.bridge.render_phase(data.name(), &data),
                Effect::RenderError(text) => self.bridge.render_error(&text),
                Effect::Close => self.connection.close(),
            }
        }
    }

    /// Tears the connection down after a failed send
    ///
    /// The remaining effects of the batch are dropped and the machine goes
    /// back to its initial state.
    fn reset(&mut self, error: &ConnectionError) {
        let reason = error.to_string();
        tracing::warn!(%reason, "resetting session");

        self.connection.close();
        self.bridge.render_error(&reason);
        let effects = self.machine.on_close(&reason);
        self.execute(effects);
    }
}
