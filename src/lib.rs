//! # tvgame
//!
//! Client side of a server-authoritative party trivia game. One Controller
//! drives the shared display and paces each round; every contestant plays
//! through a Participant on their own device. Both talk to the game server
//! over a single websocket and keep their displayed phase in step with the
//! server's.
//!
//! The crate is sans-IO at its core: [`participant::Participant`] and
//! [`controller::Controller`] are plain state machines that turn inbound
//! events into [`session::Effect`]s. A [`session::Session`] feeds them from
//! the [`connection::Connection`] queue once per tick and carries out the
//! effects through a [`render::RenderBridge`]. [`ws`] plugs a real socket
//! into that queue.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]

pub mod clock;
pub mod codec;
pub mod config;
pub mod connection;
pub mod constants;
pub mod controller;
pub mod logger;
pub mod participant;
pub mod protocol;
pub mod render;
pub mod roster;
pub mod round;
pub mod session;
pub mod ws;
