//! Shared helpers for the session scenarios.

#![allow(dead_code)]

use tvgame::{
    codec,
    connection::{Link, Outgoing},
    protocol::Command,
    render::{PhaseData, PhaseName, RenderBridge},
};

/// Render bridge that remembers everything it was asked to draw
#[derive(Debug, Default)]
pub struct Recorder {
    pub phases: Vec<(PhaseName, PhaseData)>,
    pub errors: Vec<String>,
}

impl Recorder {
    pub fn last(&self) -> Option<&PhaseData> {
        self.phases.last().map(|(_, data)| data)
    }

    pub fn last_name(&self) -> Option<PhaseName> {
        self.phases.last().map(|(name, _)| *name)
    }
}

impl RenderBridge for Recorder {
    fn render_phase(&mut self, name: PhaseName, data: &PhaseData) {
        self.phases.push((name, data.clone()));
    }

    fn render_error(&mut self, text: &str) {
        self.errors.push(text.to_string());
    }
}

/// Everything the session handed to the transport since the last call
pub fn outgoing<E>(link: &mut Link<E>) -> Vec<Outgoing> {
    let mut items = Vec::new();
    while let Ok(item) = link.outbox.try_recv() {
        items.push(item);
    }
    items
}

/// The raw frames the session sent since the last call
pub fn frames<E>(link: &mut Link<E>) -> Vec<String> {
    outgoing(link)
        .into_iter()
        .filter_map(|item| match item {
            Outgoing::Frame(frame) => Some(frame),
            Outgoing::Close => None,
        })
        .collect()
}

/// The commands the session sent since the last call
pub fn commands<E>(link: &mut Link<E>) -> Vec<Command> {
    frames(link)
        .iter()
        .map(|frame| codec::decode::<Command>(frame).unwrap())
        .collect()
}
