//! Session lifecycle for the interactive loop.
//!
//! `Idle → ReadingInput → Dispatching → Rendering → Idle`, with `Exiting`
//! as the terminal state. The REPL drives a [`Session`] with events and
//! stops once it reports `Exiting`.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    ReadingInput,
    Dispatching,
    Rendering,
    Exiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The prompt is shown.
    Prompt,
    /// A line was submitted.
    Submitted,
    /// Ctrl-C. `pending_input` is true when the input line had text.
    Interrupt { pending_input: bool },
    /// Ctrl-D or closed stdin.
    EndOfInput,
    /// The submitted line was a quit command.
    Quit,
    /// The command finished, successfully or with a failure to render.
    Finished,
    Rendered,
}

/// Next state for `event` in `state`. Events that do not apply leave the
/// state unchanged.
pub fn transition(state: SessionState, event: SessionEvent) -> SessionState {
    use SessionEvent as E;
    use SessionState as S;
    match (state, event) {
        (S::Exiting, _) => S::Exiting,
        (S::Idle, E::Prompt) => S::ReadingInput,
        (S::ReadingInput, E::Submitted) => S::Dispatching,
        (S::ReadingInput, E::Interrupt { pending_input: true }) => S::Idle,
        (S::ReadingInput, E::Interrupt { pending_input: false }) => S::Exiting,
        (S::ReadingInput, E::EndOfInput) => S::Exiting,
        (S::Dispatching, E::Interrupt { .. }) => S::Idle,
        (S::Dispatching, E::Quit) => S::Exiting,
        (S::Dispatching, E::Finished) => S::Rendering,
        (S::Rendering, E::Rendered) => S::Idle,
        (state, _) => state,
    }
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_exiting(&self) -> bool {
        self.state == SessionState::Exiting
    }

    pub fn apply(&mut self, event: SessionEvent) -> SessionState {
        let next = transition(self.state, event);
        if next == self.state && !matches!(next, SessionState::Exiting) {
            debug!(state = ?self.state, event = ?event, "session event ignored");
        }
        self.state = next;
        next
    }
}
