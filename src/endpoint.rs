use std::fmt;

/// One side's view of an endpoint's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum State {
    Uninitialized,
    Active,
    Closed,
}

impl Default for State {
    fn default() -> State {
        State::Uninitialized
    }
}

/// Local and remote lifecycle state of a connection or link.
///
/// Both sides only ever move forward (`Uninitialized -> Active -> Closed`); the local side is
/// driven by explicit calls, the remote side by frames from the peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointState {
    local: State,
    remote: State,
}

impl EndpointState {
    pub fn local(&self) -> State {
        self.local
    }

    pub fn remote(&self) -> State {
        self.remote
    }

    pub fn is_local_active(&self) -> bool {
        self.local == State::Active
    }

    pub fn is_remote_uninitialized(&self) -> bool {
        self.remote == State::Uninitialized
    }

    pub fn is_remote_active(&self) -> bool {
        self.remote == State::Active
    }

    pub fn is_remote_closed(&self) -> bool {
        self.remote == State::Closed
    }

    /// True once both sides have closed.
    pub fn is_closed(&self) -> bool {
        self.local == State::Closed && self.remote == State::Closed
    }

    /// Returns true if the local state changed.
    pub(crate) fn set_local(&mut self, state: State) -> bool {
        advance(&mut self.local, state)
    }

    /// Returns true if the remote state changed.
    pub(crate) fn set_remote(&mut self, state: State) -> bool {
        advance(&mut self.remote, state)
    }
}

fn advance(current: &mut State, next: State) -> bool {
    if next > *current {
        *current = next;
        true
    } else {
        false
    }
}

/// An AMQP error condition attached to a close or detach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub name: String,
    pub description: Option<String>,
}

impl Condition {
    pub fn new<N: Into<String>, D: Into<String>>(name: N, description: D) -> Condition {
        Condition {
            name: name.into(),
            description: Some(description.into()),
        }
    }

    pub fn named<N: Into<String>>(name: N) -> Condition {
        Condition {
            name: name.into(),
            description: None,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.name, description),
            None => f.write_str(&self.name),
        }
    }
}
