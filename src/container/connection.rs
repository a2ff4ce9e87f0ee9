use crate::endpoint::{Condition, EndpointState, State};
use indexmap::IndexMap;

/// Container-side view of the AMQP connection.
pub struct Connection {
    url: String,
    hostname: Option<String>,
    properties: IndexMap<String, String>,
    state: EndpointState,
    remote_container_id: Option<String>,
    remote_condition: Option<Condition>,
    pub(super) open_sent: bool,
    pub(super) close_sent: bool,
}

impl Connection {
    pub(super) fn new() -> Connection {
        Connection {
            url: String::new(),
            hostname: None,
            properties: IndexMap::new(),
            state: EndpointState::default(),
            remote_container_id: None,
            remote_condition: None,
            open_sent: false,
            close_sent: false,
        }
    }

    pub(super) fn open(
        &mut self,
        url: String,
        hostname: Option<String>,
        properties: IndexMap<String, String>,
    ) {
        self.url = url;
        self.hostname = hostname;
        self.properties = properties;
        self.state.set_local(State::Active);
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    pub(super) fn properties(&self) -> &IndexMap<String, String> {
        &self.properties
    }

    pub fn state(&self) -> EndpointState {
        self.state
    }

    pub fn remote_container_id(&self) -> Option<&str> {
        self.remote_container_id.as_deref()
    }

    pub fn remote_condition(&self) -> Option<&Condition> {
        self.remote_condition.as_ref()
    }

    /// Request a local close. The close frame goes out the next time the container pumps.
    pub fn close(&mut self) {
        self.state.set_local(State::Closed);
    }

    pub(super) fn remote_opened(&mut self, container_id: String) -> bool {
        self.remote_container_id = Some(container_id);
        self.state.set_remote(State::Active)
    }

    pub(super) fn remote_closed(&mut self, condition: Option<Condition>) -> bool {
        if condition.is_some() {
            self.remote_condition = condition;
        }
        self.state.set_remote(State::Closed)
    }
}
