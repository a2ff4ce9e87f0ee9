use crate::delivery::Disposition;
use crate::endpoint::Condition;
use crate::frame::Role;
use snafu::Snafu;
use std::fmt;

/// A type alias for handling errors throughout amqp-sync.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Which terminus an [`Error::AddressMismatch`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminusKind {
    Source,
    Target,
}

impl fmt::Display for TerminusKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TerminusKind::Source => f.write_str("source"),
            TerminusKind::Target => f.write_str("target"),
        }
    }
}

/// Specific error cases returned by amqp-sync.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    /// A blocking wait ran past its deadline before its condition held.
    #[snafu(display("{}", message))]
    Timeout { message: String },

    /// The URL could not be parsed.
    #[snafu(display("could not parse url {}: {}", url, source))]
    ParseUrl {
        url: String,
        source: url::ParseError,
    },

    /// The URL parsed, but is not usable as an AMQP address.
    #[snafu(display("invalid url: {}", url))]
    InvalidUrl { url: String },

    /// The peer refused (or immediately closed) a link we attempted to open.
    #[snafu(display("failed to open link {}", name))]
    LinkOpen {
        name: String,
        condition: Option<Condition>,
    },

    /// The peer opened a link, but with a different address than the one we requested.
    #[snafu(display(
        "failed to open link {}, {} does not match (requested {}, peer answered {})",
        name,
        kind,
        local,
        display_address(remote)
    ))]
    AddressMismatch {
        name: String,
        kind: TerminusKind,
        local: String,
        remote: Option<String>,
    },

    /// The peer closed a link that was open.
    #[snafu(display(
        "{} {} {} {} closed {}",
        role_name(*role),
        name,
        if *role == Role::Sender { "to" } else { "from" },
        display_address(address),
        display_condition(condition)
    ))]
    LinkDetached {
        name: String,
        role: Role,
        address: Option<String>,
        condition: Option<Condition>,
    },

    /// The peer closed the connection.
    #[snafu(display("connection {} closed {}", url, display_condition(condition)))]
    ConnectionClosed {
        url: String,
        condition: Option<Condition>,
    },

    /// The transport went away without a clean close.
    #[snafu(display("connection {} disconnected", url))]
    Disconnected { url: String },

    /// A sent message ended in one of the caller's error states.
    #[snafu(display("send failed with remote state {:?}", state))]
    Send { state: Option<Disposition> },

    /// A request has no address and the request/response client has no fixed address.
    #[snafu(display("request message has no address"))]
    MissingAddress,

    /// The response to a request was gone by the time its call went to collect it.
    #[snafu(display("no response for correlation id {}", correlation_id))]
    MissingResponse { correlation_id: String },

    /// Synchronous receive or settle was attempted on a receiver created with its own handler.
    #[snafu(display(
        "cannot receive or settle on receiver {} because a handler was provided",
        name
    ))]
    HandlerInstalled { name: String },

    /// `pop` was called with no buffered message.
    #[snafu(display("no message is available"))]
    NoMessage,

    /// `settle` was called with no popped, unsettled delivery.
    #[snafu(display("no unsettled delivery is available"))]
    NothingToSettle,

    /// An operation referenced a link the container does not know about.
    #[snafu(display("unknown link handle {}", handle))]
    UnknownLink { handle: u32 },

    /// Every link handle up to the configured maximum is in use.
    #[snafu(display("no more link handles are available"))]
    ExhaustedLinkHandles,

    /// The peer sent a frame that does not make sense in the current state.
    #[snafu(display("AMQP protocol error - received unexpected frame: {}", frame))]
    UnexpectedFrame { frame: String },
}

impl Error {
    /// True for link-scoped failures (`LinkOpen`, `AddressMismatch`, `LinkDetached`).
    pub fn is_link_error(&self) -> bool {
        matches!(
            self,
            Error::LinkOpen { .. } | Error::AddressMismatch { .. } | Error::LinkDetached { .. }
        )
    }

    /// True for failures that end the usability of the connection.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Error::ConnectionClosed { .. } | Error::Disconnected { .. }
        )
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::Sender => "sender",
        Role::Receiver => "receiver",
    }
}

fn display_address(address: &Option<String>) -> &str {
    address.as_deref().unwrap_or("<none>")
}

fn display_condition(condition: &Option<Condition>) -> String {
    match condition {
        Some(condition) => format!("due to: {}", condition),
        None => "by peer".to_string(),
    }
}
