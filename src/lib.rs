//! amqp-sync is a blocking client layer for AMQP 1.0.
//!
//! Every call (opening a connection or link, sending, receiving, making a request) pumps an
//! event-driven [`Container`](container/struct.Container.html) on the calling thread until the
//! peer has answered, then returns. The container exchanges typed frames with its peer through a
//! [`Transport`](trait.Transport.html); [`pipe`](fn.pipe.html) provides an in-memory one.
//!
//! ```rust,no_run
//! use amqp_sync::{BlockingConnection, ConnectionOptions, Message, ReceiverOptions, SenderOptions};
//!
//! # fn run<T: amqp_sync::Transport>(transport: T) -> amqp_sync::Result<()> {
//! let connection = BlockingConnection::open("amqp://localhost", transport, ConnectionOptions::default())?;
//!
//! let sender = connection.create_sender(Some("work"), SenderOptions::default())?;
//! sender.send(Message::new("hello"))?;
//!
//! let receiver = connection.create_receiver(Some("work"), ReceiverOptions::default())?;
//! let message = receiver.receive()?;
//! receiver.accept()?;
//! println!("received {:?}", message.body());
//!
//! drop(sender);
//! drop(receiver);
//! connection.close()
//! # }
//! ```

pub mod container;

mod connection;
mod connection_options;
mod count;
mod delivery;
mod endpoint;
mod errors;
mod fetcher;
mod frame;
mod link;
mod link_options;
mod message;
mod receiver;
mod request_response;
mod sender;
mod transport;

pub use connection::{BlockingConnection, WaitTimeout};
pub use connection_options::{ConnectionOptions, ReceiverOptions, SenderOptions};
pub use container::{Container, Handler};
pub use count::AtomicCount;
pub use delivery::{Delivery, Disposition};
pub use endpoint::{Condition, EndpointState, State};
pub use errors::{Error, Result, TerminusKind};
pub use frame::{Frame, ReceiverSettleMode, Role, SenderSettleMode, Terminus};
pub use link::BlockingLink;
pub use link_options::LinkOption;
pub use message::{Message, MessageId};
pub use receiver::BlockingReceiver;
pub use request_response::SyncRequestResponse;
pub use sender::{BlockingSender, DEFAULT_ERROR_STATES};
pub use transport::{pipe, Disconnected, MemoryTransport, Transport};

#[allow(dead_code)]
mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[cfg(test)]
mod integration_tests;
