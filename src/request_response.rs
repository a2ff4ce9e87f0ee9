use crate::connection::{BlockingConnection, WaitTimeout};
use crate::connection_options::{ReceiverOptions, SenderOptions};
use crate::container::{Handler, Link};
use crate::count::AtomicCount;
use crate::delivery::{Delivery, Disposition};
use crate::errors::*;
use crate::message::{Message, MessageId};
use crate::receiver::BlockingReceiver;
use crate::sender::BlockingSender;
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace, warn};
use snafu::OptionExt;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Responses {
    arrived: IndexMap<MessageId, Message>,
    // Calls that gave up before their response came in.
    abandoned: IndexSet<MessageId>,
}

type Pending = Arc<Mutex<Responses>>;

// Accepts every response and files it under its correlation id. The receiver always has one
// credit outstanding, whether or not anyone is still waiting for the response.
struct ResponseHandler {
    pending: Pending,
}

impl Handler for ResponseHandler {
    fn on_message(&mut self, link: &mut Link, message: Message, delivery: Delivery) -> Result<()> {
        delivery.update(Disposition::Accepted);
        delivery.settle();
        match message.correlation_id().cloned() {
            Some(id) => {
                let mut responses = self.pending.lock().unwrap();
                if responses.abandoned.swap_remove(&id) {
                    debug!("dropping late response {} on {}", id, link.name());
                } else {
                    trace!("response {} arrived on {}", id, link.name());
                    responses.arrived.insert(id, message);
                }
            }
            None => warn!(
                "dropping response without correlation id on {}",
                link.name()
            ),
        }
        if link.credit() == 0 {
            link.flow(1);
        }
        Ok(())
    }
}

/// A blocking request/response client.
///
/// Requests are sent on one sender and responses arrive on a dynamic receiver whose
/// peer-assigned address is stamped on each request as its `reply_to`. Every request carries a
/// fresh correlation id; [`call`](#method.call) returns the response with the matching
/// correlation id. Responses to other requests stay buffered until their own `call` collects
/// them.
pub struct SyncRequestResponse<'a> {
    connection: &'a BlockingConnection,
    address: Option<String>,
    sender: BlockingSender<'a>,
    receiver: BlockingReceiver<'a>,
    correlation_id: AtomicCount,
    pending: Pending,
}

impl<'a> SyncRequestResponse<'a> {
    /// Create a client on `connection`. Requests go to `address`, or, if `None`, to the address
    /// set on each request message.
    pub fn new(
        connection: &'a BlockingConnection,
        address: Option<&str>,
    ) -> Result<SyncRequestResponse<'a>> {
        let sender = connection.create_sender(address, SenderOptions::default())?;
        let pending = Pending::default();
        let receiver = connection.create_receiver(
            None,
            ReceiverOptions::default()
                .credit(Some(1))
                .dynamic(true)
                .handler(ResponseHandler {
                    pending: Arc::clone(&pending),
                }),
        )?;
        Ok(SyncRequestResponse {
            connection,
            address: address.map(str::to_string),
            sender,
            receiver,
            correlation_id: AtomicCount::new(0),
            pending,
        })
    }

    pub fn connection(&self) -> &'a BlockingConnection {
        self.connection
    }

    pub fn sender(&self) -> &BlockingSender<'a> {
        &self.sender
    }

    pub fn receiver(&self) -> &BlockingReceiver<'a> {
        &self.receiver
    }

    /// The fixed request address, if any.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// The address responses are sent to.
    pub fn reply_to(&self) -> Option<String> {
        self.receiver.link().remote_source_address()
    }

    /// Send `request` and block until its response arrives, or the connection's default timeout
    /// elapses.
    pub fn call(&self, request: Message) -> Result<Message> {
        self.call_timeout(request, WaitTimeout::Default)
    }

    pub fn call_timeout(&self, mut request: Message, timeout: WaitTimeout) -> Result<Message> {
        if self.address.is_none() && request.address().is_none() {
            return MissingAddressSnafu.fail();
        }
        let id = MessageId::from(self.correlation_id.next());
        request.set_reply_to(self.reply_to());
        request.set_correlation_id(id.clone());
        self.sender.send_nowait(request)?;

        let pending = &self.pending;
        let waited = self.connection.wait_timeout(
            |_| pending.lock().unwrap().arrived.contains_key(&id),
            timeout,
            "waiting for response",
        );

        let mut responses = self.pending.lock().unwrap();
        if let Err(err) = waited {
            if responses.arrived.shift_remove(&id).is_none() {
                responses.abandoned.insert(id);
            }
            return Err(err);
        }
        responses
            .arrived
            .shift_remove(&id)
            .context(MissingResponseSnafu {
                correlation_id: id.to_string(),
            })
    }

    /// Close the sender and receiver, blocking until the peer has detached both.
    pub fn close(self) -> Result<()> {
        self.sender.close()?;
        self.receiver.close()
    }
}
