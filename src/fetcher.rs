use crate::container::{Connection, Handler, Link};
use crate::delivery::{Delivery, Disposition};
use crate::errors::*;
use crate::message::Message;
use log::trace;
use snafu::OptionExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Queues {
    incoming: VecDeque<(Message, Delivery)>,
    unsettled: VecDeque<Delivery>,
}

/// Buffers messages arriving on a receiver until a blocking `receive` takes them.
///
/// Clones share the same queues: one clone is installed as the link's handler and fed by the
/// pumping thread, the other is kept by the receiver.
#[derive(Clone, Debug)]
pub(crate) struct Fetcher {
    queues: Arc<Mutex<Queues>>,
    prefetch: u32,
}

impl Fetcher {
    /// A fetcher that keeps the link's credit topped up to `prefetch` as messages arrive. With a
    /// prefetch of 0 credit is left alone.
    pub(crate) fn new(prefetch: u32) -> Fetcher {
        Fetcher {
            queues: Arc::new(Mutex::new(Queues::default())),
            prefetch,
        }
    }

    pub(crate) fn has_message(&self) -> bool {
        !self.queues.lock().unwrap().incoming.is_empty()
    }

    /// Take the oldest buffered message. Its delivery is remembered for a later
    /// [`settle`](#method.settle) unless it arrived settled.
    pub(crate) fn pop(&self) -> Result<Message> {
        let mut queues = self.queues.lock().unwrap();
        let (message, delivery) = queues.incoming.pop_front().context(NoMessageSnafu)?;
        if !delivery.settled() {
            queues.unsettled.push_back(delivery);
        }
        Ok(message)
    }

    /// Settle the oldest popped, unsettled delivery, first applying `state` if given.
    pub(crate) fn settle(&self, state: Option<Disposition>) -> Result<()> {
        let delivery = self
            .queues
            .lock()
            .unwrap()
            .unsettled
            .pop_front()
            .context(NothingToSettleSnafu)?;
        if let Some(state) = state {
            delivery.update(state);
        }
        delivery.settle();
        Ok(())
    }
}

impl Handler for Fetcher {
    fn on_message(&mut self, link: &mut Link, message: Message, delivery: Delivery) -> Result<()> {
        trace!("buffering message on receiver {}", link.name());
        self.queues
            .lock()
            .unwrap()
            .incoming
            .push_back((message, delivery));
        if link.credit() < self.prefetch {
            link.flow(self.prefetch - link.credit());
        }
        Ok(())
    }

    fn on_link_error(&mut self, link: &mut Link) -> Result<()> {
        if !link.state().is_local_active() {
            return Ok(());
        }
        link.close();
        LinkDetachedSnafu {
            name: link.name(),
            role: link.role(),
            address: link.address().map(str::to_string),
            condition: link.remote_condition().cloned(),
        }
        .fail()
    }

    fn on_connection_error(&mut self, connection: &mut Connection) -> Result<()> {
        if !connection.state().is_local_active() {
            return Ok(());
        }
        connection.close();
        ConnectionClosedSnafu {
            url: connection.url(),
            condition: connection.remote_condition().cloned(),
        }
        .fail()
    }
}
