use crate::connection::{BlockingConnection, WaitTimeout};
use crate::connection_options::ReceiverOptions;
use crate::container::Handler;
use crate::delivery::Disposition;
use crate::errors::*;
use crate::fetcher::Fetcher;
use crate::link::BlockingLink;
use crate::message::Message;
use snafu::OptionExt;

/// A link that receives messages.
///
/// Created by
/// [`BlockingConnection::create_receiver`](struct.BlockingConnection.html#method.create_receiver).
/// Unless the receiver was given its own handler, arriving messages are buffered until taken by
/// [`receive`](#method.receive) and must then be settled (in the order they were received) with
/// [`accept`](#method.accept), [`reject`](#method.reject), [`release`](#method.release) or
/// [`settle`](#method.settle).
pub struct BlockingReceiver<'a> {
    link: BlockingLink<'a>,
    fetcher: Option<Fetcher>,
}

impl<'a> BlockingReceiver<'a> {
    pub(crate) fn open(
        connection: &'a BlockingConnection,
        address: Option<&str>,
        options: ReceiverOptions,
    ) -> Result<BlockingReceiver<'a>> {
        let ReceiverOptions {
            name,
            credit,
            dynamic,
            handler,
            options,
        } = options;
        let prefetch = credit.unwrap_or(1);

        let (handler, fetcher) = match handler {
            Some(handler) => (handler, None),
            None => {
                let fetcher = Fetcher::new(prefetch);
                (Box::new(fetcher.clone()) as Box<dyn Handler>, Some(fetcher))
            }
        };
        let handle = connection.lock().create_receiver(
            address,
            name.as_deref(),
            dynamic,
            Some(handler),
            &options,
        )?;
        let link = BlockingLink::open(connection, handle)?;
        link.check_address(TerminusKind::Source)?;
        if prefetch > 0 {
            connection.lock().flow(handle, prefetch)?;
        }
        Ok(BlockingReceiver { link, fetcher })
    }

    pub fn link(&self) -> &BlockingLink<'a> {
        &self.link
    }

    pub fn name(&self) -> &str {
        self.link.name()
    }

    /// Block until a message arrives, or the connection's default timeout elapses.
    pub fn receive(&self) -> Result<Message> {
        self.receive_timeout(WaitTimeout::Default)
    }

    /// Block until a message arrives, or `timeout` elapses. If the receiver has no credit, one
    /// credit is granted first.
    pub fn receive_timeout(&self, timeout: WaitTimeout) -> Result<Message> {
        let fetcher = self.fetcher()?;
        if self.link.credit() == 0 {
            self.flow(1)?;
        }
        self.link.wait(
            |_| fetcher.has_message(),
            timeout,
            &format!("receiving on receiver {}", self.link.name()),
        )?;
        fetcher.pop()
    }

    /// Accept the oldest received, unsettled message.
    pub fn accept(&self) -> Result<()> {
        self.settle(Some(Disposition::Accepted))
    }

    /// Reject the oldest received, unsettled message.
    pub fn reject(&self) -> Result<()> {
        self.settle(Some(Disposition::Rejected))
    }

    /// Give the oldest received, unsettled message back to the peer. If `delivered`, the peer is
    /// told the message was seen (`Modified`); otherwise it is simply `Released`.
    pub fn release(&self, delivered: bool) -> Result<()> {
        if delivered {
            self.settle(Some(Disposition::Modified))
        } else {
            self.settle(Some(Disposition::Released))
        }
    }

    /// Settle the oldest received, unsettled message, with `state` as its outcome if given. The
    /// outcome is written to the peer the next time the connection is pumped.
    pub fn settle(&self, state: Option<Disposition>) -> Result<()> {
        self.fetcher()?.settle(state)
    }

    /// Grant the peer `credit` more messages.
    pub fn flow(&self, credit: u32) -> Result<()> {
        self.link
            .connection()
            .lock()
            .flow(self.link.handle(), credit)
    }

    /// Close the receiver, blocking until the peer has detached it.
    pub fn close(self) -> Result<()> {
        self.link.close()
    }

    fn fetcher(&self) -> Result<&Fetcher> {
        self.fetcher.as_ref().context(HandlerInstalledSnafu {
            name: self.link.name(),
        })
    }
}
