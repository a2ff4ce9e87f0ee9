use crate::connection::{BlockingConnection, WaitTimeout};
use crate::connection_options::SenderOptions;
use crate::delivery::{Delivery, Disposition};
use crate::errors::*;
use crate::link::BlockingLink;
use crate::message::Message;
use log::trace;

/// Remote outcomes that make [`send`](struct.BlockingSender.html#method.send) fail.
pub const DEFAULT_ERROR_STATES: &[Disposition] = &[Disposition::Rejected, Disposition::Released];

/// A link that sends messages, blocking until the peer settles them.
///
/// Created by
/// [`BlockingConnection::create_sender`](struct.BlockingConnection.html#method.create_sender).
pub struct BlockingSender<'a> {
    link: BlockingLink<'a>,
}

impl<'a> BlockingSender<'a> {
    pub(crate) fn open(
        connection: &'a BlockingConnection,
        address: Option<&str>,
        options: SenderOptions,
    ) -> Result<BlockingSender<'a>> {
        let SenderOptions {
            name,
            handler,
            options,
        } = options;
        let handle = connection.lock().create_sender(
            address,
            name.as_deref(),
            handler,
            &options,
        )?;
        let link = BlockingLink::open(connection, handle)?;
        link.check_address(TerminusKind::Target)?;
        Ok(BlockingSender { link })
    }

    pub fn link(&self) -> &BlockingLink<'a> {
        &self.link
    }

    pub fn name(&self) -> &str {
        self.link.name()
    }

    /// Send `message`, blocking until the peer has settled it. Fails with
    /// [`Error::Send`](enum.Error.html#variant.Send) if the peer rejected or released it.
    pub fn send(&self, message: Message) -> Result<Delivery> {
        self.send_with(message, WaitTimeout::Default, DEFAULT_ERROR_STATES)
    }

    /// Send `message`, blocking until the peer has settled it or `timeout` elapses. Fails with
    /// [`Error::Send`](enum.Error.html#variant.Send) if the peer's outcome is one of
    /// `error_states`.
    pub fn send_with(
        &self,
        message: Message,
        timeout: WaitTimeout,
        error_states: &[Disposition],
    ) -> Result<Delivery> {
        let delivery = self.send_nowait(message)?;
        self.link.wait(
            |_| delivery.settled(),
            timeout,
            &format!("sending on sender {}", self.link.name()),
        )?;
        match delivery.remote_state() {
            Some(state) if error_states.contains(&state) => SendSnafu { state }.fail(),
            _ => Ok(delivery),
        }
    }

    /// Queue `message` for sending without waiting for the peer. The message is transferred the
    /// next time the connection is pumped and the peer has granted credit.
    pub fn send_nowait(&self, message: Message) -> Result<Delivery> {
        let delivery = self
            .link
            .connection()
            .lock()
            .send(self.link.handle(), message)?;
        trace!(
            "queued delivery {} on sender {}",
            delivery.id(),
            self.link.name()
        );
        Ok(delivery)
    }

    /// Close the sender, blocking until the peer has detached it.
    pub fn close(self) -> Result<()> {
        self.link.close()
    }
}
