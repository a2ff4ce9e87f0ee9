use super::{Connection, Link};
use crate::delivery::Delivery;
use crate::errors::Result;
use crate::message::Message;

/// Callbacks invoked by a [`Container`](struct.Container.html) while it processes frames from
/// its peer.
///
/// A handler is installed either on a link (it then sees that link's events and connection
/// errors) or on the connection (it sees every event after the link's own handler). Every
/// callback runs on the thread pumping the container, inside
/// [`do_work`](struct.Container.html#method.do_work); returning an error stops dispatch and
/// makes that `do_work` call fail with it. Undispatched events stay queued for the next call.
pub trait Handler: Send {
    fn on_connection_remote_open(&mut self, _connection: &mut Connection) -> Result<()> {
        Ok(())
    }

    fn on_connection_remote_close(&mut self, _connection: &mut Connection) -> Result<()> {
        Ok(())
    }

    /// The peer closed the connection with an error condition. Link handlers only.
    fn on_connection_error(&mut self, _connection: &mut Connection) -> Result<()> {
        Ok(())
    }

    fn on_link_remote_open(&mut self, _link: &mut Link) -> Result<()> {
        Ok(())
    }

    fn on_link_remote_close(&mut self, _link: &mut Link) -> Result<()> {
        Ok(())
    }

    /// The peer detached the link with an error condition. Called before
    /// [`on_link_remote_close`](#method.on_link_remote_close).
    fn on_link_error(&mut self, _link: &mut Link) -> Result<()> {
        Ok(())
    }

    fn on_link_flow(&mut self, _link: &mut Link) -> Result<()> {
        Ok(())
    }

    fn on_message(&mut self, _link: &mut Link, _message: Message, _delivery: Delivery) -> Result<()> {
        Ok(())
    }

    fn on_settled(&mut self, _link: &mut Link, _delivery: &Delivery) -> Result<()> {
        Ok(())
    }

    fn on_disconnected(&mut self, _connection: &mut Connection) -> Result<()> {
        Ok(())
    }
}
