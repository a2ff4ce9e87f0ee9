use crate::connection::{BlockingConnection, WaitTimeout};
use crate::container::Link;
use crate::endpoint::{Condition, EndpointState};
use crate::errors::*;
use crate::frame::Role;
use log::debug;
use snafu::OptionExt;

/// The part of a blocking sender or receiver that tracks the link itself.
///
/// A `BlockingLink` borrows the connection it was opened on. Dropping it closes the link without
/// waiting for the peer; use [`close`](struct.BlockingSender.html#method.close) on the sender or
/// receiver to wait for the peer's detach.
pub struct BlockingLink<'a> {
    connection: &'a BlockingConnection,
    handle: u32,
    name: String,
    role: Role,
}

impl Drop for BlockingLink<'_> {
    fn drop(&mut self) {
        if let Some(mut container) = self.connection.try_lock() {
            container.release_link(self.handle);
        }
    }
}

impl<'a> BlockingLink<'a> {
    // Wait for the peer to answer the attach of the link at `handle`. A link the peer refuses
    // is closed on our side and reported as `LinkOpen`.
    pub(crate) fn open(connection: &'a BlockingConnection, handle: u32) -> Result<BlockingLink<'a>> {
        let (name, role) = {
            let container = connection.lock();
            let link = container.link(handle).context(UnknownLinkSnafu { handle })?;
            (link.name().to_string(), link.role())
        };
        let link = BlockingLink {
            connection,
            handle,
            name,
            role,
        };

        let opened = connection.wait(
            |container| match container.link(handle) {
                Some(link) => !link.state().is_remote_uninitialized(),
                None => true,
            },
            &format!("opening link {}", link.name),
        );
        match opened {
            Ok(()) => (),
            // The peer refused the link by detaching it straight away; dealt with below.
            Err(Error::LinkDetached { ref name, .. }) if *name == link.name => (),
            Err(err) => return Err(err),
        }

        let refused = {
            let mut container = connection.lock();
            let engine_link = container
                .link_mut(handle)
                .context(UnknownLinkSnafu { handle })?;
            if engine_link.state().is_remote_closed() {
                engine_link.close();
                Some(engine_link.remote_condition().cloned())
            } else {
                None
            }
        };
        if let Some(condition) = refused {
            debug!("peer refused link {}", link.name);
            return LinkOpenSnafu {
                name: link.name.as_str(),
                condition,
            }
            .fail();
        }

        debug!("link {} is open", link.name);
        Ok(link)
    }

    /// Close the link, blocking until the peer has detached it.
    pub(crate) fn close(self) -> Result<()> {
        let handle = self.handle;
        self.connection.lock().close_link(handle)?;
        self.connection.wait(
            |container| match container.link(handle) {
                Some(link) => !link.state().is_remote_active(),
                None => true,
            },
            &format!("closing link {}", self.name),
        )
    }

    // Fail with `AddressMismatch` if the peer attached a different address than the one we asked
    // for. The link is closed on our side first.
    pub(crate) fn check_address(&self, kind: TerminusKind) -> Result<()> {
        let (local, remote) = self.inspect(|link| match kind {
            TerminusKind::Source => (
                link.source().address.clone(),
                link.remote_source().and_then(|t| t.address.clone()),
            ),
            TerminusKind::Target => (
                link.target().address.clone(),
                link.remote_target().and_then(|t| t.address.clone()),
            ),
        })?;
        match local {
            Some(local) if Some(&local) != remote.as_ref() => {
                self.connection.lock().close_link(self.handle)?;
                AddressMismatchSnafu {
                    name: self.name.as_str(),
                    kind,
                    local,
                    remote,
                }
                .fail()
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn wait<F>(&self, mut condition: F, timeout: WaitTimeout, msg: &str) -> Result<()>
    where
        F: FnMut(&Link) -> bool,
    {
        let handle = self.handle;
        self.connection.wait_timeout(
            |container| container.link(handle).map_or(true, |link| condition(link)),
            timeout,
            msg,
        )
    }

    fn inspect<T, F: FnOnce(&Link) -> T>(&self, f: F) -> Result<T> {
        let container = self.connection.lock();
        let link = container
            .link(self.handle)
            .context(UnknownLinkSnafu { handle: self.handle })?;
        Ok(f(link))
    }

    pub fn connection(&self) -> &'a BlockingConnection {
        self.connection
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> u32 {
        self.handle
    }

    pub fn is_sender(&self) -> bool {
        self.role == Role::Sender
    }

    pub fn is_receiver(&self) -> bool {
        self.role == Role::Receiver
    }

    pub fn state(&self) -> EndpointState {
        self.inspect(Link::state).unwrap_or_default()
    }

    pub fn source_address(&self) -> Option<String> {
        self.inspect(|link| link.source().address.clone())
            .ok()
            .flatten()
    }

    pub fn target_address(&self) -> Option<String> {
        self.inspect(|link| link.target().address.clone())
            .ok()
            .flatten()
    }

    /// The source address the peer attached with. For dynamic receivers this is the address the
    /// peer assigned.
    pub fn remote_source_address(&self) -> Option<String> {
        self.inspect(|link| link.remote_source().and_then(|t| t.address.clone()))
            .ok()
            .flatten()
    }

    pub fn remote_target_address(&self) -> Option<String> {
        self.inspect(|link| link.remote_target().and_then(|t| t.address.clone()))
            .ok()
            .flatten()
    }

    /// For senders, credit granted by the peer; for receivers, credit granted to the peer and
    /// not yet used.
    pub fn credit(&self) -> u32 {
        self.inspect(Link::credit).unwrap_or(0)
    }

    /// Messages waiting for credit.
    pub fn queued(&self) -> usize {
        self.inspect(Link::queued).unwrap_or(0)
    }

    pub fn remote_condition(&self) -> Option<Condition> {
        self.inspect(|link| link.remote_condition().cloned())
            .ok()
            .flatten()
    }
}
