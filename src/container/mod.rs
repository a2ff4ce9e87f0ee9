//! The event-driven engine the blocking layer pumps.
//!
//! A [`Container`] owns one connection's endpoint state and the transport to its peer. Local
//! operations (opening links, sending, granting credit, closing) only record intent; frames are
//! written when the container next pumps. Each call to [`Container::do_work`] writes pending
//! frames, reads at most one batch from the peer, applies it to endpoint state and dispatches the
//! resulting events to handlers.

use crate::delivery::{Delivery, Direction};
use crate::endpoint::State;
use crate::errors::*;
use crate::frame::{Frame, Role, Terminus};
use crate::link_options::LinkOption;
use crate::message::Message;
use crate::transport::Transport;
use bytes::Bytes;
use indexmap::IndexMap;
use log::{debug, error, trace, warn};
use snafu::OptionExt;
use std::collections::hash_map::HashMap;
use std::collections::VecDeque;
use std::time::Duration;
use uuid::Uuid;

mod connection;
mod event;
mod handler;
mod link;
mod link_slots;

pub use connection::Connection;
pub use handler::Handler;
pub use link::Link;

use event::Event;
use link_slots::LinkSlots;

/// Default upper bound for link handles.
pub const DEFAULT_HANDLE_MAX: u32 = 1023;

pub struct Container {
    id: String,
    transport: Box<dyn Transport>,
    transport_closed: bool,
    connection: Connection,
    handler: Option<Box<dyn Handler>>,
    links: LinkSlots<Link>,

    // Peer's link handles mapped to ours.
    remote_handles: HashMap<u32, u32>,

    next_outgoing_id: u32,

    // Deliveries we sent that the peer has not settled yet.
    outgoing: IndexMap<u32, Delivery>,

    // Deliveries we received that we have not settled yet.
    incoming: IndexMap<u32, Delivery>,

    events: VecDeque<Event>,
}

impl Container {
    /// Create a container with a randomly generated id.
    pub fn new<T: Transport>(transport: T) -> Container {
        Container::with_id(Uuid::new_v4().to_string(), transport)
    }

    pub fn with_id<S: Into<String>, T: Transport>(id: S, transport: T) -> Container {
        Container {
            id: id.into(),
            transport: Box::new(transport),
            transport_closed: false,
            connection: Connection::new(),
            handler: None,
            links: LinkSlots::new(DEFAULT_HANDLE_MAX),
            remote_handles: HashMap::new(),
            next_outgoing_id: 0,
            outgoing: IndexMap::new(),
            incoming: IndexMap::new(),
            events: VecDeque::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    pub fn link(&self, handle: u32) -> Option<&Link> {
        self.links.get(handle)
    }

    pub fn link_mut(&mut self, handle: u32) -> Option<&mut Link> {
        self.links.get_mut(handle)
    }

    pub(crate) fn set_handle_max(&mut self, handle_max: u32) {
        assert!(
            self.links.len() == 0,
            "handle_max should not be set after links have been created"
        );
        self.links = LinkSlots::new(handle_max);
    }

    fn link_or_err(&mut self, handle: u32) -> Result<&mut Link> {
        self.links
            .get_mut(handle)
            .context(UnknownLinkSnafu { handle })
    }

    /// Open the connection. `handler` receives connection-scoped events and link events after
    /// the link's own handler.
    pub(crate) fn connect(
        &mut self,
        url: String,
        hostname: Option<String>,
        properties: IndexMap<String, String>,
        handler: Box<dyn Handler>,
    ) {
        debug!("opening connection to {} (container {})", url, self.id);
        self.handler = Some(handler);
        self.connection.open(url, hostname, properties);
    }

    pub(crate) fn create_sender(
        &mut self,
        target: Option<&str>,
        name: Option<&str>,
        handler: Option<Box<dyn Handler>>,
        options: &[LinkOption],
    ) -> Result<u32> {
        let target = match target {
            Some(address) => Terminus::with_address(address),
            None => Terminus::default(),
        };
        let name = self.link_name(name, target.address.as_deref());
        self.create_link(name, Role::Sender, Terminus::default(), target, handler, options)
    }

    pub(crate) fn create_receiver(
        &mut self,
        source: Option<&str>,
        name: Option<&str>,
        dynamic: bool,
        handler: Option<Box<dyn Handler>>,
        options: &[LinkOption],
    ) -> Result<u32> {
        let mut source = match source {
            Some(address) => Terminus::with_address(address),
            None => Terminus::default(),
        };
        source.dynamic = dynamic;
        let name = self.link_name(name, source.address.as_deref());
        self.create_link(name, Role::Receiver, source, Terminus::default(), handler, options)
    }

    fn create_link(
        &mut self,
        name: String,
        role: Role,
        source: Terminus,
        target: Terminus,
        handler: Option<Box<dyn Handler>>,
        options: &[LinkOption],
    ) -> Result<u32> {
        let handle = self.links.insert(|handle| {
            let mut link = Link::new(name, handle, role, source, target);
            for option in options {
                option.apply(&mut link);
            }
            link.handler = handler;
            link.open();
            link
        })?;
        debug!("attaching {:?} link with handle {}", role, handle);
        Ok(handle)
    }

    // Names default to "<container>-<address>", falling back to a uuid when there is no
    // address or the name is already in use on this connection.
    fn link_name(&self, name: Option<&str>, address: Option<&str>) -> String {
        if let Some(name) = name {
            return name.to_string();
        }
        if let Some(address) = address {
            let candidate = format!("{}-{}", self.id, address);
            if !self.links.iter().any(|(_, link)| link.name() == candidate) {
                return candidate;
            }
        }
        format!("{}-{}", self.id, Uuid::new_v4())
    }

    /// Queue `message` on a sender link. It is transferred as soon as the peer grants credit.
    pub(crate) fn send(&mut self, handle: u32, message: Message) -> Result<Delivery> {
        let id = self.next_outgoing_id;
        let link = self.link_or_err(handle)?;
        let delivery = Delivery::new(
            id,
            Bytes::from(id.to_string()),
            handle,
            Direction::Outgoing,
            false,
        );
        let presettled = link.is_presettled();
        link.enqueue(message, delivery.clone());
        if !presettled {
            self.outgoing.insert(id, delivery.clone());
        }
        self.next_outgoing_id = self.next_outgoing_id.wrapping_add(1);
        Ok(delivery)
    }

    pub(crate) fn flow(&mut self, handle: u32, credit: u32) -> Result<()> {
        self.link_or_err(handle)?.flow(credit);
        Ok(())
    }

    pub(crate) fn close_link(&mut self, handle: u32) -> Result<()> {
        self.link_or_err(handle)?.close();
        Ok(())
    }

    /// Give up a link. It is closed locally if still open and forgotten, freeing its handle for
    /// reuse, once the detach has been written and the peer has detached too.
    pub(crate) fn release_link(&mut self, handle: u32) {
        if let Some(link) = self.links.get_mut(handle) {
            link.close();
            link.released = true;
        }
    }

    fn reap_released_links(&mut self) {
        let transport_closed = self.transport_closed;
        let close_sent = self.connection.close_sent;
        let reaped = self
            .links
            .iter()
            .filter(|(_, link)| {
                link.released
                    && (transport_closed
                        || (link.detach_sent
                            && (close_sent || !link.state().is_remote_active())))
            })
            .map(|(&handle, _)| handle)
            .collect::<Vec<_>>();
        for handle in reaped {
            if let Some(link) = self.links.remove(handle) {
                if let Some(remote_handle) = link.remote_handle() {
                    self.remote_handles.remove(&remote_handle);
                }
                trace!("released link {} (handle {})", link.name(), handle);
            }
        }
    }

    /// Advance the container: write pending local changes, then dispatch queued events or wait
    /// up to `timeout` (forever if `None`) for the peer. Returns `Ok(false)` if nothing happened
    /// before the timeout.
    pub fn do_work(&mut self, timeout: Option<Duration>) -> Result<bool> {
        self.flush();

        if !self.events.is_empty() {
            self.dispatch_events()?;
            self.flush();
            return Ok(true);
        }

        if self.transport_closed {
            return DisconnectedSnafu {
                url: self.connection.url(),
            }
            .fail();
        }

        match self.transport.recv(timeout) {
            Ok(None) => return Ok(false),
            Ok(Some(frames)) => {
                for frame in frames {
                    trace!("received frame {}", frame);
                    self.process_frame(frame)?;
                }
            }
            Err(_) => self.transport_gone(),
        }

        self.dispatch_events()?;
        self.flush();
        Ok(true)
    }

    /// Pump until the connection is closed on both sides.
    pub fn run(&mut self) -> Result<()> {
        while !self.connection.state().is_closed() {
            self.do_work(None)?;
        }
        Ok(())
    }

    fn transport_gone(&mut self) {
        if self.transport_closed {
            return;
        }
        self.transport_closed = true;
        if self.connection.state().is_closed() {
            debug!("transport closed after connection close");
        } else {
            error!("transport to {} disconnected", self.connection.url());
            self.events.push_back(Event::Disconnected);
        }
    }

    fn process_frame(&mut self, frame: Frame) -> Result<()> {
        if self.connection.state().is_remote_uninitialized() {
            match &frame {
                Frame::Open { .. } | Frame::Close { .. } => (),
                _ => {
                    return UnexpectedFrameSnafu {
                        frame: frame.to_string(),
                    }
                    .fail()
                }
            }
        }

        match frame {
            Frame::Open { container_id, .. } => {
                if self.connection.remote_opened(container_id) {
                    self.events.push_back(Event::ConnectionRemoteOpen);
                }
            }
            Frame::Close { error } => {
                if self.connection.remote_closed(error) {
                    self.events.push_back(Event::ConnectionRemoteClose);
                }
            }
            Frame::Attach {
                name,
                handle: remote_handle,
                role,
                source,
                target,
                ..
            } => {
                // The peer's role is the opposite of ours.
                let found = self.links.iter_mut().find(|(_, link)| {
                    link.name() == name && link.role() != role && link.remote_handle().is_none()
                });
                match found {
                    Some((&handle, link)) => {
                        self.remote_handles.insert(remote_handle, handle);
                        if link.remote_attached(remote_handle, source, target) {
                            self.events.push_back(Event::LinkRemoteOpen(handle));
                        }
                    }
                    None => warn!("ignoring attach for unknown link {}", name),
                }
            }
            Frame::Detach {
                handle: remote_handle,
                error,
                ..
            } => match self.remote_handles.remove(&remote_handle) {
                Some(handle) => {
                    if let Some(link) = self.links.get_mut(handle) {
                        if let Some(condition) = &error {
                            warn!("link {} detached by peer: {}", link.name(), condition);
                        }
                        if link.remote_detached(error) {
                            self.events.push_back(Event::LinkRemoteClose(handle));
                        }
                    }
                }
                None => warn!("ignoring detach for unknown remote handle {}", remote_handle),
            },
            Frame::Flow {
                handle: remote_handle,
                delivery_count,
                link_credit,
            } => {
                let handle = self.local_handle(remote_handle)?;
                if let Some(link) = self.links.get_mut(handle) {
                    link.remote_flow(delivery_count, link_credit);
                    self.events.push_back(Event::LinkFlow(handle));
                }
            }
            Frame::Transfer {
                handle: remote_handle,
                delivery_id,
                delivery_tag,
                settled,
                message,
            } => {
                let handle = self.local_handle(remote_handle)?;
                let link = self.link_or_err(handle)?;
                if !link.is_receiver() {
                    return UnexpectedFrameSnafu {
                        frame: format!("transfer on sender link {}", link.name()),
                    }
                    .fail();
                }
                link.transfer_received();
                let delivery = Delivery::new(
                    delivery_id,
                    delivery_tag,
                    handle,
                    Direction::Incoming,
                    settled,
                );
                if !settled {
                    self.incoming.insert(delivery_id, delivery.clone());
                }
                self.events
                    .push_back(Event::Message(handle, message, delivery));
            }
            Frame::Disposition {
                role,
                delivery_id,
                settled,
                state,
            } => {
                // A disposition from the receiving peer refers to deliveries we sent.
                let table = match role {
                    Role::Receiver => &mut self.outgoing,
                    Role::Sender => &mut self.incoming,
                };
                let delivery = match table.get(&delivery_id) {
                    Some(delivery) => delivery.clone(),
                    None => {
                        warn!("ignoring disposition for unknown delivery {}", delivery_id);
                        return Ok(());
                    }
                };
                delivery.apply_remote(state, settled);
                if settled {
                    if delivery.direction() == Direction::Outgoing {
                        table.shift_remove(&delivery_id);
                        delivery.settle();
                    }
                    self.events
                        .push_back(Event::Settled(delivery.link_handle(), delivery));
                }
            }
        }
        Ok(())
    }

    fn local_handle(&self, remote_handle: u32) -> Result<u32> {
        self.remote_handles
            .get(&remote_handle)
            .copied()
            .context(UnexpectedFrameSnafu {
                frame: format!("frame for unattached remote handle {}", remote_handle),
            })
    }

    fn dispatch_events(&mut self) -> Result<()> {
        while let Some(event) = self.events.pop_front() {
            self.dispatch(event)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, event: Event) -> Result<()> {
        let Container {
            connection,
            links,
            handler,
            ..
        } = self;

        match event {
            Event::ConnectionRemoteOpen => {
                debug!("connection to {} opened by peer", connection.url());
                if let Some(handler) = handler {
                    handler.on_connection_remote_open(connection)?;
                }
            }
            Event::ConnectionRemoteClose => {
                if connection.remote_condition().is_some() {
                    for (_, link) in links.iter_mut() {
                        if let Some(link_handler) = link.handler.as_mut() {
                            link_handler.on_connection_error(connection)?;
                        }
                    }
                }
                if let Some(handler) = handler {
                    handler.on_connection_remote_close(connection)?;
                }
            }
            Event::LinkRemoteOpen(handle) => {
                if let Some(link) = links.get_mut(handle) {
                    with_link_handler(link, |h, link| h.on_link_remote_open(link))?;
                    if let Some(handler) = handler {
                        handler.on_link_remote_open(link)?;
                    }
                }
            }
            Event::LinkRemoteClose(handle) => {
                if let Some(link) = links.get_mut(handle) {
                    if link.remote_condition().is_some() {
                        with_link_handler(link, |h, link| h.on_link_error(link))?;
                    }
                    with_link_handler(link, |h, link| h.on_link_remote_close(link))?;
                    if let Some(handler) = handler {
                        handler.on_link_remote_close(link)?;
                    }
                }
            }
            Event::LinkFlow(handle) => {
                if let Some(link) = links.get_mut(handle) {
                    with_link_handler(link, |h, link| h.on_link_flow(link))?;
                }
            }
            Event::Message(handle, message, delivery) => match links.get_mut(handle) {
                Some(link) if link.handler.is_some() => {
                    with_link_handler(link, |h, link| h.on_message(link, message, delivery))?;
                }
                Some(link) => match handler {
                    Some(handler) => handler.on_message(link, message, delivery)?,
                    None => debug!("no handler for message on link {}", link.name()),
                },
                None => debug!("dropping message for released link handle {}", handle),
            },
            Event::Settled(handle, delivery) => {
                if let Some(link) = links.get_mut(handle) {
                    with_link_handler(link, |h, link| h.on_settled(link, &delivery))?;
                }
            }
            Event::Disconnected => {
                if let Some(handler) = handler {
                    handler.on_disconnected(connection)?;
                }
            }
        }
        Ok(())
    }

    /// Write every pending local change to the transport as one batch.
    pub(crate) fn flush(&mut self) {
        if self.transport_closed {
            self.reap_released_links();
            return;
        }

        let mut frames = Vec::new();

        if self.connection.state().local() != State::Uninitialized
            && !self.connection.open_sent
        {
            self.connection.open_sent = true;
            frames.push(Frame::Open {
                container_id: self.id.clone(),
                hostname: self.connection.hostname().map(str::to_string),
                properties: self.connection.properties().clone(),
            });
        }

        if self.connection.open_sent && !self.connection.close_sent {
            self.flush_links(&mut frames);
            self.flush_dispositions(&mut frames);
            self.flush_detaches(&mut frames);
        }

        if self.connection.state().local() == State::Closed
            && !self.connection.close_sent
        {
            self.connection.close_sent = true;
            frames.push(Frame::Close { error: None });
        }

        if !frames.is_empty() {
            for frame in &frames {
                trace!("sending frame {}", frame);
            }
            if self.transport.send(frames).is_err() {
                self.transport_gone();
            }
        }
        self.reap_released_links();
    }

    fn flush_links(&mut self, frames: &mut Vec<Frame>) {
        for (&handle, link) in self.links.iter_mut() {
            if !link.attach_sent {
                link.attach_sent = true;
                frames.push(Frame::Attach {
                    name: link.name().to_string(),
                    handle,
                    role: link.role(),
                    source: Some(link.source().clone()),
                    target: Some(link.target().clone()),
                    snd_settle_mode: link.snd_settle_mode,
                    rcv_settle_mode: link.rcv_settle_mode,
                });
            }
            if link.detach_sent {
                continue;
            }
            if let Some((delivery_count, link_credit)) = link.take_flow() {
                frames.push(Frame::Flow {
                    handle,
                    delivery_count,
                    link_credit,
                });
            }
            let presettled = link.is_presettled();
            while let Some((message, delivery)) = link.next_transfer() {
                if presettled {
                    delivery.settle();
                    delivery.apply_remote(None, true);
                }
                frames.push(Frame::Transfer {
                    handle,
                    delivery_id: delivery.id(),
                    delivery_tag: delivery.tag(),
                    settled: presettled,
                    message,
                });
            }
        }
    }

    fn flush_dispositions(&mut self, frames: &mut Vec<Frame>) {
        let mut settled = Vec::new();
        for (&delivery_id, delivery) in self.incoming.iter() {
            if let Some((state, is_settled)) = delivery.take_pending_disposition() {
                frames.push(Frame::Disposition {
                    role: Role::Receiver,
                    delivery_id,
                    settled: is_settled,
                    state,
                });
                if is_settled {
                    settled.push(delivery_id);
                }
            }
        }
        for delivery_id in settled {
            self.incoming.shift_remove(&delivery_id);
        }
    }

    fn flush_detaches(&mut self, frames: &mut Vec<Frame>) {
        for (&handle, link) in self.links.iter_mut() {
            if link.state().local() == State::Closed && !link.detach_sent {
                link.detach_sent = true;
                debug!("detaching link {}", link.name());
                frames.push(Frame::Detach {
                    handle,
                    closed: true,
                    error: None,
                });
            }
        }
    }
}

fn with_link_handler<F>(link: &mut Link, f: F) -> Result<()>
where
    F: FnOnce(&mut dyn Handler, &mut Link) -> Result<()>,
{
    let mut handler = match link.handler.take() {
        Some(handler) => handler,
        None => return Ok(()),
    };
    let result = f(handler.as_mut(), link);
    link.handler = Some(handler);
    result
}
