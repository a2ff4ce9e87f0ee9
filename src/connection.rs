use crate::connection_options::{ConnectionOptions, ReceiverOptions, SenderOptions};
use crate::container::{Connection, Container, Handler, Link};
use crate::errors::*;
use crate::receiver::BlockingReceiver;
use crate::sender::BlockingSender;
use crate::transport::Transport;
use log::debug;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// How long a blocking call may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTimeout {
    /// Use the connection's timeout (see
    /// [`ConnectionOptions::timeout`](struct.ConnectionOptions.html#method.timeout)).
    Default,

    /// Wait until the condition holds, however long that takes.
    Never,

    /// Wait at most the given duration.
    After(Duration),
}

impl Default for WaitTimeout {
    fn default() -> WaitTimeout {
        WaitTimeout::Default
    }
}

impl From<Duration> for WaitTimeout {
    fn from(duration: Duration) -> WaitTimeout {
        WaitTimeout::After(duration)
    }
}

/// A connection whose operations block until the peer has responded.
///
/// The connection owns a [`Container`](container/struct.Container.html). Every blocking call locks
/// it and pumps it on the calling thread until the call's condition holds, so at most one thread
/// drives the connection at a time. Senders, receivers and request/response clients borrow the
/// connection they were created on.
pub struct BlockingConnection {
    container: Mutex<Container>,
    url: String,
    timeout: Option<Duration>,
}

impl Drop for BlockingConnection {
    fn drop(&mut self) {
        let container = match self.container.get_mut() {
            Ok(container) => container,
            Err(_) => return,
        };
        if container.connection().state().is_local_active() {
            debug!("closing connection to {} on drop", self.url);
            container.connection_mut().close();
            // best effort: write the close frame, but do not wait for the answer
            let _ = container.do_work(Some(Duration::from_millis(0)));
        }
    }
}

impl BlockingConnection {
    /// Open a connection to the peer at the far end of `transport`, blocking until the peer has
    /// answered our open.
    ///
    /// `url` must use the `amqp` or `amqps` scheme; a missing host defaults to `localhost` and a
    /// missing port to the scheme's standard port. The host is advertised to the peer as the
    /// connection hostname.
    pub fn open<T: Transport>(
        url: &str,
        transport: T,
        options: ConnectionOptions,
    ) -> Result<BlockingConnection> {
        let container = options.make_container(transport);
        BlockingConnection::with_container(url, container, options)
    }

    /// Like [`open`](#method.open), but with a container the caller has already built. The
    /// `container_id` and `handle_max` options are ignored.
    pub fn with_container(
        url: &str,
        mut container: Container,
        options: ConnectionOptions,
    ) -> Result<BlockingConnection> {
        let url = amqp_url::parse(url)?;
        let hostname = url.host_str().map(str::to_string);
        let url = url.to_string();

        container.connect(
            url.clone(),
            hostname,
            options.make_properties(),
            Box::new(ConnectionHandler),
        );
        let connection = BlockingConnection {
            container: Mutex::new(container),
            url,
            timeout: options.timeout,
        };
        connection.wait(
            |container| !container.connection().state().is_remote_uninitialized(),
            "opening connection",
        )?;
        debug!("connection to {} is open", connection.url);
        Ok(connection)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn container_id(&self) -> String {
        self.lock().id().to_string()
    }

    /// The default timeout applied to blocking calls.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Create a sender. If `address` is `None`, the sender is anonymous and each message must
    /// carry its own address.
    pub fn create_sender(
        &self,
        address: Option<&str>,
        options: SenderOptions,
    ) -> Result<BlockingSender<'_>> {
        BlockingSender::open(self, address, options)
    }

    /// Create a receiver from `address`, or from an address assigned by the peer if the options
    /// ask for a dynamic source.
    pub fn create_receiver(
        &self,
        address: Option<&str>,
        options: ReceiverOptions,
    ) -> Result<BlockingReceiver<'_>> {
        BlockingReceiver::open(self, address, options)
    }

    /// Block, pumping the connection, until `condition` holds or the default timeout elapses.
    /// `msg` describes what is being waited for and appears in the timeout error.
    pub fn wait<F>(&self, condition: F, msg: &str) -> Result<()>
    where
        F: FnMut(&Container) -> bool,
    {
        self.wait_timeout(condition, WaitTimeout::Default, msg)
    }

    pub fn wait_timeout<F>(&self, mut condition: F, timeout: WaitTimeout, msg: &str) -> Result<()>
    where
        F: FnMut(&Container) -> bool,
    {
        let mut container = self.lock();
        container.flush();
        let timeout = match timeout {
            WaitTimeout::Default => self.timeout,
            WaitTimeout::Never => None,
            WaitTimeout::After(timeout) => Some(timeout),
        };

        let deadline = match timeout {
            Some(timeout) => Instant::now() + timeout,
            None => {
                while !condition(&*container) {
                    container.do_work(None)?;
                }
                return Ok(());
            }
        };

        while !condition(&*container) {
            let now = Instant::now();
            if now >= deadline || !container.do_work(Some(deadline - now))? {
                return TimeoutSnafu {
                    message: format!("connection {} timed out: {}", self.url, msg),
                }
                .fail();
            }
        }
        Ok(())
    }

    /// Pump the connection until it has been closed by both sides.
    pub fn run(&self) -> Result<()> {
        self.lock().run()
    }

    /// Close the connection, blocking until the peer has acknowledged the close.
    pub fn close(self) -> Result<()> {
        debug!("closing connection to {}", self.url);
        self.lock().connection_mut().close();
        self.wait(
            |container| !container.connection().state().is_remote_active(),
            "closing connection",
        )
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Container> {
        self.container.lock().unwrap()
    }

    // For drop paths, which must not panic on a lock poisoned by an earlier panic.
    pub(crate) fn try_lock(&self) -> Option<MutexGuard<'_, Container>> {
        self.container.lock().ok()
    }
}

// Turns unsolicited closes into errors for whichever blocking call is pumping.
struct ConnectionHandler;

impl Handler for ConnectionHandler {
    fn on_link_remote_close(&mut self, link: &mut Link) -> Result<()> {
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

    fn on_connection_remote_close(&mut self, connection: &mut Connection) -> Result<()> {
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

    fn on_disconnected(&mut self, connection: &mut Connection) -> Result<()> {
        DisconnectedSnafu {
            url: connection.url(),
        }
        .fail()
    }
}

mod amqp_url {
    use crate::errors::*;
    use snafu::ResultExt;
    use url::Url;

    pub(super) fn parse(url: &str) -> Result<Url> {
        let url = with_default_host(url);
        let mut parsed = Url::parse(&url).context(ParseUrlSnafu { url: url.as_str() })?;
        populate_host_and_port(&mut parsed)?;
        Ok(parsed)
    }

    // `Url` refuses an empty host followed by a port, so `amqp://:35` becomes
    // `amqp://localhost:35` before parsing.
    fn with_default_host(url: &str) -> String {
        match url.find("://") {
            Some(i) if url[i + 3..].starts_with(':') => {
                format!("{}://localhost{}", &url[..i], &url[i + 3..])
            }
            _ => url.to_string(),
        }
    }

    fn populate_host_and_port(url: &mut Url) -> Result<()> {
        if !url.has_host() || url.host_str() == Some("") {
            url.set_host(Some("localhost"))
                .context(ParseUrlSnafu { url: url.as_str() })?;
        }
        let default_port = match url.scheme() {
            "amqp" => 5672,
            "amqps" => 5671,
            _ => return InvalidUrlSnafu { url: url.as_str() }.fail(),
        };
        url.set_port(Some(url.port().unwrap_or(default_port)))
            .map_err(|()| InvalidUrlSnafu { url: url.as_str() }.build())
    }

}
