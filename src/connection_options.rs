use crate::container::{Container, Handler, DEFAULT_HANDLE_MAX};
use crate::link_options::LinkOption;
use indexmap::IndexMap;
use std::fmt;
use std::time::Duration;

/// Options that control a [`BlockingConnection`](struct.BlockingConnection.html).
///
/// `ConnectionOptions` uses the builder pattern. The default settings are equivalent to
///
/// ```rust
/// use amqp_sync::ConnectionOptions;
/// use std::time::Duration;
///
/// # fn default_connection_options() -> ConnectionOptions {
/// ConnectionOptions::default()
///     .timeout(Some(Duration::from_secs(60)))
///     .container_id(None)
///     .handle_max(1023)
///     .information(None)
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionOptions {
    pub(crate) timeout: Option<Duration>,
    pub(crate) container_id: Option<String>,
    pub(crate) handle_max: u32,
    information: Option<String>,
    properties: IndexMap<String, String>,
}

impl Default for ConnectionOptions {
    // NOTE: If we change this, make sure to change the doc comment above.
    fn default() -> Self {
        ConnectionOptions {
            timeout: Some(Duration::from_secs(60)),
            container_id: None,
            handle_max: DEFAULT_HANDLE_MAX,
            information: None,
            properties: IndexMap::new(),
        }
    }
}

impl ConnectionOptions {
    /// Sets the default timeout for blocking calls on the connection. `None` means blocking calls
    /// wait forever unless given an explicit timeout.
    pub fn timeout(self, timeout: Option<Duration>) -> Self {
        ConnectionOptions { timeout, ..self }
    }

    /// Sets the id of the container. If `None` (the default), a random UUID is used. Generated
    /// link names are prefixed with it.
    pub fn container_id(self, container_id: Option<String>) -> Self {
        ConnectionOptions {
            container_id,
            ..self
        }
    }

    /// Sets the highest link handle this connection will allocate. Once every handle up to
    /// `handle_max` has been used, handles of closed links are reused.
    pub fn handle_max(self, handle_max: u32) -> Self {
        ConnectionOptions { handle_max, ..self }
    }

    /// Sets the "information" string advertised to the peer in the connection properties.
    pub fn information(self, information: Option<String>) -> Self {
        ConnectionOptions {
            information,
            ..self
        }
    }

    /// Adds a connection property advertised to the peer.
    pub fn property<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub(crate) fn make_container<T: crate::Transport>(&self, transport: T) -> Container {
        let mut container = match &self.container_id {
            Some(id) => Container::with_id(id.clone(), transport),
            None => Container::new(transport),
        };
        container.set_handle_max(self.handle_max);
        container
    }

    // Properties sent in our Open frame: information about this crate, then any set by the
    // caller (which may override ours).
    pub(crate) fn make_properties(&self) -> IndexMap<String, String> {
        let mut properties = IndexMap::new();
        properties.insert(
            "product".to_string(),
            crate::built_info::PKG_NAME.to_string(),
        );
        properties.insert(
            "version".to_string(),
            crate::built_info::PKG_VERSION.to_string(),
        );
        properties.insert(
            "platform".to_string(),
            format!(
                "{} / {}",
                crate::built_info::CFG_OS,
                crate::built_info::RUSTC_VERSION
            ),
        );
        if let Some(information) = &self.information {
            properties.insert("information".to_string(), information.clone());
        }
        for (k, v) in &self.properties {
            properties.insert(k.clone(), v.clone());
        }
        properties
    }
}

/// Options for [`BlockingConnection::create_sender`](struct.BlockingConnection.html#method.create_sender).
///
/// The default sender has a generated name, no handler of its own and no link options.
#[derive(Default)]
pub struct SenderOptions {
    pub(crate) name: Option<String>,
    pub(crate) handler: Option<Box<dyn Handler>>,
    pub(crate) options: Vec<LinkOption>,
}

impl fmt::Debug for SenderOptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SenderOptions")
            .field("name", &self.name)
            .field("handler", &self.handler.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl SenderOptions {
    /// Sets the link name. If not set, the name is `"<container id>-<address>"`, or a generated
    /// UUID if that is unavailable.
    pub fn name<T: Into<String>>(self, name: T) -> Self {
        SenderOptions {
            name: Some(name.into()),
            ..self
        }
    }

    /// Installs a handler for this link's events.
    pub fn handler<H: Handler + 'static>(self, handler: H) -> Self {
        SenderOptions {
            handler: Some(Box::new(handler)),
            ..self
        }
    }

    pub fn option(mut self, option: LinkOption) -> Self {
        self.options.push(option);
        self
    }
}

/// Options for [`BlockingConnection::create_receiver`](struct.BlockingConnection.html#method.create_receiver).
///
/// The default receiver has a generated name, a credit window of 1, a non-dynamic source and
/// receives messages through [`receive`](struct.BlockingReceiver.html#method.receive).
#[derive(Default)]
pub struct ReceiverOptions {
    pub(crate) name: Option<String>,
    pub(crate) credit: Option<u32>,
    pub(crate) dynamic: bool,
    pub(crate) handler: Option<Box<dyn Handler>>,
    pub(crate) options: Vec<LinkOption>,
}

impl fmt::Debug for ReceiverOptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ReceiverOptions")
            .field("name", &self.name)
            .field("credit", &self.credit)
            .field("dynamic", &self.dynamic)
            .field("handler", &self.handler.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl ReceiverOptions {
    /// Sets the link name. If not set, the name is `"<container id>-<address>"`, or a generated
    /// UUID if that is unavailable.
    pub fn name<T: Into<String>>(self, name: T) -> Self {
        ReceiverOptions {
            name: Some(name.into()),
            ..self
        }
    }

    /// Sets the prefetch window. The link is granted this much credit when it opens and, when
    /// messages are received through [`receive`](struct.BlockingReceiver.html#method.receive),
    /// credit is topped back up to it as messages arrive. `Some(0)` grants nothing up front;
    /// `receive` then asks for one message at a time.
    pub fn credit(self, credit: Option<u32>) -> Self {
        ReceiverOptions { credit, ..self }
    }

    /// Ask the peer to create the source node and assign its address.
    pub fn dynamic(self, dynamic: bool) -> Self {
        ReceiverOptions { dynamic, ..self }
    }

    /// Installs a handler for this link's messages. Receivers with their own handler cannot use
    /// [`receive`](struct.BlockingReceiver.html#method.receive) or the settlement methods.
    pub fn handler<H: Handler + 'static>(self, handler: H) -> Self {
        ReceiverOptions {
            handler: Some(Box::new(handler)),
            ..self
        }
    }

    pub fn option(mut self, option: LinkOption) -> Self {
        self.options.push(option);
        self
    }
}
