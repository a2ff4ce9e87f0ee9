use bytes::Bytes;
use indexmap::IndexMap;
use std::fmt;
use uuid::Uuid;

/// A message id or correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageId {
    Ulong(u64),
    Uuid(Uuid),
    String(String),
}

impl From<u64> for MessageId {
    fn from(id: u64) -> MessageId {
        MessageId::Ulong(id)
    }
}

impl From<Uuid> for MessageId {
    fn from(id: Uuid) -> MessageId {
        MessageId::Uuid(id)
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> MessageId {
        MessageId::String(id)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> MessageId {
        MessageId::String(id.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MessageId::Ulong(id) => write!(f, "{}", id),
            MessageId::Uuid(id) => write!(f, "{}", id),
            MessageId::String(id) => f.write_str(id),
        }
    }
}

/// An application message.
///
/// Only the properties the blocking layer and its callers need are modelled; encoding the
/// message onto the wire is the transport's business.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    id: Option<MessageId>,
    address: Option<String>,
    subject: Option<String>,
    reply_to: Option<String>,
    correlation_id: Option<MessageId>,
    content_type: Option<String>,
    durable: bool,
    properties: IndexMap<String, String>,
    body: Bytes,
}

impl Message {
    pub fn new<B: Into<Bytes>>(body: B) -> Message {
        Message {
            body: body.into(),
            ..Message::default()
        }
    }

    pub fn with_id<T: Into<MessageId>>(self, id: T) -> Message {
        Message {
            id: Some(id.into()),
            ..self
        }
    }

    pub fn with_address<T: Into<String>>(self, address: T) -> Message {
        Message {
            address: Some(address.into()),
            ..self
        }
    }

    pub fn with_subject<T: Into<String>>(self, subject: T) -> Message {
        Message {
            subject: Some(subject.into()),
            ..self
        }
    }

    pub fn with_reply_to<T: Into<String>>(self, reply_to: T) -> Message {
        Message {
            reply_to: Some(reply_to.into()),
            ..self
        }
    }

    pub fn with_correlation_id<T: Into<MessageId>>(self, correlation_id: T) -> Message {
        Message {
            correlation_id: Some(correlation_id.into()),
            ..self
        }
    }

    pub fn with_content_type<T: Into<String>>(self, content_type: T) -> Message {
        Message {
            content_type: Some(content_type.into()),
            ..self
        }
    }

    pub fn with_durable(self, durable: bool) -> Message {
        Message { durable, ..self }
    }

    pub fn with_property<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Message {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> Option<&MessageId> {
        self.id.as_ref()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    pub fn correlation_id(&self) -> Option<&MessageId> {
        self.correlation_id.as_ref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn durable(&self) -> bool {
        self.durable
    }

    pub fn properties(&self) -> &IndexMap<String, String> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    pub fn set_address<T: Into<String>>(&mut self, address: T) {
        self.address = Some(address.into());
    }

    pub fn set_reply_to(&mut self, reply_to: Option<String>) {
        self.reply_to = reply_to;
    }

    pub fn set_correlation_id<T: Into<MessageId>>(&mut self, correlation_id: T) {
        self.correlation_id = Some(correlation_id.into());
    }
}
