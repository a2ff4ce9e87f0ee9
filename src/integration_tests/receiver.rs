use super::*;
use crate::container::{Handler, Link};
use crate::{
    Condition, Delivery, Disposition, Error, Message, ReceiverOptions, Role, SenderOptions,
    TerminusKind,
};
use std::sync::{Arc, Mutex};

fn preloaded(bodies: &[&'static str]) -> PeerConfig {
    bodies.iter().fold(PeerConfig::default(), |config, body| {
        config.preload("q", Message::new(*body))
    })
}

#[test]
fn receive_accept_then_time_out() {
    with_peer(preloaded(&["one"]), |conn, peer| {
        let receiver = conn
            .create_receiver(Some("q"), ReceiverOptions::default())
            .unwrap();
        let message = receiver.receive().unwrap();
        assert_eq!(message.body(), b"one");
        receiver.accept().unwrap();

        match receiver.receive_timeout(short()).unwrap_err() {
            Error::Timeout { message } => assert_eq!(
                message,
                "connection amqp://localhost:5672 timed out: receiving on receiver test-client-q"
            ),
            err => panic!("unexpected error {}", err),
        }

        // the accept went out while waiting for the second message
        assert!(peer.eventually(|observed| observed.dispositions
            == vec![(0, Some(Disposition::Accepted), true)]));
    })
}

#[test]
fn messages_sent_are_received() {
    with_conn(|conn| {
        let sender = conn.create_sender(Some("q"), SenderOptions::default()).unwrap();
        let receiver = conn
            .create_receiver(Some("q"), ReceiverOptions::default())
            .unwrap();
        for body in &["a", "b", "c"] {
            sender.send(Message::new(*body)).unwrap();
        }
        for body in &["a", "b", "c"] {
            assert_eq!(receiver.receive().unwrap().body(), body.as_bytes());
            receiver.accept().unwrap();
        }
    })
}

#[test]
fn settlement_outcomes() {
    with_peer(preloaded(&["a", "b", "c", "d"]), |conn, peer| {
        let receiver = conn
            .create_receiver(Some("q"), ReceiverOptions::default())
            .unwrap();
        receiver.receive().unwrap();
        receiver.reject().unwrap();
        receiver.receive().unwrap();
        receiver.release(false).unwrap();
        receiver.receive().unwrap();
        receiver.release(true).unwrap();
        receiver.receive().unwrap();
        receiver.settle(None).unwrap();
        let _ = conn.wait_timeout(|_| false, short(), "settle");

        assert!(peer.eventually(|observed| observed.dispositions
            == vec![
                (0, Some(Disposition::Rejected), true),
                (1, Some(Disposition::Released), true),
                (2, Some(Disposition::Modified), true),
                (3, None, true),
            ]));
    })
}

#[test]
fn settle_applies_to_oldest_received() {
    with_peer(preloaded(&["a", "b"]), |conn, peer| {
        let receiver = conn
            .create_receiver(Some("q"), ReceiverOptions::default().credit(Some(2)))
            .unwrap();
        assert_eq!(receiver.receive().unwrap().body(), b"a");
        assert_eq!(receiver.receive().unwrap().body(), b"b");
        receiver.reject().unwrap();
        receiver.accept().unwrap();
        match receiver.accept().unwrap_err() {
            Error::NothingToSettle => (),
            err => panic!("unexpected error {}", err),
        }
        let _ = conn.wait_timeout(|_| false, short(), "settle");

        assert!(peer.eventually(|observed| observed.dispositions
            == vec![
                (0, Some(Disposition::Rejected), true),
                (1, Some(Disposition::Accepted), true),
            ]));
    })
}

#[test]
fn zero_credit_asks_for_one_message() {
    with_peer(preloaded(&["a", "b"]), |conn, _| {
        let receiver = conn
            .create_receiver(Some("q"), ReceiverOptions::default().credit(Some(0)))
            .unwrap();
        assert_eq!(receiver.link().credit(), 0);
        match receiver.receive_timeout(short()) {
            Ok(message) => assert_eq!(message.body(), b"a"),
            Err(err) => panic!("unexpected error {}", err),
        }
        assert_eq!(receiver.link().credit(), 0);
    })
}

#[test]
fn source_mismatch() {
    let config = PeerConfig::default().rename("q", "elsewhere");
    with_conn_config(config, |conn| {
        match conn.create_receiver(Some("q"), ReceiverOptions::default()) {
            Err(Error::AddressMismatch { kind, remote, .. }) => {
                assert_eq!(kind, TerminusKind::Source);
                assert_eq!(remote.as_deref(), Some("elsewhere"));
            }
            Err(err) => panic!("unexpected error {}", err),
            Ok(_) => panic!("receiver should not open"),
        }
    })
}

#[test]
fn refused_receiver() {
    let config = PeerConfig::default().refuse("q", Condition::named("amqp:not-found"));
    with_conn_config(config, |conn| {
        match conn.create_receiver(Some("q"), ReceiverOptions::default()) {
            Err(Error::LinkOpen { name, condition }) => {
                assert_eq!(name, "test-client-q");
                assert_eq!(condition, Some(Condition::named("amqp:not-found")));
            }
            Err(err) => panic!("unexpected error {}", err),
            Ok(_) => panic!("receiver should not open"),
        }
    })
}

#[test]
fn dynamic_receiver_gets_address_from_peer() {
    with_conn(|conn| {
        let receiver = conn
            .create_receiver(None, ReceiverOptions::default().dynamic(true))
            .unwrap();
        assert_eq!(receiver.link().source_address(), None);
        assert_eq!(
            receiver.link().remote_source_address().as_deref(),
            Some("dynamic-0")
        );
    })
}

#[test]
fn remote_detach_is_reported() {
    with_peer(PeerConfig::default(), |conn, peer| {
        let receiver = conn
            .create_receiver(Some("q"), ReceiverOptions::default())
            .unwrap();
        peer.detach(
            "q",
            Some(Condition::new("amqp:resource-deleted", "queue gone")),
        );
        let err = receiver.receive().unwrap_err();
        assert_eq!(
            err.to_string(),
            "receiver test-client-q from q closed due to: amqp:resource-deleted: queue gone"
        );
        match err {
            Error::LinkDetached { role, .. } => assert_eq!(role, Role::Receiver),
            err => panic!("unexpected error {}", err),
        }
        assert!(receiver.link().state().is_remote_closed());
    })
}

#[derive(Clone, Default)]
struct Collect {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl Handler for Collect {
    fn on_message(
        &mut self,
        _link: &mut Link,
        message: Message,
        delivery: Delivery,
    ) -> crate::Result<()> {
        delivery.update(Disposition::Accepted);
        delivery.settle();
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}

#[test]
fn custom_handler_receives_messages() {
    with_peer(preloaded(&["a"]), |conn, peer| {
        let collect = Collect::default();
        let receiver = conn
            .create_receiver(
                Some("q"),
                ReceiverOptions::default().handler(collect.clone()),
            )
            .unwrap();
        conn.wait(
            |_| !collect.messages.lock().unwrap().is_empty(),
            "collecting",
        )
        .unwrap();
        assert_eq!(collect.messages.lock().unwrap()[0].body(), b"a");
        let _ = conn.wait_timeout(|_| false, short(), "settle");
        assert!(peer.eventually(|observed| observed.dispositions.len() == 1));

        match receiver.receive().unwrap_err() {
            Error::HandlerInstalled { name } => assert_eq!(name, "test-client-q"),
            err => panic!("unexpected error {}", err),
        }
        match receiver.accept().unwrap_err() {
            Error::HandlerInstalled { .. } => (),
            err => panic!("unexpected error {}", err),
        }
    })
}

fn with_conn_config<F: FnOnce(&BlockingConnection)>(config: PeerConfig, f: F) {
    with_peer(config, |conn, _| f(conn))
}
