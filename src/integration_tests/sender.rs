use super::*;
use crate::{
    Condition, Disposition, Error, LinkOption, Message, SenderOptions, TerminusKind, WaitTimeout,
};
use std::panic::{self, AssertUnwindSafe};

#[test]
fn send_is_accepted() {
    with_peer(PeerConfig::default(), |conn, peer| {
        let sender = conn.create_sender(Some("q"), SenderOptions::default()).unwrap();
        assert_eq!(sender.name(), "test-client-q");
        assert_eq!(sender.link().remote_target_address().as_deref(), Some("q"));

        let delivery = sender.send(Message::new("hello")).unwrap();
        assert!(delivery.settled());
        assert!(delivery.is_locally_settled());
        assert_eq!(delivery.remote_state(), Some(Disposition::Accepted));

        let observed = peer.observed();
        assert_eq!(observed.received.len(), 1);
        let (address, message, settled) = &observed.received[0];
        assert_eq!(address, "q");
        assert_eq!(message.body(), b"hello");
        assert!(!settled);
    })
}

#[test]
fn rejected_send_fails() {
    let config = PeerConfig::default().outcome("q", Disposition::Rejected);
    with_peer(config, |conn, _| {
        let sender = conn.create_sender(Some("q"), SenderOptions::default()).unwrap();
        match sender.send(Message::new("hello")).unwrap_err() {
            Error::Send { state } => assert_eq!(state, Some(Disposition::Rejected)),
            err => panic!("unexpected error {}", err),
        }
    })
}

#[test]
fn caller_chooses_error_states() {
    let config = PeerConfig::default().outcome("q", Disposition::Released);
    with_peer(config, |conn, _| {
        let sender = conn.create_sender(Some("q"), SenderOptions::default()).unwrap();
        match sender.send(Message::new("a")).unwrap_err() {
            Error::Send { state } => assert_eq!(state, Some(Disposition::Released)),
            err => panic!("unexpected error {}", err),
        }

        let delivery = sender
            .send_with(
                Message::new("b"),
                WaitTimeout::Default,
                &[Disposition::Rejected],
            )
            .unwrap();
        assert_eq!(delivery.remote_state(), Some(Disposition::Released));
    })
}

#[test]
fn send_waits_for_credit() {
    let config = PeerConfig::default().sender_credit(0);
    with_peer(config, |conn, peer| {
        let sender = conn.create_sender(Some("q"), SenderOptions::default()).unwrap();
        match sender
            .send_with(Message::new("stuck"), short(), crate::DEFAULT_ERROR_STATES)
            .unwrap_err()
        {
            Error::Timeout { message } => {
                assert_eq!(
                    message,
                    "connection amqp://localhost:5672 timed out: sending on sender test-client-q"
                );
            }
            err => panic!("unexpected error {}", err),
        }
        assert_eq!(sender.link().queued(), 1);
        assert!(peer.observed().received.is_empty());
    })
}

#[test]
fn anonymous_sender_uses_message_address() {
    with_peer(PeerConfig::default(), |conn, peer| {
        let sender = conn.create_sender(None, SenderOptions::default()).unwrap();
        assert_eq!(sender.link().target_address(), None);

        sender
            .send(Message::new("routed").with_address("elsewhere"))
            .unwrap();
        assert_eq!(peer.observed().received[0].0, "elsewhere");
    })
}

#[test]
fn at_most_once_does_not_wait_for_the_peer() {
    with_peer(PeerConfig::default(), |conn, peer| {
        let sender = conn
            .create_sender(
                Some("q"),
                SenderOptions::default().option(LinkOption::AtMostOnce),
            )
            .unwrap();
        let delivery = sender.send(Message::new("fire")).unwrap();
        assert!(delivery.settled());
        assert_eq!(delivery.remote_state(), None);

        assert!(peer.eventually(|observed| observed.received.len() == 1));
        assert!(peer.observed().received[0].2);
        assert!(peer.observed().dispositions.is_empty());
    })
}

#[test]
fn target_mismatch() {
    let config = PeerConfig::default().rename("q", "other");
    with_peer(config, |conn, peer| {
        match conn.create_sender(Some("q"), SenderOptions::default()) {
            Err(Error::AddressMismatch {
                name,
                kind,
                local,
                remote,
            }) => {
                assert_eq!(name, "test-client-q");
                assert_eq!(kind, TerminusKind::Target);
                assert_eq!(local, "q");
                assert_eq!(remote.as_deref(), Some("other"));
            }
            Err(err) => panic!("unexpected error {}", err),
            Ok(_) => panic!("sender should not open"),
        }

        // the link is detached on our side
        let _ = conn.wait_timeout(|_| false, short(), "detach");
        assert!(peer.eventually(|observed| observed.detached == vec!["test-client-q"]));
    })
}

#[test]
fn refused_link() {
    let condition = Condition::new("amqp:unauthorized-access", "not allowed");
    let config = PeerConfig::default().refuse("forbidden", condition.clone());
    with_peer(config, |conn, peer| {
        let err = conn
            .create_sender(
                Some("forbidden"),
                SenderOptions::default().name("s1"),
            )
            .err()
            .unwrap();
        assert!(err.is_link_error());
        assert_eq!(err.to_string(), "failed to open link s1");
        match err {
            Error::LinkOpen {
                name,
                condition: Some(c),
            } => {
                assert_eq!(name, "s1");
                assert_eq!(c, condition);
            }
            err => panic!("unexpected error {}", err),
        }

        // our detach goes out and the connection stays usable
        let _ = conn.wait_timeout(|_| false, short(), "detach");
        assert!(peer.eventually(|observed| observed.detached == vec!["s1"]));
        let sender = conn.create_sender(Some("q"), SenderOptions::default()).unwrap();
        sender.send(Message::new("still works")).unwrap();
    })
}

#[test]
fn remote_detach_fails_pending_send() {
    let config = PeerConfig::default().sender_credit(0);
    with_peer(config, |conn, peer| {
        let sender = conn.create_sender(Some("q"), SenderOptions::default()).unwrap();
        peer.detach("q", Some(Condition::named("amqp:link:detach-forced")));
        match sender.send(Message::new("never")).unwrap_err() {
            Error::LinkDetached {
                name,
                address,
                condition,
                ..
            } => {
                assert_eq!(name, "test-client-q");
                assert_eq!(address.as_deref(), Some("q"));
                assert_eq!(condition, Some(Condition::named("amqp:link:detach-forced")));
            }
            err => panic!("unexpected error {}", err),
        }
        assert!(!sender.link().state().is_local_active());
    })
}

#[test]
fn close_sender() {
    with_peer(PeerConfig::default(), |conn, peer| {
        let sender = conn.create_sender(Some("q"), SenderOptions::default()).unwrap();
        let handle = sender.link().handle();
        sender.close().unwrap();
        assert!(peer.eventually(|observed| observed.detached == vec!["test-client-q"]));

        // released links are forgotten
        let _ = conn.wait_timeout(|_| false, short(), "release");
        assert!(conn.lock().link(handle).is_none());
    })
}

#[test]
fn dropping_sender_after_poisoned_lock() {
    init_logging();
    let (client, server) = pipe();
    let peer = TestPeer::spawn(server, PeerConfig::default());
    let conn = BlockingConnection::open(TEST_URL, client, test_options()).unwrap();
    let sender = conn.create_sender(Some("q"), SenderOptions::default()).unwrap();

    let poisoned = panic::catch_unwind(AssertUnwindSafe(|| {
        let _container = conn.lock();
        panic!("panicking while the connection is locked");
    }));
    assert!(poisoned.is_err());

    drop(sender);
    drop(conn);
    drop(peer);
}
