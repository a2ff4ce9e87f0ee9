use super::peer::PEER_CONTAINER_ID;
use super::*;
use crate::{Condition, Error, Frame, ReceiverOptions, WaitTimeout};
use std::time::Instant;

#[test]
fn open_and_close() {
    init_logging();
    let (client, server) = pipe();
    let peer = TestPeer::spawn(server, PeerConfig::default());
    let conn = BlockingConnection::open(TEST_URL, client, test_options()).unwrap();

    assert_eq!(conn.url(), "amqp://localhost:5672");
    assert_eq!(conn.container_id(), "test-client");
    assert_eq!(
        conn.lock().connection().remote_container_id(),
        Some(PEER_CONTAINER_ID)
    );

    conn.close().unwrap();
    drop(peer);
}

#[test]
fn open_advertises_hostname_and_properties() {
    with_peer(PeerConfig::default(), |_, peer| {
        let observed = peer.observed();
        match &observed.open {
            Some(Frame::Open {
                container_id,
                hostname,
                properties,
            }) => {
                assert_eq!(container_id, "test-client");
                assert_eq!(hostname.as_deref(), Some("localhost"));
                assert_eq!(properties["product"], crate::built_info::PKG_NAME);
                assert_eq!(properties["version"], crate::built_info::PKG_VERSION);
            }
            other => panic!("unexpected open {:?}", other),
        }
    })
}

#[test]
fn wait_times_out() {
    with_conn(|conn| {
        let start = Instant::now();
        let err = conn
            .wait_timeout(|_| false, WaitTimeout::After(Duration::from_millis(200)), "nothing")
            .unwrap_err();
        let elapsed = start.elapsed();

        assert_eq!(
            err.to_string(),
            "connection amqp://localhost:5672 timed out: nothing"
        );
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_secs(2));
    })
}

#[test]
fn wait_returns_once_condition_holds() {
    with_conn(|conn| {
        let mut calls = 0;
        conn.wait(
            |_| {
                calls += 1;
                true
            },
            "immediately",
        )
        .unwrap();
        assert_eq!(calls, 1);
    })
}

#[test]
fn remote_close_is_reported() {
    with_peer(PeerConfig::default(), |conn, peer| {
        let receiver = conn
            .create_receiver(Some("q"), ReceiverOptions::default())
            .unwrap();
        peer.close(Some(Condition::new("amqp:connection:forced", "shutting down")));

        match receiver.receive().unwrap_err() {
            Error::ConnectionClosed { url, condition } => {
                assert_eq!(url, "amqp://localhost:5672");
                assert_eq!(
                    condition,
                    Some(Condition::new("amqp:connection:forced", "shutting down"))
                );
            }
            err => panic!("unexpected error {}", err),
        }
        assert!(!conn.lock().connection().state().is_local_active());
    })
}

#[test]
fn remote_close_without_receivers() {
    with_peer(PeerConfig::default(), |conn, peer| {
        peer.close(None);
        let err = conn
            .wait_timeout(|_| false, WaitTimeout::After(Duration::from_secs(2)), "close")
            .unwrap_err();
        assert!(err.is_connection_error());
        match err {
            Error::ConnectionClosed {
                condition: None, ..
            } => (),
            err => panic!("unexpected error {}", err),
        }
    })
}

#[test]
fn disconnect_is_reported() {
    with_peer(PeerConfig::default(), |conn, peer| {
        peer.disconnect();
        match conn
            .wait_timeout(|_| false, WaitTimeout::After(Duration::from_secs(2)), "anything")
            .unwrap_err()
        {
            Error::Disconnected { url } => assert_eq!(url, "amqp://localhost:5672"),
            err => panic!("unexpected error {}", err),
        }

        // the transport stays gone
        match conn.wait_timeout(|_| false, short(), "anything").unwrap_err() {
            Error::Disconnected { .. } => (),
            err => panic!("unexpected error {}", err),
        }
    })
}

#[test]
fn invalid_url() {
    let (client, _server) = pipe();
    match BlockingConnection::open("http://localhost", client, test_options()) {
        Err(Error::InvalidUrl { url }) => assert_eq!(url, "http://localhost/"),
        Err(err) => panic!("unexpected error {}", err),
        Ok(_) => panic!("connection should not open"),
    }
}
