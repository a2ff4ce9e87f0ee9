use crate::{pipe, BlockingConnection, ConnectionOptions};
use std::sync::Once;
use std::time::Duration;

mod connection;
mod receiver;
mod sender;

use peer::{PeerConfig, TestPeer};

const TEST_URL: &str = "amqp://";

static INIT_LOGGING: Once = Once::new();

fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

fn test_options() -> ConnectionOptions {
    ConnectionOptions::default()
        .timeout(Some(Duration::from_secs(5)))
        .container_id(Some("test-client".to_string()))
}

// The connection is dropped (and closes) before the peer is told to stop.
fn with_peer<F: FnOnce(&BlockingConnection, &TestPeer)>(config: PeerConfig, f: F) {
    init_logging();
    let (client, server) = pipe();
    let peer = TestPeer::spawn(server, config);
    let conn = BlockingConnection::open(TEST_URL, client, test_options()).unwrap();
    f(&conn, &peer);
    drop(conn);
    drop(peer);
}

fn with_conn<F: FnOnce(&BlockingConnection)>(f: F) {
    with_peer(PeerConfig::default(), |conn, _| f(conn))
}

fn short() -> crate::WaitTimeout {
    crate::WaitTimeout::After(Duration::from_millis(100))
}
