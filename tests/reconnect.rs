//! Client reconnection against a server that starts late.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use roomcast::session::{OFFLINE_NOTICE, RECONNECTED_NOTICE};
use roomcast::{
    run_receive_duty, run_send_duty, ChatServer, ClientConfig, ClientSession, MemoryTerminal,
};

const BACKOFF: Duration = Duration::from_millis(200);

/// Reserve a local port with nothing listening on it
async fn free_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    addr
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..300 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_client_reconnects_once_server_starts() {
    let addr = free_addr().await;
    let config = ClientConfig::new(&addr, "alice").with_backoff(BACKOFF);
    let session = Arc::new(ClientSession::new(&config));
    let terminal = Arc::new(MemoryTerminal::new());

    assert!(session.connect().await.is_none());

    let receive = {
        let session = Arc::clone(&session);
        let terminal = Arc::clone(&terminal);
        tokio::spawn(async move { run_receive_duty(&*session, &*terminal, None).await })
    };

    // server down: one offline notice per backoff interval
    tokio::time::sleep(BACKOFF * 2 + BACKOFF / 2).await;
    assert!(terminal.count_containing("Trying to connect in") >= 2);
    assert!(!session.is_connected());
    assert_eq!(terminal.count_containing(RECONNECTED_NOTICE), 0);

    let server = ChatServer::from_listener(TcpListener::bind(addr.as_str()).await.unwrap());
    let registry = server.registry();
    tokio::spawn(server.run());

    wait_until(|| session.is_connected()).await;
    wait_until(|| terminal.count_containing(RECONNECTED_NOTICE) == 1).await;
    wait_until(|| registry.list() == vec!["alice"]).await;

    receive.abort();
}

#[tokio::test]
async fn test_offline_lines_are_dropped_not_queued() {
    let addr = free_addr().await;
    let config = ClientConfig::new(&addr, "alice").with_backoff(BACKOFF);
    let session = ClientSession::new(&config);
    let terminal = MemoryTerminal::new();

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send("lost message".to_string()).unwrap();
    tx.send("/exit".to_string()).unwrap();
    run_send_duty(&session, &terminal, rx).await;

    assert_eq!(terminal.lines(), vec![OFFLINE_NOTICE]);
}

#[tokio::test]
async fn test_two_sessions_chat_through_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let server = ChatServer::from_listener(listener);
    let registry = server.registry();
    tokio::spawn(server.run());

    let alice = Arc::new(ClientSession::new(&ClientConfig::new(&addr, "alice")));
    let alice_view = Arc::new(MemoryTerminal::new());
    let alice_reader = alice.connect().await;
    wait_until(|| registry.list() == vec!["alice"]).await;

    let bob = Arc::new(ClientSession::new(&ClientConfig::new(&addr, "bob")));
    let bob_view = Arc::new(MemoryTerminal::new());
    let bob_reader = bob.connect().await;
    wait_until(|| registry.list() == vec!["alice", "bob"]).await;

    let tasks = [
        {
            let (s, t) = (Arc::clone(&alice), Arc::clone(&alice_view));
            tokio::spawn(async move { run_receive_duty(&*s, &*t, alice_reader).await })
        },
        {
            let (s, t) = (Arc::clone(&bob), Arc::clone(&bob_view));
            tokio::spawn(async move { run_receive_duty(&*s, &*t, bob_reader).await })
        },
    ];

    wait_until(|| alice_view.count_containing("User bob entered the room") == 1).await;

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send("hi".to_string()).unwrap();
    drop(tx);
    run_send_duty(&*alice, &*alice_view, rx).await;

    wait_until(|| bob_view.count_containing("[alice]: hi") == 1).await;
    // alice sees only her local echo
    assert_eq!(alice_view.count_containing("[alice]: hi"), 1);

    for task in tasks {
        task.abort();
    }
}
