//! End-to-end tests against a small RESP server on loopback.
//!
//! The server runs on tokio worker threads; the client is driven from the
//! test thread exactly as a host application would drive it.

use bytes::{Buf, BytesMut};
use pollkv::protocol::parse_reply;
use pollkv::{Client, ClientConfig, CommandError, ConnectionState, Reply, SinkEvent};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Clone, Copy)]
enum Behavior {
    /// Answer every command.
    Serve,
    /// Read one command, then close without answering.
    HangUpAfterFirst,
}

async fn spawn_server(behavior: Behavior) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve(stream, behavior));
        }
    });

    port
}

async fn serve(mut stream: TcpStream, behavior: Behavior) -> std::io::Result<()> {
    let mut store: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();
    let mut buf = BytesMut::with_capacity(4096);

    loop {
        while let Ok(Some((request, consumed))) = parse_reply(&buf) {
            buf.advance(consumed);
            if let Behavior::HangUpAfterFirst = behavior {
                return Ok(());
            }
            let reply = execute(&mut store, request);
            stream.write_all(&reply.serialize()).await?;
        }

        if stream.read_buf(&mut buf).await? == 0 {
            return Ok(());
        }
    }
}

fn execute(store: &mut HashMap<Vec<u8>, Vec<u8>>, request: Reply) -> Reply {
    let args: Vec<Vec<u8>> = request
        .into_array()
        .unwrap_or_default()
        .iter()
        .filter_map(|arg| arg.as_bytes().map(<[u8]>::to_vec))
        .collect();

    match args.first().map(|name| name.to_ascii_uppercase()).as_deref() {
        Some(b"PING") => Reply::status("PONG"),
        Some(b"SET") if args.len() == 3 => {
            store.insert(args[1].clone(), args[2].clone());
            Reply::ok()
        }
        Some(b"GET") if args.len() == 2 => match store.get(&args[1]) {
            Some(value) => Reply::string(value.clone()),
            None => Reply::Nil,
        },
        Some(b"INCR") if args.len() == 2 => {
            let current = store
                .get(&args[1])
                .and_then(|v| std::str::from_utf8(v).ok()?.parse::<i64>().ok())
                .unwrap_or(0);
            store.insert(args[1].clone(), (current + 1).to_string().into_bytes());
            Reply::Integer(current + 1)
        }
        Some(b"KEYS") => Reply::Array(
            store
                .keys()
                .map(|k| Reply::string(k.clone()))
                .collect(),
        ),
        _ => Reply::error("ERR unknown command"),
    }
}

/// Calls `update` until `done` holds or five seconds pass.
fn drive_until<F>(client: &mut Client, events: &mut Vec<SinkEvent>, mut done: F)
where
    F: FnMut(&[SinkEvent]) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done(events.as_slice()) {
        assert!(Instant::now() < deadline, "timed out, events: {:?}", events);
        client.update(Duration::from_millis(10), events);
    }
}

fn replies(events: &[SinkEvent]) -> Vec<Reply> {
    events
        .iter()
        .filter_map(|e| match e {
            SinkEvent::Reply(r) => Some(r.clone()),
            _ => None,
        })
        .collect()
}

fn connected(port: u16) -> (Client, Vec<SinkEvent>) {
    let mut client = Client::new(ClientConfig::default());
    let mut events = Vec::new();
    client
        .connect("127.0.0.1", port, Duration::from_secs(2))
        .unwrap();
    drive_until(&mut client, &mut events, |e| !e.is_empty());
    assert_eq!(events, vec![SinkEvent::Connect(true)]);
    assert_eq!(client.state(), ConnectionState::Open);
    events.clear();
    (client, events)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pipelined_commands_in_order() {
    let port = spawn_server(Behavior::Serve).await;
    let (mut client, mut events) = connected(port);

    client.command(&["SET", "name", "Ariz"]).unwrap();
    client.command(&["GET", "name"]).unwrap();
    client.command(&["INCR", "hits"]).unwrap();
    client.command(&["INCR", "hits"]).unwrap();
    client.command(&["GET", "missing"]).unwrap();
    client.command(&["NOPE"]).unwrap();

    drive_until(&mut client, &mut events, |e| e.len() >= 6);

    assert_eq!(
        replies(&events),
        vec![
            Reply::ok(),
            Reply::string("Ariz"),
            Reply::Integer(1),
            Reply::Integer(2),
            Reply::Nil,
            Reply::error("ERR unknown command"),
        ]
    );
    let stats = client.stats();
    assert_eq!(stats.commands_enqueued, 6);
    assert_eq!(stats.replies_dispatched, 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_update_count_matches_dispatches() {
    let port = spawn_server(Behavior::Serve).await;
    let (mut client, mut events) = connected(port);

    for i in 0..50 {
        let key = format!("k{}", i);
        client.command(&["SET", key.as_str(), "v"]).unwrap();
    }

    let mut counted = 0;
    let deadline = Instant::now() + Duration::from_secs(5);
    while counted < 50 {
        assert!(Instant::now() < deadline);
        let before = events.len();
        let n = client.update(Duration::from_millis(10), &mut events);
        assert_eq!(n, events.len() - before);
        counted += n;
    }
    assert!(events.iter().all(|e| *e == SinkEvent::Reply(Reply::ok())));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_large_value_survives_partial_io() {
    let port = spawn_server(Behavior::Serve).await;
    let (mut client, mut events) = connected(port);

    let value: Vec<u8> = (0..4 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
    client
        .command(&[&b"SET"[..], &b"blob"[..], &value[..]])
        .unwrap();
    client.command(&["GET", "blob"]).unwrap();

    drive_until(&mut client, &mut events, |e| e.len() >= 2);
    assert_eq!(
        replies(&events),
        vec![Reply::ok(), Reply::string(value)]
    );
    assert_eq!(client.pending_bytes(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_hang_up_reports_disconnect() {
    let port = spawn_server(Behavior::HangUpAfterFirst).await;
    let (mut client, mut events) = connected(port);

    client.command(&["PING"]).unwrap();
    drive_until(&mut client, &mut events, |e| !e.is_empty());

    assert_eq!(events, vec![SinkEvent::Disconnect]);
    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(client.command(&["PING"]), Err(CommandError::NotOpen));

    let healthy = spawn_server(Behavior::Serve).await;
    events.clear();
    client
        .connect("127.0.0.1", healthy, Duration::from_secs(2))
        .unwrap();
    drive_until(&mut client, &mut events, |e| !e.is_empty());
    client.command(&["PING"]).unwrap();
    drive_until(&mut client, &mut events, |e| e.len() >= 2);
    assert_eq!(
        events,
        vec![SinkEvent::Connect(true), SinkEvent::Reply(Reply::status("PONG"))]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_refused_connect_reports_failure_once() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut client = Client::new(ClientConfig::default());
    let mut events = Vec::new();
    client
        .connect("127.0.0.1", port, Duration::from_secs(2))
        .unwrap();
    drive_until(&mut client, &mut events, |e| !e.is_empty());

    for _ in 0..5 {
        client.update(Duration::from_millis(5), &mut events);
    }
    assert_eq!(events, vec![SinkEvent::Connect(false)]);
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[test]
fn test_unreachable_connect_fails_once() {
    let mut client = Client::new(ClientConfig::default());
    let mut events = Vec::new();
    // TEST-NET-1 is never routed; the attempt either times out or is
    // rejected by the local stack.
    client
        .connect("192.0.2.1", 6379, Duration::from_millis(50))
        .unwrap();

    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(300) {
        assert_eq!(client.update(Duration::from_millis(20), &mut events), 0);
    }
    assert_eq!(events, vec![SinkEvent::Connect(false)]);
}

#[test]
fn test_invalid_arguments_are_rejected() {
    let mut client = Client::new(ClientConfig::default());
    assert!(client.connect("", 6379, Duration::from_secs(1)).is_err());
    assert!(client.connect("127.0.0.1", 0, Duration::from_secs(1)).is_err());
    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(client.command(&["PING"]), Err(CommandError::NotOpen));
}
