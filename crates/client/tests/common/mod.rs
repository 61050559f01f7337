//! Loopback peer used by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tcplink_client::{ClientConfig, LinkEvent};

/// Upper bound for waiting on a single event.
pub const EVENT_WAIT: Duration = Duration::from_secs(5);

/// Builds a reply from one inbound read; `None` sends nothing.
pub type Responder = Arc<dyn Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync>;

pub async fn listener() -> (TcpListener, u32) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, u32::from(port))
}

/// A port on which nothing listens.
pub async fn closed_port() -> u32 {
    let (listener, port) = listener().await;
    drop(listener);
    port
}

/// Short intervals so reconnect scenarios finish quickly.
pub fn fast_config() -> ClientConfig {
    ClientConfig {
        connect_timeout: Duration::from_secs(2),
        retry_interval: Duration::from_millis(200),
        ..ClientConfig::default()
    }
}

/// Accepts connections forever, optionally greeting each one, and answers
/// every read through `respond`.
pub fn serve(
    listener: TcpListener,
    greeting: Option<Vec<u8>>,
    respond: Responder,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(handle(stream, greeting.clone(), respond.clone()));
        }
    })
}

async fn handle(mut stream: TcpStream, greeting: Option<Vec<u8>>, respond: Responder) {
    if let Some(greeting) = greeting
        && stream.write_all(&greeting).await.is_err()
    {
        return;
    }
    let mut buf = [0u8; 1024];
    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        if let Some(reply) = respond(&buf[..n])
            && stream.write_all(&reply).await.is_err()
        {
            return;
        }
    }
}

pub fn echo() -> Responder {
    Arc::new(|bytes| Some(bytes.to_vec()))
}

pub fn fixed(reply: &[u8]) -> Responder {
    let reply = reply.to_vec();
    Arc::new(move |_| Some(reply.clone()))
}

/// Next event, failing the test if none arrives in time.
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<LinkEvent>) -> LinkEvent {
    tokio::time::timeout(EVENT_WAIT, rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

/// Skips events until `pred` matches, returning the match.
pub async fn wait_for(
    rx: &mut mpsc::UnboundedReceiver<LinkEvent>,
    pred: impl Fn(&LinkEvent) -> bool,
) -> LinkEvent {
    loop {
        let event = next_event(rx).await;
        if pred(&event) {
            return event;
        }
    }
}

/// Concatenates message texts until `expected_chars` characters arrived.
pub async fn collect_text(
    rx: &mut mpsc::UnboundedReceiver<LinkEvent>,
    expected_chars: usize,
) -> String {
    let mut text = String::new();
    while text.chars().count() < expected_chars {
        match next_event(rx).await {
            LinkEvent::Message(env) if !env.is_error() => text.push_str(&env.text),
            other => panic!("unexpected event while collecting text: {other:?}"),
        }
    }
    text
}
