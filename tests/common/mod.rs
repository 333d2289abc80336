//! Scripted in-process BaseX server for integration tests.
//!
//! Speaks the server side of the client protocol on a loopback port with a
//! fixed user table and a handful of canned queries, and records every
//! request it receives so tests can assert on the exchange.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

pub const NONCE: &str = "1369578179679";
pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "admin";

pub const RANGE_QUERY: &str = "for $i in 1 to 3 return $i";
pub const XML_QUERY: &str = "for $i in 1 to 10 return <xml>Text { $i }</xml>";
pub const EMPTY_QUERY: &str = "()";
pub const FAILING_QUERY: &str = "error(xs:QName('err:FOER0000'))";

/// A request observed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Login { username: String, accepted: bool },
    Command(String),
    QueryOpen(String),
    QueryNext(String),
    QueryClose(String),
    Exit,
    Disconnected,
}

/// Handle to a running mock server.
pub struct MockServer {
    pub addr: SocketAddr,
    events: Arc<Mutex<Vec<Event>>>,
}

impl MockServer {
    /// Bind to an ephemeral loopback port and serve connections in the background.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));

        let log = events.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, log.clone()));
            }
        });

        Self { addr, events }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Snapshot of the requests received so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Wait until the server has seen `event`, for requests with no response.
    pub async fn wait_for(&self, event: &Event) {
        for _ in 0..200 {
            if self.events().contains(event) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("server never received {event:?}, got {:?}", self.events());
    }
}

fn md5_hex(data: &[u8]) -> String {
    use md5::{Digest, Md5};
    hex::encode(Md5::digest(data))
}

fn items_for(query: &str) -> Option<Vec<String>> {
    match query {
        RANGE_QUERY => Some((1..=3).map(|i| i.to_string()).collect()),
        XML_QUERY => Some((1..=10).map(|i| format!("<xml>Text {i}</xml>")).collect()),
        EMPTY_QUERY | FAILING_QUERY => Some(Vec::new()),
        _ => None,
    }
}

struct Cursor {
    query: String,
    items: std::vec::IntoIter<String>,
}

async fn serve(stream: TcpStream, log: Arc<Mutex<Vec<Event>>>) {
    let record = |event: Event| log.lock().unwrap().push(event);
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    macro_rules! frame {
        () => {{
            let mut buf = Vec::new();
            match reader.read_until(0, &mut buf).await {
                Ok(n) if n > 0 && buf.last() == Some(&0) => {
                    buf.pop();
                    buf
                }
                _ => {
                    record(Event::Disconnected);
                    return;
                }
            }
        }};
    }

    // Login
    if writer.write_all(format!("{NONCE}\0").as_bytes()).await.is_err() {
        return;
    }
    let username = String::from_utf8(frame!()).unwrap();
    let digest = String::from_utf8(frame!()).unwrap();
    let expected = {
        let mut input = md5_hex(PASSWORD.as_bytes()).into_bytes();
        input.extend_from_slice(NONCE.as_bytes());
        md5_hex(&input)
    };
    let accepted = username == USERNAME && digest == expected;
    record(Event::Login {
        username,
        accepted,
    });
    if !accepted {
        let _ = writer.write_all(b"\x01").await;
        return;
    }
    let _ = writer.write_all(b"\0").await;

    let mut cursors: HashMap<String, Cursor> = HashMap::new();
    let mut next_id = 0u32;

    loop {
        let request = frame!();
        let mut response = Vec::new();

        match request.first().copied() {
            Some(0x00) => {
                let query = String::from_utf8_lossy(&request[1..]).into_owned();
                record(Event::QueryOpen(query.clone()));
                match items_for(&query) {
                    Some(items) => {
                        let id = next_id.to_string();
                        next_id += 1;
                        response.extend_from_slice(id.as_bytes());
                        response.extend_from_slice(b"\0\0");
                        cursors.insert(
                            id,
                            Cursor {
                                query,
                                items: items.into_iter(),
                            },
                        );
                    }
                    None => {
                        response.extend_from_slice(b"\0\x01");
                        response.extend_from_slice(
                            b"Stopped at line 1, column 1: Unknown query.\0",
                        );
                    }
                }
            }
            Some(0x01) => {
                let id = String::from_utf8_lossy(&request[1..]).into_owned();
                record(Event::QueryNext(id.clone()));
                match cursors.get_mut(&id) {
                    Some(cursor) if cursor.query == FAILING_QUERY => {
                        response.extend_from_slice(b"\0\x01");
                        response.extend_from_slice(b"FOER0000: Halted on error().\0");
                    }
                    Some(cursor) => {
                        let item = cursor.items.next().unwrap_or_default();
                        response.extend_from_slice(item.as_bytes());
                        response.extend_from_slice(b"\0\0");
                    }
                    None => {
                        response.extend_from_slice(b"\0\x01");
                        response.extend_from_slice(format!("Unknown query id: {id}\0").as_bytes());
                    }
                }
            }
            Some(0x02) => {
                let id = String::from_utf8_lossy(&request[1..]).into_owned();
                cursors.remove(&id);
                record(Event::QueryClose(id));
                continue;
            }
            _ => {
                let command = String::from_utf8_lossy(&request).into_owned();
                if command == "exit" {
                    record(Event::Exit);
                    return;
                }
                record(Event::Command(command.clone()));
                match command.as_str() {
                    "xquery 1+1" => {
                        response.extend_from_slice(b"2\0Query executed in 0.41 ms.\0\0")
                    }
                    "xquery <a>{ 1 to 2000 }</a>" => {
                        let numbers: Vec<String> = (1..=2000).map(|i| i.to_string()).collect();
                        response.extend_from_slice(format!("<a>{}</a>\0", numbers.join(" ")).as_bytes());
                        response.extend_from_slice(b"Query executed in 1.73 ms.\0\0");
                    }
                    _ => {
                        response.extend_from_slice(b"\0");
                        response.extend_from_slice(format!("Unknown command: {command}\0").as_bytes());
                        response.push(0x01);
                    }
                }
            }
        }

        if writer.write_all(&response).await.is_err() {
            record(Event::Disconnected);
            return;
        }
    }
}
