//! Minimal HTTP/1.1 server standing in for the archive API in integration tests.
//!
//! Answers every GET with the next scripted reply; once the script runs out the
//! last reply is repeated. Request paths are recorded for assertions.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn json(body: &str) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

pub struct SizeServer {
    /// Base URL to use as the API prefix, e.g. "http://127.0.0.1:12345/api".
    pub api_prefix: String,
    paths: Arc<Mutex<Vec<String>>>,
}

impl SizeServer {
    pub fn requests(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start(script: Vec<Reply>) -> SizeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let script = Arc::new(Mutex::new((script, 0usize)));
    let paths = Arc::new(Mutex::new(Vec::new()));
    let paths_srv = Arc::clone(&paths);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let script = Arc::clone(&script);
            let paths = Arc::clone(&paths_srv);
            thread::spawn(move || handle(stream, &script, &paths));
        }
    });
    SizeServer {
        api_prefix: format!("http://127.0.0.1:{}/api", port),
        paths,
    }
}

fn next_reply(script: &Mutex<(Vec<Reply>, usize)>) -> Reply {
    let mut guard = script.lock().unwrap();
    let (replies, next) = &mut *guard;
    if replies.is_empty() {
        return Reply::status(404);
    }
    let idx = (*next).min(replies.len() - 1);
    *next += 1;
    replies[idx].clone()
}

fn handle(
    mut stream: std::net::TcpStream,
    script: &Mutex<(Vec<Reply>, usize)>,
    paths: &Mutex<Vec<String>>,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("").to_string();
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }
    paths.lock().unwrap().push(path);

    let reply = next_reply(script);
    let response = format!(
        "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.status,
        reply.body.len(),
        reply.body
    );
    let _ = stream.write_all(response.as_bytes());
}
