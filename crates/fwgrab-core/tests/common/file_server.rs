//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed set of paths with 200 (or a redirect) and answers 404 with a
//! small HTML body for everything else, so tests can check that error pages
//! never end up on disk.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Route {
    Body(Vec<u8>),
    /// 302 to the given absolute path on this server.
    Redirect(String),
    /// 200 announcing `declared_len` bytes, then only `body` before closing.
    Truncated { declared_len: usize, body: Vec<u8> },
}

pub const NOT_FOUND_BODY: &[u8] = b"<html><body>404 Not Found</body></html>";

/// Starts a server in a background thread. Returns the base URL without a
/// trailing slash (e.g. "http://127.0.0.1:12345"). Runs until the process exits.
pub fn start(routes: Vec<(&str, Route)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<HashMap<String, Route>> = Arc::new(
        routes
            .into_iter()
            .map(|(path, route)| (path.to_string(), route))
            .collect(),
    );
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            thread::spawn(move || handle(stream, &routes));
        }
    });
    format!("http://127.0.0.1:{}", port)
}

/// Starts a listener that accepts connections and never answers them.
/// Returns the base URL without a trailing slash.
pub fn start_silent() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });
    format!("http://127.0.0.1:{}", port)
}

fn handle(mut stream: TcpStream, routes: &HashMap<String, Route>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut first = request.lines().next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("");
    let path = first.next().unwrap_or("/");

    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    }
    match routes.get(path) {
        Some(Route::Body(body)) => respond(&mut stream, "200 OK", &[], body),
        Some(Route::Redirect(to)) => {
            let location = format!("Location: {}\r\n", to);
            respond(&mut stream, "302 Found", &[location.as_str()], b"")
        }
        Some(Route::Truncated { declared_len, body }) => {
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                declared_len
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(body);
        }
        None => respond(&mut stream, "404 Not Found", &[], NOT_FOUND_BODY),
    }
}

fn respond(stream: &mut TcpStream, status: &str, extra_headers: &[&str], body: &[u8]) {
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n",
        status,
        body.len(),
        extra_headers.concat()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}
