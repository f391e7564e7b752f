//! Minimal HTTP/1.1 server for pipeline integration tests.
//!
//! Serves a fixed route table: a path can answer with a PNG body, a 404,
//! undecodable garbage, or a delayed PNG (for cancellation tests).

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// What one route answers with.
#[derive(Debug, Clone)]
pub enum Served {
    /// 200 with the given body.
    Png(Vec<u8>),
    /// 404 with no body.
    NotFound,
    /// 200 with bytes that do not decode as an image.
    Garbage,
    /// Sleep, then 200 with the given body.
    Slow { body: Vec<u8>, delay: Duration },
}

/// Starts a server in a background thread. Returns the base URL
/// (e.g. "http://127.0.0.1:12345"). Unknown paths get a 404. The server
/// runs until the process exits.
pub fn start(routes: HashMap<String, Served>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes = Arc::new(routes);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            thread::spawn(move || handle(stream, &routes));
        }
    });
    format!("http://127.0.0.1:{}", port)
}

/// A small valid PNG, encoded in memory.
pub fn tiny_png() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        4,
        4,
        image::Rgba([200, 160, 40, 255]),
    ));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).expect("encode png");
    buf.into_inner()
}

fn handle(mut stream: std::net::TcpStream, routes: &HashMap<String, Served>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
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
    let path = match parse_path(request) {
        Some(p) => p,
        None => return,
    };

    match routes.get(&path) {
        Some(Served::Png(body)) => respond_ok(&mut stream, body, "image/png"),
        Some(Served::Garbage) => respond_ok(&mut stream, b"this is not an image", "text/plain"),
        Some(Served::Slow { body, delay }) => {
            thread::sleep(*delay);
            respond_ok(&mut stream, body, "image/png");
        }
        Some(Served::NotFound) | None => {
            let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
        }
    }
}

fn respond_ok(stream: &mut std::net::TcpStream, body: &[u8], content_type: &str) {
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
        content_type,
        body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(body);
}

fn parse_path(request: &str) -> Option<String> {
    let line = request.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    if !method.eq_ignore_ascii_case("GET") {
        return None;
    }
    Some(parts.next()?.to_string())
}
