//! Stand-in for the smart-picking vision server.
//!
//! Answers every request line with a legacy pose datagram whose coordinates
//! drift a little on each reply. Handy for running `vision_client` locally.
//!
//! Usage:
//!   cargo run --example mock_server -- [port]
//!   SMARTPICK_HOST=127.0.0.1 SMARTPICK_PORT=<port> cargo run --example vision_client

use std::io::{BufRead, BufReader, Write as _};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const DEFAULT_PORT: u16 = 59002;

fn main() {
    env_logger::init();

    let port = std::env::args()
        .nth(1)
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    let listener = TcpListener::bind(("0.0.0.0", port)).unwrap_or_else(|e| {
        eprintln!("Failed to bind port {}: {}", port, e);
        std::process::exit(1);
    });
    eprintln!("[MOCK] listening on 0.0.0.0:{}", port);

    let replies = Arc::new(AtomicU64::new(0));

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[TCP] accept error: {}", e);
                continue;
            }
        };

        let replies = replies.clone();
        std::thread::spawn(move || handle_connection(stream, replies));
    }
}

/// Reply to each request line until the client disconnects.
fn handle_connection(stream: TcpStream, replies: Arc<AtomicU64>) {
    let peer = stream.peer_addr().map(|a| a.to_string()).unwrap_or_default();
    eprintln!("[MOCK] client connected: {}", peer);

    let mut writer = match stream.try_clone() {
        Ok(w) => w,
        Err(e) => {
            eprintln!("[MOCK] clone failed: {}", e);
            return;
        }
    };
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("[MOCK] read error: {}", e);
                break;
            }
        }
        eprintln!("[MOCK] request {:?}", line);

        let n = replies.fetch_add(1, Ordering::Relaxed) as f64;
        let reply = format!(
            "PICK,{},0,0,0,{:.3},{:.3},{:.3},{:.4},{:.4},{:.4}\n",
            n as u64,
            250.0 + n,
            -120.0 + 0.5 * n,
            35.0,
            0.0,
            0.0,
            (0.1 * n).sin(),
        );
        if let Err(e) = writer.write_all(reply.as_bytes()) {
            eprintln!("[MOCK] write error: {}", e);
            break;
        }
    }

    eprintln!("[MOCK] client disconnected: {}", peer);
}
