//! Loopback WebSocket servers for tests.

use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;
use tungstenite::protocol::frame::coding::CloseCode;
use tungstenite::protocol::frame::CloseFrame;
use tungstenite::WebSocket;

pub type ServerSocket = WebSocket<TcpStream>;

/// Accepts a single connection on a loopback port and hands the upgraded
/// socket to `handler` on its own thread. Returns the `ws://` url to dial.
pub fn serve<F>(handler: F) -> String
where
    F: FnOnce(&mut ServerSocket) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("ws://{}/", listener.local_addr().unwrap());
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let mut socket = match tungstenite::accept(stream) {
            Ok(socket) => socket,
            Err(_) => return,
        };
        handler(&mut socket);
        // Let the client finish its side of the close handshake.
        while socket.read().is_ok() {}
    });
    url
}

pub fn close_with(socket: &mut ServerSocket, code: u16) {
    let _ = socket.close(Some(CloseFrame {
        code: CloseCode::from(code),
        reason: "".into(),
    }));
}

/// A url nothing listens on.
pub fn unused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("ws://{}/", listener.local_addr().unwrap());
    drop(listener);
    url
}
