use crate::connection::{
    Channel, Dialer, Frame, TransportError, CLOSE_ABNORMAL, CLOSE_NO_STATUS,
};
use derivative::*;
use native_tls::{HandshakeError as TlsHandshakeError, TlsConnector};
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};
use tungstenite::client::IntoClientRequest;
use tungstenite::error::ProtocolError;
use tungstenite::handshake::HandshakeError;
use tungstenite::protocol::frame::coding::CloseCode;
use tungstenite::protocol::frame::CloseFrame;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Error as WsError, Message, WebSocket};

/// Opens `ws://` and `wss://` connections over blocking TCP sockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketDialer;

#[derive(Derivative)]
#[derivative(Debug)]
pub struct WebSocketChannel {
    #[derivative(Debug = "ignore")]
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
    read_deadline: Option<Instant>,
    write_deadline: Option<Instant>,
}

impl Dialer for WebSocketDialer {
    type Channel = WebSocketChannel;

    fn dial(
        &self,
        url: &str,
        handshake_timeout: Duration,
    ) -> Result<WebSocketChannel, TransportError> {
        let deadline = Instant::now() + handshake_timeout;
        let request = url.into_client_request()?;
        let (secure, host, port) = {
            let uri = request.uri();
            let secure = match uri.scheme_str() {
                Some("ws") => false,
                Some("wss") => true,
                other => {
                    return Err(TransportError::Other(format!(
                        "unsupported url scheme {:?}",
                        other.unwrap_or_default()
                    )))
                }
            };
            let host = uri
                .host()
                .map(|host| host.trim_start_matches('[').trim_end_matches(']').to_owned())
                .ok_or_else(|| TransportError::Other(format!("missing host in url {}", url)))?;
            let port = uri.port_u16().unwrap_or(if secure { 443 } else { 80 });
            (secure, host, port)
        };

        let stream = connect_tcp(&host, port, deadline)?;
        stream.set_nodelay(true)?;
        let left = remaining(deadline).ok_or(TransportError::Timeout)?;
        stream.set_read_timeout(Some(left))?;
        stream.set_write_timeout(Some(left))?;

        let stream = if secure {
            wrap_tls(&host, stream)?
        } else {
            MaybeTlsStream::Plain(stream)
        };
        let (socket, response) = tungstenite::client(request, stream).map_err(|err| match err {
            HandshakeError::Interrupted(_) => TransportError::Timeout,
            HandshakeError::Failure(err) => TransportError::from(err),
        })?;
        debug!(
            "Handshake with {} completed with status {}",
            url,
            response.status()
        );

        let channel = WebSocketChannel {
            socket,
            read_deadline: None,
            write_deadline: None,
        };
        let stream = channel.stream()?;
        stream.set_read_timeout(None)?;
        stream.set_write_timeout(None)?;
        Ok(channel)
    }
}

impl WebSocketChannel {
    fn stream(&self) -> io::Result<&TcpStream> {
        match self.socket.get_ref() {
            MaybeTlsStream::Plain(stream) => Ok(stream),
            MaybeTlsStream::NativeTls(stream) => Ok(stream.get_ref()),
            _ => Err(io::Error::new(
                io::ErrorKind::Other,
                "stream does not support deadlines",
            )),
        }
    }

    fn arm_read(&self) -> Result<(), TransportError> {
        if let Some(deadline) = self.read_deadline {
            let left = remaining(deadline).ok_or(TransportError::Timeout)?;
            self.stream()?.set_read_timeout(Some(left))?;
        }
        Ok(())
    }

    fn arm_write(&self) -> Result<(), TransportError> {
        if let Some(deadline) = self.write_deadline {
            let left = remaining(deadline).ok_or(TransportError::Timeout)?;
            self.stream()?.set_write_timeout(Some(left))?;
        }
        Ok(())
    }
}

impl Channel for WebSocketChannel {
    fn set_read_deadline(&mut self, deadline: Instant) -> io::Result<()> {
        let stream = self.stream()?;
        if let Some(left) = remaining(deadline) {
            stream.set_read_timeout(Some(left))?;
        }
        self.read_deadline = Some(deadline);
        Ok(())
    }

    fn set_write_deadline(&mut self, deadline: Instant) -> io::Result<()> {
        let stream = self.stream()?;
        if let Some(left) = remaining(deadline) {
            stream.set_write_timeout(Some(left))?;
        }
        self.write_deadline = Some(deadline);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame, TransportError> {
        // Control frames are answered by tungstenite; keep waiting for data
        // until the same deadline.
        loop {
            self.arm_read()?;
            match self.socket.read()? {
                Message::Text(text) => return Ok(Frame::Text(text.as_str().to_owned())),
                Message::Binary(data) => return Ok(Frame::Binary(data.to_vec())),
                Message::Close(frame) => {
                    let (code, reason) = frame
                        .map(|frame| (u16::from(frame.code), frame.reason.as_str().to_owned()))
                        .unwrap_or((CLOSE_NO_STATUS, String::new()));
                    debug!("Received close frame {} '{}'", code, reason);
                    return Err(TransportError::Closed { code, reason });
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                    trace!("Skipping control frame");
                }
            }
        }
    }

    fn write_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.arm_write()?;
        self.socket.send(Message::text(text.to_owned()))?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.arm_write()?;
        self.socket.close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        }))?;
        Ok(())
    }
}

impl From<WsError> for TransportError {
    fn from(err: WsError) -> Self {
        match err {
            WsError::Io(err) => TransportError::from(err),
            WsError::Tls(err) => TransportError::Network(err.to_string()),
            WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
                TransportError::Closed {
                    code: CLOSE_ABNORMAL,
                    reason: "unexpected EOF".to_owned(),
                }
            }
            other => TransportError::Other(other.to_string()),
        }
    }
}

fn remaining(deadline: Instant) -> Option<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left == Duration::from_secs(0) {
        None
    } else {
        Some(left)
    }
}

fn connect_tcp(host: &str, port: u16, deadline: Instant) -> Result<TcpStream, TransportError> {
    let mut last_error = None;
    for addr in (host, port).to_socket_addrs()? {
        let left = remaining(deadline).ok_or(TransportError::Timeout)?;
        match TcpStream::connect_timeout(&addr, left) {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                trace!("Connecting to {} failed: {}", addr, err);
                last_error = Some(err);
            }
        }
    }
    Err(last_error.map(TransportError::from).unwrap_or_else(|| {
        TransportError::Network(format!("no addresses found for {}", host))
    }))
}

fn wrap_tls(host: &str, stream: TcpStream) -> Result<MaybeTlsStream<TcpStream>, TransportError> {
    let connector = TlsConnector::new().map_err(|err| TransportError::Other(err.to_string()))?;
    match connector.connect(host, stream) {
        Ok(stream) => Ok(MaybeTlsStream::NativeTls(stream)),
        Err(TlsHandshakeError::WouldBlock(_)) => Err(TransportError::Timeout),
        Err(TlsHandshakeError::Failure(err)) => Err(TransportError::Network(err.to_string())),
    }
}
