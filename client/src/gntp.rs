//! TCP transport for GNTP
//!
//! One request per connection: send the packet, read the response
//! frame, and when a callback handler is attached read the second
//! frame the server sends after user interaction.

use std::io::{BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use anyhow::{Context, Result};
use protocol::constants::{FRAME_TERMINATOR, GNTP_PORT};
use protocol::gntp::{GntpCodec, Notification};
use protocol::response::{self, Response, ResponseStatus};
use protocol::Session;
use tracing::{debug, trace};

/// Connection factory, injectable so tests exchange frames with an
/// in-memory stream instead of a live server.
pub trait Connector {
    type Stream: Read + Write;

    fn connect(&self) -> Result<Self::Stream>;
}

/// Connects a fresh TCP stream per request, as GNTP's
/// `Connection: close` model expects.
pub struct TcpConnector {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpConnector {
    pub fn new(host: impl Into<String>) -> Self {
        TcpConnector {
            host: host.into(),
            port: GNTP_PORT,
            timeout: Duration::from_secs(5),
        }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self) -> Result<TcpStream> {
        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .with_context(|| format!("Failed to resolve growl host: {}", self.host))?
            .next()
            .with_context(|| format!("No addresses for growl host: {}", self.host))?;

        let stream = TcpStream::connect_timeout(&addr, self.timeout)
            .with_context(|| format!("Failed to connect to {}", addr))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .context("Failed to set read timeout")?;
        stream
            .set_write_timeout(Some(self.timeout))
            .context("Failed to set write timeout")?;

        Ok(stream)
    }
}

/// GNTP client for one session.
pub struct GntpClient<C = TcpConnector> {
    session: Session,
    connector: C,
    codec: GntpCodec,
}

impl GntpClient<TcpConnector> {
    pub fn connect(host: &str, session: Session) -> Self {
        GntpClient::with_connector(TcpConnector::new(host), session)
    }
}

impl<C: Connector> GntpClient<C> {
    pub fn with_connector(connector: C, session: Session) -> Self {
        GntpClient {
            session,
            connector,
            codec: GntpCodec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Registers the application and its notification types. Servers
    /// reject NOTIFY requests from unregistered applications.
    pub fn register(&mut self) -> Result<Response> {
        let packet = self.codec.registration_packet(&self.session)?;
        self.exchange(&packet, None)
    }

    /// Sends one notification.
    pub fn notify(&mut self, note: &Notification) -> Result<Response> {
        let packet = self.codec.notification_packet(&self.session, note, false)?;
        self.exchange(&packet, None)
    }

    /// Sends one notification and waits for the interaction callback,
    /// invoking `handler` with the callback frame. Mutually exclusive
    /// with a callback URL on the notification.
    pub fn notify_with_callback<F>(&mut self, note: &Notification, mut handler: F) -> Result<Response>
    where
        F: FnMut(&Response),
    {
        let packet = self.codec.notification_packet(&self.session, note, true)?;
        self.exchange(&packet, Some(&mut handler))
    }

    fn exchange(
        &mut self,
        packet: &[u8],
        handler: Option<&mut dyn FnMut(&Response)>,
    ) -> Result<Response> {
        let mut stream = BufReader::new(self.connector.connect()?);

        stream
            .get_mut()
            .write_all(packet)
            .context("Failed to send GNTP request")?;
        stream
            .get_mut()
            .flush()
            .context("Failed to flush GNTP request")?;
        trace!("Sent {} byte GNTP request", packet.len());

        let frame = read_frame(&mut stream)?;
        let response = response::parse_response(&frame)?;
        debug!("GNTP response: {:?}", response.status);

        if let Some(handler) = handler {
            // the callback arrives as a second frame on the same
            // connection, after the user interacts
            let frame = read_frame(&mut stream)?;
            let callback = response::parse_response(&frame)?;
            if callback.status == ResponseStatus::Callback {
                handler(&callback);
            }
        }

        Ok(response)
    }
}

/// Reads one frame, up to and including the triple-CRLF terminator.
/// Responses are text-only, so scanning byte-wise through the buffered
/// reader is fine and leaves any following frame unconsumed.
fn read_frame<S: Read>(stream: &mut BufReader<S>) -> Result<Vec<u8>> {
    let mut frame = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        let n = stream.read(&mut byte).context("Failed to read GNTP response")?;
        if n == 0 {
            break;
        }
        frame.push(byte[0]);
        if frame.ends_with(FRAME_TERMINATOR) {
            break;
        }
    }

    if frame.is_empty() {
        anyhow::bail!("Connection closed before any response");
    }

    Ok(frame)
}
