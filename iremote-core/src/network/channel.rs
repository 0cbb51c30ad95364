use std::fmt;
use std::future::Future;
use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::codec::{FRAME_SIZE, FrameCodec};
use crate::error::{IRemoteError, Result};
use crate::message::Command;

/// Largest instruction text the controller sends.
pub const MAX_TEXT_LEN: usize = 2048;

/// Anything the channel can speak the protocol over.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

/// Where the controller lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    host: String,
    port: u16,
}

impl ConnectionInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Deadlines applied to every socket operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTimeouts {
    pub connect: Duration,
    pub read: Duration,
    pub write: Duration,
}

impl Default for ChannelTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            read: Duration::from_secs(5),
            write: Duration::from_secs(1),
        }
    }
}

/// The single request/response connection to the controller.
///
/// Callers must finish reading one response before sending the next
/// command; the session enforces this by holding the channel lock for a
/// whole exchange.
pub struct CommandChannel {
    transport: Option<Box<dyn Transport>>,
    info: Option<ConnectionInfo>,
    timeouts: ChannelTimeouts,
}

impl fmt::Debug for CommandChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandChannel")
            .field("open", &self.is_open())
            .field("info", &self.info)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl CommandChannel {
    pub fn new(timeouts: ChannelTimeouts) -> Self {
        Self {
            transport: None,
            info: None,
            timeouts,
        }
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    pub fn info(&self) -> Option<&ConnectionInfo> {
        self.info.as_ref()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Open a TCP connection and run the status-byte handshake.
    pub async fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        self.disconnect().await;

        let info = ConnectionInfo::new(host, port);
        let addr = info.to_string();
        debug!(%addr, "opening controller connection");

        let stream = match timeout(self.timeouts.connect, TcpStream::connect((host, port))).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(IRemoteError::ConnectionFailed { addr, source }),
            Err(_) => {
                return Err(IRemoteError::ConnectionFailed {
                    addr,
                    source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                });
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed: {e}");
        }

        self.open_with(Box::new(stream), info).await
    }

    /// Run the handshake over an already-connected transport.
    ///
    /// On any rejection the transport is dropped and the channel stays
    /// closed.
    pub async fn open_with(
        &mut self,
        mut transport: Box<dyn Transport>,
        info: ConnectionInfo,
    ) -> Result<()> {
        let mut status = [0u8; 1];
        let outcome = match timeout(self.timeouts.read, transport.read_exact(&mut status)).await {
            Err(_) => Err(IRemoteError::StatusTimeout),
            Ok(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(IRemoteError::StatusTimeout)
            }
            Ok(Err(e)) => Err(IRemoteError::InternalError(e.to_string())),
            Ok(Ok(_)) => match status[0] {
                0 => Ok(()),
                1 => Err(IRemoteError::TooManyConnections),
                2 => Err(IRemoteError::AccessDenied),
                other => Err(IRemoteError::InternalError(format!(
                    "unknown handshake status {other}"
                ))),
            },
        };

        match outcome {
            Ok(()) => {
                info!(addr = %info, "controller accepted connection");
                self.transport = Some(transport);
                self.info = Some(info);
                Ok(())
            }
            Err(e) => {
                warn!(addr = %info, "controller handshake failed: {e}");
                let _ = timeout(self.timeouts.write, transport.shutdown()).await;
                Err(e)
            }
        }
    }

    /// Close the connection. Does nothing when already closed.
    pub async fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            let _ = timeout(self.timeouts.write, transport.shutdown()).await;
            if let Some(info) = self.info.take() {
                info!(addr = %info, "controller connection closed");
            }
        }
    }

    // ── Requests ─────────────────────────────────────────────────

    /// Validate, frame and write one command.
    pub async fn send(&mut self, command: &Command) -> Result<()> {
        command.validate()?;
        let token = command.token();
        debug!(%token, "-> controller");

        let frame = FrameCodec::frame(&token);
        let limit = self.timeouts.write;
        let transport = self.transport.as_mut().ok_or(IRemoteError::NotConnected)?;
        with_deadline(limit, async {
            transport.write_all(&frame).await?;
            transport.flush().await
        })
        .await?;
        Ok(())
    }

    // ── Responses ────────────────────────────────────────────────

    /// Read exactly `n` bytes.
    pub async fn read_fixed(&mut self, n: usize) -> Result<Bytes> {
        let limit = self.timeouts.read;
        let transport = self.transport.as_mut().ok_or(IRemoteError::NotConnected)?;
        let mut buf = vec![0u8; n];
        with_deadline(limit, transport.read_exact(&mut buf)).await?;
        Ok(Bytes::from(buf))
    }

    pub async fn read_u8(&mut self) -> Result<u8> {
        let bytes = self.read_fixed(1).await?;
        Ok(bytes[0])
    }

    /// Read a big-endian count.
    pub async fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_fixed(2).await?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read a name prefixed by a one-byte length.
    pub async fn read_name(&mut self) -> Result<String> {
        let len = self.read_u8().await?;
        let bytes = self.read_fixed(usize::from(len)).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read a text prefixed by a two-byte big-endian length.
    pub async fn read_text(&mut self) -> Result<String> {
        let len = usize::from(self.read_u16().await?);
        if len > MAX_TEXT_LEN {
            return Err(IRemoteError::invalid_data(format!(
                "text of {len} bytes exceeds {MAX_TEXT_LEN}"
            )));
        }
        let bytes = self.read_fixed(len).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read a poll reply: a count followed by that many frames.
    pub async fn read_poll_batch(&mut self) -> Result<Vec<String>> {
        let count = self.read_u16().await?;
        let mut messages = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let frame = self.read_fixed(FRAME_SIZE).await?;
            let message = FrameCodec::unframe(&frame);
            debug!(%message, "<- controller");
            messages.push(message);
        }
        Ok(messages)
    }

    // ── Exchanges ────────────────────────────────────────────────

    /// Send a query and read its u16 reply.
    pub async fn query_u16(&mut self, command: &Command) -> Result<u16> {
        self.send(command).await?;
        self.read_u16().await
    }
}

async fn with_deadline<T>(
    limit: Duration,
    fut: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "controller did not respond in time",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityKind;
    use tokio_test::io::Builder;

    fn timeouts() -> ChannelTimeouts {
        ChannelTimeouts {
            connect: Duration::from_millis(200),
            read: Duration::from_millis(100),
            write: Duration::from_millis(100),
        }
    }

    fn info() -> ConnectionInfo {
        ConnectionInfo::new("controller", 33999)
    }

    async fn open(mock: tokio_test::io::Mock) -> CommandChannel {
        let mut channel = CommandChannel::new(timeouts());
        channel.open_with(Box::new(mock), info()).await.unwrap();
        channel
    }

    #[tokio::test]
    async fn handshake_accepts_status_zero() {
        let channel = open(Builder::new().read(&[0]).build()).await;
        assert!(channel.is_open());
        assert_eq!(channel.info().unwrap().to_string(), "controller:33999");
    }

    #[tokio::test]
    async fn handshake_rejections() {
        for (status, expected) in [(1u8, "too many"), (2, "denied"), (9, "unknown")] {
            let mut channel = CommandChannel::new(timeouts());
            let mock = Builder::new().read(&[status]).build();
            let err = channel.open_with(Box::new(mock), info()).await.unwrap_err();
            assert!(err.to_string().contains(expected), "{err}");
            assert!(err.is_handshake_rejection());
            assert!(!channel.is_open());
        }
    }

    #[tokio::test]
    async fn handshake_eof_is_status_timeout() {
        let mut channel = CommandChannel::new(timeouts());
        let mock = Builder::new().build();
        let err = channel.open_with(Box::new(mock), info()).await.unwrap_err();
        assert!(matches!(err, IRemoteError::StatusTimeout));
    }

    #[tokio::test]
    async fn handshake_silence_is_status_timeout() {
        let mut channel = CommandChannel::new(timeouts());
        let mock = Builder::new().wait(Duration::from_secs(2)).build();
        let err = channel.open_with(Box::new(mock), info()).await.unwrap_err();
        assert!(matches!(err, IRemoteError::StatusTimeout));
    }

    #[tokio::test]
    async fn send_writes_one_padded_frame() {
        let mock = Builder::new()
            .read(&[0])
            .write(&FrameCodec::frame("STOPTAB"))
            .read(&[0x01, 0x02])
            .build();
        let mut channel = open(mock).await;
        let count = channel
            .query_u16(&Command::Count(EntityKind::Socket))
            .await
            .unwrap();
        assert_eq!(count, 0x0102);
    }

    #[tokio::test]
    async fn invalid_command_never_reaches_the_wire() {
        let mut channel = open(Builder::new().read(&[0]).build()).await;
        let err = channel
            .send(&Command::ClientName("n".repeat(30)))
            .await
            .unwrap_err();
        assert!(matches!(err, IRemoteError::ValueOutOfRange(_)));
    }

    #[tokio::test]
    async fn send_without_connection() {
        let mut channel = CommandChannel::new(timeouts());
        let err = channel.send(&Command::Ping).await.unwrap_err();
        assert!(matches!(err, IRemoteError::NotConnected));
    }

    #[tokio::test]
    async fn name_and_text_prefixes() {
        let mock = Builder::new()
            .read(&[0])
            .read(&[4])
            .read(b"Hall")
            .read(&[0, 5])
            .read(b"Lamps")
            .build();
        let mut channel = open(mock).await;
        assert_eq!(channel.read_name().await.unwrap(), "Hall");
        assert_eq!(channel.read_text().await.unwrap(), "Lamps");
    }

    #[tokio::test]
    async fn short_read_is_communication_error() {
        let mock = Builder::new().read(&[0]).read(&[7]).build();
        let mut channel = open(mock).await;
        let err = channel.read_u16().await.unwrap_err();
        assert!(matches!(err, IRemoteError::Communication(_)));
    }

    #[tokio::test]
    async fn poll_batch_is_trimmed() {
        let mut padded = FrameCodec::frame("LCHANGED:0:0");
        padded[12] = b' ';
        let mock = Builder::new()
            .read(&[0])
            .read(&[0, 2])
            .read(&FrameCodec::frame("SCHANGED:1:1"))
            .read(&padded)
            .build();
        let mut channel = open(mock).await;
        let batch = channel.read_poll_batch().await.unwrap();
        assert_eq!(batch, vec!["SCHANGED:1:1", "LCHANGED:0:0"]);
    }
}
