use crate::bridge::DataBridge;
use crate::config::ClientConfig;
use crate::gateway::MessageGateway;
use crate::protocol;
use crate::types::{ConnectionState, PoseSample};
use crate::{Result, VisionError};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest response line accepted before the exchange is abandoned.
const MAX_LINE_LEN: usize = 64 * 1024;
/// Cap on unsolicited bytes discarded by one liveness check.
const MAX_DISCARD: usize = 64 * 1024;

/// What triggered a request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSource {
    /// The robot asserted its data request input.
    Trigger,
    /// A message taken from the gateway outbox.
    Outbox,
}

/// One completed request/response exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub source: RequestSource,
    /// Response line without its line ending.
    pub response: String,
    /// Pose decoded from the response and published to the bridge.
    pub pose: Option<PoseSample>,
}

/// Result of one [`VisionClient::tick`].
#[derive(Debug)]
pub enum CycleOutcome {
    /// Was disconnected, connect attempt succeeded.
    Connected,
    /// Was disconnected, connect attempt failed.
    ConnectFailed,
    /// The server closed the connection since the last cycle.
    ConnectionLost,
    /// Connected, nothing to send.
    Idle,
    Exchanged(Exchange),
    /// Write or read failed (including timeout); the socket was closed.
    ExchangeFailed(VisionError),
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    pub connect_attempts: u64,
    pub connect_failures: u64,
    /// Connect failures that were logged at warn level (one per outage).
    pub failure_reports: u64,
    pub exchanges: u64,
    pub poses_published: u64,
    pub disconnects: u64,
}

/// Socket plus buffered reader over a clone of the same socket.
struct Connection {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
    peer: SocketAddr,
}

impl Connection {
    /// Try each address in order until one accepts, all within one
    /// `connect_timeout`. Returns the last connect error if none does.
    fn open_any(addrs: &[SocketAddr], config: &ClientConfig) -> Result<Connection> {
        let deadline = Instant::now() + config.connect_timeout;
        let mut last_err = None;

        for &addr in addrs {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match Connection::open(addr, remaining, config) {
                Ok(conn) => return Ok(conn),
                Err(e) => {
                    log::trace!("Connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or(VisionError::Timeout))
    }

    fn open(addr: SocketAddr, timeout: Duration, config: &ClientConfig) -> Result<Connection> {
        let stream = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|source| VisionError::Connect { addr, source })?;
        stream.set_read_timeout(Some(config.read_timeout))?;
        stream.set_write_timeout(Some(config.write_timeout))?;
        stream.set_nodelay(true).ok();
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Connection {
            stream,
            reader,
            peer: addr,
        })
    }

    /// Non-blocking check that the peer has not closed the connection.
    ///
    /// Unsolicited bytes the server sent between exchanges are discarded so
    /// the next response read belongs to the next request.
    fn is_alive(&mut self) -> bool {
        let stale = self.reader.buffer().len();
        self.reader.consume(stale);

        if let Err(e) = self.stream.set_nonblocking(true) {
            log::warn!("Cannot check vision socket: {}", e);
            return false;
        }

        let mut scratch = [0u8; 512];
        let mut discarded = stale;
        let alive = loop {
            match self.reader.get_mut().read(&mut scratch) {
                Ok(0) => break false,
                Ok(n) => {
                    discarded += n;
                    if discarded >= MAX_DISCARD {
                        break true;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break true,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break false,
            }
        };

        if self.stream.set_nonblocking(false).is_err() {
            return false;
        }
        if discarded > 0 {
            log::debug!("Discarded {} unsolicited bytes from {}", discarded, self.peer);
        }
        alive
    }

    fn send(&mut self, request: &str) -> Result<()> {
        self.stream
            .write_all(request.as_bytes())
            .and_then(|_| self.stream.flush())
            .map_err(VisionError::from_socket)
    }

    /// Read one `\n`-terminated line within `timeout` overall.
    ///
    /// The socket timeout is shrunk before every read so a server that
    /// trickles bytes cannot stretch the wait past the deadline.
    fn read_line(&mut self, timeout: Duration) -> Result<String> {
        let deadline = Instant::now() + timeout;
        let mut line: Vec<u8> = Vec::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(VisionError::Timeout);
            }
            self.stream.set_read_timeout(Some(remaining))?;

            let available = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(VisionError::from_socket(e)),
            };

            if available.is_empty() {
                // EOF: hand out a final unterminated line, like a line reader would.
                if line.is_empty() {
                    return Err(VisionError::ConnectionClosed);
                }
                break;
            }

            let (chunk, done) = match available.iter().position(|&b| b == b'\n') {
                Some(pos) => (&available[..=pos], true),
                None => (available, false),
            };
            line.extend_from_slice(chunk);
            let used = chunk.len();
            self.reader.consume(used);

            if done {
                break;
            }
            if line.len() > MAX_LINE_LEN {
                return Err(VisionError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "response line too long",
                )));
            }
        }

        let text = String::from_utf8_lossy(&line);
        Ok(protocol::strip_line_ending(&text).to_string())
    }

    fn close(self) {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => {}
            // Already torn down by the peer.
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => {}
            Err(e) => log::warn!("Error closing vision socket: {}", e),
        }
    }
}

/// Cyclic TCP client for the smart-picking vision server.
///
/// Holds no thread of its own: an external scheduler calls [`tick`](Self::tick)
/// at a fixed cadence. Each tick does at most one connect attempt or one
/// request/response exchange, and every socket operation is bounded by the
/// configured timeouts, so a tick never blocks for longer than
/// `connect_timeout` or `write_timeout + read_timeout`.
pub struct VisionClient {
    config: ClientConfig,
    bridge: Arc<DataBridge>,
    gateway: MessageGateway,
    state: ConnectionState,
    conn: Option<Connection>,
    /// A connect failure was already logged for the current outage.
    failure_reported: bool,
    stats: ClientStats,
}

impl VisionClient {
    pub fn new(config: ClientConfig, bridge: Arc<DataBridge>, gateway: MessageGateway) -> Result<Self> {
        config.validate()?;
        log::info!("Vision client initialized. Target: {}", config.server_addr());
        Ok(Self {
            config,
            bridge,
            gateway,
            state: ConnectionState::Disconnected,
            conn: None,
            failure_reported: false,
            stats: ClientStats::default(),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn stats(&self) -> ClientStats {
        self.stats
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.conn.as_ref().map(|c| c.peer)
    }

    /// Run one cycle.
    ///
    /// - Disconnected: one connect attempt.
    /// - Connected: verify the peer is still there, then exchange the trigger
    ///   request if `trigger` is set, else one pending outbox message, if any.
    pub fn tick(&mut self, trigger: bool) -> CycleOutcome {
        if self.state == ConnectionState::Disconnected {
            return if self.try_connect() {
                CycleOutcome::Connected
            } else {
                CycleOutcome::ConnectFailed
            };
        }

        if !self.check_alive() {
            log::warn!("Vision server closed the connection");
            self.disconnect();
            return CycleOutcome::ConnectionLost;
        }

        if trigger {
            let request = self.config.request_line();
            return self.run_exchange(&request, RequestSource::Trigger);
        }

        if let Some(msg) = self.gateway.poll_outbox() {
            let request = protocol::frame_message(&msg);
            return self.run_exchange(&request, RequestSource::Outbox);
        }

        CycleOutcome::Idle
    }

    /// Connect unless already connected to a live peer. Returns the resulting link state.
    pub fn ensure_connected(&mut self) -> bool {
        if self.state == ConnectionState::Connected {
            if self.check_alive() {
                return true;
            }
            self.disconnect();
        }
        self.try_connect()
    }

    /// Close the socket. Safe to call repeatedly or when never connected.
    pub fn shutdown(&mut self) {
        if self.conn.is_some() {
            self.disconnect();
        }
    }

    fn check_alive(&mut self) -> bool {
        self.conn.as_mut().is_some_and(|c| c.is_alive())
    }

    fn try_connect(&mut self) -> bool {
        self.stats.connect_attempts += 1;
        log::trace!("Attempting to connect to {}", self.config.server_addr());

        match self
            .resolve()
            .and_then(|addrs| Connection::open_any(&addrs, &self.config))
        {
            Ok(conn) => {
                log::info!("Connected to vision server at {}", conn.peer);
                self.conn = Some(conn);
                self.state = ConnectionState::Connected;
                self.failure_reported = false;
                true
            }
            Err(e) => {
                self.stats.connect_failures += 1;
                if self.failure_reported {
                    log::trace!("Connect attempt failed: {}", e);
                } else {
                    log::warn!("Vision server unreachable, retrying every cycle: {}", e);
                    self.failure_reported = true;
                    self.stats.failure_reports += 1;
                }
                false
            }
        }
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>> {
        let target = self.config.server_addr();
        let addrs: Vec<SocketAddr> = target
            .to_socket_addrs()
            .map_err(|e| VisionError::AddressResolution(format!("{}: {}", target, e)))?
            .collect();
        if addrs.is_empty() {
            return Err(VisionError::AddressResolution(target));
        }
        Ok(addrs)
    }

    fn run_exchange(&mut self, request: &str, source: RequestSource) -> CycleOutcome {
        match self.exchange(request) {
            Ok(response) => {
                self.stats.exchanges += 1;
                log::info!("Server response: {}", response);
                let pose = self.publish_pose(&response);
                self.gateway.deposit_response(response.clone());
                CycleOutcome::Exchanged(Exchange {
                    source,
                    response,
                    pose,
                })
            }
            Err(e) => {
                log::error!("Communication error: {}", e);
                self.disconnect();
                CycleOutcome::ExchangeFailed(e)
            }
        }
    }

    fn exchange(&mut self, request: &str) -> Result<String> {
        let read_timeout = self.config.read_timeout;
        let conn = self.conn.as_mut().ok_or(VisionError::NotConnected)?;
        log::debug!("Sending {:?}", request);
        conn.send(request)?;
        conn.read_line(read_timeout)
    }

    fn publish_pose(&mut self, response: &str) -> Option<PoseSample> {
        if !self.config.parse_responses {
            return None;
        }
        match decode_pose(response, &self.config.delimiter) {
            Ok(Some(pose)) => {
                self.bridge.publish(pose);
                self.stats.poses_published += 1;
                log::debug!("Published pose {:?}", pose);
                Some(pose)
            }
            Ok(None) => {
                log::debug!("Response carries no pose: {}", response);
                None
            }
            Err(e) => {
                log::debug!("Response is not a pose datagram: {}", e);
                None
            }
        }
    }

    fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            log::info!("Disconnected from vision server at {}", conn.peer);
            conn.close();
            self.stats.disconnects += 1;
        }
        self.state = ConnectionState::Disconnected;
        self.failure_reported = false;
    }
}

impl Drop for VisionClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Decode a response line. `Ok(None)` for a well-formed datagram without a full pose.
fn decode_pose(response: &str, delimiter: &str) -> Result<Option<PoseSample>> {
    let datagram = protocol::parse_datagram(response, delimiter)?;
    Ok(datagram.to_pose_sample())
}
