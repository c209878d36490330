use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{split, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_serial::SerialPortBuilderExt;

use crate::errors::DobotError;
use crate::protocol::{self, params::ParamReader, Direction, FrameBuffer, Message, ProtocolId};
use crate::{ConnectInfo, DeviceVersion, FirmwareKind};

use super::{DobotDriverConfig, Endpoint};

/// Anything the driver can speak over: a serial port, a TCP socket, or an
/// in-memory duplex stream in tests.
pub trait IoStream: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> IoStream for T {}

type BoxedStream = Box<dyn IoStream>;

/// The firmware session model allows exactly one outstanding exchange per
/// command id and direction, so that pair is the whole matching key.
type PendingKey = (u8, Direction);
type ExchangeResult = Result<Message, DobotError>;

/// Driver for a serial-connected arm controller.
///
/// Owns the transport, the table of in-flight exchanges and the spawned
/// receive task. Cloning is cheap and every clone talks to the same session;
/// all methods take `&self`.
#[derive(Clone)]
pub struct DobotDriver {
    pub config: DobotDriverConfig,
    pub(crate) cmd_timeout: Arc<Mutex<Duration>>,
    pub(crate) writer: Arc<Mutex<WriteHalf<BoxedStream>>>,
    pub(crate) pending: Arc<Mutex<HashMap<PendingKey, oneshot::Sender<ExchangeResult>>>>,
    pub(crate) connected: Arc<AtomicBool>,
    /// Last queue free-slot count reported by the device; 0 forces a fresh
    /// query before the next queued submission.
    pub(crate) queue_space: Arc<Mutex<u32>>,
    pub(crate) read_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl DobotDriver {
    /// Opens the configured endpoint, starts the receive task and performs
    /// the identification handshake (firmware kind, version, device time).
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid, the port or socket cannot be
    /// opened, or the controller does not answer the handshake before the
    /// command timeout (after the configured retries).
    pub async fn connect(config: DobotDriverConfig) -> Result<(Self, ConnectInfo), DobotError> {
        config.validate().map_err(DobotError::InvalidParams)?;
        let stream: BoxedStream = match &config.endpoint {
            Endpoint::Serial { port, baud_rate } => {
                let serial = tokio_serial::new(port.as_str(), *baud_rate)
                    .data_bits(tokio_serial::DataBits::Eight)
                    .parity(tokio_serial::Parity::None)
                    .stop_bits(tokio_serial::StopBits::One)
                    .open_native_async()
                    .map_err(|e| DobotError::Io(e.to_string()))?;
                Box::new(serial)
            }
            Endpoint::Tcp { addr } => {
                let socket = TcpStream::connect(addr)
                    .await
                    .map_err(|e| DobotError::Io(e.to_string()))?;
                Box::new(socket)
            }
        };
        let driver = Self::from_boxed(config, stream);
        let info = match driver.handshake().await {
            Ok(info) => info,
            // Tear the session down so the port is not left locked behind
            // a dead controller.
            Err(e) => {
                driver.disconnect().await;
                return Err(e);
            }
        };
        tracing::info!(
            firmware = ?info.firmware,
            version = %info.version,
            "connected to controller"
        );
        Ok((driver, info))
    }

    /// Builds a driver over an already-open stream without the handshake.
    /// This is how the simulator and the integration tests attach.
    pub fn connect_with_stream(
        config: DobotDriverConfig,
        stream: impl IoStream + 'static,
    ) -> Self {
        Self::from_boxed(config, Box::new(stream))
    }

    fn from_boxed(config: DobotDriverConfig, stream: BoxedStream) -> Self {
        let (read_half, write_half) = split(stream);
        let driver = Self {
            cmd_timeout: Arc::new(Mutex::new(Duration::from_millis(config.cmd_timeout_ms))),
            config,
            writer: Arc::new(Mutex::new(write_half)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            connected: Arc::new(AtomicBool::new(true)),
            queue_space: Arc::new(Mutex::new(0)),
            read_task: Arc::new(Mutex::new(None)),
        };
        let reader = driver.clone();
        let handle = tokio::spawn(async move { reader.read_responses(read_half).await });
        // Nothing else can hold the fresh mutex yet.
        if let Ok(mut slot) = driver.read_task.try_lock() {
            *slot = Some(handle);
        }
        driver
    }

    /// Receive loop: accumulates bytes, decodes frames and resolves matching
    /// exchanges until the stream ends or fails. Any exit fails the session.
    async fn read_responses(&self, mut read_half: ReadHalf<BoxedStream>) {
        let mut chunk = [0u8; 512];
        let mut frames = FrameBuffer::new();
        loop {
            match read_half.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => {
                    frames.extend(&chunk[..n]);
                    while let Some(msg) = frames.next_frame() {
                        self.dispatch_inbound(msg).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "transport read failed");
                    break;
                }
            }
        }
        self.fail_session().await;
    }

    /// Queries firmware version, mode and device uptime over the fresh
    /// session.
    pub async fn handshake(&self) -> Result<ConnectInfo, DobotError> {
        let ack = self
            .call_and_wait(&Message::read(ProtocolId::DeviceVersion))
            .await?;
        let mut r = ParamReader::new(&ack.params);
        let version = DeviceVersion {
            major: r.u8()?,
            minor: r.u8()?,
            revision: r.u8()?,
            // Older firmware omits the hardware revision byte.
            hardware: r.u8().unwrap_or(0),
        };

        let ack = self
            .call_and_wait(&Message::read(ProtocolId::FirmwareMode))
            .await?;
        let mode = ParamReader::new(&ack.params).u8()?;
        let firmware = FirmwareKind::try_from(mode)
            .map_err(|_| DobotError::Protocol(format!("unknown firmware mode {}", mode)))?;

        let ack = self
            .call_and_wait(&Message::read(ProtocolId::DeviceTime))
            .await?;
        let device_time_secs = ParamReader::new(&ack.params).u32()?;

        Ok(ConnectInfo {
            firmware,
            version,
            device_time_secs,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Replaces the default exchange deadline. Applies to submissions made
    /// after this call; exchanges already in flight keep the deadline they
    /// were submitted with.
    pub async fn set_cmd_timeout(&self, timeout_ms: u64) {
        *self.cmd_timeout.lock().await = Duration::from_millis(timeout_ms);
    }

    pub async fn cmd_timeout(&self) -> Duration {
        *self.cmd_timeout.lock().await
    }

    /// One immediate command/response exchange; returns the ack payload.
    pub async fn submit_immediate(
        &self,
        id: ProtocolId,
        direction: Direction,
        params: Vec<u8>,
    ) -> Result<Vec<u8>, DobotError> {
        let msg = Message {
            id: u8::from(id),
            direction,
            queued: false,
            params,
        };
        let ack = self.call_and_wait(&msg).await?;
        Ok(ack.params)
    }

    /// Submits `msg` and waits for its response, the configured timeout and
    /// retry policy applied. Concurrent exchanges on other command ids keep
    /// flowing while this call waits; only the same id + direction pair is
    /// serialized (by `Busy` rejection at submission).
    pub async fn call_and_wait(&self, msg: &Message) -> Result<Message, DobotError> {
        let timeout = *self.cmd_timeout.lock().await;
        let attempts = self.config.retries.max(1);
        let key = (msg.id, msg.direction);
        for attempt in 1..=attempts {
            let rx = self.start_exchange(msg).await?;
            match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(result)) => return result,
                // The completion cell was dropped without a verdict, which
                // only happens when the session is torn down.
                Ok(Err(_)) => return Err(DobotError::Disconnected),
                Err(_) => {
                    self.pending.lock().await.remove(&key);
                    tracing::debug!(id = key.0, attempt, "exchange timed out, re-sending");
                }
            }
        }
        Err(DobotError::Timeout)
    }

    /// Registers the exchange and writes the frame. `Busy` is returned
    /// before any I/O when the same id + direction is already outstanding.
    async fn start_exchange(
        &self,
        msg: &Message,
    ) -> Result<oneshot::Receiver<ExchangeResult>, DobotError> {
        if !self.is_connected() {
            return Err(DobotError::Disconnected);
        }
        let bytes = protocol::encode(msg)?;
        let key = (msg.id, msg.direction);
        let rx = {
            let mut pending = self.pending.lock().await;
            if pending.contains_key(&key) {
                return Err(DobotError::Busy(format!(
                    "command {} ({:?}) already has an exchange in flight",
                    key.0, key.1
                )));
            }
            let (tx, rx) = oneshot::channel();
            pending.insert(key, tx);
            rx
        };
        if let Err(e) = self.write_frame(&bytes).await {
            self.pending.lock().await.remove(&key);
            return Err(e);
        }
        Ok(rx)
    }

    /// Fire-and-forget write for commands the firmware never acks, such as
    /// the reboot into another firmware mode.
    pub async fn send_oneway(&self, msg: &Message) -> Result<(), DobotError> {
        if !self.is_connected() {
            return Err(DobotError::Disconnected);
        }
        let bytes = protocol::encode(msg)?;
        self.write_frame(&bytes).await
    }

    async fn write_frame(&self, bytes: &[u8]) -> Result<(), DobotError> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(bytes)
            .await
            .map_err(|e| DobotError::FailedToSend(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| DobotError::FailedToSend(e.to_string()))
    }

    async fn dispatch_inbound(&self, msg: Message) {
        // The free-slot counter rides along on its own command; keep the
        // cache fresh no matter which caller asked.
        if msg.id == u8::from(ProtocolId::QueuedCmdLeftSpace) && msg.direction == Direction::Read {
            if let Ok(space) = ParamReader::new(&msg.params).u32() {
                *self.queue_space.lock().await = space;
            }
        }
        let key = (msg.id, msg.direction);
        let waiter = self.pending.lock().await.remove(&key);
        match waiter {
            Some(tx) => {
                if tx.send(Ok(msg)).is_err() {
                    tracing::debug!(id = key.0, "caller gone before resolution");
                }
            }
            // Stale or unsolicited frames are never fatal.
            None => tracing::debug!(id = key.0, direction = ?key.1, "dropping unmatched frame"),
        }
    }

    async fn fail_session(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let waiters: Vec<_> = self.pending.lock().await.drain().collect();
        let count = waiters.len();
        for (_, tx) in waiters {
            let _ = tx.send(Err(DobotError::Disconnected));
        }
        if count > 0 {
            tracing::warn!(count, "session failed with exchanges outstanding");
        } else {
            tracing::info!("session closed");
        }
    }

    /// Tears the session down: aborts the receive task, closes the stream
    /// and resolves anything still pending as `Disconnected`.
    pub async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(handle) = self.read_task.lock().await.take() {
            handle.abort();
        }
        let _ = self.writer.lock().await.shutdown().await;
        self.fail_session().await;
    }
}
