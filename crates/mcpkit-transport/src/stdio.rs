//! Stdio NDJSON transport.
//!
//! Reads standard input line by line; every `\n`-terminated line (CRLF
//! tolerated) is one inbound frame, forwarded to dispatch verbatim — blank
//! and unparseable lines included, so the codec can answer them with a
//! ParseError. Responses are written to standard output as single
//! `JSON + '\n'` lines. Nothing else ever touches stdout; logging goes to
//! stderr.
//!
//! Closing stdin triggers an orderly stop. Once a stop begins, inbound lines
//! are discarded and outbound writes are suppressed after a final flush.
//! The process's stdio streams are exclusive: only one instance may run at a
//! time.

use crate::{
    MessageDispatch, ResponseSink, Result, Transport, TransportError, TransportMetadata,
    TransportState,
};
use async_trait::async_trait;
use mcpkit_core::protocol::{Inbound, JsonRpcMessage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

pub const STDIO_TRANSPORT_NAME: &str = "stdio";

/// Process-wide claim on the stdio streams.
static STDIO_CLAIMED: AtomicBool = AtomicBool::new(false);

struct StdioSink {
    writer: tokio::sync::Mutex<BufWriter<tokio::io::Stdout>>,
    closed: AtomicBool,
}

impl StdioSink {
    fn new() -> Self {
        Self {
            writer: tokio::sync::Mutex::new(BufWriter::new(tokio::io::stdout())),
            closed: AtomicBool::new(false),
        }
    }

    /// Flush pending output and suppress all later writes.
    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.flush().await {
            warn!("failed to drain stdout on close: {e}");
        }
    }
}

#[async_trait]
impl ResponseSink for StdioSink {
    async fn send(&self, message: JsonRpcMessage) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            trace!("stdio sink closed; dropping outbound message");
            return Ok(());
        }
        let line = serde_json::to_string(&message).map_err(|e| {
            TransportError::SerializationError {
                message: format!("failed to serialize outbound message: {e}"),
            }
        })?;

        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| TransportError::SendFailed {
                message: format!("failed to write message: {e}"),
            })?;
        writer
            .write_all(b"\n")
            .await
            .map_err(|e| TransportError::SendFailed {
                message: format!("failed to write delimiter: {e}"),
            })?;
        writer.flush().await.map_err(|e| TransportError::SendFailed {
            message: format!("failed to flush stdout: {e}"),
        })?;

        trace!("sent {} bytes on stdout", line.len());
        Ok(())
    }
}

struct Shared {
    state: Mutex<TransportState>,
    sink: Mutex<Option<Arc<StdioSink>>>,
}

impl Shared {
    fn set_state(&self, state: TransportState) {
        *self.state.lock().expect("stdio state lock poisoned") = state;
    }
}

/// The framework's built-in stdio transport.
pub struct StdioTransport {
    shared: Arc<Shared>,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl StdioTransport {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(TransportState::Stopped),
                sink: Mutex::new(None),
            }),
            shutdown: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    fn read_loop(
        shared: Arc<Shared>,
        dispatch: Arc<dyn MessageDispatch>,
        sink: Arc<StdioSink>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut reader = BufReader::new(tokio::io::stdin());
            let mut line = String::new();
            loop {
                line.clear();
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        debug!("stdio read loop stopping on shutdown signal");
                        break;
                    }
                    read = reader.read_line(&mut line) => match read {
                        Ok(0) => {
                            debug!("stdin closed; stopping stdio transport");
                            sink.close().await;
                            shared.set_state(TransportState::Stopped);
                            STDIO_CLAIMED.store(false, Ordering::SeqCst);
                            return;
                        }
                        Ok(_) => {
                            let frame = line
                                .trim_end_matches('\n')
                                .trim_end_matches('\r')
                                .to_string();
                            trace!("stdio received {} bytes", frame.len());
                            let dispatch = dispatch.clone();
                            let sink: Arc<dyn ResponseSink> = sink.clone();
                            tokio::spawn(async move {
                                dispatch
                                    .dispatch(
                                        Inbound::Text(frame),
                                        sink,
                                        TransportMetadata::for_transport(STDIO_TRANSPORT_NAME),
                                    )
                                    .await;
                            });
                        }
                        Err(e) => {
                            warn!("stdin read error: {e}; stopping stdio transport");
                            sink.close().await;
                            shared.set_state(TransportState::Stopped);
                            STDIO_CLAIMED.store(false, Ordering::SeqCst);
                            return;
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl Transport for StdioTransport {
    fn name(&self) -> &str {
        STDIO_TRANSPORT_NAME
    }

    async fn start(&self, dispatch: Arc<dyn MessageDispatch>) -> Result<()> {
        {
            let mut state = self.shared.state.lock().expect("stdio state lock poisoned");
            match *state {
                TransportState::Stopped => *state = TransportState::Starting,
                TransportState::Error(ref message) => {
                    return Err(TransportError::StartFailed {
                        name: STDIO_TRANSPORT_NAME.to_string(),
                        message: format!("transport previously failed: {message}"),
                    });
                }
                _ => {
                    return Err(TransportError::AlreadyStarted {
                        name: STDIO_TRANSPORT_NAME.to_string(),
                    });
                }
            }
        }

        if STDIO_CLAIMED.swap(true, Ordering::SeqCst) {
            let message = "process stdio streams already claimed".to_string();
            self.shared.set_state(TransportState::Error(message.clone()));
            return Err(TransportError::StartFailed {
                name: STDIO_TRANSPORT_NAME.to_string(),
                message,
            });
        }

        let sink = Arc::new(StdioSink::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = Self::read_loop(self.shared.clone(), dispatch, sink.clone(), shutdown_rx);

        *self.shared.sink.lock().expect("stdio sink lock poisoned") = Some(sink);
        *self.shutdown.lock().expect("stdio shutdown lock poisoned") = Some(shutdown_tx);
        *self.task.lock().expect("stdio task lock poisoned") = Some(handle);
        self.shared.set_state(TransportState::Running);
        debug!("stdio transport running");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        {
            let mut state = self.shared.state.lock().expect("stdio state lock poisoned");
            match *state {
                TransportState::Stopped | TransportState::Stopping => return Ok(()),
                TransportState::Error(_) => return Ok(()),
                _ => *state = TransportState::Stopping,
            }
        }

        if let Some(shutdown) = self
            .shutdown
            .lock()
            .expect("stdio shutdown lock poisoned")
            .take()
        {
            let _ = shutdown.send(true);
        }

        let sink = self
            .shared
            .sink
            .lock()
            .expect("stdio sink lock poisoned")
            .take();
        if let Some(sink) = sink {
            sink.close().await;
        }

        let task = self.task.lock().expect("stdio task lock poisoned").take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("stdio read loop join error: {e}");
            }
        }

        self.shared.set_state(TransportState::Stopped);
        STDIO_CLAIMED.store(false, Ordering::SeqCst);
        debug!("stdio transport stopped");
        Ok(())
    }

    fn state(&self) -> TransportState {
        self.shared
            .state
            .lock()
            .expect("stdio state lock poisoned")
            .clone()
    }
}
