// terminal-client/src/transport.rs
use actix::Recipient;
use async_trait::async_trait;
use common::{ConnectionId, Payload, SessionTarget, TransportEvent, TransportEventKind};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as WsMessage};
use url::Url;

/// Text frame sent on the keep-alive interval; never typed into the shell
pub const KEEP_ALIVE_SENTINEL: &str = "__ping__";

const OUTBOUND_QUEUE: usize = 100;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid connection url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("transport is closed")]
    Closed,
    #[error("outbound queue is full")]
    QueueFull,
}

/// Build `<scheme>://<host><sub_path>?project=..&token=..`
pub fn connection_url(
    scheme: &str,
    host: &str,
    target: &SessionTarget,
    token: &str,
) -> Result<Url, TransportError> {
    let raw = format!(
        "{}://{}{}?project={}&token={}",
        scheme,
        host,
        target.sub_path,
        urlencoding::encode(&target.project_id),
        urlencoding::encode(token),
    );
    Ok(Url::parse(&raw)?)
}

/// One live full-duplex connection
pub trait Transport: Send {
    fn id(&self) -> ConnectionId;

    fn send_text(&self, text: &str) -> Result<(), TransportError>;

    fn is_open(&self) -> bool;

    /// Stop delivering events and close the socket. Idempotent.
    fn close(&mut self);
}

/// Opens transports. Resolves once the connection is open.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        url: Url,
        id: ConnectionId,
        events: Recipient<TransportEvent>,
    ) -> Result<Box<dyn Transport>, TransportError>;
}

/// WebSocket connector over tokio-tungstenite
#[derive(Debug, Default, Clone)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(
        &self,
        url: Url,
        id: ConnectionId,
        events: Recipient<TransportEvent>,
    ) -> Result<Box<dyn Transport>, TransportError> {
        let (ws_stream, _) = connect_async(url.as_str()).await?;
        let (mut ws_sink, mut ws_stream) = ws_stream.split();

        let (tx, mut rx) = mpsc::channel::<WsMessage>(OUTBOUND_QUEUE);
        let open = Arc::new(AtomicBool::new(true));

        // Forward queued frames to the socket
        let writer = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let closing = matches!(msg, WsMessage::Close(_));
                if let Err(e) = ws_sink.send(msg).await {
                    tracing::error!("Error sending to terminal backend: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        // Forward socket frames to the session
        let reader_open = open.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_stream.next().await {
                match msg {
                    Ok(WsMessage::Text(text)) => {
                        events.do_send(TransportEvent::new(
                            id,
                            TransportEventKind::Inbound(Payload::Text(text)),
                        ));
                    },
                    Ok(WsMessage::Binary(data)) => {
                        events.do_send(TransportEvent::new(
                            id,
                            TransportEventKind::Inbound(Payload::Binary(data)),
                        ));
                    },
                    Ok(WsMessage::Close(frame)) => {
                        tracing::debug!("Backend closed connection {}: {:?}", id, frame);
                        break;
                    },
                    Ok(_) => {
                        // Ping/pong and raw frames are handled by tungstenite
                    },
                    Err(e) => {
                        reader_open.store(false, Ordering::SeqCst);
                        events.do_send(TransportEvent::new(
                            id,
                            TransportEventKind::Error(e.to_string()),
                        ));
                        break;
                    }
                }
            }

            reader_open.store(false, Ordering::SeqCst);
            events.do_send(TransportEvent::new(id, TransportEventKind::Closed));
        });

        tracing::info!("Connected to {}{} ({})", url.host_str().unwrap_or_default(), url.path(), id);

        Ok(Box::new(WsTransport {
            id,
            tx,
            open,
            reader,
            writer,
        }))
    }
}

pub struct WsTransport {
    id: ConnectionId,
    tx: mpsc::Sender<WsMessage>,
    open: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Transport for WsTransport {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send_text(&self, text: &str) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        self.tx
            .try_send(WsMessage::Text(text.to_string()))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => TransportError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
            })
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.writer.is_finished()
    }

    fn close(&mut self) {
        // Abort the reader first so no event from this handle reaches the session
        self.reader.abort();
        if self.open.swap(false, Ordering::SeqCst) {
            let _ = self.tx.try_send(WsMessage::Close(None));
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close();
    }
}
