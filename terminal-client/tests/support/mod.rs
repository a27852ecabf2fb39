// Fakes shared by the integration tests
#![allow(dead_code)]

use actix::clock::Instant;
use actix::Recipient;
use async_trait::async_trait;
use common::{ConnectionId, Payload, TransportEvent, TransportEventKind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use terminal_client::surface::{SurfaceError, TerminalSurface};
use terminal_client::transport::{Connector, Transport, TransportError};
use tokio::sync::Notify;
use url::Url;

pub async fn settle() {
    actix::clock::sleep(Duration::from_millis(30)).await;
}

#[derive(Default)]
pub struct SurfaceLog {
    pub output: String,
    pub raw: Vec<u8>,
    pub fits: usize,
}

#[derive(Clone, Default)]
pub struct FakeSurface {
    pub log: Arc<Mutex<SurfaceLog>>,
}

impl FakeSurface {
    pub fn output(&self) -> String {
        self.log.lock().unwrap().output.clone()
    }

    pub fn raw(&self) -> Vec<u8> {
        self.log.lock().unwrap().raw.clone()
    }

    pub fn fits(&self) -> usize {
        self.log.lock().unwrap().fits
    }
}

impl TerminalSurface for FakeSurface {
    fn write(&mut self, data: &[u8]) -> Result<(), SurfaceError> {
        let mut log = self.log.lock().unwrap();
        log.output.push_str(&String::from_utf8_lossy(data));
        log.raw.extend_from_slice(data);
        Ok(())
    }

    fn fit(&mut self) -> Result<(), SurfaceError> {
        self.log.lock().unwrap().fits += 1;
        Ok(())
    }
}

/// Test-side view of one opened transport
#[derive(Clone)]
pub struct FakeHandle {
    pub id: ConnectionId,
    pub events: Recipient<TransportEvent>,
    pub sent: Arc<Mutex<Vec<String>>>,
    pub open: Arc<AtomicBool>,
    pub closes: Arc<AtomicUsize>,
}

impl FakeHandle {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn inbound(&self, text: &str) {
        self.events.do_send(TransportEvent::new(
            self.id,
            TransportEventKind::Inbound(Payload::Text(text.to_string())),
        ));
    }

    pub fn inbound_binary(&self, data: &[u8]) {
        self.events.do_send(TransportEvent::new(
            self.id,
            TransportEventKind::Inbound(Payload::Binary(data.to_vec())),
        ));
    }

    /// Remote side hung up
    pub fn drop_connection(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.events.do_send(TransportEvent::new(self.id, TransportEventKind::Closed));
    }

    pub fn emit(&self, kind: TransportEventKind) {
        self.events.do_send(TransportEvent::new(self.id, kind));
    }
}

struct FakeTransport {
    handle: FakeHandle,
}

impl Transport for FakeTransport {
    fn id(&self) -> ConnectionId {
        self.handle.id
    }

    fn send_text(&self, text: &str) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        self.handle.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.handle.open.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        self.handle.open.store(false, Ordering::SeqCst);
        self.handle.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeConnector {
    pub urls: Mutex<Vec<Url>>,
    /// When each attempt reached the connector
    pub attempted_at: Mutex<Vec<Instant>>,
    pub handles: Mutex<Vec<FakeHandle>>,
    pub fail: AtomicBool,
    /// When set, each attempt waits for a permit before resolving
    pub gate: Option<Arc<Notify>>,
}

impl FakeConnector {
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        let connector = Self::default();
        connector.fail.store(true, Ordering::SeqCst);
        connector
    }

    pub fn attempts(&self) -> usize {
        self.urls.lock().unwrap().len()
    }

    /// Time between consecutive attempts
    pub fn attempt_gaps(&self) -> Vec<Duration> {
        let times = self.attempted_at.lock().unwrap();
        times.windows(2).map(|w| w[1] - w[0]).collect()
    }

    pub fn urls(&self) -> Vec<Url> {
        self.urls.lock().unwrap().clone()
    }

    pub fn handle(&self, index: usize) -> FakeHandle {
        self.handles.lock().unwrap()[index].clone()
    }

    pub fn handle_count(&self) -> usize {
        self.handles.lock().unwrap().len()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        url: Url,
        id: ConnectionId,
        events: Recipient<TransportEvent>,
    ) -> Result<Box<dyn Transport>, TransportError> {
        self.urls.lock().unwrap().push(url);
        self.attempted_at.lock().unwrap().push(Instant::now());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let handle = FakeHandle {
            id,
            events,
            sent: Arc::new(Mutex::new(Vec::new())),
            open: Arc::new(AtomicBool::new(true)),
            closes: Arc::new(AtomicUsize::new(0)),
        };
        self.handles.lock().unwrap().push(handle.clone());
        Ok(Box::new(FakeTransport { handle }))
    }
}
