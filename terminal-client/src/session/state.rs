// terminal-client/src/session/state.rs
use actix::SpawnHandle;
use common::{Config, ConnectionId, SessionStatus, SessionTarget};
use std::time::Duration;

use super::input_buffer::InputBuffer;
use crate::transport::Transport;

/// Fixed parameters of one terminal session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub target: SessionTarget,
    pub scheme: &'static str,
    pub host: String,
    pub reconnect_delay: Duration,
    pub keep_alive_interval: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            target: config.target(),
            scheme: config.scheme(),
            host: config.backend_host().to_string(),
            reconnect_delay: config.reconnect_delay(),
            keep_alive_interval: config.keep_alive_interval(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Mutable state owned by the session controller.
///
/// Holds at most one of each: connection attempt, transport handle,
/// reconnect timer.
pub struct SessionState {
    pub status: SessionStatus,
    pub buffer: InputBuffer,
    /// Id of the attempt or handle whose events are accepted
    current: Option<ConnectionId>,
    transport: Option<Box<dyn Transport>>,
    pending_connect: Option<SpawnHandle>,
    reconnect_timer: Option<SpawnHandle>,
    keep_alive: Option<SpawnHandle>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Connecting,
            buffer: InputBuffer::new(),
            current: None,
            transport: None,
            pending_connect: None,
            reconnect_timer: None,
            keep_alive: None,
        }
    }

    /// Events from any other connection are stale
    pub fn accepts(&self, id: ConnectionId) -> bool {
        self.current == Some(id)
    }

    pub fn current_id(&self) -> Option<ConnectionId> {
        self.current
    }

    /// Start a new attempt; the caller must have released the previous one
    pub fn begin_attempt(&mut self) -> ConnectionId {
        let id = ConnectionId::new();
        self.current = Some(id);
        id
    }

    pub fn install_transport(&mut self, transport: Box<dyn Transport>) {
        debug_assert!(self.transport.is_none());
        tracing::debug!("Installed transport {}", transport.id());
        self.transport = Some(transport);
    }

    pub fn transport(&self) -> Option<&dyn Transport> {
        self.transport.as_deref()
    }

    /// Whether a transport handle exists and is open at this instant
    pub fn is_open(&self) -> bool {
        self.transport.as_ref().map_or(false, |t| t.is_open())
    }

    /// Close and forget the current handle. Safe to call repeatedly.
    pub fn release_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.current = None;
    }

    pub fn set_pending_connect(&mut self, handle: SpawnHandle) -> Option<SpawnHandle> {
        self.pending_connect.replace(handle)
    }

    pub fn take_pending_connect(&mut self) -> Option<SpawnHandle> {
        self.pending_connect.take()
    }

    pub fn set_reconnect_timer(&mut self, handle: SpawnHandle) -> Option<SpawnHandle> {
        self.reconnect_timer.replace(handle)
    }

    pub fn take_reconnect_timer(&mut self) -> Option<SpawnHandle> {
        self.reconnect_timer.take()
    }

    pub fn set_keep_alive(&mut self, handle: SpawnHandle) -> Option<SpawnHandle> {
        self.keep_alive.replace(handle)
    }

    pub fn take_keep_alive(&mut self) -> Option<SpawnHandle> {
        self.keep_alive.take()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTransport {
        id: ConnectionId,
        open: bool,
        closes: Arc<AtomicUsize>,
    }

    impl Transport for CountingTransport {
        fn id(&self) -> ConnectionId {
            self.id
        }

        fn send_text(&self, _text: &str) -> Result<(), TransportError> {
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.open
        }

        fn close(&mut self) {
            self.open = false;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_stale_ids_rejected_after_new_attempt() {
        let mut state = SessionState::new();
        let first = state.begin_attempt();
        assert!(state.accepts(first));

        state.release_transport();
        let second = state.begin_attempt();
        assert!(!state.accepts(first));
        assert!(state.accepts(second));
    }

    #[test]
    fn test_release_closes_once_and_is_idempotent() {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut state = SessionState::new();
        let id = state.begin_attempt();
        state.install_transport(Box::new(CountingTransport {
            id,
            open: true,
            closes: closes.clone(),
        }));
        assert!(state.is_open());

        state.release_transport();
        state.release_transport();

        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(!state.is_open());
        assert!(state.current_id().is_none());
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config {
            project_id: "p1".to_string(),
            secure: true,
            ..Config::default()
        };
        let settings = SessionSettings::from_config(&config);
        assert_eq!(settings.scheme, "wss");
        assert_eq!(settings.host, "localhost:4000");
        assert_eq!(settings.target.project_id, "p1");
        assert_eq!(settings.reconnect_delay, Duration::from_secs(3));
    }
}
