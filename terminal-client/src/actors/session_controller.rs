// terminal-client/src/actors/session_controller.rs
use actix::prelude::*;
use common::{
    AuthStateChanged, ConnectionId, FitSurface, Keystroke, SessionStatus, Shutdown,
    TransportEvent, TransportEventKind, ViewActivated,
};
use std::sync::Arc;
use tokio::sync::watch;

use crate::auth::{AuthStateSource, AuthSubscription, TokenProvider};
use crate::session::{route_keystroke, SessionSettings, SessionState};
use crate::surface::TerminalSurface;
use crate::transport::{connection_url, Connector, Transport, TransportError, KEEP_ALIVE_SENTINEL};

pub const CONNECTED_BANNER: &str = "\x1b[32m✅ Connected to server\x1b[0m\r\n";

/// Collaborators injected into a session
pub struct SessionDeps {
    pub token_provider: Arc<dyn TokenProvider>,
    pub auth: Arc<dyn AuthStateSource>,
    pub connector: Arc<dyn Connector>,
    pub surface: Box<dyn TerminalSurface>,
}

/// Owns one terminal session: transport, input buffer, timers.
///
/// Every mutation happens inside a handler on this actor, so transport
/// events, keystrokes and timer fires never overlap.
pub struct SessionController {
    settings: SessionSettings,
    token_provider: Arc<dyn TokenProvider>,
    auth: Arc<dyn AuthStateSource>,
    connector: Arc<dyn Connector>,
    surface: Box<dyn TerminalSurface>,
    state: SessionState,
    auth_subscription: Option<AuthSubscription>,
    status_tx: watch::Sender<SessionStatus>,
    torn_down: bool,
}

impl SessionController {
    pub fn new(settings: SessionSettings, deps: SessionDeps) -> (Self, watch::Receiver<SessionStatus>) {
        let state = SessionState::new();
        let (status_tx, status_rx) = watch::channel(state.status);
        let controller = Self {
            settings,
            token_provider: deps.token_provider,
            auth: deps.auth,
            connector: deps.connector,
            surface: deps.surface,
            state,
            auth_subscription: None,
            status_tx,
            torn_down: false,
        };
        (controller, status_rx)
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.state.status != status {
            tracing::info!(
                project = %self.settings.target.project_id,
                "Terminal session {} -> {}",
                self.state.status,
                status
            );
        }
        self.state.status = status;
        self.status_tx.send_replace(status);
    }

    fn write_surface(&mut self, data: &[u8]) {
        if let Err(e) = self.surface.write(data) {
            tracing::warn!("Failed to write to terminal: {}", e);
        }
    }

    fn fit_surface(&mut self) {
        if let Err(e) = self.surface.fit() {
            tracing::warn!("Failed to fit terminal: {}", e);
        }
    }

    fn cancel_reconnect(&mut self, ctx: &mut Context<Self>) {
        if let Some(handle) = self.state.take_reconnect_timer() {
            ctx.cancel_future(handle);
        }
    }

    /// Drop any in-flight attempt and the current handle
    fn release_connection(&mut self, ctx: &mut Context<Self>) {
        if let Some(handle) = self.state.take_pending_connect() {
            ctx.cancel_future(handle);
        }
        self.state.release_transport();
    }

    /// (Re)connect: release the old handle, fetch a fresh credential, open a new one
    fn connect(&mut self, ctx: &mut Context<Self>) {
        if self.torn_down {
            return;
        }
        self.cancel_reconnect(ctx);
        self.release_connection(ctx);
        self.set_status(SessionStatus::Connecting);

        let id = self.state.begin_attempt();
        let settings = self.settings.clone();
        let token_provider = self.token_provider.clone();
        let connector = self.connector.clone();
        let events = ctx.address().recipient::<TransportEvent>();

        let attempt = async move {
            let token = match token_provider.get_token(true).await {
                Ok(token) => token,
                Err(e) => {
                    tracing::warn!("Credential fetch failed, connecting without token: {}", e);
                    String::new()
                }
            };
            let url = connection_url(settings.scheme, &settings.host, &settings.target, &token)?;
            tracing::debug!("Opening {}{} ({})", settings.host, settings.target.sub_path, id);
            connector.connect(url, id, events).await
        };

        let handle = ctx.spawn(attempt.into_actor(self).map(move |result, act, ctx| {
            act.state.take_pending_connect();
            act.finish_attempt(id, result, ctx);
        }));
        self.state.set_pending_connect(handle);
    }

    fn finish_attempt(
        &mut self,
        id: ConnectionId,
        result: Result<Box<dyn Transport>, TransportError>,
        ctx: &mut Context<Self>,
    ) {
        match result {
            Ok(mut transport) => {
                if !self.state.accepts(id) {
                    transport.close();
                    return;
                }
                self.state.install_transport(transport);
                self.dispatch(TransportEvent::new(id, TransportEventKind::Opened), ctx);
            },
            Err(e) => {
                self.dispatch(TransportEvent::new(id, TransportEventKind::Error(e.to_string())), ctx);
                self.dispatch(TransportEvent::new(id, TransportEventKind::Closed), ctx);
            }
        }
    }

    /// Single entry point for transport lifecycle transitions
    fn dispatch(&mut self, event: TransportEvent, ctx: &mut Context<Self>) {
        if !self.state.accepts(event.connection_id) {
            tracing::trace!("Ignoring event from stale connection {}", event.connection_id);
            return;
        }

        match event.kind {
            TransportEventKind::Opened => {
                self.set_status(SessionStatus::Connected);
                self.state.buffer.reset();
                self.fit_surface();
                self.write_surface(CONNECTED_BANNER.as_bytes());
            },
            TransportEventKind::Inbound(payload) => {
                self.write_surface(payload.as_bytes());
            },
            TransportEventKind::Error(e) => {
                tracing::warn!("Terminal transport error: {}", e);
                self.set_status(SessionStatus::Error);
            },
            TransportEventKind::Closed => {
                self.set_status(SessionStatus::Disconnected);
                self.state.release_transport();
                self.schedule_reconnect(ctx);
            }
        }
    }

    fn schedule_reconnect(&mut self, ctx: &mut Context<Self>) {
        self.cancel_reconnect(ctx);
        let delay = self.settings.reconnect_delay;
        tracing::info!("Reconnecting in {:?}", delay);

        let handle = ctx.run_later(delay, |act, ctx| {
            act.state.take_reconnect_timer();
            act.connect(ctx);
        });
        self.state.set_reconnect_timer(handle);
    }

    fn keep_alive(&mut self, ctx: &mut Context<Self>) {
        let handle = ctx.run_interval(self.settings.keep_alive_interval, |act, _ctx| {
            let Some(transport) = act.state.transport() else {
                return;
            };
            if !transport.is_open() {
                return;
            }
            if let Err(e) = transport.send_text(KEEP_ALIVE_SENTINEL) {
                tracing::debug!("Keep-alive not sent: {}", e);
            }
        });
        self.state.set_keep_alive(handle);
    }

    /// Cancel timers, close the transport, stop listening for auth changes
    fn teardown(&mut self, ctx: &mut Context<Self>) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.cancel_reconnect(ctx);
        if let Some(handle) = self.state.take_keep_alive() {
            ctx.cancel_future(handle);
        }
        self.release_connection(ctx);
        if let Some(mut subscription) = self.auth_subscription.take() {
            subscription.unsubscribe();
        }
        tracing::info!("Terminal session torn down");
    }
}

impl Actor for SessionController {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            "Terminal session started: project={} path={}",
            self.settings.target.project_id,
            self.settings.target.sub_path
        );

        let listener = ctx.address().recipient::<AuthStateChanged>();
        self.auth_subscription = Some(self.auth.subscribe(listener));

        self.keep_alive(ctx);
        self.connect(ctx);
    }

    fn stopped(&mut self, ctx: &mut Self::Context) {
        self.teardown(ctx);
    }
}

impl Handler<TransportEvent> for SessionController {
    type Result = ();

    fn handle(&mut self, msg: TransportEvent, ctx: &mut Self::Context) -> Self::Result {
        self.dispatch(msg, ctx);
    }
}

impl Handler<Keystroke> for SessionController {
    type Result = ();

    fn handle(&mut self, msg: Keystroke, _ctx: &mut Self::Context) -> Self::Result {
        if self.torn_down {
            return;
        }
        let connected = self.state.is_open();
        for outcome in route_keystroke(&mut self.state.buffer, &msg.data, connected) {
            if let Some(line) = outcome.outbound {
                if let Some(transport) = self.state.transport() {
                    if let Err(e) = transport.send_text(&line) {
                        tracing::warn!("Failed to send line: {}", e);
                    }
                }
            }
            if let Some(echo) = outcome.echo {
                self.write_surface(echo.as_bytes());
            }
        }
    }
}

impl Handler<AuthStateChanged> for SessionController {
    type Result = ();

    fn handle(&mut self, msg: AuthStateChanged, ctx: &mut Self::Context) -> Self::Result {
        tracing::info!("Re-authenticating terminal session after {:?}", msg.change);
        self.connect(ctx);
    }
}

impl Handler<FitSurface> for SessionController {
    type Result = ();

    fn handle(&mut self, _msg: FitSurface, _ctx: &mut Self::Context) -> Self::Result {
        if self.torn_down {
            return;
        }
        self.fit_surface();
    }
}

impl Handler<ViewActivated> for SessionController {
    type Result = ();

    fn handle(&mut self, _msg: ViewActivated, _ctx: &mut Self::Context) -> Self::Result {
        if self.torn_down {
            return;
        }
        self.fit_surface();
    }
}

impl Handler<Shutdown> for SessionController {
    type Result = ();

    fn handle(&mut self, _msg: Shutdown, ctx: &mut Self::Context) -> Self::Result {
        self.teardown(ctx);
        ctx.stop();
    }
}
