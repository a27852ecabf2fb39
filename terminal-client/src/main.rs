// terminal-client/src/main.rs
use actix::Actor;
use anyhow::Context as _;
use clap::Parser;
use common::{setup_tracing, setup_tracing_with_writer, AuthChange, Config, FitSurface, Keystroke, Shutdown, ViewActivated};
use crossterm::{execute, terminal::SetTitle};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use terminal_client::actors::{SessionController, SessionDeps};
use terminal_client::auth::{provider_from_config, AuthBroadcaster};
use terminal_client::session::SessionSettings;
use terminal_client::surface::{translate_event, CrosstermSurface, RawModeGuard, TerminalInput};
use terminal_client::transport::WsConnector;

/// Interactive terminal attached to a backend shell over WebSocket
#[derive(Debug, Parser)]
#[command(name = "terminal-client", version)]
struct Cli {
    /// Project identifier sent to the backend
    #[arg(long, env = "TERMINAL_PROJECT")]
    project: Option<String>,

    /// Backend channel, e.g. /terminal-audit
    #[arg(long)]
    path: Option<String>,

    /// Backend host:port
    #[arg(long)]
    host: Option<String>,

    /// Connect with wss
    #[arg(long)]
    secure: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(project) = &self.project {
            config.project_id = project.clone();
        }
        if let Some(path) = &self.path {
            config.sub_path = path.clone();
        }
        if let Some(host) = &self.host {
            config.backend_ws_host = host.clone();
        }
        if self.secure {
            config.secure = true;
        }
    }
}

#[actix::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _log_guard = match &cli.log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(std::path::Path::new("."));
            let file = path.file_name().context("log file path has no file name")?;
            let appender = tracing_appender::rolling::never(dir, file);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            setup_tracing_with_writer(writer);
            Some(guard)
        },
        None => {
            setup_tracing();
            None
        }
    };

    let mut config = Config::from_env();
    cli.apply(&mut config);

    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    let settings = SessionSettings::from_config(&config);
    let auth = Arc::new(AuthBroadcaster::new());

    let raw_mode = RawModeGuard::enable().context("failed to enable raw mode")?;
    let surface = CrosstermSurface::stdout().context("failed to open terminal")?;

    let (controller, mut status_rx) = SessionController::new(
        settings,
        SessionDeps {
            token_provider: provider_from_config(&config.auth),
            auth: auth.clone(),
            connector: Arc::new(WsConnector),
            surface: Box::new(surface),
        },
    );
    let session = controller.start();

    // Status badge
    let badge = actix::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = *status_rx.borrow();
            let _ = execute!(std::io::stdout(), SetTitle(format!("terminal [{}]", status)));
        }
    });

    // Blocking reader; exits with the process
    let (input_tx, mut input_rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || loop {
        match crossterm::event::read() {
            Ok(event) => {
                if let Some(input) = translate_event(event) {
                    if input_tx.send(input).is_err() {
                        break;
                    }
                }
            },
            Err(e) => {
                tracing::error!("Terminal input error: {}", e);
                break;
            }
        }
    });

    let mut hangup = hangup_signal()?;

    loop {
        tokio::select! {
            input = input_rx.recv() => match input {
                Some(TerminalInput::Data(data)) => session.do_send(Keystroke::new(data)),
                Some(TerminalInput::Resized) => session.do_send(FitSurface),
                Some(TerminalInput::FocusGained) => session.do_send(ViewActivated),
                Some(TerminalInput::Exit) | None => break,
            },
            _ = hangup.recv() => {
                // Operator rotated credentials
                auth.notify(AuthChange::TokenRefreshed);
            },
        }
    }

    if let Err(e) = session.send(Shutdown).await {
        tracing::warn!("Session already stopped: {}", e);
    }
    badge.abort();
    drop(raw_mode);
    println!();
    Ok(())
}

#[cfg(unix)]
fn hangup_signal() -> anyhow::Result<tokio::signal::unix::Signal> {
    use tokio::signal::unix::{signal, SignalKind};
    signal(SignalKind::hangup()).context("failed to install SIGHUP handler")
}

#[cfg(not(unix))]
fn hangup_signal() -> anyhow::Result<NeverSignal> {
    Ok(NeverSignal)
}

#[cfg(not(unix))]
struct NeverSignal;

#[cfg(not(unix))]
impl NeverSignal {
    async fn recv(&mut self) -> Option<()> {
        std::future::pending().await
    }
}
