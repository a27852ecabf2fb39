// terminal-client/src/surface.rs
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{execute, terminal};
use std::borrow::Cow;
use std::io::{self, Write};
use thiserror::Error;

use crate::session::routing::{DELETE, LINE_TERMINATOR};

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("terminal io error: {0}")]
    Io(#[from] io::Error),
}

/// Where session output is rendered. The surface interprets escape sequences itself.
pub trait TerminalSurface {
    fn write(&mut self, data: &[u8]) -> Result<(), SurfaceError>;

    /// Re-layout to the current container size
    fn fit(&mut self) -> Result<(), SurfaceError>;
}

/// Insert `\r` before every bare `\n`
pub fn convert_eol(data: &[u8]) -> Cow<'_, [u8]> {
    let bare = data
        .iter()
        .enumerate()
        .any(|(i, b)| *b == b'\n' && (i == 0 || data[i - 1] != b'\r'));
    if !bare {
        return Cow::Borrowed(data);
    }

    let mut out = Vec::with_capacity(data.len() + 8);
    for (i, b) in data.iter().enumerate() {
        if *b == b'\n' && (i == 0 || data[i - 1] != b'\r') {
            out.push(b'\r');
        }
        out.push(*b);
    }
    Cow::Owned(out)
}

/// The user's terminal, in raw mode
pub struct CrosstermSurface<W: Write> {
    out: W,
    size: (u16, u16),
}

impl CrosstermSurface<io::Stdout> {
    pub fn stdout() -> Result<Self, SurfaceError> {
        Ok(Self::new(io::stdout(), terminal::size()?))
    }
}

impl<W: Write> CrosstermSurface<W> {
    pub fn new(out: W, size: (u16, u16)) -> Self {
        Self { out, size }
    }
}

impl<W: Write> TerminalSurface for CrosstermSurface<W> {
    fn write(&mut self, data: &[u8]) -> Result<(), SurfaceError> {
        self.out.write_all(&convert_eol(data))?;
        self.out.flush()?;
        Ok(())
    }

    fn fit(&mut self) -> Result<(), SurfaceError> {
        let size = terminal::size()?;
        if size != self.size {
            tracing::debug!("Terminal resized to {}x{}", size.0, size.1);
            self.size = size;
        }
        Ok(())
    }
}

/// Raw mode for the lifetime of the guard
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> Result<Self, SurfaceError> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), crossterm::event::EnableFocusChange)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), crossterm::event::DisableFocusChange);
        if let Err(e) = terminal::disable_raw_mode() {
            tracing::warn!("Failed to restore terminal mode: {}", e);
        }
    }
}

/// A terminal event as the session sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalInput {
    /// Raw keystroke data
    Data(String),
    Resized,
    FocusGained,
    /// Local exit request (Ctrl-C / Ctrl-D)
    Exit,
}

pub fn translate_event(event: Event) -> Option<TerminalInput> {
    match event {
        Event::Key(key) => translate_key(key),
        Event::Paste(text) => Some(TerminalInput::Data(text)),
        Event::Resize(_, _) => Some(TerminalInput::Resized),
        Event::FocusGained => Some(TerminalInput::FocusGained),
        _ => None,
    }
}

fn translate_key(key: KeyEvent) -> Option<TerminalInput> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') => Some(TerminalInput::Exit),
            _ => None,
        };
    }
    let data = match key.code {
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => LINE_TERMINATOR.to_string(),
        KeyCode::Backspace => DELETE.to_string(),
        KeyCode::Tab => "\t".to_string(),
        _ => return None,
    };
    Some(TerminalInput::Data(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_eol() {
        assert_eq!(&*convert_eol(b"a\nb"), b"a\r\nb");
        assert_eq!(&*convert_eol(b"\n"), b"\r\n");
        assert!(matches!(convert_eol(b"a\r\nb"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_surface_writes_verbatim_escape_sequences() {
        let mut surface = CrosstermSurface::new(Vec::new(), (80, 24));
        surface.write(b"\x1b[32mok\x1b[0m").unwrap();
        assert_eq!(surface.out, b"\x1b[32mok\x1b[0m");
    }

    #[test]
    fn test_translate_keys() {
        let enter = Event::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(translate_event(enter), Some(TerminalInput::Data("\r".to_string())));

        let backspace = Event::Key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(translate_event(backspace), Some(TerminalInput::Data("\u{7f}".to_string())));

        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(translate_event(ctrl_c), Some(TerminalInput::Exit));

        let up = Event::Key(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE));
        assert_eq!(translate_event(up), None);

        assert_eq!(translate_event(Event::Resize(100, 40)), Some(TerminalInput::Resized));
    }
}
