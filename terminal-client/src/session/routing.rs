// terminal-client/src/session/routing.rs
use super::input_buffer::InputBuffer;

pub const LINE_TERMINATOR: char = '\r';
pub const DELETE: char = '\u{7f}';
pub const BACKSPACE: char = '\u{8}';

pub const VISUAL_NEWLINE: &str = "\r\n";
pub const VISUAL_ERASE: &str = "\u{8} \u{8}";

/// What a single keystroke asks of the surface and the transport
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KeyOutcome {
    pub echo: Option<String>,
    pub outbound: Option<String>,
}

impl KeyOutcome {
    fn echo(text: impl Into<String>) -> Self {
        Self {
            echo: Some(text.into()),
            outbound: None,
        }
    }
}

fn is_erase(ch: char) -> bool {
    ch == DELETE || ch == BACKSPACE
}

/// Route one character against the buffer.
///
/// `connected` is whether the current transport is open right now. A line
/// terminator while offline is not queued; it drops the pending line.
pub fn route_char(buffer: &mut InputBuffer, ch: char, connected: bool) -> KeyOutcome {
    if ch == LINE_TERMINATOR {
        if connected {
            let line = buffer.commit();
            return KeyOutcome {
                echo: Some(VISUAL_NEWLINE.to_string()),
                outbound: Some(format!("{}\n", line)),
            };
        }
        buffer.reset();
        return KeyOutcome::echo(VISUAL_NEWLINE);
    }

    if is_erase(ch) {
        if buffer.backspace() {
            return KeyOutcome::echo(VISUAL_ERASE);
        }
        return KeyOutcome::default();
    }

    buffer.append(ch);
    KeyOutcome::echo(ch.to_string())
}

/// Route raw keystroke data one character at a time
pub fn route_keystroke(buffer: &mut InputBuffer, data: &str, connected: bool) -> Vec<KeyOutcome> {
    data.chars()
        .map(|ch| route_char(buffer, ch, connected))
        .collect()
}
