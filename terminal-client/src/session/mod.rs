pub mod input_buffer;
pub mod routing;
pub mod state;

pub use input_buffer::InputBuffer;
pub use routing::{route_char, route_keystroke, KeyOutcome};
pub use state::{SessionSettings, SessionState};
