pub mod session_controller;

pub use session_controller::{SessionController, SessionDeps, CONNECTED_BANNER};
