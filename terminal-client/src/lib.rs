pub mod actors;
pub mod auth;
pub mod session;
pub mod surface;
pub mod transport;
