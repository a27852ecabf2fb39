// common/src/messages.rs
use actix::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies one transport handle; events carrying an old id are stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Raw keystroke data reported by the terminal surface
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct Keystroke {
    pub data: String,
}

impl Keystroke {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthChange {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Authentication state moved; any live connection carries a stale credential
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct AuthStateChanged {
    pub change: AuthChange,
}

/// Inbound frame body, passed to the surface untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Binary(data) => data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    Opened,
    Inbound(Payload),
    Error(String),
    Closed,
}

/// Lifecycle event from a transport handle
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct TransportEvent {
    pub connection_id: ConnectionId,
    pub kind: TransportEventKind,
}

impl TransportEvent {
    pub fn new(connection_id: ConnectionId, kind: TransportEventKind) -> Self {
        Self { connection_id, kind }
    }
}

/// Window resized
#[derive(Debug, Clone, Copy, Message)]
#[rtype(result = "()")]
pub struct FitSurface;

/// The hosting view became active
#[derive(Debug, Clone, Copy, Message)]
#[rtype(result = "()")]
pub struct ViewActivated;

/// Tear the session down; nothing fires afterwards
#[derive(Debug, Clone, Copy, Message)]
#[rtype(result = "()")]
pub struct Shutdown;
