//! HLX Core - shared library for the HLX control stack.
//!
//! This crate models a multi-zone, multi-source audio matrix controller
//! and speaks its bracket-framed ASCII Telnet protocol in three
//! personalities:
//!
//! - **client** ([`client::ClientController`]): connects to a controller
//!   and maintains an event-driven, observable mirror of its state
//! - **server** ([`server::ServerController`]): answers the protocol
//!   against an in-memory model persisted through a backing store
//! - **proxy** ([`proxy::ProxyController`]): a client upstream and a
//!   server downstream, mirroring state and forwarding mutations
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`model`]: entities, bounded identifiers, nullable properties, and
//!   the group-derivation invariants
//! - [`protocol`]: framer, formatter, and the regex dispatch tables
//! - [`exchange`]: per-connection request/response pairing with timeout
//! - [`connection`]: the client-side connection manager
//! - [`events`]: the state-change notification bus
//! - [`persist`]: configuration snapshot persistence
//! - [`error`]: centralized error types
//!
//! # Abstraction seams
//!
//! - [`transport::Stream`]: any duplex byte stream carries the protocol;
//!   production uses TCP, tests use in-memory pipes
//! - [`events::EventSink`]: observers without transport knowledge
//! - [`persist::BackingStore`]: snapshot storage without format knowledge

#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod exchange;
pub mod model;
pub mod peer;
pub mod persist;
pub mod protocol;
pub mod proxy;
pub mod server;
pub mod transport;

// Re-export commonly used types at the crate root
pub use client::ClientController;
pub use config::{Capacity, Config, DEFAULT_PORT};
pub use error::{
    ConnectionError, ErrorCode, HlxError, HlxResult, ModelError, ProtocolError, StorageError,
};
pub use events::{
    BroadcastBridge, ConnectionEvent, ConnectionStage, Event, EventSink, LoggingEventSink,
    NoopEventSink, RefreshEvent, StateChange,
};
pub use model::{DeviceModel, SetOutcome};
pub use persist::{BackingStore, FileStore, MemoryStore};
pub use proxy::ProxyController;
pub use server::{default_model, NetworkIdentity, ServerController};
pub use transport::HostAddress;
