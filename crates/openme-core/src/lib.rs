//! openme core: replay protection and client registry
//!
//! This crate holds the server-side state that survives across
//! datagrams: the replay cache and the client registry. It has no
//! knowledge of sockets or firewalls.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod error;
pub mod ports;
pub mod registry;
pub mod replay;

pub use error::{CoreError, Result};
pub use ports::{PortSpec, Protocol};
pub use registry::{ClientRecord, ClientRegistry, ClientRegistryHandle};
pub use replay::{ReplayCache, ReplayOutcome};
