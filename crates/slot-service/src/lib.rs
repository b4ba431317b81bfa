//! # slot-service — Spin and RNG services
//!
//! Thin transport over `slot-engine`: newline-delimited JSON frames on TCP.
//!
//! - [`SpinServer`] — `spin`, `list_games`, `reload` frames
//! - [`RngServer`] — standalone random number service
//! - [`RemoteRandomSource`] — engine-side client for the RNG server

pub mod protocol;
pub mod remote;
pub mod rng_server;
pub mod server;

pub use protocol::*;
pub use remote::*;
pub use rng_server::*;
pub use server::*;
