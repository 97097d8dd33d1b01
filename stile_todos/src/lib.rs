//! A small todo API protected by `stile` bearer tokens
//!
//! The binary wires everything together in `main`; the library exposes the
//! pieces so integration tests can build the router directly and drive it
//! without a listening socket.

pub mod config;
pub mod credentials;
pub mod routes;
pub mod store;
