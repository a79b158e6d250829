//! Tutor API Library Crate
//!
//! This library contains the web-facing side of the tutor service: the
//! application state, REST handlers, the WebSocket session bridge, and routing.
//! The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;
