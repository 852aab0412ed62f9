//! WebSocket HTTP handler for the web layer.
//!
//! This module contains only the Axum handlers for the chat websocket
//! endpoint. The relay itself (Hub, Connection, wire messages) lives in the
//! `relay` crate so producers can depend on it without pulling in routing.

pub mod handler;
