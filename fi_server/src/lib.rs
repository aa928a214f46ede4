//! Websocket room server for the flood_isle engine.
//!
//! Exposes rooms over HTTP for management and over websockets for play.
//! All game state lives in the room actors of the library crate; this crate
//! only transports frames, loads configuration and records logs and metrics.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod observer;
