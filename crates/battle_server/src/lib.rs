//! # Battle Server
//!
//! Hosts battles from `battle_core` for many players at once.
//!
//! The engine itself is a synchronous state machine. This crate adds what a
//! multiplayer host needs around it:
//! - A registry that serializes commands per battle
//! - Persistence of snapshots and event logs
//! - Fraction credentials and player/operator projections
//! - Broadcast notifications when turns resolve
//! - A headless simulator driven by RON scenarios

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod auth;
pub mod config;
pub mod error;
pub mod notify;
pub mod projection;
pub mod registry;
pub mod scenario;
pub mod service;
pub mod store;
pub mod strategy;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use service::BattleService;
