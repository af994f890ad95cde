#![forbid(unsafe_code)]

//! Core ledger and cooldown-gated mutation engine for the Civy economy.
//!
//! This crate provides:
//! - Domain types (accounts, resources, requests, outcomes)
//! - Account management with checked balance changes
//! - Cooldown policy for mining and daily claims
//! - Persistence (ledger store, event journal, CSV export)
//! - The action engine tying them together

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod clock;
pub mod account;
pub mod cooldown;
pub mod guard;
pub mod store;
pub mod journal;
pub mod export;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::{Config, EconomyConfig};
pub use clock::{Clock, ManualClock, SystemClock};
pub use cooldown::{can_act_now, CooldownDecision};
pub use store::{Change, JsonFileStore, LedgerStore, MemoryStore};
pub use journal::{read_events, EventKind, EventSink, JsonlJournal, LedgerEvent};
pub use export::export_csv;
pub use engine::Economy;
