//! chainwatch: independent transaction-monitoring agents for EVM chains.
//!
//! Each agent consumes one transaction event at a time and returns alert
//! `Finding`s when its pattern matches. The binary in `main.rs` wires the
//! agents to a WebSocket block stream; everything here is host-agnostic.

pub mod abi;
pub mod agents;
pub mod config;
pub mod fetch;
pub mod runner;
pub mod types;
