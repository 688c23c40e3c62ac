//! Alert and transaction-event types shared by all agents.

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// How severe a detected condition is, from informational to critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Unknown,
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Broad category of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FindingType {
    Unknown,
    Exploit,
    Suspicious,
    Degraded,
    Info,
}

impl fmt::Display for FindingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Exploit => "exploit",
            Self::Suspicious => "suspicious",
            Self::Degraded => "degraded",
            Self::Info => "info",
        };
        write!(f, "{s}")
    }
}

/// A structured alert record describing one detected condition.
///
/// Built fresh per match and handed to the caller for delivery; never
/// mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub name: String,
    pub description: String,
    /// Stable identifier for this class of alert.
    pub alert_id: String,
    pub protocol: String,
    pub severity: Severity,
    pub finding_type: FindingType,
    /// String key/value pairs carrying the matched data.
    pub metadata: BTreeMap<String, String>,
}

/// A single log entry emitted by a transaction.
#[derive(Debug, Clone, Default)]
pub struct LogEntry {
    /// The contract that emitted the log.
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

impl LogEntry {
    pub fn topic0(&self) -> Option<&B256> {
        self.topics.first()
    }
}

/// One blockchain transaction's data as handed to an agent: raw call
/// data, emitted logs, gas used and the addresses touched.
#[derive(Debug, Clone, Default)]
pub struct TxEvent {
    pub input: Bytes,
    pub gas_used: U256,
    pub logs: Vec<LogEntry>,
    /// Addresses touched by the transaction: sender, recipient and every
    /// log emitter. Part of the event surface handed to agents; the
    /// current agents match on logs and call data only.
    pub addresses: HashSet<Address>,
}

impl TxEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, input: Bytes) -> Self {
        self.input = input;
        self
    }

    pub fn with_gas_used(mut self, gas_used: u64) -> Self {
        self.gas_used = U256::from(gas_used);
        self
    }

    pub fn with_log(mut self, address: Address, topics: Vec<B256>, data: Bytes) -> Self {
        self.addresses.insert(address);
        self.logs.push(LogEntry {
            address,
            topics,
            data,
        });
        self
    }

    /// Logs whose first topic equals `topic0`, in emission order.
    pub fn logs_matching<'a>(&'a self, topic0: &'a B256) -> impl Iterator<Item = &'a LogEntry> {
        self.logs
            .iter()
            .filter(move |log| log.topic0() == Some(topic0))
    }
}
