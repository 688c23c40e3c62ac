//! Transaction-monitoring agents.
//!
//! Each agent is invoked once per transaction and returns zero or more
//! findings. The host serializes invocations; agents hold their own
//! mutable state (tracked addresses, resolved oracle) on the instance.

pub mod answers;
pub mod gas;
pub mod unkill;
pub mod withdrawal;

use crate::types::{Finding, TxEvent};
use anyhow::Result;
use async_trait::async_trait;

/// One monitoring agent: a handler run against every transaction.
#[async_trait]
pub trait Agent: Send {
    fn name(&self) -> &'static str;

    /// Examine one transaction and return any findings, in match order.
    /// An empty vec is the normal no-match path, not an error.
    async fn handle_transaction(&mut self, tx: &TxEvent) -> Result<Vec<Finding>>;
}
