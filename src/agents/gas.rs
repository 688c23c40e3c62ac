//! Gas-threshold detector: one comparison, no state.

use crate::agents::Agent;
use crate::types::{Finding, FindingType, Severity, TxEvent};
use alloy::primitives::U256;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Strict lower bound: a transaction using exactly this much gas is not
/// reported.
pub const GAS_USED_THRESHOLD: u64 = 1_000_000;

#[derive(Default)]
pub struct GasAgent;

impl GasAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Agent for GasAgent {
    fn name(&self) -> &'static str {
        "high-gas"
    }

    async fn handle_transaction(&mut self, tx: &TxEvent) -> Result<Vec<Finding>> {
        if tx.gas_used <= U256::from(GAS_USED_THRESHOLD) {
            return Ok(Vec::new());
        }

        Ok(vec![Finding {
            name: "High Gas Used".to_string(),
            description: format!("Gas Used: {}", tx.gas_used),
            alert_id: "HIGH-GAS-1".to_string(),
            protocol: "ethereum".to_string(),
            severity: Severity::Medium,
            finding_type: FindingType::Suspicious,
            metadata: BTreeMap::new(),
        }])
    }
}
