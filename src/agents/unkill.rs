//! Unkill-call detector.
//!
//! Flags any transaction whose call data starts with the selector of the
//! zero-argument `unkill_me()` function. No argument decoding is needed.

use crate::abi;
use crate::agents::Agent;
use crate::types::{Finding, FindingType, Severity, TxEvent};
use alloy::primitives::Address;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::debug;

pub struct UnkillAgent {
    alert_id: String,
    pool: Address,
    selector: [u8; 4],
}

impl UnkillAgent {
    pub fn new(alert_id: String, pool: Address) -> Self {
        Self {
            alert_id,
            pool,
            selector: abi::selector(abi::UNKILL_FUNCTION),
        }
    }
}

#[async_trait]
impl Agent for UnkillAgent {
    fn name(&self) -> &'static str {
        "unkill"
    }

    async fn handle_transaction(&mut self, tx: &TxEvent) -> Result<Vec<Finding>> {
        if tx.input.len() < 4 || tx.input[..4] != self.selector[..] {
            return Ok(Vec::new());
        }

        debug!(pool = %self.pool, "unkill_me() selector matched");
        Ok(vec![Finding {
            name: "Unkill Function Called".to_string(),
            description: "unkill_me() was called on the pool".to_string(),
            alert_id: self.alert_id.clone(),
            protocol: "ethereum".to_string(),
            severity: Severity::Low,
            finding_type: FindingType::Suspicious,
            metadata: BTreeMap::new(),
        }])
    }
}
