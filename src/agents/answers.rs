//! Oracle-answer-submission filter.
//!
//! Resolves the oracle address registered against a reality module once
//! at startup, then maps every answer-related log the oracle emits to a
//! finding. The handler never retries resolution; while the oracle is
//! unresolved it simply matches nothing.

use crate::abi;
use crate::agents::Agent;
use crate::fetch::OracleResolver;
use crate::types::{Finding, FindingType, LogEntry, Severity, TxEvent};
use alloy::eips::BlockId;
use alloy::primitives::Address;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

pub struct AnswersAgent {
    reality_module: Address,
    oracle: Option<Address>,
    resolver: Arc<dyn OracleResolver>,
}

impl AnswersAgent {
    pub fn new(reality_module: Address, resolver: Arc<dyn OracleResolver>) -> Self {
        Self {
            reality_module,
            oracle: None,
            resolver,
        }
    }

    /// One-shot oracle lookup at the latest block. Called by the host at
    /// startup; a failure leaves the agent inert.
    pub async fn initialize(&mut self) -> Result<()> {
        let oracle = self
            .resolver
            .oracle(self.reality_module, BlockId::latest())
            .await?;
        info!(reality_module = %self.reality_module, oracle = %oracle, "resolved oracle address");
        self.oracle = Some(oracle);
        Ok(())
    }
}

#[async_trait]
impl Agent for AnswersAgent {
    fn name(&self) -> &'static str {
        "oracle-answers"
    }

    async fn handle_transaction(&mut self, tx: &TxEvent) -> Result<Vec<Finding>> {
        let Some(oracle) = self.oracle else {
            return Ok(Vec::new());
        };

        let findings = tx
            .logs
            .iter()
            .filter(|log| log.address == oracle)
            .filter_map(answer_finding)
            .collect();
        Ok(findings)
    }
}

/// Pure mapping from a decoded oracle log to a finding. Logs that are not
/// in the watched signature set map to `None`.
fn answer_finding(log: &LogEntry) -> Option<Finding> {
    let topic0 = log.topic0()?;
    let (event, alert_id) = if *topic0 == *abi::LOG_NEW_ANSWER_TOPIC {
        ("LogNewAnswer", "SAFESNAP-ANSWER-1")
    } else if *topic0 == *abi::LOG_ANSWER_REVEAL_TOPIC {
        ("LogAnswerReveal", "SAFESNAP-ANSWER-2")
    } else {
        return None;
    };

    let mut metadata = BTreeMap::new();
    metadata.insert("event".to_string(), event.to_string());
    metadata.insert("oracle".to_string(), log.address.to_string());
    // question_id is the first indexed parameter on both events
    if let Some(question_id) = log.topics.get(1) {
        metadata.insert("questionId".to_string(), question_id.to_string());
    }

    Some(Finding {
        name: "Oracle Answer Submitted".to_string(),
        description: format!("{event} emitted by the reality oracle"),
        alert_id: alert_id.to_string(),
        protocol: "safesnap".to_string(),
        severity: Severity::Info,
        finding_type: FindingType::Info,
        metadata,
    })
}
