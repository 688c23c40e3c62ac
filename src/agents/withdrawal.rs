//! Large-pool-withdrawal detector.
//!
//! Watches `Redeem` events on a tracked set of lending-pool tokens and
//! flags redemptions larger than a configured percentage of the token's
//! total supply. The tracked set is seeded from config and grows when the
//! comptroller emits `MarketListed`; entries are never removed.

use crate::abi;
use crate::agents::Agent;
use crate::fetch::SupplySource;
use crate::types::{Finding, FindingType, Severity, TxEvent};
use alloy::primitives::{Address, U256, U512};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

const ALERT_ID: &str = "POOL-WITHDRAW-1";

pub struct WithdrawalAgent {
    /// Insertion-ordered pool token addresses. Duplicate listings are kept
    /// as-is; membership checks make duplicates harmless.
    tracked: Vec<Address>,
    /// Redemption-to-supply percentage above which a finding is emitted.
    threshold_pct: u64,
    comptroller: Address,
    supply: Arc<dyn SupplySource>,
}

impl WithdrawalAgent {
    pub fn new(
        tracked: Vec<Address>,
        threshold_pct: u64,
        comptroller: Address,
        supply: Arc<dyn SupplySource>,
    ) -> Self {
        Self {
            tracked,
            threshold_pct,
            comptroller,
            supply,
        }
    }

    /// Append tokens announced by `MarketListed` logs on the comptroller.
    /// Runs before redemption scanning so a listing and a qualifying
    /// redemption in the same transaction both take effect.
    fn absorb_listings(&mut self, tx: &TxEvent) {
        for log in tx.logs_matching(&abi::MARKET_LISTED_TOPIC) {
            if log.address != self.comptroller {
                continue;
            }
            let Some(token) = abi::word_address(&log.data, 0) else {
                continue;
            };
            info!(token = %token, "new market listed, tracking pool token");
            self.tracked.push(token);
        }
    }
}

#[async_trait]
impl Agent for WithdrawalAgent {
    fn name(&self) -> &'static str {
        "large-pool-withdrawal"
    }

    async fn handle_transaction(&mut self, tx: &TxEvent) -> Result<Vec<Finding>> {
        self.absorb_listings(tx);

        let mut findings = Vec::new();
        for log in tx.logs_matching(&abi::REDEEM_TOPIC) {
            if !self.tracked.contains(&log.address) {
                continue;
            }
            // Redeem(address redeemer, uint256 redeemAmount, uint256 redeemTokens),
            // all non-indexed: redeemAmount is the second data word.
            let Some(amount) = abi::word(&log.data, 1) else {
                continue;
            };

            // A failed supply read skips this redemption only.
            let total_supply = match self.supply.total_supply(log.address).await {
                Ok(supply) => supply,
                Err(e) => {
                    warn!(token = %log.address, error = %e, "total supply fetch failed, skipping redemption");
                    continue;
                }
            };

            debug!(
                token = %log.address,
                amount = %amount,
                total_supply = %total_supply,
                "redemption observed"
            );

            // Widen before scaling: amounts near 2^256 would wrap a U256
            // multiply and silently suppress the alert.
            let scaled = U512::from(amount) * U512::from(100u64);
            let limit = U512::from(total_supply) * U512::from(self.threshold_pct);
            if scaled > limit {
                findings.push(create_finding(log.address, total_supply, amount));
            }
        }
        Ok(findings)
    }
}

fn create_finding(token: Address, total_supply: U256, amount: U256) -> Finding {
    let mut metadata = BTreeMap::new();
    metadata.insert("token".to_string(), token.to_string());
    metadata.insert("totalSupply".to_string(), total_supply.to_string());
    metadata.insert("redeemAmount".to_string(), amount.to_string());
    Finding {
        name: "Large Pool Withdrawal".to_string(),
        description: "A large amount of pool tokens was redeemed in a single transaction"
            .to_string(),
        alert_id: ALERT_ID.to_string(),
        protocol: "benqi".to_string(),
        severity: Severity::Medium,
        finding_type: FindingType::Info,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, B256};
    use anyhow::anyhow;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Canned supply responses, consumed in call order.
    struct MockSupply {
        responses: Mutex<VecDeque<Result<U256>>>,
    }

    impl MockSupply {
        fn with(responses: Vec<Result<U256>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait]
    impl SupplySource for MockSupply {
        async fn total_supply(&self, _token: Address) -> Result<U256> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("unexpected total_supply call")))
        }
    }

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn redeem_log(tx: TxEvent, token: Address, amount: impl Into<U256>) -> TxEvent {
        let amount = amount.into();
        let mut data = Vec::with_capacity(96);
        data.extend_from_slice(B256::left_padding_from(addr(0xd1).as_slice()).as_slice());
        data.extend_from_slice(B256::from(amount).as_slice());
        data.extend_from_slice(B256::from(amount).as_slice());
        tx.with_log(token, vec![*abi::REDEEM_TOPIC], Bytes::from(data))
    }

    fn market_listed_log(tx: TxEvent, comptroller: Address, token: Address) -> TxEvent {
        let data = B256::left_padding_from(token.as_slice());
        tx.with_log(
            comptroller,
            vec![*abi::MARKET_LISTED_TOPIC],
            Bytes::copy_from_slice(data.as_slice()),
        )
    }

    fn agent(supply: Arc<dyn SupplySource>) -> WithdrawalAgent {
        WithdrawalAgent::new(vec![addr(0xa1)], 25, addr(0xb1), supply)
    }

    #[tokio::test]
    async fn ignores_empty_transactions() {
        let mut agent = agent(MockSupply::with(vec![]));
        let findings = agent.handle_transaction(&TxEvent::new()).await.unwrap();
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn ignores_redeems_from_untracked_addresses() {
        let mut agent = agent(MockSupply::with(vec![]));
        let tx = redeem_log(TxEvent::new(), addr(0xc1), U256::from(1_000_000));
        let findings = agent.handle_transaction(&tx).await.unwrap();
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn ignores_redeems_under_the_threshold() {
        let mut agent = agent(MockSupply::with(vec![Ok(U256::from(1000))]));
        let tx = redeem_log(TxEvent::new(), addr(0xa1), U256::from(100));
        let findings = agent.handle_transaction(&tx).await.unwrap();
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn boundary_redeem_at_exact_threshold_is_not_reported() {
        let mut agent = agent(MockSupply::with(vec![Ok(U256::from(1000))]));
        let tx = redeem_log(TxEvent::new(), addr(0xa1), U256::from(250));
        let findings = agent.handle_transaction(&tx).await.unwrap();
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn detects_redeems_over_the_threshold() {
        let mut agent = agent(MockSupply::with(vec![Ok(U256::from(1000))]));
        let tx = redeem_log(TxEvent::new(), addr(0xa1), U256::from(500));
        let findings = agent.handle_transaction(&tx).await.unwrap();
        assert_eq!(
            findings,
            vec![create_finding(addr(0xa1), U256::from(1000), U256::from(500))],
        );
    }

    #[tokio::test]
    async fn detects_redeems_near_the_uint256_limit() {
        // 2^254 * 100 wraps to zero in 256-bit arithmetic; the widened
        // compare must still report it.
        let mut agent = agent(MockSupply::with(vec![
            Ok(U256::from(1000)),
            Ok(U256::from(1000)),
        ]));
        let huge = U256::from(1) << 254;
        let tx = redeem_log(TxEvent::new(), addr(0xa1), huge);
        let tx = redeem_log(tx, addr(0xa1), U256::MAX);
        let findings = agent.handle_transaction(&tx).await.unwrap();
        assert_eq!(
            findings,
            vec![
                create_finding(addr(0xa1), U256::from(1000), huge),
                create_finding(addr(0xa1), U256::from(1000), U256::MAX),
            ],
        );
    }

    #[tokio::test]
    async fn detects_multiple_redeems_with_per_log_supplies() {
        let mut agent = agent(MockSupply::with(vec![
            Ok(U256::from(1000)),
            Ok(U256::from(5000)),
        ]));
        let tx = redeem_log(TxEvent::new(), addr(0xa1), U256::from(700));
        let tx = redeem_log(tx, addr(0xa1), U256::from(2501));
        let findings = agent.handle_transaction(&tx).await.unwrap();
        assert_eq!(
            findings,
            vec![
                create_finding(addr(0xa1), U256::from(1000), U256::from(700)),
                create_finding(addr(0xa1), U256::from(5000), U256::from(2501)),
            ],
        );
    }

    #[tokio::test]
    async fn market_listing_takes_effect_within_the_same_transaction() {
        let mut agent = agent(MockSupply::with(vec![Ok(U256::from(1000))]));
        let tx = market_listed_log(TxEvent::new(), addr(0xb1), addr(0xa2));
        let tx = redeem_log(tx, addr(0xa2), U256::from(500));
        let findings = agent.handle_transaction(&tx).await.unwrap();
        assert_eq!(
            findings,
            vec![create_finding(addr(0xa2), U256::from(1000), U256::from(500))],
        );
    }

    #[tokio::test]
    async fn listings_from_other_contracts_are_ignored() {
        let mut agent = agent(MockSupply::with(vec![]));
        let tx = market_listed_log(TxEvent::new(), addr(0xc1), addr(0xa2));
        let tx = redeem_log(tx, addr(0xa2), U256::from(500));
        let findings = agent.handle_transaction(&tx).await.unwrap();
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn failed_supply_fetch_skips_that_redemption_only() {
        let mut agent = agent(MockSupply::with(vec![
            Err(anyhow!("provider down")),
            Ok(U256::from(1000)),
        ]));
        let tx = redeem_log(TxEvent::new(), addr(0xa1), U256::from(900));
        let tx = redeem_log(tx, addr(0xa1), U256::from(500));
        let findings = agent.handle_transaction(&tx).await.unwrap();
        assert_eq!(
            findings,
            vec![create_finding(addr(0xa1), U256::from(1000), U256::from(500))],
        );
    }
}
