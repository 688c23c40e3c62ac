//! Transaction ingestion host.
//!
//! Subscribes to new blocks over WebSocket RPC, assembles one `TxEvent`
//! per transaction (logs and gas used from the receipt, call data from the
//! transaction body) and hands them to the main loop over a tokio channel.
//!
//! Features:
//! - Automatic reconnection with exponential backoff
//! - Rotation through fallback WebSocket URLs on consecutive failures

use crate::config::RpcConfig;
use crate::types::TxEvent;

use alloy::consensus::Transaction as _;
use alloy::providers::{Provider, ProviderBuilder, WsConnect};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Events emitted by the runner, consumed by the main loop.
#[derive(Debug)]
pub enum RunnerEvent {
    /// The WebSocket connection was established.
    Connected,
    /// The WebSocket connection was lost (will auto-reconnect).
    Disconnected { reason: String },
    /// One fully assembled transaction, ready for the agents.
    Transaction(TxEvent),
}

pub struct Runner {
    config: RpcConfig,
    event_tx: mpsc::UnboundedSender<RunnerEvent>,
}

impl Runner {
    pub fn new(config: RpcConfig, event_tx: mpsc::UnboundedSender<RunnerEvent>) -> Self {
        Self { config, event_tx }
    }

    /// Start the runner in a background task. Returns immediately.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run_forever().await;
        })
    }

    /// Primary URL first, then fallbacks, duplicates skipped.
    fn ws_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = Vec::new();
        if !self.config.ws_url.is_empty() {
            urls.push(&self.config.ws_url);
        }
        for url in &self.config.fallback_ws_urls {
            if !url.is_empty() && urls.iter().all(|u| *u != url.as_str()) {
                urls.push(url);
            }
        }
        urls
    }

    /// Main loop: connect, stream blocks, reconnect on failure.
    async fn run_forever(&self) {
        let max_backoff = Duration::from_secs(60);
        let urls = self.ws_urls();
        if urls.is_empty() {
            error!("no WebSocket RPC URLs configured (primary or fallback)");
            return;
        }
        let mut url_index = 0;
        let mut consecutive_failures: usize = 0;

        loop {
            let url = urls[url_index];
            info!(url = %url, provider = url_index + 1, total = urls.len(), "connecting to WebSocket RPC");

            match self.run_session(url).await {
                Ok(()) => {
                    info!("WebSocket session ended cleanly");
                    consecutive_failures = 0;
                }
                Err(e) => {
                    error!(url = %url, error = %e, "WebSocket session error");
                    let _ = self.event_tx.send(RunnerEvent::Disconnected {
                        reason: e.to_string(),
                    });
                    consecutive_failures += 1;
                    url_index = (url_index + 1) % urls.len();
                }
            }

            // Rotate fast while untried providers remain, back off hard once
            // the whole list has failed this cycle.
            let backoff = if consecutive_failures == 0 {
                Duration::from_secs(1)
            } else if consecutive_failures < urls.len() {
                Duration::from_secs(2)
            } else {
                let cycle = consecutive_failures / urls.len();
                let secs = (2u64).pow(cycle.min(5) as u32).min(max_backoff.as_secs());
                Duration::from_secs(secs)
            };

            info!(
                backoff_secs = backoff.as_secs(),
                next_url = %urls[url_index],
                failures = consecutive_failures,
                "reconnecting to WebSocket RPC"
            );
            tokio::time::sleep(backoff).await;
        }
    }

    /// A single WebSocket session: connect, subscribe to blocks, process
    /// every transaction in each block in order.
    async fn run_session(&self, url: &str) -> anyhow::Result<()> {
        let ws = WsConnect::new(url);
        let provider = ProviderBuilder::new().connect_ws(ws).await?;

        let _ = self.event_tx.send(RunnerEvent::Connected);
        let current_block = provider.get_block_number().await?;
        info!(block = current_block, "WebSocket connected, streaming forward");

        let sub = provider.subscribe_blocks().await?;
        let mut stream = sub.into_stream();

        while let Some(header) = stream.next().await {
            if let Err(e) = self.process_block(&provider, header.number).await {
                warn!(block = header.number, error = %e, "failed to process block");
            }
        }

        // Stream ended - will reconnect
        Ok(())
    }

    async fn process_block<P: Provider>(&self, provider: &P, number: u64) -> anyhow::Result<()> {
        let receipts = provider
            .get_block_receipts(number.into())
            .await?
            .unwrap_or_default();

        debug!(block = number, txs = receipts.len(), "processing block");

        for receipt in receipts {
            // Call data lives on the transaction body, not the receipt.
            let input = match provider
                .get_transaction_by_hash(receipt.transaction_hash)
                .await?
            {
                Some(tx) => tx.input().clone(),
                None => Default::default(),
            };

            let mut event = TxEvent::new()
                .with_input(input)
                .with_gas_used(receipt.gas_used);
            event.addresses.insert(receipt.from);
            if let Some(to) = receipt.to {
                event.addresses.insert(to);
            }
            for log in receipt.inner.logs() {
                event = event.with_log(
                    log.address(),
                    log.topics().to_vec(),
                    log.data().data.clone(),
                );
            }

            let _ = self.event_tx.send(RunnerEvent::Transaction(event));
        }

        Ok(())
    }
}
