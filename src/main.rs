use chainwatch::agents::answers::AnswersAgent;
use chainwatch::agents::gas::GasAgent;
use chainwatch::agents::unkill::UnkillAgent;
use chainwatch::agents::withdrawal::WithdrawalAgent;
use chainwatch::agents::Agent;
use chainwatch::config::Config;
use chainwatch::fetch::{ChainFetcher, OracleResolver, SupplySource};
use chainwatch::runner::{Runner, RunnerEvent};

use alloy::primitives::Address;
use alloy::providers::{ProviderBuilder, WsConnect};
use anyhow::Context;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage.
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    // Load .env if present
    let _ = dotenvy::dotenv();

    // Load config
    let config = if Path::new("chainwatch.toml").exists() {
        Config::load(Path::new("chainwatch.toml"))?
    } else {
        info!("no chainwatch.toml found, using env-only config");
        Config::from_env()?
    };

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .init();
    }

    info!("chainwatch v{} starting", env!("CARGO_PKG_VERSION"));

    // --- External data accessors ---
    // A dedicated connection for view reads; the runner manages its own.
    let ws = WsConnect::new(&config.rpc.ws_url);
    let provider = ProviderBuilder::new()
        .connect_ws(ws)
        .await
        .with_context(|| format!("failed to connect to {}", config.rpc.ws_url))?;
    let fetcher = Arc::new(ChainFetcher::new(provider));

    // --- Agents ---
    let mut agents: Vec<Box<dyn Agent>> = Vec::new();

    if config.withdrawal.enabled {
        let tracked = config
            .withdrawal
            .tracked_tokens
            .iter()
            .map(|s| Address::from_str(s).with_context(|| format!("invalid tracked token {s}")))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let comptroller = Address::from_str(&config.withdrawal.comptroller)
            .context("invalid comptroller address")?;
        let supply: Arc<dyn SupplySource> = fetcher.clone();
        info!(
            tracked = tracked.len(),
            threshold_pct = config.withdrawal.threshold_pct,
            comptroller = %comptroller,
            "large-pool-withdrawal agent enabled"
        );
        agents.push(Box::new(WithdrawalAgent::new(
            tracked,
            config.withdrawal.threshold_pct,
            comptroller,
            supply,
        )));
    }

    if config.unkill.enabled {
        let pool = if config.unkill.pool.is_empty() {
            Address::ZERO
        } else {
            Address::from_str(&config.unkill.pool).context("invalid unkill pool address")?
        };
        info!(alert_id = %config.unkill.alert_id, pool = %pool, "unkill agent enabled");
        agents.push(Box::new(UnkillAgent::new(config.unkill.alert_id.clone(), pool)));
    }

    if config.gas.enabled {
        info!("high-gas agent enabled");
        agents.push(Box::new(GasAgent::new()));
    }

    if config.answers.enabled {
        if config.answers.reality_module.is_empty() {
            warn!("answers agent enabled but no reality_module configured - disabled");
        } else {
            let reality_module = Address::from_str(&config.answers.reality_module)
                .context("invalid reality module address")?;
            let resolver: Arc<dyn OracleResolver> = fetcher.clone();
            let mut agent = AnswersAgent::new(reality_module, resolver);
            // A failed lookup leaves the agent inert rather than aborting
            // startup; it never retries on its own.
            if let Err(e) = agent.initialize().await {
                warn!(error = %e, "oracle resolution failed - answers agent will match nothing");
            }
            info!(reality_module = %reality_module, "oracle-answers agent enabled");
            agents.push(Box::new(agent));
        }
    }

    if agents.is_empty() {
        error!("all agents disabled, nothing to do");
        return Ok(());
    }

    // --- Runner ---
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<RunnerEvent>();
    Runner::new(config.rpc.clone(), event_tx).start();

    // --- Main Event Loop ---
    info!(agents = agents.len(), "entering main event loop - press Ctrl+C to stop");

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                match event {
                    RunnerEvent::Connected => info!("RPC connected"),
                    RunnerEvent::Disconnected { reason } => warn!(reason = %reason, "RPC disconnected"),
                    RunnerEvent::Transaction(tx) => {
                        for agent in agents.iter_mut() {
                            match agent.handle_transaction(&tx).await {
                                Ok(findings) => {
                                    for finding in findings {
                                        info!(
                                            agent = agent.name(),
                                            alert_id = %finding.alert_id,
                                            severity = %finding.severity,
                                            name = %finding.name,
                                            description = %finding.description,
                                            "FINDING"
                                        );
                                        debug!(
                                            payload = %serde_json::to_string(&finding).unwrap_or_default(),
                                            "finding payload"
                                        );
                                    }
                                }
                                Err(e) => {
                                    error!(agent = agent.name(), error = %e, "agent handler error");
                                }
                            }
                        }
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("shutting down...");
                break;
            }
        }
    }

    Ok(())
}
