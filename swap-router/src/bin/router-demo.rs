//! Router demo binary
//!
//! Deploys a router, a constant-rate pool and the stock executor on a fresh
//! (or restored) ledger, settles one DAI → WETH swap through the host actor,
//! and saves the resulting ledger snapshot. With `metrics_listen_addr` set
//! (or `ROUTER_METRICS_ADDR`) it then serves `GET /metrics` until Ctrl-C.
//!
//! Usage: `router-demo [config.toml]`

use anyhow::Context;
use axum::{http::StatusCode, routing::get};
use ledger_core::{
    spawn_host_actor, to_units, Address, Amount, AssetCall, CallContext, CallResult, Contract, Host, Revert,
    Storage, ASSET_GATEWAY,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use swap_router::{Config, Executor, Interaction, InteractionExecutor, Router, SwapRequest};

const DECIMALS: u32 = 18;
const ONE: Amount = 1_000_000_000_000_000_000;

/// Pool swap call
#[derive(Debug, Serialize, Deserialize)]
struct PoolSwap {
    input_asset: Address,
    output_asset: Address,
    amount_in: Amount,
}

/// Pool quoting a fixed `numerator / denominator` rate out of its reserves
struct ConstantRatePool {
    numerator: Amount,
    denominator: Amount,
}

impl Contract for ConstantRatePool {
    fn call(&self, cx: &mut CallContext<'_>, payload: &[u8]) -> CallResult {
        let swap: PoolSwap = bincode::deserialize(payload).map_err(|_| Revert::Silent)?;
        let pool = cx.address();
        let trader = cx.caller();

        cx.transfer_from(swap.input_asset, trader, pool, swap.amount_in)?;

        let amount_out = swap.amount_in / self.denominator * self.numerator;
        if cx.balance_of(swap.output_asset, pool) < amount_out {
            return Err(Revert::message("pool: insufficient reserves"));
        }
        cx.transfer(swap.output_asset, trader, amount_out)?;
        Ok(Vec::new())
    }
}

fn metrics_text(host: &Host, router: &Router) -> Result<String, (StatusCode, String)> {
    let internal = |e: prometheus::Error| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    let ledger = host.metrics().export().map_err(internal)?;
    let swaps = router.metrics().export().map_err(internal)?;
    Ok(ledger + &swaps)
}

async fn serve_metrics(addr: &str, host: Arc<Host>, router: Arc<Router>) -> anyhow::Result<()> {
    let app = axum::Router::new().route(
        "/metrics",
        get(move || {
            let host = host.clone();
            let router = router.clone();
            async move { metrics_text(&host, &router) }
        }),
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding metrics listener on {}", addr))?;
    tracing::info!(%addr, "serving /metrics, Ctrl-C to stop");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

fn load_config() -> anyhow::Result<Config> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        None => Config::from_env()?,
    };
    if config.router.treasury.is_zero() {
        config.router.treasury = Address::from_label("treasury");
        tracing::warn!(treasury = %config.router.treasury, "no treasury configured, using demo treasury");
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = load_config()?;
    tracing::info!(service = %config.service_name, version = %config.service_version, "starting router demo");

    // Restore the ledger
    let storage = Storage::open(&config.ledger)?;
    let mut host = Host::new(config.ledger.clone());
    if let Some(state) = storage.load()? {
        host = host.with_state(state);
    }
    let host = Arc::new(host);

    // Deploy contracts
    let owner = Address::from_label("deployer");
    let router = Router::deploy(&host, owner, &config.router)?;

    let pool = Address::from_label("demo-pool");
    host.deploy(
        pool,
        Arc::new(ConstantRatePool {
            numerator: 6,
            denominator: 5,
        }),
    )?;
    let executor = Address::from_label("demo-executor");
    host.deploy(executor, InteractionExecutor.into_contract())?;

    // Genesis balances
    let dai = Address::from_label("DAI");
    let weth = Address::from_label("WETH");
    let user = Address::from_label("demo-user");
    let amount_in = 100 * ONE;
    host.mint(dai, user, amount_in)?;
    host.mint(weth, pool, 1_000 * ONE)?;
    host.approve(dai, user, router.address(), amount_in)?;

    // Executor approves the pool, then swaps
    let interactions = vec![
        Interaction::new(
            ASSET_GATEWAY,
            AssetCall::Approve {
                asset: dai,
                spender: pool,
                amount: amount_in,
            }
            .encode()?,
        ),
        Interaction::new(
            pool,
            bincode::serialize(&PoolSwap {
                input_asset: dai,
                output_asset: weth,
                amount_in,
            })?,
        ),
    ];
    let request = SwapRequest::new(dai, weth, amount_in, 119 * ONE, host.now() + 300).with_route_id(1);

    let handle = spawn_host_actor(host.clone());
    let swap_router = router.clone();
    let record = handle
        .run(move |host| swap_router.swap(host, user, 0, executor, &request, &interactions))
        .await??;

    tracing::info!(settlement_id = %record.settlement_id, "swap settled");
    println!(
        "measured {} WETH, user received {}, treasury fee {}",
        to_units(record.measured_output, DECIMALS).unwrap_or_default(),
        to_units(record.payout, DECIMALS).unwrap_or_default(),
        to_units(record.fee, DECIMALS).unwrap_or_default(),
    );
    println!(
        "router balance after settlement: {}",
        host.balance_of(weth, router.address())
    );
    println!(
        "swaps executed: {}, failed: {}",
        router.metrics().swaps_executed.get(),
        router.metrics().swaps_failed.get()
    );

    handle.shutdown().await?;
    storage.save(&host.snapshot())?;
    tracing::info!(path = %storage.path().display(), "ledger snapshot saved");

    if let Some(addr) = config.metrics_listen_addr.as_deref() {
        serve_metrics(addr, host, router).await?;
    }

    Ok(())
}
