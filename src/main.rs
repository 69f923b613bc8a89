//! Sponsor relay server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use sponsor_relay::apikeys::ApiKeyStore;
use sponsor_relay::chain::{ChainClient, HttpChainClient};
use sponsor_relay::config::{Config, SponsorKeyMaterial};
use sponsor_relay::dedup::DedupStore;
use sponsor_relay::fees::FeeEstimator;
use sponsor_relay::handlers;
use sponsor_relay::nonce::NonceCoordinator;
use sponsor_relay::ratelimit::OriginRateLimiter;
use sponsor_relay::receipts::ReceiptStore;
use sponsor_relay::settlement::SettlementPipeline;
use sponsor_relay::stats::StatsAggregator;
use sponsor_relay::util::sig_down::SigDown;
use sponsor_relay::util::telemetry::Telemetry;
use sponsor_relay::wallet::{derive_wallet_from_raw_key, derive_wallets_from_mnemonic};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let telemetry = Telemetry::new()
        .with_name("sponsor-relay")
        .with_version(env!("CARGO_PKG_VERSION"))
        .register();

    let config = match Config::load() {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(error = %error, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let wallets = match &config.sponsor_key {
        SponsorKeyMaterial::Mnemonic { mnemonic, account_count } => {
            derive_wallets_from_mnemonic(mnemonic, *account_count)
        }
        SponsorKeyMaterial::RawKey { raw_key } => {
            derive_wallet_from_raw_key(raw_key).map(|w| vec![w])
        }
    };
    let wallets = match wallets {
        Ok(wallets) if !wallets.is_empty() => wallets,
        Ok(_) => {
            tracing::error!("sponsor key material produced zero wallets");
            std::process::exit(1);
        }
        Err(error) => {
            tracing::error!(error = %error, "failed to derive sponsor wallets");
            std::process::exit(1);
        }
    };
    let addresses: Vec<String> = wallets.iter().map(|w| w.address.clone()).collect();
    tracing::info!(wallet_count = wallets.len(), network = ?config.network, "sponsor wallets ready");

    let chain: Arc<dyn ChainClient> =
        Arc::new(HttpChainClient::new(config.chain_base_url(), config.chain_api_key.clone()));

    let shutdown = SigDown::try_new().unwrap_or_else(|error| {
        tracing::error!(error = %error, "failed to install signal handlers");
        std::process::exit(1);
    });

    let nonce = NonceCoordinator::spawn(addresses, chain.clone(), shutdown.cancellation_token());
    let fees = Arc::new(FeeEstimator::new(chain.clone()));
    let receipts = Arc::new(ReceiptStore::new());
    let dedup = Arc::new(DedupStore::new());
    let stats = Arc::new(StatsAggregator::new());
    let rate_limiter = Arc::new(OriginRateLimiter::new());
    let api_keys = Arc::new(ApiKeyStore::new());
    api_keys.provision_all(&config.api_keys);

    let pipeline = Arc::new(SettlementPipeline::new(
        chain,
        nonce,
        wallets,
        config.network,
        fees,
        receipts,
        dedup,
        stats,
        rate_limiter,
        api_keys,
    ));

    let app = handlers::routes()
        .with_state(pipeline)
        .layer(telemetry.http_tracing())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::new(config.host, config.port);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(error = %error, %addr, "failed to bind listener");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "sponsor relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancellation_token().cancelled().await })
        .await
        .unwrap_or_else(|error| tracing::error!(error = %error, "server exited with error"));
}
