use anyhow::Context;
use mediastore_api::{app, AppState};
use mediastore_catalog::{ChainedCatalog, ProductCatalog, ProductCategory, ProvinceAllowList, RushEvaluator};
use mediastore_order::{CheckoutOrchestrator, GatewayRegistry, MomoGateway, PaymentGateway, VnpayGateway};
use mediastore_store::{Config, StoreCatalog, StoreOrderRepository, StoreTransactionRepository};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mediastore_api=debug,mediastore_order=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Media Store API on port {}", config.server.port);

    let catalog = build_catalog(&config).await;
    let registry = build_registry(&config).context("Failed to register payment gateways")?;
    let rush = RushEvaluator::new(Arc::new(ProvinceAllowList::new(&config.rush.provinces)));

    let orchestrator = CheckoutOrchestrator::new(
        catalog.clone(),
        Arc::new(StoreOrderRepository::new()),
        Arc::new(StoreTransactionRepository::new()),
        Arc::new(registry),
        Arc::new(rush),
        config.checkout.policy(),
    );

    let app = app(AppState::new(Arc::new(orchestrator), catalog));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// One source per category, tried in declaration order.
async fn build_catalog(config: &Config) -> Arc<dyn ProductCatalog> {
    let sources: Vec<Arc<StoreCatalog>> = [
        ProductCategory::Book,
        ProductCategory::Cd,
        ProductCategory::Dvd,
        ProductCategory::Lp,
    ]
    .into_iter()
    .map(|category| Arc::new(StoreCatalog::for_category(category)))
    .collect();

    for product in &config.catalog.products {
        for source in &sources {
            if source.upsert(product.clone()).await {
                break;
            }
        }
    }
    tracing::info!("Loaded {} catalog products", config.catalog.products.len());

    Arc::new(ChainedCatalog::new(
        sources.into_iter().map(|s| s as Arc<dyn ProductCatalog>).collect(),
    ))
}

fn build_registry(config: &Config) -> anyhow::Result<GatewayRegistry> {
    let mut adapters: Vec<Arc<dyn PaymentGateway>> = Vec::new();
    if let Some(vnpay) = &config.gateways.vnpay {
        adapters.push(Arc::new(VnpayGateway::new(vnpay.clone())));
    }
    if let Some(momo) = &config.gateways.momo {
        adapters.push(Arc::new(MomoGateway::new(momo.clone())));
    }
    if adapters.is_empty() {
        tracing::warn!("No payment gateways configured; checkout will reject every payment type");
    }

    let registry = GatewayRegistry::new(adapters)?;
    tracing::info!("Payment gateways: {:?}", registry.list_supported());
    Ok(registry)
}
