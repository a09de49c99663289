//! Storefront demo.
//!
//! Walks through a full session against the mock backend: sign in, browse
//! both catalogs, fill a cart, check out, then look at history and tracking.

use anyhow::Context;
use storefront::formatters::format_price_with_symbol;
use storefront::{DeliveryInfo, Namespace, Storefront, StorefrontConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading configuration
    let _ = dotenvy::dotenv();
    let config = StorefrontConfig::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("storefront={}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(?config, "Starting storefront demo");
    let symbol = config.currency_symbol.clone();
    let storefront = Storefront::with_mock_backend(config);

    let user = storefront
        .login("demo@example.com", "password")
        .await
        .context("login failed")?;
    info!(user = %user.name, "Signed in");

    storefront
        .load_all_catalogs()
        .await
        .context("loading catalogs failed")?;
    for namespace in Namespace::ALL {
        info!(
            %namespace,
            categories = ?storefront.categories(namespace).await,
            "Catalog loaded"
        );
    }

    storefront.select_category("fruits").await?;
    let fruits = storefront.visible_products(Namespace::Grocery).await;
    storefront.select_category("all").await?;

    let groceries = storefront.visible_products(Namespace::Grocery).await;
    let apples = fruits
        .first()
        .or_else(|| groceries.first())
        .cloned()
        .context("grocery catalog is empty")?;
    storefront.add_to_cart(Namespace::Grocery, apples, 2).await?;
    if let Some(extra) = groceries.get(2).cloned() {
        storefront.add_to_cart(Namespace::Grocery, extra, 1).await?;
    }

    let cart = storefront.cart(Namespace::Grocery).await;
    info!(
        items = cart.total_items,
        total = %format_price_with_symbol(Some(cart.total_price), &symbol),
        "Cart ready"
    );

    let order = storefront
        .checkout(
            Namespace::Grocery,
            DeliveryInfo {
                address: "221B Baker Street".to_string(),
                phone: "+1234567890".to_string(),
                instructions: Some("Ring twice".to_string()),
            },
        )
        .await
        .context("checkout failed")?;
    info!(
        order_id = %order.id,
        total = %format_price_with_symbol(Some(order.total_price), &symbol),
        cart_items_after = storefront.cart(Namespace::Grocery).await.total_items,
        "Order placed"
    );
    println!("{}", serde_json::to_string_pretty(&order)?);

    let tracking = storefront.track_order(order.id.clone()).await?;
    info!(
        status = %tracking.status,
        location = %tracking.current_location,
        eta = %tracking.estimated_arrival,
        "Tracking"
    );

    let history = storefront.load_orders().await?;
    info!(orders = history.len(), "Order history loaded");

    storefront.logout().await?;
    storefront.shutdown().await?;
    info!("Demo finished");
    Ok(())
}
