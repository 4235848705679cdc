//! A client session against one configured products collection.

use std::sync::Arc;

use admin_api_core::{ApiResult, ApiSettings};
use admin_api_query::prelude::*;

use crate::models::Product;

/// What the walkthrough observed, step by step.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub initial_count: u64,
    pub created_id: Option<i64>,
    pub bulk_created: usize,
    pub priciest: Vec<String>,
    pub fetched: Product,
    pub recategorized: u64,
    pub final_count: u64,
}

/// Builds a manager for `collection` using an HTTP transport configured from
/// `settings`.
pub fn products(collection: &str, settings: &ApiSettings) -> ApiResult<Manager<Product>> {
    let transport = Arc::new(HttpTransport::from_settings(settings)?);
    Manager::from_registry(collection, settings, transport, JsonSerializer::new())
}

/// Runs the walkthrough. The collection ends with the same rows it started
/// with.
pub async fn run(objects: &Manager<Product>) -> ApiResult<Report> {
    let initial_count = objects.count().await?;
    tracing::info!(collection = objects.name(), initial_count, "starting walkthrough");

    let mut desk = Product::new("desk", 120.0, Some("furniture"));
    save_model(&mut desk, objects, None).await?;
    tracing::info!(id = ?desk.id, "created desk");

    let chairs = objects
        .bulk_create(&[
            Product::new("chair", 45.0, Some("furniture")),
            Product::new("stool", 25.0, Some("furniture")),
        ])
        .await?;
    tracing::info!(created = chairs.len(), "bulk created");

    let priciest: Vec<String> = objects
        .filter(kwargs!("price__gte" => 20))
        .order_by(["-price"])
        .slice(..2)?
        .into_vec()
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect();
    tracing::info!(?priciest, "two most expensive");

    let fetched = objects.get(kwargs!("name" => "chair")).await?;

    let recategorized = objects
        .filter(kwargs!("category" => "furniture"))
        .update(kwargs!("category" => "office"))
        .await?;

    desk.price = 99.0;
    save_model(&mut desk, objects, Some(&["price"][..])).await?;

    delete_model(&desk, objects).await?;
    objects
        .filter(kwargs!("category" => "office"))
        .delete()
        .await?;

    let final_count = objects.count().await?;
    tracing::info!(final_count, "walkthrough finished");

    Ok(Report {
        initial_count,
        created_id: desk.id,
        bulk_created: chairs.len(),
        priciest,
        fetched,
        recategorized,
        final_count,
    })
}
