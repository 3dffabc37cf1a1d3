//! End-to-end exercise of json-vet against realistic payloads:
//! - a storefront order feed with nested objects, arrays, and a set
//! - lenient ingestion (skip-invalid policy with a warning sink)
//! - a user-registered kind (big integers as numeric strings)
//! - a self-referential schema (linked category tree)

use std::sync::Arc;

use anyhow::{bail, Result};
use json_vet::{camel_case, set_spec, Config, Property, Sample, Schema};
use serde_json::json;

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    orders_feed()?;
    lenient_ingest()?;
    linked_categories()?;
    Ok(())
}

/// Strict parse of a realistic order payload, camelCase on the wire.
fn orders_feed() -> Result<()> {
    let cx = Arc::new(Config::new().rename(camel_case));

    let line_item = Schema::new("line_item")
        .field("sku", Property::new(json!("SKU-0")).min(1.0).regex(r"^[A-Z0-9-]+$"))
        .field("quantity", Property::new(json!(1)).min(1.0))
        .field("unit_price", Property::new(json!(0.0)).min(0.0).integer(false))
        .compile(&cx)?;

    let order = Schema::new("order")
        .field("id", Property::new(json!("ord-0")).min(1.0))
        .field(
            "status",
            Property::new(json!("pending"))
                .allowed(vec![json!("pending"), json!("paid"), json!("shipped")])
                .fallback(json!("pending")),
        )
        .field("items", Property::new(Sample::Array(vec![Sample::Schema(line_item)])).min(1.0))
        .field(
            "tags",
            Property::new(Sample::Collection(set_spec(), vec![Sample::Json(json!(""))]))
                .default_on_missing(),
        )
        .field("note", Property::new(json!("")).optional())
        .compile(&cx)?;

    let parsed = order.raise(&json!({
        "id": "ord-93",
        "status": "refunded",  // not allowed → falls back to "pending"
        "items": [
            {"sku": "TEA-GR-250", "quantity": 2, "unitPrice": 7.5},
            {"sku": "MUG-01", "quantity": 1, "unitPrice": 12.0}
        ],
        "tags": ["gift", "gift", "fragile"]
    }))?;
    println!("order parsed: {parsed}");

    if parsed["status"] != json!("pending") {
        bail!("fallback did not apply");
    }
    if parsed["tags"] != json!(["gift", "fragile"]) {
        bail!("set did not dedup");
    }

    println!("sample instance: {}", order.sample_value());
    Ok(())
}

/// Lenient batch ingestion: bad elements are pruned with warnings instead of
/// failing the feed.
fn lenient_ingest() -> Result<()> {
    let cx = Arc::new(
        Config::new()
            .skip_invalid(true)
            .warn_sink(|fail| tracing::warn!(path = %fail.path, "dropped: {}", fail.message)),
    );

    let reading = Schema::new("reading")
        .field("sensor", Property::new(json!("")).min(1.0))
        .field("celsius", Property::new(json!(0)).min(-80.0).max(80.0).integer(false))
        .compile(&cx)?;

    let batch = Schema::new("batch")
        .field("readings", Property::new(Sample::Array(vec![Sample::Schema(reading)])))
        .compile(&cx)?;

    let out = batch.raise(&json!({
        "readings": [
            {"sensor": "roof", "celsius": 21.5},
            {"sensor": "", "celsius": 19.0},          // pruned: empty sensor
            {"sensor": "cellar", "celsius": 9000.0},  // pruned: out of range
            {"sensor": "garden", "celsius": 14.0}
        ]
    }))?;
    let kept = out["readings"].as_array().map(Vec::len).unwrap_or(0);
    println!("kept {kept} of 4 readings: {out}");
    if kept != 2 {
        bail!("expected 2 surviving readings");
    }
    Ok(())
}

/// Self-referential schema: category → parent category.
fn linked_categories() -> Result<()> {
    let cx = Arc::new(Config::new());

    let category = Schema::new("category")
        .field("name", Property::new(json!("")).min(1.0))
        .field("parent", Property::new(json!(null)).optional())
        .compile(&cx)?;
    category.recurse("parent", category.clone())?;

    let parsed = category.raise(&json!({
        "name": "espresso machines",
        "parent": {"name": "kitchen", "parent": {"name": "home"}}
    }))?;
    println!("category chain: {parsed}");

    let Err(err) = category.raise(&json!({"name": "espresso machines", "parent": {"name": ""}}))
    else {
        bail!("an empty parent name should not validate");
    };
    println!("as expected: {err}");
    if err.to_string() != "parent.name: length of 0 < minimum length of 1" {
        bail!("unexpected failure shape: {err}");
    }
    Ok(())
}
