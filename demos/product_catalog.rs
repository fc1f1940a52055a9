//! A product catalogue and the signed-in user, driven through both stores.
//!
//! Run with `RUST_LOG=crudstore=debug cargo run --example product_catalog`
//! to see every action traced.

use crudstore::{create_collection_store, create_entity_store, CollectionOptions, EntityOptions};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Product {
    sku: String,
    name: String,
    price_cents: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Session {
    user: String,
    preferences: Preferences,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Preferences {
    currency: String,
    dark_mode: bool,
}

fn product(sku: &str, name: &str, price_cents: u32) -> Product {
    Product {
        sku: sku.to_string(),
        name: name.to_string(),
        price_cents,
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Catalogue ===\n");

    let catalog = create_collection_store(CollectionOptions::<Product>::new().id_key("sku"));

    let _subscription = catalog.subscribe(|state| {
        println!(
            "  [catalogue] {} products, loaded={}, error={:?}",
            state.len(),
            state.loaded,
            state.error
        );
    });

    catalog.set_loading(true);
    catalog.replace_all(vec![
        product("LAP-1", "Laptop", 129_900),
        product("PHN-2", "Phone", 79_900),
    ]);
    catalog.set_loading(false);

    catalog.add(product("WCH-3", "Watch", 24_900));
    catalog.add(product("LAP-1", "Another laptop", 99_900));

    catalog.update("PHN-2", json!({ "price_cents": 69_900 }));
    catalog.update_many(vec![
        json!({ "sku": "LAP-1", "name": "Laptop Pro" }),
        json!({ "sku": "WCH-3", "price_cents": 19_900 }),
    ]);

    let snapshot = catalog.state();
    for item in snapshot.iter() {
        println!("  {} {:<12} {:>8}", item.sku, item.name, item.price_cents);
    }
    if let Some(first) = snapshot.get(0) {
        println!("  first listed: {}", first.name);
    }

    catalog.delete_many(["LAP-1", "PHN-2", "WCH-3"]);
    println!("  empty after delete: {}", catalog.is_empty());

    println!("\n=== Session ===\n");

    let session = create_entity_store(EntityOptions::<Session>::new().deep_merge(true));

    session.update(json!({ "user": "nobody" }));
    println!("  update before sign-in: {:?}", session.error());

    session.set(Session {
        user: "alice".to_string(),
        preferences: Preferences {
            currency: "EUR".to_string(),
            dark_mode: false,
        },
    });
    session.update(json!({ "preferences": { "dark_mode": true } }));

    if let Some(current) = session.entity() {
        println!(
            "  {} uses {} with dark_mode={}",
            current.user, current.preferences.currency, current.preferences.dark_mode
        );
    }

    session.clear();
    println!("  signed out, loaded={}", session.loaded());
}
