//! Shared fixtures for integration tests.

use std::sync::Arc;

use store_gateway::store::{CollectionKind, MemoryStore, Record};
use store_gateway::{CoreClient, GatewayConfig};

/// Default config with short, unjittered retry delays.
pub fn fast_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.resilience.initial_delay_ms = 100;
    config.resilience.max_delay_ms = 1000;
    config.resilience.jitter_fraction = 0.0;
    config
}

pub fn local(id: &str, name: &str, city: &str, state: &str) -> Record {
    Record::new(CollectionKind::Locals, id)
        .with_field("name", name)
        .with_field("city", city)
        .with_field("state", state)
}

#[allow(dead_code)]
pub fn job(id: &str, title: &str, state: &str) -> Record {
    Record::new(CollectionKind::Jobs, id)
        .with_field("title", title)
        .with_field("state", state)
}

/// Union locals spread over every region.
#[allow(dead_code)]
pub fn seeded_locals() -> Vec<Record> {
    vec![
        local("l46", "IBEW Local 46", "Seattle", "WA"),
        local("l48", "IBEW Local 48", "Portland", "OR"),
        local("l11", "IBEW Local 11", "Los Angeles", "CA"),
        local("l20", "IBEW Local 20", "Dallas", "TX"),
        local("l134", "IBEW Local 134", "Chicago", "IL"),
        local("l3", "IBEW Local 3", "New York", "NY"),
        local("l613", "IBEW Local 613", "Atlanta", "GA"),
    ]
}

/// Client over a store seeded with `records`.
pub fn client_with(records: Vec<Record>, config: &GatewayConfig) -> (Arc<MemoryStore>, CoreClient) {
    let store = Arc::new(MemoryStore::with_records(records));
    let client = CoreClient::new(store.clone(), config);
    (store, client)
}
