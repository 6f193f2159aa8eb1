//! Basic queuebus usage: closures subscribed to plain events.

use queuebus::prelude::*;
use std::time::Duration;

#[derive(Clone, Debug)]
struct UserLoggedIn {
    user_id: u64,
    username: String,
}

impl Event for UserLoggedIn {}

#[derive(Clone, Debug)]
struct OrderCreated {
    order_id: u64,
    user_id: u64,
    total: f64,
}

impl Event for OrderCreated {}

fn main() -> Result<(), EventBusError> {
    println!("🚀 queuebus Basic Example");

    let bus = EventBus::new();
    bus.enable()?;

    bus.subscribe(|event: &UserLoggedIn| {
        println!("👤 User '{}' (ID: {}) logged in", event.username, event.user_id);
    })?;

    bus.subscribe(|event: &OrderCreated| {
        println!(
            "🛒 Order {} created by user {} for ${:.2}",
            event.order_id, event.user_id, event.total
        );
    })?;

    let high_value = bus.subscribe(|event: &OrderCreated| {
        if event.total > 100.0 {
            println!("💰 High-value order detected: ${:.2}", event.total);
        }
    })?;

    println!("\n📡 Firing events...\n");

    bus.fire_event(UserLoggedIn {
        user_id: 123,
        username: "alice".to_string(),
    })?;
    bus.fire_event(OrderCreated {
        order_id: 456,
        user_id: 123,
        total: 299.99,
    })?;
    bus.wait_idle(Some(Duration::from_secs(1)));

    println!("\n🔕 Unsubscribing the high-value watcher\n");
    bus.unsubscribe(high_value);

    bus.fire_event(OrderCreated {
        order_id: 457,
        user_id: 123,
        total: 150.00,
    })?;

    // Disabling drains whatever is still queued before the dispatcher stops.
    bus.disable()?;

    println!("\n✅ Done ({} handlers left)", bus.total_handler_count());
    Ok(())
}
