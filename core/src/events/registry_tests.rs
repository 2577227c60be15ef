//! Tests for EventRegistry registration, cost mutation, and listing order

use super::{EventDefinition, EventRegistry};

// ═══════════════════════════════════════════════════════════════════════════
// Test Helpers
// ═══════════════════════════════════════════════════════════════════════════

fn make_event(bit_cost: u32, cooldown_secs: f32) -> EventDefinition {
    EventDefinition::simple(bit_cost, cooldown_secs, |_, _| Ok(()))
}

fn make_registry(entries: &[(&str, u32)]) -> EventRegistry {
    let mut registry = EventRegistry::new();
    for (id, cost) in entries {
        registry.register(*id, make_event(*cost, 0.0));
    }
    registry
}

// ═══════════════════════════════════════════════════════════════════════════
// Registration Tests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_register_rejects_duplicate_id() {
    let mut registry = EventRegistry::new();
    assert!(registry.register("Laser", make_event(100, 5.0)));
    assert!(!registry.register("Laser", make_event(900, 1.0)));

    // First definition stays in place
    assert_eq!(registry.get("Laser").unwrap().bit_cost, 100);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_ids_are_case_sensitive() {
    let mut registry = EventRegistry::new();
    assert!(registry.register("Laser", make_event(100, 0.0)));
    assert!(registry.register("laser", make_event(200, 0.0)));
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_unregister_absent_id_is_noop() {
    let mut registry = make_registry(&[("Laser", 100)]);
    assert!(!registry.unregister("Meteor"));
    assert!(registry.unregister("Laser"));
    assert!(registry.is_empty());
}

#[test]
fn test_set_cost_updates_in_place() {
    let mut registry = make_registry(&[("HypeTrain", 0)]);
    assert!(registry.set_cost("HypeTrain", 500));
    assert_eq!(registry.get("HypeTrain").unwrap().bit_cost, 500);
    assert!(!registry.set_cost("Missing", 10));
}

#[test]
fn test_negative_cooldown_clamps_to_zero() {
    let def = EventDefinition::simple(10, -3.0, |_, _| Ok(()));
    assert_eq!(def.cooldown_secs, 0.0);
}

// ═══════════════════════════════════════════════════════════════════════════
// Listing Tests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_list_by_cost_orders_and_filters() {
    let registry = make_registry(&[
        ("Zap", 100),
        ("Ant", 100),
        ("Meteor", 1000),
        ("Spawn", 0),
        ("Laser", 500),
    ]);

    let listed = registry.list_by_cost();
    assert_eq!(
        listed,
        vec![("Ant", 100), ("Zap", 100), ("Laser", 500), ("Meteor", 1000)]
    );
}

#[test]
fn test_list_all_includes_free_events() {
    let registry = make_registry(&[("Zap", 100), ("Spawn", 0), ("Alarm", 0)]);
    let listed = registry.list_all();
    assert_eq!(listed, vec![("Alarm", 0), ("Spawn", 0), ("Zap", 100)]);
}

#[test]
fn test_set_cost_reorders_listing() {
    let mut registry = make_registry(&[("A", 100), ("B", 200)]);
    registry.set_cost("A", 300);
    assert_eq!(registry.list_by_cost(), vec![("B", 200), ("A", 300)]);
}

#[test]
fn test_price_lines_format() {
    let registry = make_registry(&[("Laser", 100), ("Spawn", 0)]);
    assert_eq!(registry.price_lines(), vec!["[ Laser ]: 100 bits".to_string()]);
}

#[test]
fn test_catalog_lines_omit_price_for_free_events() {
    let registry = make_registry(&[("Laser", 100), ("Spawn", 0)]);
    assert_eq!(
        registry.catalog_lines(),
        vec!["[ Spawn ]".to_string(), "[ Laser ]: 100 bits".to_string()]
    );
}
