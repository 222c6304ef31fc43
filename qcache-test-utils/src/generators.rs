//! Proptest generators for QCACHE types.

use proptest::prelude::*;
use serde_json::Value;

use crate::{Order, Predicate, ScopeKey};

/// Strategy for JSON leaves. Floats are left out so equality stays exact.
pub fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 :_-]{0,12}".prop_map(Value::String),
    ]
}

/// Strategy for nested JSON values of bounded depth.
pub fn json_value() -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(field_name(), inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Strategy for predicate field names, including operator-style names.
/// Never produces `collection`.
pub fn field_name() -> impl Strategy<Value = String> {
    "\\$?[a-z]{1,8}".prop_filter("reserved field", |name| name != "collection")
}

/// Strategy for predicates given as a field list, so callers can rebuild the
/// same predicate in a different insertion order.
pub fn predicate_fields() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::btree_map(field_name(), json_value(), 0..6)
        .prop_map(|m| m.into_iter().collect())
}

/// Strategy for predicates.
pub fn predicate() -> impl Strategy<Value = Predicate> {
    predicate_fields().prop_map(|fields| fields.into_iter().collect())
}

/// Strategy for collection names.
pub fn collection_name() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{0,11}"
}

/// Strategy for scope keys (strings and numbers, like user or tenant ids).
pub fn scope_key() -> impl Strategy<Value = ScopeKey> {
    prop_oneof![
        "(user|tenant):[0-9]{1,4}".prop_map(ScopeKey::from),
        any::<u64>().prop_map(ScopeKey::from),
        Just(ScopeKey::default()),
    ]
}

/// Strategy for order documents with a fixed timestamp.
pub fn order() -> impl Strategy<Value = Order> {
    (
        any::<[u8; 16]>(),
        1u64..1_000,
        prop_oneof![Just("active"), Just("shipped"), Just("closed")],
        0i64..1_000_000,
    )
        .prop_map(|(id, user_id, status, total_cents)| Order {
            id: uuid::Uuid::from_bytes(id),
            user_id,
            status: status.to_string(),
            total_cents,
            created_at: crate::fixed_time(),
        })
}

/// Strategy for ordered lists of orders.
pub fn orders(max: usize) -> impl Strategy<Value = Vec<Order>> {
    prop::collection::vec(order(), 0..=max)
}
