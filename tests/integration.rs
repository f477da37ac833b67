//! Integration tests for operation chains.

use opchain::{
    MemoryCache, OperationChain, OperationInput, SnapshotCache, Timestamp, TransformRegistry,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Snap {
    name: String,
}

fn snap(name: &str) -> Snap {
    Snap {
        name: name.to_string(),
    }
}

fn index_arg(data: Option<&Value>, at: usize) -> Option<usize> {
    data?.get(at)?.as_u64().map(|n| n as usize)
}

fn string_transforms() -> TransformRegistry<Snap> {
    TransformRegistry::new()
        .with("upper", |mut s: Snap, _| {
            s.name = s.name.to_uppercase();
            Ok(s)
        })
        .with("lower", |mut s: Snap, _| {
            s.name = s.name.to_lowercase();
            Ok(s)
        })
        .with("slice", |mut s: Snap, data| {
            let chars: Vec<char> = s.name.chars().collect();
            let start = index_arg(data, 0).unwrap_or(0).min(chars.len());
            let end = index_arg(data, 1).unwrap_or(chars.len()).clamp(start, chars.len());
            s.name = chars[start..end].iter().collect();
            Ok(s)
        })
        .with("prepend", |mut s: Snap, data| {
            let prefix = data.and_then(Value::as_str).ok_or("prepend needs a string")?;
            s.name = format!("{}{}", prefix, s.name);
            Ok(s)
        })
}

fn new_chain() -> OperationChain<Snap> {
    OperationChain::new(snap("hello"), string_transforms(), Vec::<OperationInput>::new()).unwrap()
}

// --- Scenarios ---

#[test]
fn test_incremental_inserts() {
    let mut chain = new_chain();

    chain.insert_operation(OperationInput::new("upper")).unwrap();
    assert_eq!(chain.eval(true).unwrap(), snap("HELLO"));

    chain.insert_operation(OperationInput::new("lower")).unwrap();
    assert_eq!(chain.eval(true).unwrap(), snap("hello"));

    chain
        .insert_operation(OperationInput::new("slice").data(json!([1])))
        .unwrap();
    assert_eq!(chain.eval(true).unwrap(), snap("ello"));
}

#[test]
fn test_timestamp_order_beats_insert_order() {
    let mut chain = new_chain();

    chain
        .insert_operations(vec![
            OperationInput::new("slice").data(json!([2])).at(Timestamp(2)),
            OperationInput::new("prepend").data(json!("123")).at(Timestamp(1)),
        ])
        .unwrap();

    assert_eq!(chain.eval(true).unwrap(), snap("3hello"));
}

#[test]
fn test_reversed_call_site_same_result() {
    let mut chain = new_chain();

    chain
        .insert_operations(vec![
            OperationInput::new("prepend").data(json!("123")).at(Timestamp(1)),
            OperationInput::new("slice").data(json!([2])).at(Timestamp(2)),
        ])
        .unwrap();

    assert_eq!(chain.eval(true).unwrap(), snap("3hello"));
}

#[test]
fn test_separate_inserts_still_sorted() {
    let mut chain = new_chain();

    chain
        .insert_operation(OperationInput::new("slice").data(json!([2])).at(Timestamp(2)))
        .unwrap();
    assert_eq!(chain.eval(true).unwrap(), snap("llo"));

    chain
        .insert_operation(OperationInput::new("prepend").data(json!("123")).at(Timestamp(1)))
        .unwrap();
    assert_eq!(chain.eval(true).unwrap(), snap("3hello"));
}

#[test]
fn test_initial_operations() {
    let chain = OperationChain::new(
        snap("hello"),
        string_transforms(),
        vec![
            OperationInput::new("upper").at(Timestamp(1)),
            OperationInput::new("slice").data(json!([0, 4])).at(Timestamp(2)),
        ],
    )
    .unwrap();

    assert_eq!(chain.len(), 2);
    assert_eq!(chain.eval(true).unwrap(), snap("HELL"));
}

// --- Properties ---

#[test]
fn test_empty_chain_is_base() {
    let chain = new_chain();
    assert!(chain.is_empty());
    assert_eq!(chain.eval(true).unwrap(), snap("hello"));
    assert_eq!(chain.eval(false).unwrap(), snap("hello"));
}

#[test]
fn test_consecutive_evals_equal() {
    let mut chain = new_chain();
    chain.insert_operations(["upper", "lower", "upper"]).unwrap();

    let first = chain.eval(true).unwrap();
    let second = chain.eval(true).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, snap("HELLO"));
}

#[test]
fn test_cache_is_transparent() {
    let mut chain = new_chain();
    chain
        .insert_operations(vec![
            OperationInput::new("prepend").data(json!("abc")).at(Timestamp(1)),
            OperationInput::new("upper").at(Timestamp(2)),
            OperationInput::new("slice").data(json!([1, 5])).at(Timestamp(3)),
        ])
        .unwrap();

    let uncached = chain.eval(false).unwrap();
    let cached = chain.eval(true).unwrap();
    let cached_again = chain.eval(true).unwrap();

    assert_eq!(uncached, snap("BCHE"));
    assert_eq!(cached, uncached);
    assert_eq!(cached_again, uncached);
}

#[test]
fn test_base_never_mutated() {
    let mut chain = new_chain();
    chain.insert_operations(["upper", "upper"]).unwrap();

    assert_eq!(chain.eval(true).unwrap(), snap("HELLO"));
    assert_eq!(chain.eval(false).unwrap(), snap("HELLO"));
    assert_eq!(chain.base(), &snap("hello"));
}

#[test]
fn test_cached_snapshots_not_mutated_by_later_transforms() {
    let cache = Arc::new(MemoryCache::<Snap>::new());
    let mut chain = new_chain().with_cache(cache.clone());

    chain.insert_operation(OperationInput::new("upper").at(Timestamp(1))).unwrap();
    assert_eq!(chain.eval(true).unwrap(), snap("HELLO"));

    // "lower" mutates its input in place; the cached "HELLO" must survive.
    chain.insert_operation(OperationInput::new("lower").at(Timestamp(2))).unwrap();
    assert_eq!(chain.eval(true).unwrap(), snap("hello"));

    let after_upper = cache.get(&chain.tree_hash(1).unwrap()).unwrap();
    assert_eq!(*after_upper, snap("HELLO"));
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_duplicate_operations_share_hash() {
    let mut chain = new_chain();
    chain
        .insert_operations(vec![
            OperationInput::new("slice").data(json!([1])).at(Timestamp(1)),
            OperationInput::new("slice").data(json!([1])).at(Timestamp(2)),
        ])
        .unwrap();

    let ops = chain.operations();
    assert_eq!(ops[0].hash, ops[1].hash);
    assert_ne!(chain.tree_hash(1).unwrap(), chain.tree_hash(2).unwrap());
    assert_eq!(chain.eval(true).unwrap(), snap("llo"));
}

#[test]
fn test_serializable_payloads() {
    #[derive(Serialize)]
    struct Prefix<'a> {
        text: &'a str,
    }

    let transforms = string_transforms().with("prepend_struct", |mut s: Snap, data| {
        let text = data
            .and_then(|d| d.get("text"))
            .and_then(Value::as_str)
            .ok_or("missing text")?;
        s.name = format!("{}{}", text, s.name);
        Ok(s)
    });
    let mut chain =
        OperationChain::new(snap("world"), transforms, Vec::<OperationInput>::new()).unwrap();

    chain
        .insert_operation(
            OperationInput::new("prepend_struct")
                .try_data(&Prefix { text: "hello " })
                .unwrap(),
        )
        .unwrap();
    assert_eq!(chain.eval(true).unwrap(), snap("hello world"));
}
