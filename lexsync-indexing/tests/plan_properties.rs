//! Property-based tests for indexing-plan coalescing.
//!
//! The coalesced plan must leave the index in the same final state as
//! applying every raw operation one by one, and must never hold more than
//! one pending operation per entity reference.

use lexsync_engine::{CommitStrategy, IndexEngine, MemoryIndexEngine, RefreshStrategy};
use lexsync_indexing::IndexingPlan;
use lexsync_types::{DocumentWork, EntityReference};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum Op {
    Add,
    Update,
    AddOrUpdate,
    Delete,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Add),
        Just(Op::Update),
        Just(Op::AddOrUpdate),
        Just(Op::Delete),
    ]
}

/// An operation sequence over a small reference pool, so collisions on the
/// same entity are common.
fn ops_strategy() -> impl Strategy<Value = Vec<(usize, Op, u32)>> {
    prop::collection::vec((0..3usize, op_strategy(), 0..100u32), 1..=6)
}

fn reference(index: usize) -> EntityReference {
    EntityReference::new("book", index.to_string())
}

fn document(version: u32) -> Value {
    json!({ "v": version })
}

fn apply_to_plan(plan: &mut IndexingPlan, reference: EntityReference, op: Op, version: u32) {
    match op {
        Op::Add => plan.add(reference, document(version)),
        Op::Update => plan.update(reference, document(version)),
        Op::AddOrUpdate => plan.add_or_update(reference, document(version)),
        Op::Delete => plan.delete(reference),
    }
}

/// The uncoalesced semantics: each operation hits the index directly.
fn apply_to_model(model: &mut HashMap<EntityReference, Value>, reference: EntityReference, op: Op, version: u32) {
    match op {
        Op::Add | Op::Update | Op::AddOrUpdate => {
            model.insert(reference, document(version));
        }
        Op::Delete => {
            model.remove(&reference);
        }
    }
}

proptest! {
    /// Flushing the coalesced plan leaves the engine in the same state as
    /// applying every operation individually.
    #[test]
    fn coalesced_flush_matches_sequential_application(ops in ops_strategy()) {
        let engine = Arc::new(MemoryIndexEngine::new());
        let mut plan = IndexingPlan::direct(
            Arc::clone(&engine) as Arc<dyn IndexEngine>,
            CommitStrategy::None,
            RefreshStrategy::None,
        );
        let mut model = HashMap::new();

        for (index, op, version) in &ops {
            apply_to_plan(&mut plan, reference(*index), *op, *version);
            apply_to_model(&mut model, reference(*index), *op, *version);
        }

        plan.execute().unwrap();

        for index in 0..3 {
            prop_assert_eq!(
                engine.document(&reference(index)),
                model.get(&reference(index)).cloned(),
                "mismatch for reference {}", index
            );
        }
    }

    /// However many operations target one entity, at most one stays
    /// pending.
    #[test]
    fn at_most_one_pending_operation_per_reference(ops in ops_strategy()) {
        let engine = Arc::new(MemoryIndexEngine::new());
        let mut plan = IndexingPlan::direct(
            Arc::clone(&engine) as Arc<dyn IndexEngine>,
            CommitStrategy::None,
            RefreshStrategy::None,
        );

        let mut touched = HashSet::new();
        for (index, op, version) in &ops {
            apply_to_plan(&mut plan, reference(*index), *op, *version);
            touched.insert(*index);
        }

        prop_assert!(plan.len() <= touched.len());
    }

    /// Coalescing never reorders entities: a direct flush and a sequential
    /// per-operation run agree even when the sequence interleaves
    /// references.
    #[test]
    fn sequential_engine_run_agrees_with_plan(ops in ops_strategy()) {
        let sequential = Arc::new(MemoryIndexEngine::new());
        for (index, op, version) in &ops {
            let work = match op {
                Op::Add => DocumentWork::add(reference(*index), document(*version)),
                Op::Update | Op::AddOrUpdate => {
                    DocumentWork::add_or_update(reference(*index), document(*version))
                }
                Op::Delete => DocumentWork::delete(reference(*index)),
            };
            sequential
                .execute(vec![work], CommitStrategy::None, RefreshStrategy::None)
                .unwrap();
        }

        let coalesced = Arc::new(MemoryIndexEngine::new());
        let mut plan = IndexingPlan::direct(
            Arc::clone(&coalesced) as Arc<dyn IndexEngine>,
            CommitStrategy::None,
            RefreshStrategy::None,
        );
        for (index, op, version) in &ops {
            apply_to_plan(&mut plan, reference(*index), *op, *version);
        }
        plan.execute().unwrap();

        for index in 0..3 {
            prop_assert_eq!(
                coalesced.document(&reference(index)),
                sequential.document(&reference(index))
            );
        }
    }
}
