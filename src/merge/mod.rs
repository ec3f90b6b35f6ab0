//! Reconciliation of a newly supplied sequence with the persisted one.
//!
//! The merge keeps run history for steps that survive, takes the new
//! sequence's shape for everything else, and resolves the combined ordering
//! through a dependency graph built from both sequence orders plus rerun
//! edges.

pub mod graph;

use std::collections::HashMap;

use crate::error::Result;
use crate::model::{Sequence, Step};

use graph::StepGraph;

/// Merge `incoming` with `current`, producing the reconciled sequence.
///
/// Steps flagged `deleted` are dropped from both sides before any graph
/// work. For names present in both sequences the incoming shape wins and
/// only run-history fields (status, timestamps, failure reason) survive
/// from the current record. An empty current sequence short-circuits to the
/// incoming sequence verbatim.
pub fn merge_sequences(incoming: &Sequence, current: &Sequence) -> Result<Sequence> {
    let mut incoming = incoming.clone();
    incoming.drop_deleted();
    let mut current = current.clone();
    current.drop_deleted();

    if current.is_empty() {
        return Ok(incoming);
    }

    // Union of step records: incoming shape + current history for shared
    // names, current record for names the incoming sequence does not carry.
    let mut records: HashMap<String, Step> = HashMap::new();
    for step in &incoming.steps {
        let mut merged = step.clone();
        if let Some(existing) = current.find(&step.name) {
            merged.retain_history_from(existing);
        }
        records.insert(step.name.clone(), merged);
    }
    for step in &current.steps {
        records
            .entry(step.name.clone())
            .or_insert_with(|| step.clone());
    }

    let order = merge_order(&incoming, &current, &records)?;

    Ok(Sequence::new(
        order
            .into_iter()
            .filter_map(|name| records.remove(&name))
            .collect(),
    ))
}

/// Resolve the combined ordering. Incoming-sequence position is the primary
/// tie-break rank so repeated merges of the same inputs stay stable.
fn merge_order(
    incoming: &Sequence,
    current: &Sequence,
    records: &HashMap<String, Step>,
) -> Result<Vec<String>> {
    let mut graph = StepGraph::new();

    for (i, step) in incoming.steps.iter().enumerate() {
        graph.add_node(&step.name, i);
    }
    for (i, step) in current.steps.iter().enumerate() {
        graph.add_node(&step.name, incoming.len() + i);
    }

    for pair in incoming.steps.windows(2) {
        graph.add_edge(&pair[0].name, &pair[1].name);
    }
    for pair in current.steps.windows(2) {
        graph.add_edge(&pair[0].name, &pair[1].name);
    }

    // Rerun edges: a step precedes every step it forces back to READY.
    // Targets outside the union are not ordering constraints.
    for (name, step) in records {
        for dep in &step.states_to_rerun {
            graph.add_edge(name, dep);
        }
    }

    graph.topological_order()
}
