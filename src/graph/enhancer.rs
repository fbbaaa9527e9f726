//! Foreign-key annotation of structural edges.

use super::{EdgeRelation, FkEdgeData, GraphEdge};
use crate::fk::FkLookup;

/// Stamp `edge` with the FK metadata for `"{source_type}.{field_name}"`.
///
/// Without a lookup, or without an entry, the edge is marked structural so
/// the graph still renders when relational data is missing.
pub fn enhance_edge(
    mut edge: GraphEdge,
    source_type: &str,
    field_name: &str,
    lookup: Option<&FkLookup>,
) -> GraphEdge {
    edge.relation = relation_for(source_type, field_name, lookup);
    edge
}

/// Re-stamp every edge from its own source type and field name.
/// Returns the number of edges backed by a foreign key.
pub fn enhance_edges(edges: &mut [GraphEdge], lookup: Option<&FkLookup>) -> usize {
    let mut foreign_keys = 0;
    for edge in edges.iter_mut() {
        edge.relation = relation_for(&edge.source_type, &edge.field_name, lookup);
        if edge.is_foreign_key() {
            foreign_keys += 1;
        }
    }
    foreign_keys
}

fn relation_for(source_type: &str, field_name: &str, lookup: Option<&FkLookup>) -> EdgeRelation {
    match lookup.and_then(|lookup| lookup.get(source_type, field_name)) {
        Some(metadata) => EdgeRelation::ForeignKey(FkEdgeData::from(metadata)),
        None => EdgeRelation::Structural,
    }
}
