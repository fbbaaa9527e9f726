//! Graph construction: depth-bounded nodes and edges over introspected
//! types, annotated with foreign-key metadata where it is available.
//!
//! Nodes are keyed by (type, depth): the same type reached at two depths is
//! two nodes. The whole node/edge set is rebuilt on every parameter change.

mod builder;
mod enhancer;
mod filter;
mod session;

pub use builder::build_graph;
pub use enhancer::{enhance_edge, enhance_edges};
pub use filter::{PrimaryModelChecker, TypeFilter};
pub use session::{BuildToken, GraphRequest, GraphSession};

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::fk::{Cardinality, Direction, FkLookup, FkMetadata};

/// Default cap on types fetched per depth level.
pub const DEFAULT_FETCH_CAP_PER_DEPTH: usize = 100;

/// Options for one graph build.
#[derive(Clone)]
pub struct TransformOptions {
    /// Number of depth levels, roots included. Values below 1 act as 1.
    pub max_depth: usize,
    pub include_scalars: bool,
    pub show_field_nodes: bool,
    pub fetch_cap_per_depth: usize,
    pub type_filter: Option<TypeFilter>,
    /// When absent nothing is primary and every node is a leaf.
    pub primary_model_checker: Option<PrimaryModelChecker>,
    pub fk_lookup: Option<Arc<FkLookup>>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            max_depth: 2,
            include_scalars: false,
            show_field_nodes: false,
            fetch_cap_per_depth: DEFAULT_FETCH_CAP_PER_DEPTH,
            type_filter: None,
            primary_model_checker: None,
            fk_lookup: None,
        }
    }
}

impl TransformOptions {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Default::default()
        }
    }

    pub fn with_type_filter(mut self, filter: TypeFilter) -> Self {
        self.type_filter = Some(filter);
        self
    }

    pub fn with_primary_model_checker(mut self, checker: PrimaryModelChecker) -> Self {
        self.primary_model_checker = Some(checker);
        self
    }

    pub fn with_fk_lookup(mut self, lookup: Arc<FkLookup>) -> Self {
        self.fk_lookup = Some(lookup);
        self
    }

    pub fn effective_max_depth(&self) -> usize {
        self.max_depth.max(1)
    }

    pub(crate) fn passes_filter(&self, type_name: &str) -> bool {
        self.type_filter
            .as_ref()
            .map_or(true, |filter| filter.allows(type_name))
    }

    pub(crate) fn is_primary(&self, type_name: &str) -> bool {
        self.primary_model_checker
            .as_ref()
            .is_some_and(|checker| checker.is_primary(type_name))
    }
}

impl fmt::Debug for TransformOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformOptions")
            .field("max_depth", &self.max_depth)
            .field("include_scalars", &self.include_scalars)
            .field("show_field_nodes", &self.show_field_nodes)
            .field("fetch_cap_per_depth", &self.fetch_cap_per_depth)
            .field("type_filter", &self.type_filter)
            .field("primary_model_checker", &self.primary_model_checker.is_some())
            .field("fk_lookup", &self.fk_lookup.as_ref().map(|l| l.len()))
            .finish()
    }
}

/// A non-relationship field, listed on its node when field nodes are shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSummary {
    pub name: String,
    pub type_name: String,
    pub is_list: bool,
    pub is_non_null: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// `"{typename}@{depth}"`
    pub id: String,
    pub typename: String,
    pub depth: usize,
    pub is_root: bool,
    pub is_primary_model: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSummary>,
}

impl GraphNode {
    pub fn node_id(typename: &str, depth: usize) -> String {
        format!("{}@{}", typename, depth)
    }
}

/// Relational annotation of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EdgeRelation {
    /// Not backed by a known foreign key; purely structural.
    Structural,
    ForeignKey(FkEdgeData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FkEdgeData {
    pub direction: Direction,
    pub cardinality: Cardinality,
    pub source_table: String,
    pub target_table: String,
    pub is_junction_table: bool,
}

impl From<&FkMetadata> for FkEdgeData {
    fn from(metadata: &FkMetadata) -> Self {
        Self {
            direction: metadata.direction,
            cardinality: metadata.cardinality,
            source_table: metadata.source_table.clone(),
            target_table: metadata.target_table.clone(),
            is_junction_table: metadata.is_junction_table,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    /// `"{source}:{field}->{target}"`
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_type: String,
    pub target_type: String,
    pub field_name: String,
    /// Schema-level list field. Informational only; cardinality comes from
    /// FK metadata.
    pub is_list: bool,
    pub relation: EdgeRelation,
}

impl GraphEdge {
    pub fn structural(
        source: &GraphNode,
        target: &GraphNode,
        field_name: &str,
        is_list: bool,
    ) -> Self {
        Self {
            id: format!("{}:{}->{}", source.id, field_name, target.id),
            source: source.id.clone(),
            target: target.id.clone(),
            source_type: source.typename.clone(),
            target_type: target.typename.clone(),
            field_name: field_name.to_string(),
            is_list,
            relation: EdgeRelation::Structural,
        }
    }

    pub fn is_foreign_key(&self) -> bool {
        matches!(self.relation, EdgeRelation::ForeignKey(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    /// Node count per depth level, indexed by depth
    pub nodes_per_depth: Vec<usize>,
    /// Distinct (type, depth) candidates rejected by the type filter
    pub filtered_nodes: usize,
    /// Types newly added to the cache during this build
    pub types_fetched: usize,
    /// Edges not created because their source is not a primary model
    pub edges_skipped_non_primary: usize,
    /// Missing types left unfetched because of the per-depth cap
    pub types_dropped_by_cap: usize,
    /// Frontier entries with no type data, so no node
    pub types_missing: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphBuild {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub stats: GraphStats,
}

impl GraphBuild {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |edge| edge.source == id)
    }
}
