//! Breadth-first graph construction over the introspection cache.

use std::collections::{HashMap, HashSet};

use super::enhancer::enhance_edges;
use super::session::BuildToken;
use super::{FieldSummary, GraphBuild, GraphEdge, GraphNode, GraphStats, TransformOptions};
use crate::error::Result;
use crate::introspection::{is_meta_name, IntrospectionType, TypeCache, TypeFetcher};

/// Build nodes and edges reachable from `root_types`.
///
/// Pass 1 walks depth levels `0..max_depth`. Each level first fetches the
/// frontier types missing from `cache` as one batch, capped at
/// `fetch_cap_per_depth` (the excess is dropped, not deferred), then creates
/// one node per (type, depth) and collects the next frontier from
/// relationship fields that pass the type filter. Types whose data never
/// arrives are skipped along with everything below them.
///
/// Pass 2 links each primary-model node to the node for each relationship
/// target one level down, where such a node exists. Non-primary nodes stay
/// leaves; the edges they would have had are counted in
/// `edges_skipped_non_primary`. Edges are then stamped from `fk_lookup`.
///
/// The token is checked after every fetch; a superseded build stops with
/// [`TypegraphError::Superseded`](crate::TypegraphError::Superseded).
/// A named type reference without a name is the only other error; wrapper
/// chains that run out are skipped.
pub async fn build_graph(
    root_types: &[String],
    cache: &TypeCache,
    options: &TransformOptions,
    fetcher: &dyn TypeFetcher,
    token: &BuildToken,
) -> Result<GraphBuild> {
    let max_depth = options.effective_max_depth();
    let fetch_cap = options.fetch_cap_per_depth.max(1);
    let mut stats = GraphStats {
        nodes_per_depth: vec![0; max_depth],
        ..Default::default()
    };

    let mut nodes: Vec<GraphNode> = Vec::new();
    let mut node_index: HashMap<(String, usize), usize> = HashMap::new();

    let mut seen_roots = HashSet::new();
    let mut frontier: Vec<String> = root_types
        .iter()
        .filter(|name| seen_roots.insert(name.as_str()))
        .cloned()
        .collect();

    // Pass 1: nodes, one depth level at a time
    for depth in 0..max_depth {
        if frontier.is_empty() {
            break;
        }

        let missing = cache.missing(&frontier);
        if !missing.is_empty() {
            let (to_fetch, over_cap) = missing.split_at(missing.len().min(fetch_cap));
            if !over_cap.is_empty() {
                log::warn!(
                    "Depth {}: {} missing types exceed the fetch cap of {}; dropping {}",
                    depth,
                    missing.len(),
                    fetch_cap,
                    over_cap.join(", ")
                );
                stats.types_dropped_by_cap += over_cap.len();
            }

            let fetched = fetcher.fetch_types(to_fetch).await;
            token.ensure_current()?;

            let requested: HashSet<&str> = to_fetch.iter().map(String::as_str).collect();
            let accepted = fetched
                .into_values()
                .filter(|introspected| requested.contains(introspected.name.as_str()));
            stats.types_fetched += cache.insert_all(accepted);
        }

        let mut next_frontier = Vec::new();
        let mut queued: HashSet<String> = HashSet::new();
        let mut rejected: HashSet<String> = HashSet::new();

        for type_name in &frontier {
            let Some(introspected) = cache.get(type_name) else {
                log::debug!("Depth {}: no data for {}, skipping subtree", depth, type_name);
                stats.types_missing += 1;
                continue;
            };

            let fields = if options.show_field_nodes {
                field_summaries(&introspected, options.include_scalars)?
            } else {
                Vec::new()
            };

            nodes.push(GraphNode {
                id: GraphNode::node_id(type_name, depth),
                typename: type_name.clone(),
                depth,
                is_root: depth == 0,
                is_primary_model: options.is_primary(type_name),
                fields,
            });
            node_index.insert((type_name.clone(), depth), nodes.len() - 1);
            stats.nodes_per_depth[depth] += 1;

            if depth + 1 >= max_depth {
                continue;
            }
            for field in &introspected.fields {
                let Some(target) = field.relationship_target(options.include_scalars)? else {
                    continue;
                };
                if queued.contains(&target.name) || rejected.contains(&target.name) {
                    continue;
                }
                if options.passes_filter(&target.name) {
                    queued.insert(target.name.clone());
                    next_frontier.push(target.name);
                } else {
                    rejected.insert(target.name);
                }
            }
        }

        stats.filtered_nodes += rejected.len();
        frontier = next_frontier;
    }

    // Pass 2: edges between nodes that exist
    let mut edges = Vec::new();
    for node in &nodes {
        let child_depth = node.depth + 1;
        if child_depth >= max_depth {
            continue;
        }
        let Some(introspected) = cache.get(&node.typename) else {
            continue;
        };

        for field in &introspected.fields {
            let Some(target) = field.relationship_target(options.include_scalars)? else {
                continue;
            };
            if !options.passes_filter(&target.name) {
                continue;
            }
            let Some(&child) = node_index.get(&(target.name, child_depth)) else {
                continue;
            };
            if !node.is_primary_model {
                stats.edges_skipped_non_primary += 1;
                continue;
            }
            edges.push(GraphEdge::structural(
                node,
                &nodes[child],
                &field.name,
                target.is_list,
            ));
        }
    }

    let foreign_keys = enhance_edges(&mut edges, options.fk_lookup.as_deref());

    stats.total_nodes = nodes.len();
    stats.total_edges = edges.len();

    log::info!(
        "Graph built: {} nodes, {} edges ({} FK-backed), {} fetched, {} skipped non-primary",
        stats.total_nodes,
        stats.total_edges,
        foreign_keys,
        stats.types_fetched,
        stats.edges_skipped_non_primary
    );

    Ok(GraphBuild {
        nodes,
        edges,
        stats,
    })
}

fn field_summaries(
    introspected: &IntrospectionType,
    include_scalars: bool,
) -> Result<Vec<FieldSummary>> {
    let mut summaries = Vec::new();
    for field in &introspected.fields {
        if is_meta_name(&field.name) || field.relationship_target(include_scalars)?.is_some() {
            continue;
        }
        let Some(unwrapped) = field.type_ref.unwrap_bounded()? else {
            log::debug!(
                "{}.{}: type reference too deep to summarise",
                introspected.name,
                field.name
            );
            continue;
        };
        summaries.push(FieldSummary {
            name: field.name.clone(),
            type_name: unwrapped.name,
            is_list: unwrapped.is_list,
            is_non_null: unwrapped.is_non_null,
        });
    }
    Ok(summaries)
}
