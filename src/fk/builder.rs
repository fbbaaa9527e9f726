//! FK lookup construction.

use serde::Serialize;

use super::inference::{infer_field_name, is_junction_table, is_self_reference};
use super::{Cardinality, Direction, FkLookup, FkMetadata, PgForeignKey};
use crate::names::NameMapper;

/// Counters from one lookup build. Diagnostic, but exact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FkBuildStats {
    pub total_rows: usize,
    pub entries: usize,
    /// Rows that produced no entry: unmapped tables plus key collisions
    pub parse_errors: usize,
    pub unmapped_tables: usize,
    pub collisions: usize,
    pub junction_tables: usize,
    pub self_references: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FkLookupResult {
    pub lookup: FkLookup,
    pub stats: FkBuildStats,
}

/// Classify FK rows into a `"Type.field"` lookup.
///
/// Each row whose two tables both map to types yields one forward entry
/// keyed on the source type and the field inferred from the source column.
/// Junction tables give many-to-many, everything else many-to-one. Reverse
/// entries are never synthesized: the schema exposes its own reverse
/// fields and the graph discovers them structurally.
///
/// The first row to claim a key keeps it; later rows with the same key
/// count as parse errors.
pub fn build_fk_lookup(rows: &[PgForeignKey], mapper: &NameMapper) -> FkLookupResult {
    let mut lookup = FkLookup::default();
    let mut stats = FkBuildStats {
        total_rows: rows.len(),
        ..Default::default()
    };

    for row in rows {
        let source_type = mapper.table_to_type(&row.source_table);
        let target_type = mapper.table_to_type(&row.target_table);
        let source_type = match (source_type, target_type) {
            (Some(source), Some(_)) => source,
            _ => {
                let unmapped: Vec<&str> = [
                    (source_type, row.source_table.as_str()),
                    (target_type, row.target_table.as_str()),
                ]
                .into_iter()
                .filter(|(mapped, _)| mapped.is_none())
                .map(|(_, table)| table)
                .collect();
                let message = format!(
                    "{}.{} -> {}.{}: unmapped table {}",
                    row.source_table,
                    row.source_column,
                    row.target_table,
                    row.target_column,
                    unmapped.join(", ")
                );
                log::debug!("Skipping FK {}", message);
                stats.unmapped_tables += 1;
                stats.parse_errors += 1;
                stats.errors.push(message);
                continue;
            }
        };

        let field_name = infer_field_name(&row.source_column);
        let is_junction = is_junction_table(&row.source_table);
        let is_self = is_self_reference(row);
        let key = FkLookup::key(source_type, &field_name);

        let metadata = FkMetadata {
            direction: Direction::Forward,
            cardinality: if is_junction {
                Cardinality::ManyToMany
            } else {
                Cardinality::ManyToOne
            },
            source_table: row.source_table.clone(),
            target_table: row.target_table.clone(),
            source_column: row.source_column.clone(),
            target_column: row.target_column.clone(),
            field_name,
            is_junction_table: is_junction,
            is_self_reference: is_self,
        };

        if lookup.insert_new(key.clone(), metadata) {
            stats.entries += 1;
            if is_junction {
                stats.junction_tables += 1;
            }
            if is_self {
                stats.self_references += 1;
            }
        } else {
            let message = format!(
                "duplicate key {} from {}.{}",
                key, row.source_table, row.source_column
            );
            log::debug!("Skipping FK {}", message);
            stats.collisions += 1;
            stats.parse_errors += 1;
            stats.errors.push(message);
        }
    }

    log::info!(
        "FK lookup built: {} entries from {} rows ({} errors, {} junction, {} self-referencing)",
        stats.entries,
        stats.total_rows,
        stats.parse_errors,
        stats.junction_tables,
        stats.self_references
    );

    FkLookupResult { lookup, stats }
}
