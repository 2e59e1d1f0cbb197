//! Taxonomy enrichment of type-grouped rows

use crate::models::GroupResult;
use crate::taxonomy::{TaxonomyTable, base_type};
use std::sync::Arc;
use tracing::debug;

/// Expands event codes into readable names
#[derive(Debug, Clone)]
pub struct Enricher {
    taxonomy: Arc<TaxonomyTable>,
}

impl Enricher {
    pub fn new(taxonomy: Arc<TaxonomyTable>) -> Self {
        Self { taxonomy }
    }

    /// Attach `Type_Name`, `BaseType` and `BaseType_Name` to each row.
    ///
    /// Rows without a type code, or with a code the taxonomy does not know,
    /// are dropped. The base type name is left empty when the base code is
    /// itself unknown.
    pub fn enrich(&self, rows: Vec<GroupResult>) -> Vec<GroupResult> {
        let total = rows.len();
        let enriched: Vec<GroupResult> = rows
            .into_iter()
            .filter_map(|row| self.enrich_row(row))
            .collect();

        let dropped = total - enriched.len();
        if dropped > 0 {
            debug!(dropped, kept = enriched.len(), "Dropped rows with unclassifiable type");
        }
        enriched
    }

    fn enrich_row(&self, mut row: GroupResult) -> Option<GroupResult> {
        let code = row.type_code()?.to_string();
        let type_name = self.taxonomy.lookup(&code)?.to_string();
        let base = base_type(&code).unwrap_or(&code).to_string();
        let base_name = self.taxonomy.lookup(&base).unwrap_or_default().to_string();

        row.type_name = Some(type_name);
        row.base_type = Some(base);
        row.base_type_name = Some(base_name);
        Some(row)
    }
}
