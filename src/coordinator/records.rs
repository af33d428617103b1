//! Combined Records Queries
//!
//! Builds the query text for browsing the union of every fragment table on the
//! central node, ten rows per page, optionally narrowed to one `game_id`.

use crate::topology::types::Topology;

pub const ITEMS_PER_PAGE: usize = 10;

fn union_of_fragments(topology: &Topology, game_id: Option<i64>) -> String {
    let search_clause = game_id
        .map(|id| format!(" WHERE game_id = {}", id))
        .unwrap_or_default();

    topology
        .fragments()
        .map(|(_, fragment)| format!("SELECT * FROM {}{}", fragment.table, search_clause))
        .collect::<Vec<_>>()
        .join(" UNION ALL ")
}

pub fn total_records_query(topology: &Topology, game_id: Option<i64>) -> String {
    format!(
        "SELECT COUNT(*) AS total_records FROM ({}) AS combined_records",
        union_of_fragments(topology, game_id)
    )
}

/// `page` is 1-based; anything below 1 is treated as the first page.
pub fn page_query(topology: &Topology, game_id: Option<i64>, page: usize) -> String {
    let offset = page.saturating_sub(1).saturating_mul(ITEMS_PER_PAGE);
    format!(
        "SELECT * FROM ({}) AS combined_records LIMIT {} OFFSET {}",
        union_of_fragments(topology, game_id),
        ITEMS_PER_PAGE,
        offset
    )
}

pub fn total_pages(total_records: u64) -> u64 {
    total_records.div_ceil(ITEMS_PER_PAGE as u64)
}
