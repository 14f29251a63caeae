use crate::entity::Entity;

/// Case-insensitive substring match against every field of the row.
pub fn matches_query<T: Entity>(entity: &T, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    entity
        .search_text()
        .to_lowercase()
        .contains(&query.to_lowercase())
}

pub fn filter_entities<'a, T: Entity>(entities: &'a [T], query: &str) -> Vec<&'a T> {
    entities.iter().filter(|e| matches_query(*e, query)).collect()
}
