use redb::TableDefinition;

/// One table per collection: document id -> document (msgpack)
pub fn collection_table(name: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(name)
}
