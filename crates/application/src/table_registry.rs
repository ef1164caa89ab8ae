use std::sync::Arc;

use sppg_core::{AppError, AppResult};
use sppg_domain::EntitySchema;

/// Registry mapping entity identifiers to their table schema.
///
/// Populated once at startup, then shared read-only behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    schemas: Vec<Arc<EntitySchema>>,
}

impl TableRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a schema, replacing any schema with the same entity id in place.
    pub fn register(&mut self, schema: EntitySchema) -> AppResult<()> {
        schema.validate().map_err(|error| match error {
            AppError::Config(message) => AppError::Config(message),
            other => AppError::Config(other.to_string()),
        })?;

        let schema = Arc::new(schema);
        match self
            .schemas
            .iter_mut()
            .find(|existing| existing.entity_id() == schema.entity_id())
        {
            Some(existing) => *existing = schema,
            None => self.schemas.push(schema),
        }

        Ok(())
    }

    /// Returns the schema for `entity_id`, or a view-only fallback.
    #[must_use]
    pub fn get(&self, entity_id: &str) -> Arc<EntitySchema> {
        self.find(entity_id)
            .unwrap_or_else(|| Arc::new(EntitySchema::fallback(entity_id)))
    }

    /// Returns the registered schema, if any.
    #[must_use]
    pub fn find(&self, entity_id: &str) -> Option<Arc<EntitySchema>> {
        self.schemas
            .iter()
            .find(|schema| schema.entity_id() == entity_id)
            .cloned()
    }

    /// Returns schemas in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<EntitySchema>> {
        self.schemas.clone()
    }

    /// Returns the number of distinct registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use sppg_core::AppError;
    use sppg_domain::{ColumnSpec, EntityAction, EntitySchema, EntitySchemaInput};

    use super::TableRegistry;

    fn schema(entity_id: &str, display_name: &str) -> EntitySchema {
        let mut input = EntitySchemaInput::new(entity_id, display_name, format!("/{entity_id}"));
        input.columns = vec![ColumnSpec::text("name", "Nama").unwrap_or_else(|_| unreachable!())];
        EntitySchema::new(input).unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn last_registration_wins_without_duplicates() {
        let mut registry = TableRegistry::new();
        assert!(registry.register(schema("sppg", "SPPG")).is_ok());
        assert!(registry.register(schema("schools", "Sekolah")).is_ok());
        assert!(registry.register(schema("sppg", "Penyedia SPPG")).is_ok());

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("sppg").display_name(), "Penyedia SPPG");
    }

    #[test]
    fn list_keeps_registration_order() {
        let mut registry = TableRegistry::new();
        for entity_id in ["users", "menus", "schools"] {
            assert!(registry.register(schema(entity_id, entity_id)).is_ok());
        }

        let order: Vec<String> = registry
            .list()
            .iter()
            .map(|schema| schema.entity_id().to_owned())
            .collect();
        assert_eq!(order, vec!["users", "menus", "schools"]);
    }

    #[test]
    fn unknown_entities_get_a_view_only_fallback() {
        let registry = TableRegistry::new();
        let fallback = registry.get("nonexistent");
        assert!(fallback.columns().is_empty());
        assert!(fallback.allows(EntityAction::View));
        assert_eq!(fallback.allowed_actions().len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn register_rejects_column_less_schemas() {
        let mut registry = TableRegistry::new();
        let result = registry.register(EntitySchema::fallback("reports"));
        assert!(matches!(result, Err(AppError::Config(_))));
        assert!(registry.is_empty());
    }
}
