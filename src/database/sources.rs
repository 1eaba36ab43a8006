use async_trait::async_trait;
use sqlx::PgPool;

use super::manager::{DatabaseError, DatabaseManager};
use crate::registry::{DependencyRegistry, DependencySource, ModuleDescriptor, SourceError};

/// One row of a business table as the registry sees it
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OwnedRow {
    pub id: String,
    pub name: String,
    pub owner_id: Option<String>,
}

/// Dependency source over a single table with an owner column
pub struct TableSource {
    pool: PgPool,
    module: String,
    select_sql: String,
    update_sql: String,
}

impl TableSource {
    /// `table`, `name_column` and `owner_column` must be plain identifiers
    pub fn new(
        pool: PgPool,
        module: &str,
        table: &str,
        name_column: &str,
        owner_column: &str,
    ) -> Result<Self, DatabaseError> {
        let table = DatabaseManager::quote_identifier(table)?;
        let name_column = DatabaseManager::quote_identifier(name_column)?;
        let owner_column = DatabaseManager::quote_identifier(owner_column)?;

        let select_sql = format!(
            "SELECT id::text AS id, {name}::text AS name, {owner}::text AS owner_id \
             FROM {table} WHERE deleted_at IS NULL ORDER BY {name}",
            name = name_column,
            owner = owner_column,
            table = table,
        );
        // Owner columns hold identity-provider object ids (uuid)
        let update_sql = format!(
            "UPDATE {table} SET {owner} = $1::text::uuid, updated_at = now() \
             WHERE id::text = $2 AND deleted_at IS NULL",
            table = table,
            owner = owner_column,
        );

        Ok(Self {
            pool,
            module: module.to_string(),
            select_sql,
            update_sql,
        })
    }
}

#[async_trait]
impl DependencySource for TableSource {
    type Item = OwnedRow;

    async fn items(&self) -> Result<Vec<OwnedRow>, SourceError> {
        let rows = sqlx::query_as::<_, OwnedRow>(&self.select_sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    fn owner_id<'a>(&self, item: &'a OwnedRow) -> Option<&'a str> {
        item.owner_id.as_deref()
    }

    fn item_id(&self, item: &OwnedRow) -> String {
        item.id.clone()
    }

    fn item_name(&self, item: &OwnedRow) -> String {
        item.name.clone()
    }

    fn item_url(&self, item: &OwnedRow) -> Option<String> {
        Some(format!("/{}/{}", self.module, item.id))
    }

    async fn reassign(&self, item_id: &str, to_user_id: Option<&str>) -> Result<(), SourceError> {
        let result = sqlx::query(&self.update_sql)
            .bind(to_user_id)
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(SourceError::NotFound(item_id.to_string()));
        }
        Ok(())
    }
}

/// Module descriptor plus the table that backs it
pub struct StandardModule {
    pub descriptor: ModuleDescriptor,
    pub table: &'static str,
    pub name_column: &'static str,
}

pub fn standard_modules() -> Vec<StandardModule> {
    vec![
        StandardModule {
            descriptor: ModuleDescriptor::new("companies", "Companies", "building", "account_manager_id"),
            table: "companies",
            name_column: "name",
        },
        StandardModule {
            descriptor: ModuleDescriptor::new("projects", "Projects", "folder", "project_manager_id"),
            table: "projects",
            name_column: "name",
        },
        StandardModule {
            descriptor: ModuleDescriptor::new("estimates", "Estimates", "calculator", "estimator_id"),
            table: "estimates",
            name_column: "title",
        },
        StandardModule {
            descriptor: ModuleDescriptor::new("tasks", "Tasks", "check-square", "assignee_id"),
            table: "tasks",
            name_column: "title",
        },
    ]
}

/// Register a `TableSource` for every standard module
pub fn register_standard_sources(registry: &DependencyRegistry, pool: &PgPool) -> Result<(), DatabaseError> {
    for module in standard_modules() {
        let source = TableSource::new(
            pool.clone(),
            &module.descriptor.module,
            module.table,
            module.name_column,
            &module.descriptor.owner_field,
        )?;
        registry.register(module.descriptor, source);
    }
    Ok(())
}
