//! External analytical warehouse capability
//!
//! The pipeline can hand ratio derivation to a warehouse: preprocessed facts are
//! uploaded to one table per category and the derived view is queried back.
//! Wire protocol and authentication belong to the implementor.

use crate::category::Category;
use crate::dataset::CategoryDataset;
use crate::engines::engine_for;
use crate::error::{PipelineError, Result};
use crate::processing::PeriodFact;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};

static VIEW_QUERY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*SELECT\s+\*\s+FROM\s+([A-Z_]+)_VIEW\s*;?\s*$").ok());

/// Remote store that can receive facts and answer view queries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Replace the contents of `table` with `facts`
    async fn upload(&self, table: &str, facts: &[PeriodFact]) -> Result<()>;

    /// Run a query returning a wide dataset
    async fn query(&self, sql: &str) -> Result<CategoryDataset>;
}

/// In-process warehouse whose views are the local ratio engines
pub struct InMemoryWarehouse {
    tables: Mutex<HashMap<String, Vec<PeriodFact>>>,
    monetary_scale: f64,
}

impl InMemoryWarehouse {
    pub fn new(monetary_scale: f64) -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            monetary_scale,
        }
    }

    /// Names of uploaded tables
    pub fn tables(&self) -> Vec<String> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        names
    }

    fn view_category(sql: &str) -> Result<Category> {
        let captures = VIEW_QUERY
            .as_ref()
            .and_then(|re| re.captures(sql))
            .ok_or_else(|| PipelineError::Query(format!("Unsupported warehouse query: {sql}")))?;
        let table = captures[1].to_uppercase();

        Category::ALL
            .into_iter()
            .find(|c| c.warehouse_table() == table)
            .ok_or_else(|| PipelineError::Query(format!("Unknown warehouse view: {table}_VIEW")))
    }
}

#[async_trait]
impl Warehouse for InMemoryWarehouse {
    async fn upload(&self, table: &str, facts: &[PeriodFact]) -> Result<()> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables.insert(table.to_uppercase(), facts.to_vec());
        tracing::debug!("Uploaded {} rows to {table}", facts.len());
        Ok(())
    }

    async fn query(&self, sql: &str) -> Result<CategoryDataset> {
        let category = Self::view_category(sql)?;
        let facts = {
            let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
            tables.get(&category.warehouse_table()).cloned().ok_or_else(|| {
                PipelineError::Query(format!(
                    "Table {} has not been uploaded",
                    category.warehouse_table()
                ))
            })?
        };
        engine_for(category).run_query(&facts, self.monetary_scale)
    }
}
