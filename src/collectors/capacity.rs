//! Configured pool capacity per route, built from `show databases;`.

use crate::collectors::rows::{ResultSet, cell, opt_cell};
use crate::collectors::value::CellValue;
use anyhow::{Result, anyhow};
use std::collections::HashMap;

/// A route identity. An empty `user` is the wildcard for "any user".
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub database: String,
    pub user: String,
}

impl RouteKey {
    #[must_use]
    pub fn new(database: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            user: user.into(),
        }
    }

    #[must_use]
    pub fn wildcard(database: impl Into<String>) -> Self {
        Self::new(database, "")
    }
}

/// Read-only lookup of configured pool sizes for one scrape.
#[derive(Clone, Debug, Default)]
pub struct CapacityIndex {
    entries: HashMap<RouteKey, f64>,
}

impl CapacityIndex {
    /// Build the index from a `show databases;` response.
    ///
    /// Every row yields an exact `(name, force_user)` entry and raises the
    /// `(name, "")` wildcard to the largest size seen. Both are mirrored under
    /// the backend `database` name when that column is present.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` or `pool_size` are missing, or a pool size
    /// is not numeric.
    pub fn from_databases(set: &ResultSet) -> Result<Self> {
        let mut index = Self::default();
        if set.is_empty() {
            return Ok(index);
        }

        let [name_idx, pool_size_idx] = set.resolve("databases", ["name", "pool_size"])?;
        let database_idx = set.position("database");
        let user_idx = set.position("force_user");

        for row in &set.rows {
            let backend = opt_cell(row, database_idx).to_opt_text("database")?;

            let route = match cell(row, name_idx).to_opt_text("name")? {
                Some(name) => name,
                None => backend.clone().unwrap_or_default(),
            };

            let user = opt_cell(row, user_idx)
                .to_opt_text("force_user")?
                .unwrap_or_default();

            let size = pool_size(cell(row, pool_size_idx), &route)?;

            index.record(&route, &user, size);
            if let Some(backend) = backend {
                index.record(&backend, &user, size);
            }
        }

        Ok(index)
    }

    fn record(&mut self, database: &str, user: &str, size: f64) {
        if !user.is_empty() {
            self.entries.insert(RouteKey::new(database, user), size);
        }

        self.entries
            .entry(RouteKey::wildcard(database))
            .and_modify(|current| {
                if size > *current {
                    *current = size;
                }
            })
            .or_insert(size);
    }

    /// Exact `(database, user)` entry, else the database wildcard.
    #[must_use]
    pub fn lookup(&self, database: &str, user: &str) -> Option<f64> {
        self.entries
            .get(&RouteKey::new(database, user))
            .or_else(|| self.entries.get(&RouteKey::wildcard(database)))
            .copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn pool_size(value: &CellValue, route: &str) -> Result<f64> {
    if let CellValue::Text(text) = value
        && text.trim().is_empty()
    {
        return Ok(0.0);
    }

    value
        .to_f64("pool_size")
        .map(|size| size.unwrap_or(0.0))
        .map_err(|e| anyhow!("can't parse pool_size for {route}: {e}"))
}
