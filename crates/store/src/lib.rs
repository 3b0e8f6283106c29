//! In-memory JSON document store for Shelf.
//!
//! Collections are provisioned from the module registry at startup and hold
//! schemaless JSON objects. The store owns record identity and timestamps:
//! every insert is assigned a uuid v7 `id` plus `created_at`/`updated_at`,
//! and `update_merge` bumps `updated_at` on its own. Modules layer their own
//! typed views on top with serde.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    #[error("duplicate value for unique field '{0}'")]
    Conflict(String),

    #[error("document '{0}' not found")]
    NotFound(String),

    #[error("document body must be a JSON object")]
    NotAnObject,

    #[error("store lock poisoned")]
    Poisoned,
}

/// A stored record. The body is the module-owned payload; the surrounding
/// metadata belongs to the store.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub body: Value,
}

/// Top-level handle shared across modules.
pub struct Store {
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Create any missing collections. Called once after module init with the
    /// registry's aggregated collection list; safe to repeat.
    pub fn provision<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut collections = match self.collections.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for name in names {
            let name = name.into();
            collections.entry(name.clone()).or_insert_with(|| {
                tracing::debug!(collection = %name, "provisioning collection");
                Arc::new(Collection::new(name))
            });
        }
    }

    pub fn collection(&self, name: &str) -> Result<Arc<Collection>, StoreError> {
        self.collections
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))
    }

    pub fn collection_names(&self) -> Vec<String> {
        match self.collections.read() {
            Ok(guard) => {
                let mut names: Vec<String> = guard.keys().cloned().collect();
                names.sort();
                names
            }
            Err(_) => Vec::new(),
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// One named collection. Rows keep insertion order; queries are linear scans,
/// which is fine at personal-library scale.
pub struct Collection {
    name: String,
    rows: RwLock<Vec<Document>>,
}

impl Collection {
    fn new(name: String) -> Self {
        Self {
            name,
            rows: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn insert(&self, body: Value) -> Result<Document, StoreError> {
        if !body.is_object() {
            return Err(StoreError::NotAnObject);
        }
        let now = OffsetDateTime::now_utc();
        let doc = Document {
            id: Uuid::now_v7().to_string(),
            created_at: now,
            updated_at: now,
            body,
        };
        let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
        rows.push(doc.clone());
        Ok(doc)
    }

    /// Insert, rejecting the write when another document already carries the
    /// same value for `field`. The uniqueness check and the insert happen
    /// under one write lock.
    pub fn insert_unique(&self, field: &str, body: Value) -> Result<Document, StoreError> {
        if !body.is_object() {
            return Err(StoreError::NotAnObject);
        }
        let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
        if let Some(value) = body.get(field) {
            if rows.iter().any(|doc| doc.body.get(field) == Some(value)) {
                return Err(StoreError::Conflict(field.to_string()));
            }
        }
        let now = OffsetDateTime::now_utc();
        let doc = Document {
            id: Uuid::now_v7().to_string(),
            created_at: now,
            updated_at: now,
            body,
        };
        rows.push(doc.clone());
        Ok(doc)
    }

    pub fn get(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned)?;
        Ok(rows.iter().find(|doc| doc.id == id).cloned())
    }

    /// All documents whose body matches the predicate, in insertion order.
    pub fn find<F>(&self, predicate: F) -> Result<Vec<Document>, StoreError>
    where
        F: Fn(&Value) -> bool,
    {
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned)?;
        Ok(rows
            .iter()
            .filter(|doc| predicate(&doc.body))
            .cloned()
            .collect())
    }

    pub fn find_one<F>(&self, predicate: F) -> Result<Option<Document>, StoreError>
    where
        F: Fn(&Value) -> bool,
    {
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned)?;
        Ok(rows.iter().find(|doc| predicate(&doc.body)).cloned())
    }

    /// Shallow-merge the object fields of `patch` into the document body and
    /// bump `updated_at`. Keys present in the patch overwrite, keys absent are
    /// left alone.
    pub fn update_merge(&self, id: &str, patch: Value) -> Result<Document, StoreError> {
        let patch = match patch {
            Value::Object(map) => map,
            _ => return Err(StoreError::NotAnObject),
        };
        let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
        let doc = rows
            .iter_mut()
            .find(|doc| doc.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if let Value::Object(body) = &mut doc.body {
            for (key, value) in patch {
                body.insert(key, value);
            }
        }
        doc.updated_at = OffsetDateTime::now_utc();
        Ok(doc.clone())
    }

    pub fn remove(&self, id: &str) -> Result<Document, StoreError> {
        let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
        let index = rows
            .iter()
            .position(|doc| doc.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(rows.remove(index))
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned)?;
        Ok(rows.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}
