//! Persisted planning days
//!
//! The planner only needs three things from storage: the references already
//! issued, a way to save a validated day, and read access to saved days.
//! `MemoryStore` backs tests and runs without a database; the PostgreSQL
//! implementation lives in `db::queries::journee`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::types::Journee;

/// Source of already issued references
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Every persisted journée and tournée reference starting with `prefix`
    async fn existing_references(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Sink for validated days
#[async_trait]
pub trait JourneyPersister: Send + Sync {
    async fn save(&self, journee: &Journee) -> Result<()>;
}

/// Read access to validated days
#[async_trait]
pub trait JourneyLookup: Send + Sync {
    async fn find_by_date(&self, date: NaiveDate) -> Result<Option<Journee>>;

    /// Ids of every point already part of a persisted tournée
    async fn planned_point_ids(&self) -> Result<Vec<String>>;
}

/// Everything the planner needs from storage
pub trait JourneeStore: ReferenceStore + JourneyPersister + JourneyLookup {
    /// Get store name for logging
    fn name(&self) -> &str;
}

/// In-process store, lost on restart
#[derive(Default)]
pub struct MemoryStore {
    journees: Mutex<Vec<Journee>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journees(journees: Vec<Journee>) -> Self {
        Self {
            journees: Mutex::new(journees),
        }
    }

    pub fn len(&self) -> usize {
        self.journees.lock().len()
    }
}

#[async_trait]
impl ReferenceStore for MemoryStore {
    async fn existing_references(&self, prefix: &str) -> Result<Vec<String>> {
        let journees = self.journees.lock();
        let references = journees
            .iter()
            .flat_map(|j| {
                std::iter::once(j.reference.as_str())
                    .chain(j.tournees.iter().map(|t| t.reference.as_str()))
            })
            .filter(|r| r.starts_with(prefix))
            .map(str::to_string)
            .collect();
        Ok(references)
    }
}

#[async_trait]
impl JourneyPersister for MemoryStore {
    async fn save(&self, journee: &Journee) -> Result<()> {
        let mut journees = self.journees.lock();
        if journees.iter().any(|j| j.reference == journee.reference) {
            anyhow::bail!("journée {} already saved", journee.reference);
        }
        journees.push(journee.clone());
        Ok(())
    }
}

#[async_trait]
impl JourneyLookup for MemoryStore {
    async fn find_by_date(&self, date: NaiveDate) -> Result<Option<Journee>> {
        Ok(self.journees.lock().iter().find(|j| j.date == date).cloned())
    }

    async fn planned_point_ids(&self) -> Result<Vec<String>> {
        let journees = self.journees.lock();
        Ok(journees
            .iter()
            .flat_map(|j| j.tournees.iter())
            .flat_map(|t| t.point_ids.iter().cloned())
            .collect())
    }
}

impl JourneeStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }
}
