//! In-memory summary store.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::{
    BuildSummary, NewBuildSummary, SummaryError, SummaryResult, SummaryStore, SummaryUpdate,
};

/// [`SummaryStore`] keeping every row in a concurrent map.
///
/// Each update runs under the row's shard lock, which gives the same
/// single-row atomicity a database `UPDATE` statement does. Cloning is cheap and
/// clones share the same rows.
#[derive(Debug, Clone, Default)]
pub struct MemorySummaryStore {
    rows: Arc<DashMap<String, BuildSummary>>,
}

impl MemorySummaryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of summary rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns whether the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl SummaryStore for MemorySummaryStore {
    async fn insert_summary(&self, new_summary: NewBuildSummary) -> SummaryResult<BuildSummary> {
        match self.rows.entry(new_summary.pipeline_id.clone()) {
            Entry::Occupied(_) => Err(SummaryError::already_exists(new_summary.pipeline_id)),
            Entry::Vacant(entry) => {
                let row = BuildSummary::new(new_summary);
                entry.insert(row.clone());
                Ok(row)
            }
        }
    }

    async fn delete_summary(&self, pipeline_id: &str) -> SummaryResult<bool> {
        Ok(self.rows.remove(pipeline_id).is_some())
    }

    async fn find_summary(&self, pipeline_id: &str) -> SummaryResult<Option<BuildSummary>> {
        Ok(self.rows.get(pipeline_id).map(|row| row.clone()))
    }

    async fn find_summaries(&self, pipeline_ids: &[String]) -> SummaryResult<Vec<BuildSummary>> {
        let pipeline_ids: BTreeSet<&String> = pipeline_ids.iter().collect();
        let rows = pipeline_ids
            .into_iter()
            .filter_map(|pipeline_id| self.rows.get(pipeline_id).map(|row| row.clone()))
            .collect();

        Ok(rows)
    }

    async fn update_summary(
        &self,
        pipeline_id: &str,
        guard: Option<&str>,
        update: SummaryUpdate,
    ) -> SummaryResult<Option<BuildSummary>> {
        let Some(mut row) = self.rows.get_mut(pipeline_id) else {
            return Ok(None);
        };

        if let Some(build_id) = guard
            && !row.is_latest(build_id)
        {
            return Ok(None);
        }

        update.apply_to(&mut row)?;
        Ok(Some(row.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BuildStatus;

    #[tokio::test]
    async fn insert_rejects_duplicates() {
        let store = MemorySummaryStore::new();
        store
            .insert_summary(NewBuildSummary::new("p-1", "proj"))
            .await
            .unwrap();

        let error = store
            .insert_summary(NewBuildSummary::new("p-1", "proj"))
            .await
            .unwrap_err();
        assert!(matches!(error, SummaryError::AlreadyExists { .. }));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn update_missing_row_matches_nothing() {
        let store = MemorySummaryStore::new();
        let row = store
            .update_summary("missing", None, SummaryUpdate::new().queue(1))
            .await
            .unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn guarded_update_requires_latest_build() {
        let store = MemorySummaryStore::new();
        store
            .insert_summary(NewBuildSummary::new("p-1", "proj"))
            .await
            .unwrap();
        store
            .update_summary("p-1", None, SummaryUpdate::new().latest_build("b-1"))
            .await
            .unwrap();

        let stale = store
            .update_summary("p-1", Some("b-0"), SummaryUpdate::new().status(BuildStatus::Failed))
            .await
            .unwrap();
        assert!(stale.is_none());

        let applied = store
            .update_summary("p-1", Some("b-1"), SummaryUpdate::new().status(BuildStatus::Running))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(applied.latest_status, Some(BuildStatus::Running));
    }

    #[tokio::test]
    async fn bulk_lookup_skips_unknown_ids() {
        let store = MemorySummaryStore::new();
        for pipeline_id in ["p-1", "p-2"] {
            store
                .insert_summary(NewBuildSummary::new(pipeline_id, "proj"))
                .await
                .unwrap();
        }

        let ids = ["p-2", "p-9", "p-1", "p-2"].map(str::to_owned);
        let rows = store.find_summaries(&ids).await.unwrap();
        let found: Vec<_> = rows.iter().map(|row| row.pipeline_id.as_str()).collect();
        assert_eq!(found, ["p-1", "p-2"]);

        assert!(store.delete_summary("p-1").await.unwrap());
        assert!(!store.delete_summary("p-1").await.unwrap());
        assert!(store.find_summary("p-1").await.unwrap().is_none());
    }
}
