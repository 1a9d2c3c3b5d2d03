use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::schemas::{AppState, CachedData};

pub fn budget_report_key(project_id: i32) -> String {
    format!("budget_report_{}", project_id)
}

pub fn summary_key(project_id: i32) -> String {
    format!("project_summary_{}", project_id)
}

#[derive(Debug, Default)]
struct Generations {
    all: u64,
    projects: HashMap<i32, u64>,
}

/// Counts the invalidations of every project's reports.
///
/// A report computed while the counter of its project moved may be stale and
/// must not stay in the cache.
#[derive(Debug, Default, Clone)]
pub struct ReportGenerations(Arc<Mutex<Generations>>);

impl ReportGenerations {
    pub fn current(&self, project_id: i32) -> u64 {
        let generations = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        generations.all + generations.projects.get(&project_id).copied().unwrap_or(0)
    }

    fn bump(&self, project_id: i32) {
        let mut generations = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *generations.projects.entry(project_id).or_insert(0) += 1;
    }

    fn bump_all(&self) {
        let mut generations = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        generations.all += 1;
    }
}

/// Drops every cached report of a project after one of its records changed.
pub async fn invalidate_project_reports(state: &AppState, project_id: i32) {
    debug!("Invalidating cached reports for project {}", project_id);
    state.report_generations.bump(project_id);
    state.cache.invalidate(&budget_report_key(project_id)).await;
    state.cache.invalidate(&summary_key(project_id)).await;
}

/// Drops the cached reports of every project.
pub fn invalidate_all_reports(state: &AppState) {
    debug!("Invalidating all cached reports");
    state.report_generations.bump_all();
    state.cache.invalidate_all();
}

/// Caches a report computed at `generation`.
///
/// The entry is removed again when the project's reports were invalidated
/// while it was being computed.
pub async fn store_report(
    state: &AppState,
    project_id: i32,
    key: String,
    generation: u64,
    data: CachedData,
) {
    state.cache.insert(key.clone(), data).await;
    if state.report_generations.current(project_id) != generation {
        debug!("Report {} went stale while computing, not caching it", key);
        state.cache.invalidate(&key).await;
    }
}
