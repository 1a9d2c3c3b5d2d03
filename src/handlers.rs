use crate::helpers::errors::{ApiResult, database_error, not_found};
use crate::schemas::AppState;
use model::entities::project;
use sea_orm::EntityTrait;

pub mod budgets;
pub mod expenses;
pub mod health;
pub mod invoices;
pub mod material_requests;
pub mod materials;
pub mod project_materials;
pub mod projects;
pub mod purchase_orders;
pub mod reports;
pub mod settings;
pub mod tasks;
pub mod users;

/// Loads the project a nested route points at; a missing one is a 404.
pub(crate) async fn ensure_project_found(
    state: &AppState,
    project_id: i32,
) -> ApiResult<project::Model> {
    project::Entity::find_by_id(project_id)
        .one(&state.db)
        .await
        .map_err(|e| database_error("Failed to load project", e))?
        .ok_or_else(|| not_found("Project", project_id))
}
