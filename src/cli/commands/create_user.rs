use anyhow::{Result, anyhow};
use chrono::Utc;
use model::entities::user;
use sea_orm::{ActiveEnum, ActiveModelTrait, Database, Set};
use tracing::{error, info};

pub async fn create_user(
    database_url: &str,
    username: &str,
    full_name: &str,
    email: Option<String>,
    role: &str,
) -> Result<()> {
    let role = user::Role::try_from_value(&role.trim().to_uppercase())
        .map_err(|_| anyhow!("Unknown role '{}', expected ADMIN, MANAGER, ACCOUNTANT or VISUALIZER", role))?;

    let db = Database::connect(database_url).await?;

    let new_user = user::ActiveModel {
        username: Set(username.to_string()),
        full_name: Set(full_name.to_string()),
        email: Set(email),
        role: Set(role),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    match new_user.insert(&db).await {
        Ok(created) => {
            info!(
                "Created user '{}' with ID {} and role {}",
                created.username,
                created.id,
                created.role.to_value()
            );
            Ok(())
        }
        Err(e) => {
            error!("Failed to create user '{}': {}", username, e);
            Err(e.into())
        }
    }
}
