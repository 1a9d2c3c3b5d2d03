#[cfg(test)]
pub mod test_utils {
    use crate::auth::USER_ID_HEADER;
    use crate::config::Settings;
    use crate::router::create_router;
    use crate::schemas::AppState;
    use axum::Router;
    use axum::http::{HeaderName, HeaderValue};
    use axum_test::TestRequest;
    use chrono::Utc;
    use migration::{Migrator, MigratorTrait};
    use model::entities::user::{self, Role};
    use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    /// Seeded user ids, one per role.
    pub const ADMIN: i32 = 1;
    pub const MANAGER: i32 = 2;
    pub const ACCOUNTANT: i32 = 3;
    pub const VISUALIZER: i32 = 4;

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    /// Create AppState for testing, with one user per role
    pub async fn setup_test_app_state() -> AppState {
        let db = setup_test_db().await;

        let users = [
            ("admin", "Ana Administradora", Role::Admin),
            ("manager", "Mario Gerente", Role::Manager),
            ("accountant", "Carla Contadora", Role::Accountant),
            ("visualizer", "Victor Visor", Role::Visualizer),
        ];
        for (username, full_name, role) in users {
            user::ActiveModel {
                username: Set(username.to_string()),
                full_name: Set(full_name.to_string()),
                email: Set(Some(format!("{}@example.com", username))),
                role: Set(role),
                created_at: Set(Utc::now().naive_utc()),
                ..Default::default()
            }
            .insert(&db)
            .await
            .expect("Failed to create test user");
        }

        let settings = Settings::default();
        let cache = settings.build_cache();
        AppState {
            db,
            cache,
            report_generations: Default::default(),
            settings,
        }
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level comes from RUST_LOG and defaults to WARN.
    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| match level.to_uppercase().as_str() {
                "ERROR" => Some(Level::ERROR),
                "WARN" => Some(Level::WARN),
                "INFO" => Some(Level::INFO),
                "DEBUG" => Some(Level::DEBUG),
                "TRACE" => Some(Level::TRACE),
                _ => None,
            })
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Create axum app for testing
    pub async fn setup_test_app() -> Router {
        let _guard = init_test_tracing();
        let state = setup_test_app_state().await;
        create_router(state)
    }

    /// Sends the request on behalf of `user_id`.
    pub fn as_user(request: TestRequest, user_id: i32) -> TestRequest {
        request.add_header(
            HeaderName::from_static(USER_ID_HEADER),
            HeaderValue::from(user_id),
        )
    }
}
