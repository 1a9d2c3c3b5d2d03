use anyhow::Result;
use tracing::{debug, info};

use super::initdb::connect_and_migrate;
use super::serve::run_server;
use crate::config::app_state_from_connection;

pub async fn migrate_and_serve(database_url: &str, bind_address: &str) -> Result<()> {
    info!("Applying database migrations and starting server");
    debug!("Bind address: {}", bind_address);

    let db = connect_and_migrate(database_url).await?;
    let state = app_state_from_connection(db)?;

    run_server(state, bind_address).await
}
