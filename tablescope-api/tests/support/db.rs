use tablescope_api::{ApiResult, DbClient, DbConfig};

/// Client for the database named by the `TABLESCOPE_DB_*` variables.
pub fn test_db_client() -> ApiResult<DbClient> {
    let config = DbConfig::from_env()?;
    DbClient::from_config(&config)
}

/// Same database, capped at `max_size` connections.
pub fn test_db_client_with_pool(max_size: usize) -> ApiResult<DbClient> {
    let config = DbConfig {
        max_size,
        ..DbConfig::from_env()?
    };
    DbClient::from_config(&config)
}
