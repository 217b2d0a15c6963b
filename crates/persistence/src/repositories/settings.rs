//! Tenant settings repository over the ini_settings key/value table.

use std::collections::HashMap;

use sqlx::PgPool;

use domain::models::database_settings::{SETTINGS_HEADER, SETTINGS_MODULE, SETTINGS_USER};
use domain::models::DatabaseSettings;
use domain::services::{SettingsStore, StoreError};

use crate::error::store_error;
use crate::metrics::QueryTimer;

/// Repository for the scheduler settings of one tenant.
#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SettingsStore for SettingsRepository {
    async fn load(&self) -> Result<DatabaseSettings, StoreError> {
        let timer = QueryTimer::new("load_database_settings");
        let result: Result<Vec<(String, Option<String>)>, sqlx::Error> = sqlx::query_as(
            r#"
            SELECT parm_code, parm_value FROM ini_settings
            WHERE module_code = $1 AND header_code = $2 AND user_code = $3
            "#,
        )
        .bind(SETTINGS_MODULE)
        .bind(SETTINGS_HEADER)
        .bind(SETTINGS_USER)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        let values: HashMap<String, String> = result
            .map_err(store_error)?
            .into_iter()
            .filter_map(|(code, value)| value.map(|v| (code.trim().to_ascii_uppercase(), v)))
            .collect();
        Ok(DatabaseSettings::from_ini(&values))
    }

    async fn save(&self, settings: &DatabaseSettings) -> Result<(), StoreError> {
        let timer = QueryTimer::new("save_database_settings");
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        for (code, value) in settings.to_ini() {
            sqlx::query(
                r#"
                INSERT INTO ini_settings (module_code, header_code, user_code, parm_code, parm_value)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (module_code, header_code, user_code, parm_code)
                DO UPDATE SET parm_value = EXCLUDED.parm_value
                "#,
            )
            .bind(SETTINGS_MODULE)
            .bind(SETTINGS_HEADER)
            .bind(SETTINGS_USER)
            .bind(code)
            .bind(value)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        }
        let result = tx.commit().await;
        timer.record();
        result.map_err(store_error)
    }
}
