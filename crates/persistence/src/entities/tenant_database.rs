//! Tenant database entity (central catalog row mapping).

use sqlx::FromRow;

use domain::models::Tenant;

/// Database row mapping for active rows of tenant_databases joined to companies.
#[derive(Debug, Clone, FromRow)]
pub struct TenantDatabaseEntity {
    pub db_code: String,
    pub display_name: String,
    pub db_name: String,
    pub server_host: String,
    pub server_port: i32,
    pub db_user: String,
    pub db_password_encrypted: String,
    pub company_code: String,
}

impl From<TenantDatabaseEntity> for Tenant {
    fn from(entity: TenantDatabaseEntity) -> Self {
        Self {
            code: entity.db_code,
            display_name: entity.display_name,
            db_name: entity.db_name,
            server_host: entity.server_host,
            server_port: u16::try_from(entity.server_port).unwrap_or(5432),
            db_user: entity.db_user,
            db_password_encrypted: entity.db_password_encrypted,
            company_code: entity.company_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_port_falls_back_to_default() {
        let entity = TenantDatabaseEntity {
            db_code: "T1".to_string(),
            display_name: "Main".to_string(),
            db_name: "tenant_main".to_string(),
            server_host: "db".to_string(),
            server_port: -1,
            db_user: "report".to_string(),
            db_password_encrypted: String::new(),
            company_code: "C1".to_string(),
        };
        assert_eq!(Tenant::from(entity).server_port, 5432);
    }
}
