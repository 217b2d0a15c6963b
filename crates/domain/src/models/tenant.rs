//! Tenant connection domain model.

use serde::Serialize;

/// Connection information for one tenant database.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Tenant {
    pub code: String,
    pub display_name: String,
    pub db_name: String,
    pub server_host: String,
    pub server_port: u16,
    pub db_user: String,
    /// Encrypted with the service's tenant secret key.
    #[serde(skip_serializing)]
    pub db_password_encrypted: String,
    pub company_code: String,
}

impl std::fmt::Debug for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tenant")
            .field("code", &self.code)
            .field("display_name", &self.display_name)
            .field("db_name", &self.db_name)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("db_user", &self.db_user)
            .field("db_password_encrypted", &"[REDACTED]")
            .field("company_code", &self.company_code)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let tenant = Tenant {
            code: "T1".to_string(),
            display_name: "Main Store".to_string(),
            db_name: "tenant_main".to_string(),
            server_host: "localhost".to_string(),
            server_port: 5432,
            db_user: "report".to_string(),
            db_password_encrypted: "c2VjcmV0".to_string(),
            company_code: "C1".to_string(),
        };
        let debug = format!("{:?}", tenant);
        assert!(!debug.contains("c2VjcmV0"));
        assert!(debug.contains("Main Store"));

        let json = serde_json::to_value(&tenant).unwrap();
        assert!(json.get("db_password_encrypted").is_none());
    }
}
