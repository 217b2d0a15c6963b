//! Mapping of database errors onto the domain store error.

use domain::services::StoreError;

/// Postgres error codes meaning the tenant schema or database is not usable.
const UNAVAILABLE_CODES: &[&str] = &[
    "42P01", // undefined_table
    "3D000", // invalid_catalog_name
    "28P01", // invalid_password
    "28000", // invalid_authorization_specification
    "57P03", // cannot_connect_now
];

pub fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound("Row".to_string()),
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Configuration(_) => StoreError::Unavailable(err.to_string()),
        sqlx::Error::Database(db_err)
            if db_err
                .code()
                .is_some_and(|code| UNAVAILABLE_CODES.iter().any(|c| *c == code)) =>
        {
            StoreError::Unavailable(err.to_string())
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found() {
        assert!(matches!(store_error(sqlx::Error::RowNotFound), StoreError::NotFound(_)));
    }

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(store_error(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(store_error(sqlx::Error::PoolClosed).is_unavailable());
    }

    #[test]
    fn test_other_errors_are_backend() {
        assert!(matches!(
            store_error(sqlx::Error::Protocol("unexpected".to_string())),
            StoreError::Backend(_)
        ));
    }
}
