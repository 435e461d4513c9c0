//! Exit codes of the `udstore` binary.
//! These codes are part of the public contract for scripts driving the CLI.

use udstore_core::StoreError;

pub const OK: i32 = 0;
pub const STORE_ERROR: i32 = 1; // Backing store rejected or failed an operation
pub const CONFIG_ERROR: i32 = 2; // Invalid config, input file or arguments
pub const FATAL_STORE_STATE: i32 = 3; // Rollback failed; store state unknown

/// Exit code for an error returned by a command.
pub fn for_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<StoreError>() {
        Some(e) if e.is_fatal() => FATAL_STORE_STATE,
        Some(
            StoreError::Config(_)
            | StoreError::UnsupportedDatabase(_)
            | StoreError::MissingDependency(_),
        ) => CONFIG_ERROR,
        Some(_) => STORE_ERROR,
        None => CONFIG_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_store_errors_map_through_context() {
        let err: anyhow::Error = Err::<(), _>(StoreError::Database {
            context: "insert row 0".into(),
            message: "boom".into(),
        })
        .context("import failed")
        .unwrap_err();
        assert_eq!(for_error(&err), STORE_ERROR);

        let fatal = anyhow::Error::new(StoreError::RollbackFailed {
            cause: Box::new(StoreError::LockPoisoned),
            message: "no transaction is active".into(),
        });
        assert_eq!(for_error(&fatal), FATAL_STORE_STATE);

        let config = anyhow::Error::new(StoreError::UnsupportedDatabase("oracle".into()));
        assert_eq!(for_error(&config), CONFIG_ERROR);
        assert_eq!(for_error(&anyhow::anyhow!("bad input")), CONFIG_ERROR);
    }
}
