//! Logging and observability
//!
//! Structured logging through `tracing`, plus macros that give every
//! walkthrough the same field names:
//!
//! - `operation` - the service call, e.g. `create`, `patch`, `upload`
//! - `request_charge` - the cost reported for the call, when there is one
//! - `error_kind` / `status` - for failed calls
//!
//! # Example
//!
//! ```no_run
//! use azlearn::config::LoggingConfig;
//! use azlearn::logging::init_logging;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log a successful service call with its request charge
///
/// Extra `tracing` fields may follow the charge.
///
/// # Example
///
/// ```no_run
/// use azlearn::domain::RequestCharge;
/// use azlearn::log_operation;
///
/// let charge = RequestCharge::new(5.71);
/// log_operation!("create", charge, id = "42", phone = "6268889999");
/// ```
#[macro_export]
macro_rules! log_operation {
    ($operation:expr, $charge:expr) => {
        tracing::info!(
            operation = $operation,
            request_charge = %$charge,
            "Operation succeeded"
        );
    };
    ($operation:expr, $charge:expr, $($fields:tt)+) => {
        tracing::info!(
            operation = $operation,
            request_charge = %$charge,
            $($fields)+,
            "Operation succeeded"
        );
    };
}

/// Log a failed service call with its error kind, status and charge
///
/// # Example
///
/// ```no_run
/// use azlearn::domain::AzLearnError;
/// use azlearn::log_operation_failed;
///
/// let error = AzLearnError::not_found("item 42");
/// log_operation_failed!("read", &error, id = "42");
/// ```
#[macro_export]
macro_rules! log_operation_failed {
    ($operation:expr, $error:expr) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            error_kind = ?$error.kind(),
            request_charge = ?$error.request_charge(),
            "Operation failed"
        );
    };
    ($operation:expr, $error:expr, $($fields:tt)+) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            error_kind = ?$error.kind(),
            request_charge = ?$error.request_charge(),
            $($fields)+,
            "Operation failed"
        );
    };
}

/// Log the start of a numbered walkthrough step
///
/// # Example
///
/// ```no_run
/// use azlearn::log_step;
///
/// log_step!(4, "Query documents by phone");
/// ```
#[macro_export]
macro_rules! log_step {
    ($step:expr, $description:expr) => {
        tracing::info!(step = $step, "{}", $description);
    };
}

#[cfg(test)]
mod tests {
    use crate::domain::{AzLearnError, RequestCharge};

    #[test]
    fn test_macros_expand() {
        let charge = RequestCharge::new(1.0);
        crate::log_operation!("read", charge);
        crate::log_operation!("read", charge, id = "a", phone = "1");

        let error = AzLearnError::conflict("exists");
        crate::log_operation_failed!("create", &error);
        crate::log_operation_failed!("create", &error, id = "a");

        crate::log_step!(1, "Create database");
    }
}
