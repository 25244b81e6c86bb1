pub mod config;
pub mod customers;
pub mod doctor;
pub mod migrate;
pub mod reservations;
pub mod seed;

use std::future::Future;

use lunchly_core::config::{AppConfig, LoadOptions};
use lunchly_db::{connect_with_settings, migrations, DbPool, RepositoryError};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: &impl Serialize,
    ) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(error) => {
                return Self::failure(command, "serialization", error.to_string(), 1);
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: Some(data),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// Why a command stopped, with the exit code the process should report.
#[derive(Debug)]
pub struct CommandFailure {
    pub error_class: &'static str,
    pub message: String,
    pub exit_code: u8,
}

impl CommandFailure {
    pub fn new(error_class: &'static str, message: impl Into<String>, exit_code: u8) -> Self {
        Self { error_class, message: message.into(), exit_code }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new("invalid_input", message, 8)
    }
}

impl From<RepositoryError> for CommandFailure {
    fn from(error: RepositoryError) -> Self {
        if error.is_not_found() {
            Self::new("not_found", error.to_string(), 7)
        } else {
            Self::new("query", error.to_string(), 5)
        }
    }
}

/// Loads config, opens the database, applies pending migrations and hands
/// the pool to `work`. The pool is closed before the result is returned.
pub(crate) fn run_with_pool<F, Fut>(command: &str, work: F) -> CommandResult
where
    F: FnOnce(DbPool) -> Fut,
    Fut: Future<Output = Result<CommandResult, CommandFailure>>,
{
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    info!(event_name = "cli.command.start", command, "running command");

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| CommandFailure::new("db_connectivity", error.to_string(), 4))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| CommandFailure::new("migration", error.to_string(), 5))?;

        let outcome = work(pool.clone()).await;
        pool.close().await;
        outcome
    });

    match result {
        Ok(result) => {
            debug!(event_name = "cli.command.finished", command, "command finished");
            result
        }
        Err(failure) => {
            info!(
                event_name = "cli.command.failed",
                command,
                error_class = failure.error_class,
                exit_code = failure.exit_code,
                "command failed"
            );
            CommandResult::failure(command, failure.error_class, failure.message, failure.exit_code)
        }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use lunchly_db::RepositoryError;
    use serde_json::Value;

    use super::{CommandFailure, CommandResult};

    #[test]
    fn failure_payload_carries_error_class() {
        let result = CommandResult::failure("customers show", "not_found", "No such customer: 3", 7);
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 7);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "not_found");
        assert!(payload.get("data").is_none());
    }

    #[test]
    fn success_payload_embeds_data() {
        let result = CommandResult::success_with_data("customers top", "2 customers", &vec![1, 2]);
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"], serde_json::json!([1, 2]));
    }

    #[test]
    fn repository_errors_map_to_exit_codes() {
        let not_found = CommandFailure::from(RepositoryError::NotFound { entity: "customer", id: 9 });
        assert_eq!((not_found.error_class, not_found.exit_code), ("not_found", 7));

        let decode = CommandFailure::from(RepositoryError::Decode("bad row".to_string()));
        assert_eq!((decode.error_class, decode.exit_code), ("query", 5));
    }
}
