use crate::commands::CommandResult;
use ganvie_core::config::{AppConfig, LoadOptions};
use ganvie_db::repositories::{SqlTargetRepository, TargetRepository};
use ganvie_db::{connect_with_settings, migrations};

pub fn run(set: Option<i64>) -> CommandResult {
    if let Some(households) = set {
        if households <= 0 {
            return CommandResult::failure(
                "target",
                "validation",
                format!("survey target must be positive, got {households}"),
                2,
            );
        }
    }

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "target",
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
                "target",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let repository = SqlTargetRepository::new(pool.clone());
        let target = match set {
            Some(households) => repository
                .set(households)
                .await
                .map_err(|error| ("target_update", error.to_string(), 5u8))?,
            None => repository
                .get()
                .await
                .map_err(|error| ("target_read", error.to_string(), 5u8))?,
        };

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(target)
    });

    match result {
        Ok(target) => {
            let message = match set {
                Some(_) => format!(
                    "survey target set to {} households (updated {})",
                    target.households, target.updated_at
                ),
                None => format!(
                    "survey target is {} households (updated {})",
                    target.households, target.updated_at
                ),
            };
            CommandResult::success("target", message)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("target", error_class, message, exit_code)
        }
    }
}
