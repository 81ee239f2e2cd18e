use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Folder names used by enabled pipelines are non-empty
/// - Invoice retention window is positive and fits in seconds
/// - Every collaborator command of an enabled pipeline is configured
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let invoice = &config.pipelines.invoice;
    if invoice.enabled {
        require_folder("pipelines.invoice.period_folder", &invoice.period_folder)?;
        if invoice.retention_hours == 0 {
            return Err(ConfigError::ValidationError(
                "pipelines.invoice.retention_hours must be greater than 0".to_string(),
            ));
        }
        if invoice.retention_hours.checked_mul(3600).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "pipelines.invoice.retention_hours is too large: {}",
                invoice.retention_hours
            )));
        }
        let commands = &config.commands;
        require_command("fetch", commands.fetch.is_some())?;
        require_command("archive", commands.archive.is_some())?;
        require_command("predict", commands.predict.is_some())?;
        require_command("publish", commands.publish.is_some())?;
        require_command("recognize", commands.recognize.is_some())?;
        require_command("purge_remote", commands.purge_remote.is_some())?;
    }

    let training = &config.pipelines.training;
    if training.enabled {
        require_folder("pipelines.training.test_folder", &training.test_folder)?;
        require_folder("pipelines.training.train_folder", &training.train_folder)?;
        require_folder(
            "pipelines.training.preprocessed_folder",
            &training.preprocessed_folder,
        )?;
        let commands = &config.commands;
        require_command("fetch", commands.fetch.is_some())?;
        require_command("preprocess", commands.preprocess.is_some())?;
        require_command(
            "persist_preprocessed",
            commands.persist_preprocessed.is_some(),
        )?;
        require_command("train", commands.train.is_some())?;
    }

    Ok(())
}

fn require_folder(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{} cannot be empty",
            key
        )));
    }
    Ok(())
}

fn require_command(operation: &str, present: bool) -> Result<(), ConfigError> {
    if !present {
        return Err(ConfigError::ValidationError(format!(
            "commands.{} is required by an enabled pipeline",
            operation
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CommandSpec, CommandsConfig};

    fn command(program: &str) -> Option<CommandSpec> {
        Some(CommandSpec {
            program: program.to_string(),
            args: vec![],
            env: Default::default(),
        })
    }

    fn full_commands() -> CommandsConfig {
        CommandsConfig {
            fetch: command("fetch"),
            publish: command("publish"),
            archive: command("archive"),
            purge_remote: command("purge"),
            predict: command("predict"),
            preprocess: command("preprocess"),
            persist_preprocessed: command("persist"),
            train: command("train"),
            recognize: command("ocr"),
        }
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config {
            commands: full_commands(),
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config {
            commands: full_commands(),
            ..Default::default()
        };
        config.server.port = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_missing_command_for_enabled_pipeline() {
        let mut commands = full_commands();
        commands.train = None;
        let config = Config {
            commands,
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("commands.train"));
    }

    #[test]
    fn test_validate_disabled_pipelines_need_no_commands() {
        let mut config = Config::default();
        config.pipelines.invoice.enabled = false;
        config.pipelines.training.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_retention_fails() {
        let mut config = Config {
            commands: full_commands(),
            ..Default::default()
        };
        config.pipelines.invoice.retention_hours = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("retention_hours"));
    }

    #[test]
    fn test_validate_overflowing_retention_fails() {
        let mut config = Config {
            commands: full_commands(),
            ..Default::default()
        };
        config.pipelines.invoice.retention_hours = 6_000_000_000_000_000;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("retention_hours"));

        config.pipelines.invoice.retention_hours = u64::MAX / 3600;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_folder_fails() {
        let mut config = Config {
            commands: full_commands(),
            ..Default::default()
        };
        config.pipelines.training.train_folder = "  ".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("train_folder"));
    }
}
