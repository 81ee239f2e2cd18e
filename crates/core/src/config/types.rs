use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub pipelines: PipelinesConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8004
}

/// Database holding the extracted order totals and order lines.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("invoices.db")
}

/// Local directory where documents are downloaded and transient folders live.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_workspace_dir")]
    pub dir: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            dir: default_workspace_dir(),
        }
    }
}

fn default_workspace_dir() -> PathBuf {
    PathBuf::from(".")
}

/// An external program invoked for one collaborator operation.
///
/// Operation arguments (folder names, categories, ...) are appended after `args`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment for the child process (credentials, endpoints).
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// External commands backing the storage, inference and recognition collaborators.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CommandsConfig {
    #[serde(default)]
    pub fetch: Option<CommandSpec>,
    #[serde(default)]
    pub publish: Option<CommandSpec>,
    #[serde(default)]
    pub archive: Option<CommandSpec>,
    #[serde(default)]
    pub purge_remote: Option<CommandSpec>,
    #[serde(default)]
    pub predict: Option<CommandSpec>,
    #[serde(default)]
    pub preprocess: Option<CommandSpec>,
    #[serde(default)]
    pub persist_preprocessed: Option<CommandSpec>,
    #[serde(default)]
    pub train: Option<CommandSpec>,
    #[serde(default)]
    pub recognize: Option<CommandSpec>,
}

impl CommandsConfig {
    /// Iterate over configured commands with their operation name.
    pub fn configured(&self) -> impl Iterator<Item = (&'static str, &CommandSpec)> {
        [
            ("fetch", &self.fetch),
            ("publish", &self.publish),
            ("archive", &self.archive),
            ("purge_remote", &self.purge_remote),
            ("predict", &self.predict),
            ("preprocess", &self.preprocess),
            ("persist_preprocessed", &self.persist_preprocessed),
            ("train", &self.train),
            ("recognize", &self.recognize),
        ]
        .into_iter()
        .filter_map(|(name, spec)| spec.as_ref().map(|s| (name, s)))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PipelinesConfig {
    #[serde(default)]
    pub invoice: InvoicePipelineConfig,
    #[serde(default)]
    pub training: TrainingPipelineConfig,
}

/// Invoice processing pipeline settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvoicePipelineConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Upper bound for a single collaborator call (seconds, 0 = unbounded).
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_secs: u64,
    /// Remote collection holding the current period's documents.
    #[serde(default = "default_period_folder")]
    pub period_folder: String,
    /// Remote files younger than this are purged after the run.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
    /// Delete remote files permanently instead of moving them to the trash.
    #[serde(default)]
    pub permanent_purge: bool,
}

impl Default for InvoicePipelineConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            stage_timeout_secs: default_stage_timeout(),
            period_folder: default_period_folder(),
            retention_hours: default_retention_hours(),
            permanent_purge: false,
        }
    }
}

/// Model training pipeline settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrainingPipelineConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_secs: u64,
    #[serde(default = "default_test_folder")]
    pub test_folder: String,
    #[serde(default = "default_train_folder")]
    pub train_folder: String,
    /// Local folder the preprocessing step writes its output to.
    #[serde(default = "default_preprocessed_folder")]
    pub preprocessed_folder: String,
}

impl Default for TrainingPipelineConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            stage_timeout_secs: default_stage_timeout(),
            test_folder: default_test_folder(),
            train_folder: default_train_folder(),
            preprocessed_folder: default_preprocessed_folder(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_stage_timeout() -> u64 {
    14_400 // 4 hours
}

fn default_period_folder() -> String {
    "mes en curso".to_string()
}

fn default_retention_hours() -> u64 {
    1
}

fn default_test_folder() -> String {
    "invoices_test".to_string()
}

fn default_train_folder() -> String {
    "invoices_train".to_string()
}

fn default_preprocessed_folder() -> String {
    "train_data".to_string()
}

/// Sanitized config for logging and API responses (command env values redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub workspace: WorkspaceConfig,
    pub commands: BTreeMap<String, SanitizedCommand>,
    pub pipelines: PipelinesConfig,
}

/// Command with only the names of its environment variables.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env_keys: Vec<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            workspace: config.workspace.clone(),
            commands: config
                .commands
                .configured()
                .map(|(name, spec)| {
                    (
                        name.to_string(),
                        SanitizedCommand {
                            program: spec.program.clone(),
                            args: spec.args.clone(),
                            env_keys: spec.env.keys().cloned().collect(),
                        },
                    )
                })
                .collect(),
            pipelines: config.pipelines.clone(),
        }
    }
}
