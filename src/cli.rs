use clap::{Args, Parser, Subcommand};

/// connect-console: deployments, logs and custom objects for commerce projects
#[derive(Parser)]
#[command(name = "connect-console", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the dashboard API server
    Serve {
        /// Port to bind (defaults to CONSOLE_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show or switch the active project key
    Tenant {
        #[command(subcommand)]
        command: TenantCommands,
    },

    /// Inspect Connect deployments
    Deployments {
        #[command(subcommand)]
        command: DeploymentCommands,
    },

    /// Page through a deployment's logs
    Logs(LogsArgs),

    /// Show deployment log statistics
    Stats,

    /// List custom objects, newest first
    Objects(ObjectsArgs),
}

#[derive(Subcommand)]
pub enum TenantCommands {
    /// List configured project keys
    List,
    /// Print the active project key
    Show,
    /// Make a project key active
    Use { key: String },
}

#[derive(Subcommand)]
pub enum DeploymentCommands {
    /// List deployments
    List {
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        json: bool,
    },
    /// Show one deployment and its applications
    Show {
        key: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
pub struct LogsArgs {
    /// Deployment key
    pub key: String,
    /// Only logs of this application
    #[arg(long)]
    pub app: Option<String>,
    /// Start of the time window (ISO 8601)
    #[arg(long)]
    pub from: Option<String>,
    /// End of the time window (ISO 8601)
    #[arg(long)]
    pub to: Option<String>,
    /// HTTP_REQUEST, APPLICATION_TEXT, APPLICATION_JSON or all
    #[arg(long = "type", default_value = "all")]
    pub log_type: String,
    /// Severity (e.g. ERROR) or all
    #[arg(long, default_value = "all")]
    pub severity: String,
    /// Case-sensitive message substring
    #[arg(long)]
    pub search: Option<String>,
    /// Group output by application
    #[arg(long)]
    pub group: bool,
    /// timestamp, type, applicationName or severity
    #[arg(long, default_value = "timestamp")]
    pub sort: String,
    #[arg(long, default_value = "desc")]
    pub direction: String,
    /// Number of pages to load
    #[arg(long, default_value_t = 1)]
    pub pages: usize,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ObjectsArgs {
    #[arg(long)]
    pub container: Option<String>,
    #[arg(long)]
    pub key: Option<String>,
    #[arg(long)]
    pub limit: Option<u32>,
    #[arg(long)]
    pub offset: Option<u32>,
    #[arg(long)]
    pub json: bool,
}
