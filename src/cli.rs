use crate::config::ClientFlags;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "manta",
    version,
    about = "A live terminal dashboard for Kubernetes resources."
)]
pub struct CliArgs {
    /// Refresh interval in milliseconds
    #[arg(long, default_value_t = 2_000)]
    pub refresh_ms: u64,

    /// Start in a specific namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Start with all namespaces selected
    #[arg(short = 'A', long)]
    pub all_namespaces: bool,

    /// Path to a kubeconfig file
    #[arg(long)]
    pub kubeconfig: Option<String>,

    /// Kubeconfig context to use
    #[arg(long = "kube-context")]
    pub kube_context: Option<String>,

    /// Bearer token for API authentication
    #[arg(long)]
    pub token: Option<String>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,
}

impl CliArgs {
    pub fn client_flags(&self) -> ClientFlags {
        ClientFlags {
            kubeconfig: self.kubeconfig.clone(),
            context: self.kube_context.clone(),
            token: self.token.clone(),
        }
    }
}
