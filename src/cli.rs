use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "zlens",
    version,
    about = "A terminal lens for Istio ambient ztunnel proxy configuration."
)]
pub struct CliArgs {
    /// Namespace the ztunnel workload runs in
    #[arg(short, long, default_value = "istio-system")]
    pub namespace: String,

    /// Name of the ztunnel workload (pods are matched by app=<workload>)
    #[arg(short, long, default_value = "ztunnel")]
    pub workload: String,

    /// Kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,

    /// Pod list refresh interval in milliseconds
    #[arg(long, default_value_t = 5_000)]
    pub refresh_ms: u64,

    /// Seconds to wait for a config dump before giving up
    #[arg(long, default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,
}
