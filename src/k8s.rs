use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Pod;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, ResourceExt};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command as TokioCommand};
use tokio::time::timeout;
use tracing::debug;

use crate::model::{ConfigDump, PodEntry};

/// Admin port ztunnel binds on the pod's loopback interface. Reachable
/// through a port-forward, which terminates inside the pod's netns.
const ZTUNNEL_ADMIN_PORT: u16 = 15000;
const FORWARD_READY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    context: String,
    cluster: String,
    user: String,
}

impl KubeGateway {
    pub async fn new(context: Option<String>) -> Result<Self> {
        let kubeconfig = Kubeconfig::read().ok();

        let config = if let Some(kubeconfig_value) = kubeconfig.clone() {
            let options = KubeConfigOptions {
                context: context.clone(),
                cluster: None,
                user: None,
            };
            Config::from_custom_kubeconfig(kubeconfig_value, &options)
                .await
                .context("failed to infer Kubernetes configuration")?
        } else {
            if context.is_some() {
                anyhow::bail!(
                    "kubeconfig not found; context selection is unavailable in this environment"
                );
            }
            Config::infer()
                .await
                .context("failed to infer Kubernetes configuration")?
        };

        let cluster = config.cluster_url.to_string();
        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;

        let active_context = context
            .or_else(|| {
                kubeconfig
                    .as_ref()
                    .and_then(|cfg| cfg.current_context.clone())
            })
            .unwrap_or_else(|| "in-cluster".to_string());
        let user = kubeconfig
            .as_ref()
            .and_then(|cfg| {
                cfg.contexts
                    .iter()
                    .find(|named| named.name == active_context)
                    .and_then(|named| named.context.as_ref())
                    .map(|ctx| ctx.user.clone())
            })
            .flatten()
            .unwrap_or_else(|| "-".to_string());

        Ok(Self {
            client,
            context: active_context,
            cluster,
            user,
        })
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Lists the pods backing the ztunnel workload, sorted by name.
    pub async fn fetch_ztunnel_pods(
        &self,
        namespace: &str,
        workload: &str,
    ) -> Result<Vec<PodEntry>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(&format!("app={workload}"));
        let list = pods
            .list(&params)
            .await
            .with_context(|| format!("failed to list {workload} pods in {namespace}"))?;

        let mut entries = list
            .into_iter()
            .map(|pod| {
                let name = pod.name_any();
                let node = pod
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.node_name.clone())
                    .unwrap_or_else(|| "-".to_string());
                let phase = pod
                    .status
                    .as_ref()
                    .and_then(|status| status.phase.clone())
                    .unwrap_or_else(|| "Unknown".to_string());

                PodEntry { name, node, phase }
            })
            .collect::<Vec<_>>();

        entries.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(entries)
    }

    /// Retrieves the config dump from the ztunnel admin endpoint of one
    /// pod, tunneling through a short-lived port-forward.
    pub async fn fetch_ztunnel_config(&self, namespace: &str, pod_name: &str) -> Result<ConfigDump> {
        let forward = start_port_forward(namespace, pod_name).await?;
        let local_port = forward.local_port;
        debug!("config dump for {namespace}/{pod_name} via 127.0.0.1:{local_port}");

        let result = fetch_config_dump(local_port).await;
        forward.shutdown().await;

        result.with_context(|| format!("failed to fetch ztunnel config for {namespace}/{pod_name}"))
    }
}

struct PortForward {
    child: Child,
    local_port: u16,
}

impl PortForward {
    async fn shutdown(mut self) {
        let _ = self.child.kill().await;
    }
}

async fn start_port_forward(namespace: &str, pod_name: &str) -> Result<PortForward> {
    let mut child = TokioCommand::new("kubectl")
        .arg("port-forward")
        .arg("-n")
        .arg(namespace)
        .arg(format!("pod/{pod_name}"))
        .arg(format!(":{ZTUNNEL_ADMIN_PORT}"))
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn port-forward for {namespace}/{pod_name}"))?;

    let stdout = child
        .stdout
        .take()
        .context("port-forward stdout unavailable")?;
    let mut lines = BufReader::new(stdout).lines();

    let line = timeout(FORWARD_READY_TIMEOUT, lines.next_line())
        .await
        .context("timed out waiting for port-forward to become ready")?
        .context("failed reading port-forward output")?
        .context("port-forward exited before announcing a local port")?;
    let local_port = parse_forward_port(&line)
        .with_context(|| format!("unexpected port-forward output: {line}"))?;

    Ok(PortForward { child, local_port })
}

// "Forwarding from 127.0.0.1:53421 -> 15000"
fn parse_forward_port(line: &str) -> Option<u16> {
    let rest = line.strip_prefix("Forwarding from ")?;
    let address = rest.split(" -> ").next()?;
    address.rsplit(':').next()?.parse().ok()
}

async fn fetch_config_dump(local_port: u16) -> Result<ConfigDump> {
    let url = format!("http://127.0.0.1:{local_port}/config_dump");
    let response = reqwest::get(&url)
        .await
        .context("admin endpoint unreachable")?
        .error_for_status()
        .context("admin endpoint returned an error status")?;
    let dump = response
        .json::<ConfigDump>()
        .await
        .context("failed to decode config dump")?;
    Ok(dump)
}

#[cfg(test)]
mod tests {
    use super::parse_forward_port;

    #[test]
    fn parses_announced_local_port() {
        assert_eq!(
            parse_forward_port("Forwarding from 127.0.0.1:53421 -> 15000"),
            Some(53421)
        );
        assert_eq!(
            parse_forward_port("Forwarding from [::1]:40012 -> 15000"),
            Some(40012)
        );
    }

    #[test]
    fn rejects_unexpected_output() {
        assert_eq!(parse_forward_port("error: unable to forward"), None);
        assert_eq!(parse_forward_port(""), None);
        assert_eq!(
            parse_forward_port("Forwarding from 127.0.0.1:not-a-port -> 15000"),
            None
        );
    }
}
