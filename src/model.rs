use serde::Deserialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ConfigTab {
    Services,
    Workloads,
}

impl ConfigTab {
    pub const ALL: [Self; 2] = [Self::Services, Self::Workloads];

    pub fn title(self) -> &'static str {
        match self {
            Self::Services => "Services",
            Self::Workloads => "Workloads",
        }
    }

    /// Stable token used for session persistence.
    pub fn token(self) -> &'static str {
        match self {
            Self::Services => "services",
            Self::Workloads => "workloads",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "svc" | "service" | "services" => Some(Self::Services),
            "wl" | "workload" | "workloads" => Some(Self::Workloads),
            _ => None,
        }
    }
}

impl Display for ConfigTab {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// One service entry from a ztunnel config dump. Absent fields decode to
/// their defaults so a partial dump still renders.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZtunnelService {
    pub namespace: String,
    pub name: String,
    pub hostname: String,
    pub vips: Vec<String>,
}

/// One workload entry from a ztunnel config dump.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZtunnelWorkload {
    pub namespace: String,
    pub name: String,
    pub node: String,
    pub protocol: String,
    pub status: String,
    pub workload_ips: Vec<String>,
}

/// Snapshot of the configuration a ztunnel instance manages, keyed by
/// resource kind. Either key may be missing from the admin response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigDump {
    pub services: Vec<ZtunnelService>,
    pub workloads: Vec<ZtunnelWorkload>,
}

/// Anything the filter engine can inspect: an entity with a namespace and a
/// name.
pub trait ConfigItem {
    fn namespace(&self) -> &str;
    fn name(&self) -> &str;
}

impl ConfigItem for ZtunnelService {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl ConfigItem for ZtunnelWorkload {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct PodEntry {
    pub name: String,
    pub node: String,
    pub phase: String,
}

/// Identity of one config fetch: the selection in effect when the request
/// was issued. Doubles as the staleness ticket compared at commit time and
/// as the previously-fetched combination for the refetch guard.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FetchKey {
    pub pod: String,
    pub tab: ConfigTab,
    pub cluster: String,
}

#[cfg(test)]
mod tests {
    use super::{ConfigDump, ConfigTab};

    #[test]
    fn tab_aliases_map_to_expected_tabs() {
        assert_eq!(ConfigTab::from_token("svc"), Some(ConfigTab::Services));
        assert_eq!(ConfigTab::from_token("Services"), Some(ConfigTab::Services));
        assert_eq!(ConfigTab::from_token("wl"), Some(ConfigTab::Workloads));
        assert_eq!(
            ConfigTab::from_token("workloads"),
            Some(ConfigTab::Workloads)
        );
        assert_eq!(ConfigTab::from_token("pods"), None);
    }

    #[test]
    fn tab_token_round_trips() {
        for tab in ConfigTab::ALL {
            assert_eq!(ConfigTab::from_token(tab.token()), Some(tab));
        }
    }

    #[test]
    fn config_dump_tolerates_missing_sections() {
        let dump: ConfigDump = serde_json::from_str("{}").expect("empty object");
        assert!(dump.services.is_empty());
        assert!(dump.workloads.is_empty());

        let dump: ConfigDump =
            serde_json::from_str(r#"{"services": [{"name": "details"}]}"#).expect("services only");
        assert_eq!(dump.services.len(), 1);
        assert_eq!(dump.services[0].name, "details");
        assert!(dump.services[0].namespace.is_empty());
        assert!(dump.workloads.is_empty());
    }

    #[test]
    fn config_dump_decodes_workload_fields() {
        let raw = r#"{
            "workloads": [
                {
                    "name": "details-v1-abc",
                    "namespace": "bookinfo",
                    "node": "node-a",
                    "protocol": "HBONE",
                    "status": "Healthy",
                    "workloadIps": ["10.244.0.12"],
                    "trustDomain": "cluster.local"
                }
            ],
            "certificates": []
        }"#;

        let dump: ConfigDump = serde_json::from_str(raw).expect("workload dump");
        assert_eq!(dump.workloads.len(), 1);
        let workload = &dump.workloads[0];
        assert_eq!(workload.name, "details-v1-abc");
        assert_eq!(workload.namespace, "bookinfo");
        assert_eq!(workload.workload_ips, vec!["10.244.0.12".to_string()]);
    }
}
