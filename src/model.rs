use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Pods,
    Deployments,
    Services,
    ConfigMaps,
    Secrets,
    Nodes,
    Namespaces,
    Events,
}

impl ResourceKind {
    pub const ALL: [Self; 8] = [
        Self::Pods,
        Self::Deployments,
        Self::Services,
        Self::ConfigMaps,
        Self::Secrets,
        Self::Nodes,
        Self::Namespaces,
        Self::Events,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Pods => "Pods",
            Self::Deployments => "Deployments",
            Self::Services => "Services",
            Self::ConfigMaps => "ConfigMaps",
            Self::Secrets => "Secrets",
            Self::Nodes => "Nodes",
            Self::Namespaces => "Namespaces",
            Self::Events => "Events",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "po" | "pod" | "pods" => Some(Self::Pods),
            "deploy" | "dp" | "deployment" | "deployments" => Some(Self::Deployments),
            "svc" | "service" | "services" => Some(Self::Services),
            "cm" | "configmap" | "configmaps" | "config-map" | "config-maps" => {
                Some(Self::ConfigMaps)
            }
            "secret" | "secrets" => Some(Self::Secrets),
            "no" | "node" | "nodes" => Some(Self::Nodes),
            "ns" | "namespace" | "namespaces" => Some(Self::Namespaces),
            "ev" | "event" | "events" => Some(Self::Events),
            _ => None,
        }
    }

    pub fn short_token(self) -> &'static str {
        match self {
            Self::Pods => "po",
            Self::Deployments => "deploy",
            Self::Services => "svc",
            Self::ConfigMaps => "cm",
            Self::Secrets => "secret",
            Self::Nodes => "node",
            Self::Namespaces => "ns",
            Self::Events => "event",
        }
    }

    /// Kinds that live outside any namespace; their row identity is the bare name.
    pub fn cluster_scoped(self) -> bool {
        matches!(self, Self::Nodes | Self::Namespaces)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NamespaceScope {
    All,
    Named(String),
}

impl Display for NamespaceScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Named(namespace) => write!(f, "{namespace}"),
        }
    }
}

/// Split a row identity into its namespace prefix and resource name.
/// Identities without a `/` belong to cluster-scoped resources.
pub fn split_path(path: &str) -> (Option<&str>, &str) {
    match path.split_once('/') {
        Some((namespace, name)) => (Some(namespace), name),
        None => (None, path),
    }
}

pub fn join_path(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(namespace) if !namespace.is_empty() => format!("{namespace}/{name}"),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{ResourceKind, join_path, split_path};

    #[test]
    fn resource_aliases_map_to_expected_kinds() {
        assert_eq!(ResourceKind::from_token("po"), Some(ResourceKind::Pods));
        assert_eq!(
            ResourceKind::from_token("deployments"),
            Some(ResourceKind::Deployments)
        );
        assert_eq!(ResourceKind::from_token("svc"), Some(ResourceKind::Services));
        assert_eq!(
            ResourceKind::from_token("config-maps"),
            Some(ResourceKind::ConfigMaps)
        );
        assert_eq!(ResourceKind::from_token("ns"), Some(ResourceKind::Namespaces));
        assert_eq!(ResourceKind::from_token("no"), Some(ResourceKind::Nodes));
        assert_eq!(ResourceKind::from_token("bogus"), None);
    }

    #[test]
    fn path_round_trips_namespaced_and_cluster_identities() {
        assert_eq!(split_path("fred/blee"), (Some("fred"), "blee"));
        assert_eq!(split_path("blee"), (None, "blee"));
        assert_eq!(join_path(Some("fred"), "blee"), "fred/blee");
        assert_eq!(join_path(None, "blee"), "blee");
        assert_eq!(join_path(Some(""), "blee"), "blee");
    }
}
