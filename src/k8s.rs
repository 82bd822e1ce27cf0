use anyhow::{Context, Result};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Event, Namespace, Node, Pod, Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::{DeleteParams, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, ResourceExt};
use serde::Serialize;

use crate::config::ClientFlags;
use crate::model::{NamespaceScope, ResourceKind, join_path, split_path};
use crate::table::{Header, HeaderColumn, Row, Snapshot};
use crate::watch::ResourceSource;

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    context: String,
    cluster: String,
    default_namespace: String,
}

impl KubeGateway {
    pub async fn connect(flags: &ClientFlags) -> Result<Self> {
        let kubeconfig = match flags.kubeconfig() {
            Some(path) => Some(
                Kubeconfig::read_from(path)
                    .with_context(|| format!("failed to read kubeconfig {path}"))?,
            ),
            None => Kubeconfig::read().ok(),
        };

        let config = if let Some(kubeconfig) = kubeconfig.clone() {
            let options = KubeConfigOptions {
                context: flags.context().map(str::to_string),
                cluster: None,
                user: None,
            };
            Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .context("failed to infer Kubernetes configuration")?
        } else {
            if flags.context().is_some() {
                anyhow::bail!("kubeconfig not found; --kube-context is unavailable");
            }
            Config::infer()
                .await
                .context("failed to infer Kubernetes configuration")?
        };

        let cluster = config.cluster_url.to_string();
        let default_namespace = config.default_namespace.clone();
        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;

        let context = flags
            .context()
            .map(str::to_string)
            .or_else(|| kubeconfig.and_then(|cfg| cfg.current_context))
            .unwrap_or_else(|| "in-cluster".to_string());

        Ok(Self {
            client,
            context,
            cluster,
            default_namespace,
        })
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    pub fn source(&self, kind: ResourceKind, wide: bool) -> KindSource {
        KindSource {
            gateway: self.clone(),
            kind,
            wide,
        }
    }

    fn namespaced_api<K>(&self, scope: &NamespaceScope) -> Api<K>
    where
        K: kube::Resource<Scope = NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        match scope {
            NamespaceScope::All => Api::all(self.client.clone()),
            NamespaceScope::Named(namespace) => Api::namespaced(self.client.clone(), namespace),
        }
    }

    async fn fetch_rows(
        &self,
        kind: ResourceKind,
        scope: &NamespaceScope,
        selector: Option<&str>,
        wide: bool,
    ) -> Result<Vec<Row>> {
        match kind {
            ResourceKind::Pods => self.fetch_pods(scope, selector, wide).await,
            ResourceKind::Deployments => self.fetch_deployments(scope, selector).await,
            ResourceKind::Services => self.fetch_services(scope, selector).await,
            ResourceKind::ConfigMaps => self.fetch_configmaps(scope, selector).await,
            ResourceKind::Secrets => self.fetch_secrets(scope, selector).await,
            ResourceKind::Nodes => self.fetch_nodes(selector, wide).await,
            ResourceKind::Namespaces => self.fetch_namespaces(selector).await,
            ResourceKind::Events => self.fetch_events(scope, selector).await,
        }
    }

    async fn fetch_pods(
        &self,
        scope: &NamespaceScope,
        selector: Option<&str>,
        wide: bool,
    ) -> Result<Vec<Row>> {
        let pods: Api<Pod> = self.namespaced_api(scope);
        let list = pods.list(&list_params(selector)).await?;

        let rows = list
            .into_iter()
            .map(|pod| {
                let name = pod.name_any();
                let namespace = pod.namespace();
                let status = pod
                    .status
                    .as_ref()
                    .and_then(|status| status.phase.clone())
                    .unwrap_or_else(|| "Unknown".to_string());
                let (ready, total, restarts) =
                    pod.status.as_ref().map(pod_readiness).unwrap_or((0, 0, 0));
                let age = human_age(pod.metadata.creation_timestamp.as_ref());

                let mut fields = vec![
                    namespace.clone().unwrap_or_else(|| "-".to_string()),
                    name.clone(),
                    format!("{ready}/{total}"),
                    status,
                    restarts.to_string(),
                    age,
                ];
                if wide {
                    fields.push(
                        pod.status
                            .as_ref()
                            .and_then(|status| status.pod_ip.clone())
                            .unwrap_or_else(|| "-".to_string()),
                    );
                    fields.push(
                        pod.spec
                            .as_ref()
                            .and_then(|spec| spec.node_name.clone())
                            .unwrap_or_else(|| "-".to_string()),
                    );
                }

                Row::new(join_path(namespace.as_deref(), &name), fields)
            })
            .collect();

        Ok(rows)
    }

    async fn fetch_deployments(
        &self,
        scope: &NamespaceScope,
        selector: Option<&str>,
    ) -> Result<Vec<Row>> {
        let deployments: Api<Deployment> = self.namespaced_api(scope);
        let list = deployments.list(&list_params(selector)).await?;

        let rows = list
            .into_iter()
            .map(|deployment| {
                let name = deployment.name_any();
                let namespace = deployment.namespace();
                let desired = deployment
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.replicas)
                    .unwrap_or(1);
                let ready = deployment
                    .status
                    .as_ref()
                    .and_then(|status| status.ready_replicas)
                    .unwrap_or(0);
                let updated = deployment
                    .status
                    .as_ref()
                    .and_then(|status| status.updated_replicas)
                    .unwrap_or(0);
                let available = deployment
                    .status
                    .as_ref()
                    .and_then(|status| status.available_replicas)
                    .unwrap_or(0);
                let age = human_age(deployment.metadata.creation_timestamp.as_ref());

                Row::new(
                    join_path(namespace.as_deref(), &name),
                    vec![
                        namespace.clone().unwrap_or_else(|| "-".to_string()),
                        name,
                        format!("{ready}/{desired}"),
                        updated.to_string(),
                        available.to_string(),
                        age,
                    ],
                )
            })
            .collect();

        Ok(rows)
    }

    async fn fetch_services(
        &self,
        scope: &NamespaceScope,
        selector: Option<&str>,
    ) -> Result<Vec<Row>> {
        let services: Api<Service> = self.namespaced_api(scope);
        let list = services.list(&list_params(selector)).await?;

        let rows = list
            .into_iter()
            .map(|service| {
                let name = service.name_any();
                let namespace = service.namespace();
                let service_type = service
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.type_.clone())
                    .unwrap_or_else(|| "ClusterIP".to_string());
                let cluster_ip = service
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.cluster_ip.clone())
                    .unwrap_or_else(|| "-".to_string());
                let ports = service_ports_summary(&service);
                let age = human_age(service.metadata.creation_timestamp.as_ref());

                Row::new(
                    join_path(namespace.as_deref(), &name),
                    vec![
                        namespace.clone().unwrap_or_else(|| "-".to_string()),
                        name,
                        service_type,
                        cluster_ip,
                        ports,
                        age,
                    ],
                )
            })
            .collect();

        Ok(rows)
    }

    async fn fetch_configmaps(
        &self,
        scope: &NamespaceScope,
        selector: Option<&str>,
    ) -> Result<Vec<Row>> {
        let configmaps: Api<ConfigMap> = self.namespaced_api(scope);
        let list = configmaps.list(&list_params(selector)).await?;

        let rows = list
            .into_iter()
            .map(|configmap| {
                let name = configmap.name_any();
                let namespace = configmap.namespace();
                let data = configmap
                    .data
                    .as_ref()
                    .map(|entries| entries.len())
                    .unwrap_or(0);
                let age = human_age(configmap.metadata.creation_timestamp.as_ref());

                Row::new(
                    join_path(namespace.as_deref(), &name),
                    vec![
                        namespace.clone().unwrap_or_else(|| "-".to_string()),
                        name,
                        data.to_string(),
                        age,
                    ],
                )
            })
            .collect();

        Ok(rows)
    }

    async fn fetch_secrets(
        &self,
        scope: &NamespaceScope,
        selector: Option<&str>,
    ) -> Result<Vec<Row>> {
        let secrets: Api<Secret> = self.namespaced_api(scope);
        let list = secrets.list(&list_params(selector)).await?;

        let rows = list
            .into_iter()
            .map(|secret| {
                let name = secret.name_any();
                let namespace = secret.namespace();
                let kind = secret.type_.clone().unwrap_or_else(|| "Opaque".to_string());
                let data = secret.data.as_ref().map(|map| map.len()).unwrap_or(0);
                let age = human_age(secret.metadata.creation_timestamp.as_ref());

                Row::new(
                    join_path(namespace.as_deref(), &name),
                    vec![
                        namespace.clone().unwrap_or_else(|| "-".to_string()),
                        name,
                        truncate(&kind, 24),
                        data.to_string(),
                        age,
                    ],
                )
            })
            .collect();

        Ok(rows)
    }

    async fn fetch_nodes(&self, selector: Option<&str>, wide: bool) -> Result<Vec<Row>> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes.list(&list_params(selector)).await?;

        let rows = list
            .into_iter()
            .map(|node| {
                let name = node.name_any();
                let status = node_ready_condition(&node);
                let version = node
                    .status
                    .as_ref()
                    .and_then(|status| status.node_info.as_ref())
                    .map(|info| info.kubelet_version.clone())
                    .unwrap_or_else(|| "-".to_string());
                let age = human_age(node.metadata.creation_timestamp.as_ref());

                let mut fields = vec![name.clone(), status, node_roles(&node), version, age];
                if wide {
                    fields.push(node_internal_ip(&node));
                }

                Row::new(name, fields)
            })
            .collect();

        Ok(rows)
    }

    async fn fetch_namespaces(&self, selector: Option<&str>) -> Result<Vec<Row>> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces.list(&list_params(selector)).await?;

        let rows = list
            .into_iter()
            .map(|namespace| {
                let name = namespace.name_any();
                let status = namespace
                    .status
                    .as_ref()
                    .and_then(|status| status.phase.clone())
                    .unwrap_or_else(|| "Active".to_string());
                let age = human_age(namespace.metadata.creation_timestamp.as_ref());

                Row::new(name.clone(), vec![name, status, age])
            })
            .collect();

        Ok(rows)
    }

    async fn fetch_events(
        &self,
        scope: &NamespaceScope,
        selector: Option<&str>,
    ) -> Result<Vec<Row>> {
        let events: Api<Event> = self.namespaced_api(scope);
        let list = events.list(&list_params(selector)).await?;

        let rows = list
            .into_iter()
            .map(|event| {
                let name = event.name_any();
                let namespace = event.namespace();
                let last_seen = event_age(&event);
                let kind = event.type_.clone().unwrap_or_else(|| "Normal".to_string());
                let reason = event.reason.clone().unwrap_or_else(|| "-".to_string());
                let object = event
                    .involved_object
                    .name
                    .clone()
                    .unwrap_or_else(|| "-".to_string());
                let message = event
                    .message
                    .as_deref()
                    .map(|message| truncate(message, 60))
                    .unwrap_or_else(|| "-".to_string());

                Row::new(
                    join_path(namespace.as_deref(), &name),
                    vec![
                        namespace.clone().unwrap_or_else(|| "-".to_string()),
                        last_seen,
                        kind,
                        reason,
                        truncate(&object, 28),
                        message,
                    ],
                )
            })
            .collect();

        Ok(rows)
    }

    pub async fn manifest(&self, kind: ResourceKind, path: &str) -> Result<String> {
        let (namespace, name) = split_path(path);
        let namespace = namespace.unwrap_or(&self.default_namespace);

        let detail = match kind {
            ResourceKind::Pods => {
                let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
                yaml_detail(&api.get(name).await?)
            }
            ResourceKind::Deployments => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                yaml_detail(&api.get(name).await?)
            }
            ResourceKind::Services => {
                let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
                yaml_detail(&api.get(name).await?)
            }
            ResourceKind::ConfigMaps => {
                let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
                yaml_detail(&api.get(name).await?)
            }
            ResourceKind::Secrets => {
                let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
                yaml_detail(&api.get(name).await?)
            }
            ResourceKind::Nodes => {
                let api: Api<Node> = Api::all(self.client.clone());
                yaml_detail(&api.get(name).await?)
            }
            ResourceKind::Namespaces => {
                let api: Api<Namespace> = Api::all(self.client.clone());
                yaml_detail(&api.get(name).await?)
            }
            ResourceKind::Events => {
                let api: Api<Event> = Api::namespaced(self.client.clone(), namespace);
                yaml_detail(&api.get(name).await?)
            }
        };

        Ok(detail)
    }

    pub async fn delete(&self, kind: ResourceKind, path: &str) -> Result<()> {
        let (namespace, name) = split_path(path);
        let params = DeleteParams::default();

        match kind {
            ResourceKind::Pods => {
                let namespace = namespace.context("namespace is required for pod delete")?;
                let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
                let _ = api.delete(name, &params).await?;
            }
            ResourceKind::Deployments => {
                let namespace = namespace.context("namespace is required for deployment delete")?;
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                let _ = api.delete(name, &params).await?;
            }
            ResourceKind::Services => {
                let namespace = namespace.context("namespace is required for service delete")?;
                let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
                let _ = api.delete(name, &params).await?;
            }
            ResourceKind::ConfigMaps => {
                let namespace = namespace.context("namespace is required for configmap delete")?;
                let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
                let _ = api.delete(name, &params).await?;
            }
            ResourceKind::Secrets => {
                let namespace = namespace.context("namespace is required for secret delete")?;
                let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
                let _ = api.delete(name, &params).await?;
            }
            ResourceKind::Nodes => {
                let api: Api<Node> = Api::all(self.client.clone());
                let _ = api.delete(name, &params).await?;
            }
            ResourceKind::Namespaces => {
                let api: Api<Namespace> = Api::all(self.client.clone());
                let _ = api.delete(name, &params).await?;
            }
            ResourceKind::Events => {
                anyhow::bail!("delete is not supported for Events");
            }
        }

        Ok(())
    }
}

/// One resource kind bound to the gateway; the `ResourceSource` capability
/// the table models consume.
#[derive(Clone)]
pub struct KindSource {
    gateway: KubeGateway,
    kind: ResourceKind,
    wide: bool,
}

impl ResourceSource for KindSource {
    async fn snapshot(&self, scope: &NamespaceScope, selector: Option<&str>) -> Result<Snapshot> {
        let rows = self
            .gateway
            .fetch_rows(self.kind, scope, selector, self.wide)
            .await?;
        Ok(Snapshot::new(rows))
    }

    async fn get(&self, path: &str) -> Result<String> {
        self.gateway.manifest(self.kind, path).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.gateway.delete(self.kind, path).await
    }
}

/// Column layout per resource kind. Wide columns are appended last so narrow
/// and wide rows agree on the leading positions.
pub fn header_for(kind: ResourceKind, wide: bool) -> Header {
    let mut columns: Vec<HeaderColumn> = match kind {
        ResourceKind::Pods => ["NAMESPACE", "NAME", "READY", "STATUS", "RESTARTS", "AGE"]
            .iter()
            .map(|name| HeaderColumn::new(*name))
            .collect(),
        ResourceKind::Deployments => {
            ["NAMESPACE", "NAME", "READY", "UP-TO-DATE", "AVAILABLE", "AGE"]
                .iter()
                .map(|name| HeaderColumn::new(*name))
                .collect()
        }
        ResourceKind::Services => ["NAMESPACE", "NAME", "TYPE", "CLUSTER-IP", "PORTS", "AGE"]
            .iter()
            .map(|name| HeaderColumn::new(*name))
            .collect(),
        ResourceKind::ConfigMaps => ["NAMESPACE", "NAME", "DATA", "AGE"]
            .iter()
            .map(|name| HeaderColumn::new(*name))
            .collect(),
        ResourceKind::Secrets => ["NAMESPACE", "NAME", "TYPE", "DATA", "AGE"]
            .iter()
            .map(|name| HeaderColumn::new(*name))
            .collect(),
        ResourceKind::Nodes => ["NAME", "STATUS", "ROLES", "VERSION", "AGE"]
            .iter()
            .map(|name| HeaderColumn::new(*name))
            .collect(),
        ResourceKind::Namespaces => ["NAME", "STATUS", "AGE"]
            .iter()
            .map(|name| HeaderColumn::new(*name))
            .collect(),
        ResourceKind::Events => ["NAMESPACE", "LAST-SEEN", "TYPE", "REASON", "OBJECT", "MESSAGE"]
            .iter()
            .map(|name| HeaderColumn::new(*name))
            .collect(),
    };

    if wide {
        match kind {
            ResourceKind::Pods => {
                columns.push(HeaderColumn::wide("IP"));
                columns.push(HeaderColumn::wide("NODE"));
            }
            ResourceKind::Nodes => {
                columns.push(HeaderColumn::wide("INTERNAL-IP"));
            }
            _ => {}
        }
    }

    Header::new(columns)
}

fn list_params(selector: Option<&str>) -> ListParams {
    let params = ListParams::default().limit(500);
    match selector {
        Some(selector) if !selector.is_empty() => params.labels(selector),
        _ => params,
    }
}

fn pod_readiness(status: &k8s_openapi::api::core::v1::PodStatus) -> (usize, usize, i32) {
    let container_statuses = status.container_statuses.as_deref().unwrap_or(&[]);
    let total = container_statuses.len();
    let ready = container_statuses
        .iter()
        .filter(|container| container.ready)
        .count();
    let restarts = container_statuses
        .iter()
        .map(|container| container.restart_count)
        .sum();

    (ready, total, restarts)
}

fn node_ready_condition(node: &Node) -> String {
    let conditions = node
        .status
        .as_ref()
        .and_then(|status| status.conditions.as_deref())
        .unwrap_or(&[]);

    match conditions
        .iter()
        .find(|condition| condition.type_ == "Ready")
    {
        Some(condition) if condition.status == "True" => "Ready".to_string(),
        Some(_) => "NotReady".to_string(),
        None => "Unknown".to_string(),
    }
}

fn node_roles(node: &Node) -> String {
    let Some(labels) = node.metadata.labels.as_ref() else {
        return "-".to_string();
    };

    let mut roles = labels
        .keys()
        .filter_map(|key| key.strip_prefix("node-role.kubernetes.io/"))
        .map(|role| {
            if role.is_empty() {
                "worker".to_string()
            } else {
                role.to_string()
            }
        })
        .collect::<Vec<_>>();

    if roles.is_empty() {
        return "-".to_string();
    }
    roles.sort();
    roles.dedup();
    roles.join(",")
}

fn node_internal_ip(node: &Node) -> String {
    node.status
        .as_ref()
        .and_then(|status| status.addresses.as_deref())
        .unwrap_or(&[])
        .iter()
        .find(|address| address.type_ == "InternalIP")
        .map(|address| address.address.clone())
        .unwrap_or_else(|| "-".to_string())
}

fn service_ports_summary(service: &Service) -> String {
    let ports = service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.clone())
        .unwrap_or_default();
    if ports.is_empty() {
        return "-".to_string();
    }

    ports
        .into_iter()
        .map(|port| {
            let protocol = port.protocol.unwrap_or_else(|| "TCP".to_string());
            format!("{}/{}", port.port, protocol)
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn event_age(event: &Event) -> String {
    if let Some(event_time) = event.event_time.as_ref() {
        return human_age_timestamp(event_time.0);
    }
    if let Some(last_timestamp) = event.last_timestamp.as_ref() {
        return human_age(Some(last_timestamp));
    }
    if let Some(first_timestamp) = event.first_timestamp.as_ref() {
        return human_age(Some(first_timestamp));
    }
    human_age(event.metadata.creation_timestamp.as_ref())
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }

    let mut out = value
        .chars()
        .take(max.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn human_age(timestamp: Option<&Time>) -> String {
    let Some(timestamp) = timestamp else {
        return "-".to_string();
    };

    human_age_timestamp(timestamp.0)
}

fn human_age_timestamp(ts: k8s_openapi::jiff::Timestamp) -> String {
    let elapsed_seconds = (k8s_openapi::jiff::Timestamp::now().as_second() - ts.as_second()).max(0);
    format_elapsed_seconds(elapsed_seconds)
}

fn format_elapsed_seconds(seconds: i64) -> String {
    if seconds >= 86_400 {
        return format!("{}d", seconds / 86_400);
    }
    if seconds >= 3_600 {
        return format!("{}h", seconds / 3_600);
    }
    if seconds >= 60 {
        return format!("{}m", seconds / 60);
    }
    format!("{seconds}s")
}

fn yaml_detail<T>(value: &T) -> String
where
    T: Serialize,
{
    serde_yaml::to_string(value).unwrap_or_else(|error| format!("failed to format detail: {error}"))
}

#[cfg(test)]
mod tests {
    use super::{format_elapsed_seconds, header_for, truncate};
    use crate::model::ResourceKind;

    #[test]
    fn headers_grow_wide_columns_at_the_tail() {
        let narrow = header_for(ResourceKind::Pods, false);
        let wide = header_for(ResourceKind::Pods, true);

        assert_eq!(narrow.len() + 2, wide.len());
        assert!(wide.columns()[narrow.len()..].iter().all(|column| column.wide));
        assert_eq!(wide.index_of("NODE"), Some(wide.len() - 1));
    }

    #[test]
    fn elapsed_seconds_render_in_coarse_units() {
        assert_eq!(format_elapsed_seconds(42), "42s");
        assert_eq!(format_elapsed_seconds(90), "1m");
        assert_eq!(format_elapsed_seconds(7_200), "2h");
        assert_eq!(format_elapsed_seconds(200_000), "2d");
    }

    #[test]
    fn truncate_appends_an_ellipsis_past_the_limit() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-rather-long-value", 8), "a-rathe…");
    }
}
