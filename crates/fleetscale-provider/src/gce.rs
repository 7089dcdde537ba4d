//! Google Compute Engine backend (REST, `compute/v1`).
//!
//! - list: `GET instances?filter=(labels.<key> = <label>) AND (status = RUNNING)`
//! - create: `POST instances/bulkInsert` with the configured machine profile
//! - delete: `DELETE instances/<name>`, one per node, issued before any wait
//! - wait: `POST operations/<op>/wait`, repeated until the operation is `DONE`
//!
//! Credentials are a static bearer token when configured, otherwise a
//! token fetched from the GCE metadata server and reused until shortly
//! before it expires.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use fleetscale_state::{Node, NodeStatus};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{FleetInventory, NodeProvisioner, OperationReport, ProvisionReport};

const COMPUTE_BASE_URL: &str = "https://compute.googleapis.com/compute/v1";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
/// Refresh a metadata token this long before it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Machine shape for newly created nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineProfile {
    /// Boot image, e.g. `projects/my-project/global/images/worker`.
    pub image: String,
    pub disk_size_gb: u32,
    /// Machine type, e.g. `e2-standard-2`.
    pub machine_type: String,
    #[serde(default)]
    pub preemptible: bool,
    #[serde(default = "default_network")]
    pub network: String,
}

fn default_network() -> String {
    "global/networks/default".to_string()
}

/// Where and how to provision on GCE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GceSettings {
    pub project: String,
    pub zone: String,
    /// Instance label key holding the cluster label.
    #[serde(default = "default_label_key")]
    pub label_key: String,
    /// bulkInsert name pattern; `#` characters are replaced by a counter.
    #[serde(default = "default_name_pattern")]
    pub name_pattern: String,
    /// Static bearer token. When absent the metadata server is used.
    #[serde(default)]
    pub token: Option<String>,
    pub machine: MachineProfile,
}

fn default_label_key() -> String {
    "fleetscale-name".to_string()
}

fn default_name_pattern() -> String {
    "fleet-node-######".to_string()
}

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceList {
    #[serde(default)]
    items: Vec<Instance>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Instance {
    name: String,
    status: String,
    creation_timestamp: String,
    #[serde(default)]
    network_interfaces: Vec<NetworkInterface>,
    #[serde(default)]
    labels: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkInterface {
    #[serde(rename = "networkIP")]
    network_ip: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Operation {
    name: String,
    #[serde(default)]
    status: String,
    target_link: Option<String>,
    error: Option<OperationError>,
    #[serde(default)]
    warnings: Vec<OperationMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct OperationError {
    #[serde(default)]
    errors: Vec<OperationMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct OperationMessage {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl OperationMessage {
    fn render(&self) -> String {
        format!("{}: {}", self.code, self.message)
    }
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

// ── Conversions ────────────────────────────────────────────────────

fn node_status(status: &str) -> NodeStatus {
    match status {
        "RUNNING" => NodeStatus::Running,
        "PROVISIONING" | "STAGING" => NodeStatus::Provisioning,
        "STOPPING" | "SUSPENDING" => NodeStatus::Stopping,
        _ => NodeStatus::Terminated,
    }
}

/// Convert a listed instance into a [`Node`]. Instances without an
/// internal address or a parseable creation time are skipped.
fn to_node(instance: Instance, label_key: &str) -> Option<Node> {
    let Some(address) = instance
        .network_interfaces
        .iter()
        .find_map(|ni| ni.network_ip.clone())
    else {
        warn!(node = %instance.name, "instance has no internal address, skipping");
        return None;
    };

    let created_at = match chrono::DateTime::parse_from_rfc3339(&instance.creation_timestamp) {
        Ok(ts) => ts.timestamp().max(0) as u64,
        Err(e) => {
            warn!(
                node = %instance.name,
                timestamp = %instance.creation_timestamp,
                error = %e,
                "unparseable creation timestamp, skipping"
            );
            return None;
        }
    };

    Some(Node {
        label: instance.labels.get(label_key).cloned().unwrap_or_default(),
        status: node_status(&instance.status),
        name: instance.name,
        address,
        created_at,
    })
}

fn to_report(op: &Operation, target: &str) -> OperationReport {
    OperationReport {
        target: target.to_string(),
        errors: op
            .error
            .as_ref()
            .map(|e| e.errors.iter().map(OperationMessage::render).collect())
            .unwrap_or_default(),
        warnings: op.warnings.iter().map(OperationMessage::render).collect(),
    }
}

fn list_filter(label_key: &str, label: &str) -> String {
    format!("(labels.{label_key} = {label}) AND (status = RUNNING)")
}

fn bulk_insert_body(settings: &GceSettings, label: &str, count: u32) -> serde_json::Value {
    let machine = &settings.machine;
    json!({
        "count": count.to_string(),
        "namePattern": settings.name_pattern,
        "instanceProperties": {
            "machineType": machine.machine_type,
            "labels": { settings.label_key.as_str(): label },
            "scheduling": { "preemptible": machine.preemptible },
            "disks": [{
                "boot": true,
                "autoDelete": true,
                "type": "PERSISTENT",
                "initializeParams": {
                    "sourceImage": machine.image,
                    "diskSizeGb": machine.disk_size_gb.to_string(),
                },
            }],
            "networkInterfaces": [{ "network": machine.network }],
        },
    })
}

// ── Provider ───────────────────────────────────────────────────────

/// GCE-backed [`FleetInventory`] and [`NodeProvisioner`].
pub struct GceProvider {
    http: reqwest::Client,
    settings: GceSettings,
    base_url: String,
    metadata_url: String,
    cached_token: Mutex<Option<(String, Instant)>>,
}

impl GceProvider {
    pub fn new(settings: GceSettings) -> Self {
        Self::with_base_url(settings, COMPUTE_BASE_URL)
    }

    /// Use a different API root (emulators, proxies).
    pub fn with_base_url(settings: GceSettings, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
            base_url: base_url.into(),
            metadata_url: METADATA_TOKEN_URL.to_string(),
            cached_token: Mutex::new(None),
        }
    }

    /// Use a different metadata token endpoint.
    pub fn with_metadata_url(mut self, url: impl Into<String>) -> Self {
        self.metadata_url = url.into();
        self
    }

    fn zone_url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/zones/{}/{}",
            self.base_url, self.settings.project, self.settings.zone, path
        )
    }

    async fn token(&self) -> ProviderResult<String> {
        if let Some(token) = &self.settings.token {
            return Ok(token.clone());
        }

        // Held across the fetch so concurrent callers share one refresh.
        let mut cached = self.cached_token.lock().await;
        if let Some((token, refresh_at)) = cached.as_ref() {
            if Instant::now() < *refresh_at {
                return Ok(token.clone());
            }
        }

        let resp = self
            .http
            .get(&self.metadata_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| ProviderError::Auth(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ProviderError::Auth(format!(
                "metadata server returned {}",
                resp.status()
            )));
        }
        let token: AccessToken = resp
            .json()
            .await
            .map_err(|e| ProviderError::Auth(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        debug!(expires_in = token.expires_in, "fetched metadata token");
        *cached = Some((token.access_token.clone(), Instant::now() + lifetime));
        Ok(token.access_token)
    }

    async fn send<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> ProviderResult<T> {
        let token = self.token().await?;
        let resp = req
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }

    /// Block until `op` is `DONE`. There is no overall timeout.
    async fn wait(&self, mut op: Operation) -> ProviderResult<Operation> {
        while op.status != "DONE" {
            let url = self.zone_url(&format!("operations/{}/wait", op.name));
            op = self.send(self.http.post(url)).await?;
            debug!(operation = %op.name, status = %op.status, "operation polled");
        }
        Ok(op)
    }
}

#[async_trait]
impl FleetInventory for GceProvider {
    async fn list(&self, label: &str) -> ProviderResult<Vec<Node>> {
        let filter = list_filter(&self.settings.label_key, label);
        let mut nodes = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("filter", filter.clone())];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }
            let req = self.http.get(self.zone_url("instances")).query(&query);
            let page: InstanceList = self.send(req).await?;

            nodes.extend(
                page.items
                    .into_iter()
                    .filter_map(|i| to_node(i, &self.settings.label_key))
                    .filter(|n| n.status.is_running()),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(nodes)
    }
}

#[async_trait]
impl NodeProvisioner for GceProvider {
    async fn create(&self, label: &str, count: u32) -> ProviderResult<ProvisionReport> {
        info!(%label, count, zone = %self.settings.zone, "bulk creating nodes");

        let body = bulk_insert_body(&self.settings, label, count);
        let req = self.http.post(self.zone_url("instances/bulkInsert")).json(&body);
        let op: Operation = self.send(req).await?;

        let target = format!("{label} x{count}");
        let mut report = ProvisionReport::default();
        // Errors reported at submission are kept even if the final state differs.
        let submitted = to_report(&op, &target);
        let done = self.wait(op).await?;
        let mut finished = to_report(&done, &target);
        for e in submitted.errors {
            if !finished.errors.contains(&e) {
                finished.errors.push(e);
            }
        }
        report.push(finished);
        Ok(report)
    }

    async fn delete(&self, names: &[String]) -> ProviderResult<ProvisionReport> {
        info!(nodes = ?names, zone = %self.settings.zone, "deleting nodes");
        let mut report = ProvisionReport::default();

        // Issue every deletion first, then wait for all of them.
        let mut pending = Vec::with_capacity(names.len());
        for name in names {
            let req = self.http.delete(self.zone_url(&format!("instances/{name}")));
            match self.send::<Operation>(req).await {
                Ok(op) => pending.push((name, op)),
                Err(e) => report.push(OperationReport::failed(name.clone(), e.to_string())),
            }
        }

        for (name, op) in pending {
            match self.wait(op).await {
                Ok(done) => {
                    debug!(node = %name, link = ?done.target_link, "deletion finished");
                    report.push(to_report(&done, name));
                }
                Err(e) => report.push(OperationReport::failed(name.clone(), e.to_string())),
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GceSettings {
        GceSettings {
            project: "demo-project".to_string(),
            zone: "us-west1-a".to_string(),
            label_key: default_label_key(),
            name_pattern: default_name_pattern(),
            token: Some("t".to_string()),
            machine: MachineProfile {
                image: "projects/demo-project/global/images/worker".to_string(),
                disk_size_gb: 10,
                machine_type: "e2-standard-2".to_string(),
                preemptible: true,
                network: default_network(),
            },
        }
    }

    #[test]
    fn filter_selects_label_and_running() {
        assert_eq!(
            list_filter("fleetscale-name", "batch"),
            "(labels.fleetscale-name = batch) AND (status = RUNNING)"
        );
    }

    #[test]
    fn instance_maps_to_node() {
        let json = r#"{
            "name": "fleet-node-000001",
            "status": "RUNNING",
            "creationTimestamp": "2021-10-01T12:00:00.000-07:00",
            "networkInterfaces": [{"networkIP": "10.138.0.5"}],
            "labels": {"fleetscale-name": "batch"}
        }"#;
        let instance: Instance = serde_json::from_str(json).unwrap();
        let node = to_node(instance, "fleetscale-name").unwrap();

        assert_eq!(node.name, "fleet-node-000001");
        assert_eq!(node.address, "10.138.0.5");
        assert_eq!(node.created_at, 1_633_114_800);
        assert_eq!(node.label, "batch");
        assert_eq!(node.status, NodeStatus::Running);
    }

    #[test]
    fn instance_without_address_is_skipped() {
        let json = r#"{
            "name": "n",
            "status": "RUNNING",
            "creationTimestamp": "2021-10-01T12:00:00Z",
            "networkInterfaces": [{}]
        }"#;
        let instance: Instance = serde_json::from_str(json).unwrap();
        assert!(to_node(instance, "fleetscale-name").is_none());
    }

    #[test]
    fn instance_with_bad_timestamp_is_skipped() {
        let json = r#"{
            "name": "n",
            "status": "RUNNING",
            "creationTimestamp": "yesterday",
            "networkInterfaces": [{"networkIP": "10.0.0.1"}]
        }"#;
        let instance: Instance = serde_json::from_str(json).unwrap();
        assert!(to_node(instance, "fleetscale-name").is_none());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(node_status("RUNNING"), NodeStatus::Running);
        assert_eq!(node_status("STAGING"), NodeStatus::Provisioning);
        assert_eq!(node_status("STOPPING"), NodeStatus::Stopping);
        assert_eq!(node_status("TERMINATED"), NodeStatus::Terminated);
    }

    #[test]
    fn operation_errors_and_warnings_surface_in_report() {
        let json = r#"{
            "name": "operation-1",
            "status": "DONE",
            "error": {"errors": [{"code": "QUOTA_EXCEEDED", "message": "CPUS"}]},
            "warnings": [{"code": "DISK_SIZE_LARGER_THAN_IMAGE_SIZE", "message": "resize"}]
        }"#;
        let op: Operation = serde_json::from_str(json).unwrap();
        let report = to_report(&op, "fleet-node-000001");

        assert_eq!(report.errors, ["QUOTA_EXCEEDED: CPUS"]);
        assert_eq!(report.warnings, ["DISK_SIZE_LARGER_THAN_IMAGE_SIZE: resize"]);
        assert!(!report.is_ok());
    }

    #[test]
    fn clean_operation_is_ok() {
        let op: Operation = serde_json::from_str(r#"{"name": "op", "status": "DONE"}"#).unwrap();
        assert!(to_report(&op, "x").is_ok());
    }

    #[test]
    fn bulk_insert_carries_profile_and_label() {
        let body = bulk_insert_body(&settings(), "batch", 3);

        assert_eq!(body["count"], "3");
        assert_eq!(body["namePattern"], "fleet-node-######");
        let props = &body["instanceProperties"];
        assert_eq!(props["machineType"], "e2-standard-2");
        assert_eq!(props["labels"]["fleetscale-name"], "batch");
        assert_eq!(props["scheduling"]["preemptible"], true);
        assert_eq!(props["disks"][0]["initializeParams"]["diskSizeGb"], "10");
        assert_eq!(props["networkInterfaces"][0]["network"], "global/networks/default");
    }

    // ── Against a fake compute API ─────────────────────────────────

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use serde_json::Value;

    fn authorized(headers: &HeaderMap) -> Result<(), StatusCode> {
        match headers.get("authorization").and_then(|v| v.to_str().ok()) {
            Some("Bearer t") => Ok(()),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }

    fn instance(name: &str, status: &str, ip: &str) -> Value {
        json!({
            "name": name,
            "status": status,
            "creationTimestamp": "2024-01-01T00:00:00Z",
            "networkInterfaces": [{ "networkIP": ip }],
            "labels": { "fleetscale-name": "batch" },
        })
    }

    async fn list_instances(
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> Result<Json<Value>, StatusCode> {
        authorized(&headers)?;
        if query.get("filter").map(String::as_str)
            != Some("(labels.fleetscale-name = batch) AND (status = RUNNING)")
        {
            return Err(StatusCode::BAD_REQUEST);
        }
        match query.get("pageToken").map(String::as_str) {
            None => Ok(Json(json!({
                "items": [
                    instance("n1", "RUNNING", "10.0.0.1"),
                    instance("n2", "STAGING", "10.0.0.2"),
                ],
                "nextPageToken": "p2",
            }))),
            Some("p2") => Ok(Json(json!({ "items": [instance("n3", "RUNNING", "10.0.0.3")] }))),
            Some(_) => Err(StatusCode::BAD_REQUEST),
        }
    }

    async fn bulk_insert(headers: HeaderMap, Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
        authorized(&headers)?;
        if body["count"] != "2" || body["instanceProperties"]["labels"]["fleetscale-name"] != "batch" {
            return Err(StatusCode::BAD_REQUEST);
        }
        Ok(Json(json!({ "name": "op-create", "status": "PENDING" })))
    }

    async fn delete_instance(
        headers: HeaderMap,
        Path(name): Path<String>,
    ) -> Result<Json<Value>, StatusCode> {
        authorized(&headers)?;
        if name == "ghost" {
            return Err(StatusCode::NOT_FOUND);
        }
        Ok(Json(json!({ "name": format!("op-del-{name}"), "status": "RUNNING" })))
    }

    async fn wait_operation(
        headers: HeaderMap,
        Path(op): Path<String>,
    ) -> Result<Json<Value>, StatusCode> {
        authorized(&headers)?;
        if op == "op-del-n2" {
            return Ok(Json(json!({
                "name": op,
                "status": "DONE",
                "error": { "errors": [{ "code": "RESOURCE_IN_USE", "message": "n2" }] },
            })));
        }
        Ok(Json(json!({
            "name": op,
            "status": "DONE",
            "warnings": [{ "code": "NO_RESULTS_ON_PAGE", "message": "empty" }],
        })))
    }

    async fn fake_compute() -> String {
        let zone = "/projects/demo-project/zones/us-west1-a";
        let app = Router::new()
            .route(&format!("{zone}/instances"), get(list_instances))
            .route(&format!("{zone}/instances/bulkInsert"), post(bulk_insert))
            .route(&format!("{zone}/instances/{{name}}"), delete(delete_instance))
            .route(&format!("{zone}/operations/{{op}}/wait"), post(wait_operation));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn list_follows_pages_and_keeps_running_nodes() {
        let provider = GceProvider::with_base_url(settings(), fake_compute().await);

        let nodes = provider.list("batch").await.unwrap();
        let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["n1", "n3"]);
        assert_eq!(nodes[1].address, "10.0.0.3");
        assert_eq!(nodes[0].created_at, 1_704_067_200);
    }

    #[tokio::test]
    async fn create_waits_for_bulk_insert() {
        let provider = GceProvider::with_base_url(settings(), fake_compute().await);

        let report = provider.create("batch", 2).await.unwrap();
        assert_eq!(report.operations.len(), 1);
        assert_eq!(report.operations[0].target, "batch x2");
        assert_eq!(report.error_count(), 0);
        assert_eq!(report.warning_count(), 1);
    }

    #[tokio::test]
    async fn delete_reports_each_node() {
        let provider = GceProvider::with_base_url(settings(), fake_compute().await);
        let names = ["n1".to_string(), "n2".to_string(), "ghost".to_string()];

        let report = provider.delete(&names).await.unwrap();
        assert_eq!(report.operations.len(), 3);
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.succeeded().collect::<Vec<_>>(), ["n1"]);

        let ghost = report.operations.iter().find(|op| op.target == "ghost").unwrap();
        assert!(ghost.errors[0].contains("404"));
    }

    #[tokio::test]
    async fn rejected_credentials_are_an_api_error() {
        let mut settings = settings();
        settings.token = Some("expired".to_string());
        let provider = GceProvider::with_base_url(settings, fake_compute().await);

        match provider.list("batch").await {
            Err(ProviderError::Api { status, .. }) => assert_eq!(status, 401),
            other => panic!("unexpected: {other:?}"),
        }
    }

    async fn fake_metadata(expires_in: u64) -> (String, Arc<AtomicUsize>) {
        async fn issue(
            State((fetches, expires_in)): State<(Arc<AtomicUsize>, u64)>,
            headers: HeaderMap,
        ) -> Result<Json<Value>, StatusCode> {
            if headers.get("metadata-flavor").and_then(|v| v.to_str().ok()) != Some("Google") {
                return Err(StatusCode::FORBIDDEN);
            }
            fetches.fetch_add(1, Ordering::SeqCst);
            Ok(Json(json!({
                "access_token": "t",
                "expires_in": expires_in,
                "token_type": "Bearer",
            })))
        }

        let fetches = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/token", get(issue))
            .with_state((fetches.clone(), expires_in));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}/token"), fetches)
    }

    fn metadata_provider(compute: String, metadata: String) -> GceProvider {
        let mut settings = settings();
        settings.token = None;
        GceProvider::with_base_url(settings, compute).with_metadata_url(metadata)
    }

    #[tokio::test]
    async fn metadata_token_is_reused_until_expiry() {
        let (metadata, fetches) = fake_metadata(3599).await;
        let provider = metadata_provider(fake_compute().await, metadata);

        provider.list("batch").await.unwrap();
        provider.list("batch").await.unwrap();
        provider.create("batch", 2).await.unwrap();

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expiring_metadata_token_is_refetched() {
        // Lifetime inside the refresh margin, so every call fetches anew.
        let (metadata, fetches) = fake_metadata(30).await;
        let provider = metadata_provider(fake_compute().await, metadata);

        provider.list("batch").await.unwrap();
        provider.list("batch").await.unwrap();

        // Each list walks two pages.
        assert_eq!(fetches.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn unreachable_metadata_server_is_an_auth_error() {
        let provider = metadata_provider(fake_compute().await, "http://127.0.0.1:1/token".to_string());

        match provider.list("batch").await {
            Err(ProviderError::Auth(_)) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn zone_url_layout() {
        let provider = GceProvider::with_base_url(settings(), "http://localhost:9999");
        assert_eq!(
            provider.zone_url("instances"),
            "http://localhost:9999/projects/demo-project/zones/us-west1-a/instances"
        );
    }
}
