//! HTTP cluster query implementation
//!
//! This module implements the cluster query facade against
//! OpenSearch/Elasticsearch-compatible REST endpoints. It covers exactly
//! the read paths the engine needs: boundary timestamps, range counts,
//! the snapshot catalog, and cluster health.

use crate::adapters::cluster::models::{
    timestamp_from_source, CountResponse, HealthResponse, SearchResponse, SnapshotListResponse,
};
use crate::adapters::cluster::traits::{ClusterHealth, ClusterQuery, SnapshotInfo};
use crate::config::{ClusterConfig, SecretString};
use crate::domain::{CaravelError, ClusterError, Result, TimeWindow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, ClientBuilder, Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde_json::json;
use std::time::Duration;
use url::Url;

/// Cluster query facade backed by a cluster's REST API
pub struct HttpClusterQuery {
    /// Label used in logs to tell source and target apart
    label: String,

    /// HTTP client for making requests
    client: Client,

    /// Base URL of the cluster, always with a trailing slash
    base_url: Url,

    /// Index pattern the queries are scoped to
    index_pattern: String,

    /// Basic auth credentials, when configured
    username: Option<String>,
    password: Option<SecretString>,
}

impl HttpClusterQuery {
    /// Create a facade for one cluster
    ///
    /// # Arguments
    ///
    /// * `label` - Short name used in logs ("source" or "target")
    /// * `config` - Endpoint, credentials, and TLS settings
    /// * `index_pattern` - Index pattern all data queries are scoped to
    ///
    /// # Errors
    ///
    /// Returns an error if the configured URL cannot be parsed.
    pub fn new(
        label: impl Into<String>,
        config: &ClusterConfig,
        index_pattern: impl Into<String>,
    ) -> Result<Self> {
        let mut raw = config.url.trim_end_matches('/').to_string();
        raw.push('/');
        let base_url = Url::parse(&raw).map_err(|e| {
            CaravelError::Configuration(format!("invalid cluster url '{}': {e}", config.url))
        })?;

        // Build HTTP client with TLS configuration
        let mut client_builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30));

        if !config.tls_verify {
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder.build().expect("Failed to build HTTP client");

        Ok(Self {
            label: label.into(),
            client,
            base_url,
            index_pattern: index_pattern.into(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(path).map_err(|e| {
            CaravelError::Configuration(format!("invalid request path '{path}': {e}"))
        })?;

        let mut request = self.client.request(method, url);
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            request = request.basic_auth(username, Some(password.expose_secret().as_ref()));
        }

        Ok(request)
    }

    async fn dispatch(&self, request: RequestBuilder, context: &str) -> Result<reqwest::Response> {
        request
            .send()
            .await
            .map_err(|e| self.transport_error(&e, context))
    }

    fn transport_error(&self, e: &reqwest::Error, context: &str) -> CaravelError {
        let message = format!("{} cluster, {context}: {e}", self.label);
        if e.is_timeout() {
            ClusterError::Timeout(message).into()
        } else {
            ClusterError::ConnectionFailed(message).into()
        }
    }

    async fn ensure_success(
        &self,
        response: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<unreadable body>"));
        let message = format!("{} cluster, {context}: {body}", self.label);

        Err(match status.as_u16() {
            401 | 403 => ClusterError::AuthenticationFailed(message).into(),
            400 => ClusterError::QueryRejected(message).into(),
            s if (500..600).contains(&s) => ClusterError::ServerError { status: s, message }.into(),
            s => ClusterError::ClientError { status: s, message }.into(),
        })
    }

    /// Fetch the single newest or oldest timestamp via a sorted one-hit search
    async fn boundary_timestamp(&self, field: &str, order: &str) -> Result<Option<DateTime<Utc>>> {
        let mut sort_spec = serde_json::Map::new();
        sort_spec.insert(
            field.to_string(),
            json!({ "order": order, "unmapped_type": "date" }),
        );
        let body = json!({
            "size": 1,
            "sort": [sort_spec],
            "_source": [field]
        });

        let path = format!("{}/_search", self.index_pattern);
        let request = self.request(Method::POST, &path)?.json(&body);
        let response = self.dispatch(request, "timestamp query").await?;

        // A missing index means no documents, not a failure
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = self.ensure_success(response, "timestamp query").await?;
        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ClusterError::InvalidResponse(format!("search response: {e}")))?;

        match parsed.hits.hits.first() {
            Some(hit) => Ok(Some(timestamp_from_source(&hit.source, field)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ClusterQuery for HttpClusterQuery {
    async fn max_timestamp(&self, field: &str) -> Result<Option<DateTime<Utc>>> {
        self.boundary_timestamp(field, "desc").await
    }

    async fn min_timestamp(&self, field: &str) -> Result<Option<DateTime<Utc>>> {
        self.boundary_timestamp(field, "asc").await
    }

    async fn count_in_range(&self, field: &str, window: &TimeWindow) -> Result<u64> {
        let mut range_spec = serde_json::Map::new();
        range_spec.insert(
            field.to_string(),
            json!({
                "gte": window.start().timestamp_millis(),
                "lt": window.end().timestamp_millis(),
                "format": "epoch_millis"
            }),
        );
        let body = json!({ "query": { "range": range_spec } });

        let path = format!("{}/_count", self.index_pattern);
        let request = self.request(Method::POST, &path)?.json(&body);
        let response = self.dispatch(request, "count query").await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(0);
        }

        let response = self.ensure_success(response, "count query").await?;
        let parsed: CountResponse = response
            .json()
            .await
            .map_err(|e| ClusterError::InvalidResponse(format!("count response: {e}")))?;

        Ok(parsed.count)
    }

    async fn latest_snapshot(&self, repository: &str) -> Result<Option<SnapshotInfo>> {
        let path = format!("_snapshot/{repository}/_all");
        let request = self.request(Method::GET, &path)?;
        let response = self.dispatch(request, "snapshot catalog").await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::warn!(
                cluster = %self.label,
                repository,
                "Snapshot repository not registered on cluster"
            );
            return Ok(None);
        }

        let response = self.ensure_success(response, "snapshot catalog").await?;
        let listing: SnapshotListResponse = response
            .json()
            .await
            .map_err(|e| ClusterError::SnapshotRepository(format!("snapshot listing: {e}")))?;

        let latest = listing
            .snapshots
            .into_iter()
            .filter(|s| s.is_success())
            .max_by_key(|s| s.start_time_in_millis);

        match latest {
            Some(entry) => {
                let captured_at = Utc
                    .timestamp_millis_opt(entry.start_time_in_millis)
                    .single()
                    .ok_or_else(|| {
                        ClusterError::SnapshotRepository(format!(
                            "snapshot '{}' reports invalid start time {}",
                            entry.snapshot, entry.start_time_in_millis
                        ))
                    })?;
                Ok(Some(SnapshotInfo {
                    name: entry.snapshot,
                    captured_at,
                }))
            }
            None => Ok(None),
        }
    }

    async fn health(&self) -> Result<ClusterHealth> {
        let request = self.request(Method::GET, "_cluster/health")?;
        let response = self.dispatch(request, "health probe").await?;
        let response = self.ensure_success(response, "health probe").await?;

        let parsed: HealthResponse = response
            .json()
            .await
            .map_err(|e| ClusterError::InvalidResponse(format!("health response: {e}")))?;

        if parsed.status == "red" {
            return Err(ClusterError::Unhealthy(format!(
                "cluster '{}' reports red status",
                parsed.cluster_name
            ))
            .into());
        }

        Ok(ClusterHealth {
            cluster_name: parsed.cluster_name,
            status: parsed.status,
        })
    }
}
