//! Prefix routing of inbound API paths onto upstream origins.
//!
//! The table is ordered and matching is first-match, not longest-match: a
//! more specific prefix has to be listed before any prefix that contains it.
//! A path no entry matches is an error, never a pass-through.

use crate::error::ExecError;
use crate::executor::{HttpCall, RawBody, RequestExecutor};
use crate::request::RequestDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Which side of the system a route lands on. The split is decided by the
/// table alone, never by inspecting request content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Upstream {
    /// Public race-data provider: versioned REST surface, compact dates.
    Provider,
    /// Private backend: JSON REST, ISO dates.
    Backend,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::Provider => f.write_str("provider"),
            Upstream::Backend => f.write_str("backend"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    pub prefix: String,
    pub upstream: Upstream,
    pub origin: String,
    /// Replacement for the matched prefix; `None` strips it.
    pub rewrite: Option<String>,
    pub accept_invalid_certs: bool,
}

impl UpstreamTarget {
    pub fn new(prefix: &str, upstream: Upstream, origin: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            upstream,
            origin: origin.to_string(),
            rewrite: None,
            accept_invalid_certs: false,
        }
    }

    pub fn with_rewrite(mut self, replacement: &str) -> Self {
        self.rewrite = Some(replacement.to_string());
        self
    }

    pub fn insecure(mut self) -> Self {
        self.accept_invalid_certs = true;
        self
    }

    /// Prefix match on a segment boundary: `/api/pmu` matches `/api/pmu` and
    /// `/api/pmu/x` but not `/api/pmux`.
    pub fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || self.prefix.ends_with('/'),
            None => false,
        }
    }

    /// Strip the matched prefix and put the replacement in its place.
    /// Callers must check `matches` first.
    pub fn rewrite_path(&self, path: &str) -> String {
        let rest = path.strip_prefix(self.prefix.as_str()).unwrap_or(path);
        let replacement = self
            .rewrite
            .as_deref()
            .unwrap_or("")
            .trim_end_matches('/');

        let mut out = String::with_capacity(replacement.len() + rest.len() + 1);
        out.push_str(replacement);
        if !rest.is_empty() && !rest.starts_with('/') {
            out.push('/');
        }
        out.push_str(rest);
        if !out.starts_with('/') {
            out.insert(0, '/');
        }
        out
    }
}

/// Outcome of routing one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route<'a> {
    pub target: &'a UpstreamTarget,
    pub path: String,
}

impl Route<'_> {
    pub fn url(&self) -> String {
        format!("{}{}", self.target.origin.trim_end_matches('/'), self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    targets: Vec<UpstreamTarget>,
}

impl RoutingTable {
    pub fn new(targets: Vec<UpstreamTarget>) -> Self {
        let table = Self { targets };
        for (later, earlier) in table.shadowed() {
            warn!(
                "route {} (#{}) is unreachable: shadowed by {} (#{})",
                table.targets[later].prefix, later, table.targets[earlier].prefix, earlier
            );
        }
        table
    }

    /// Backend families first, then the provider catch-all for `/api/pmu`.
    pub fn default_table(provider_url: &str, provider_version: u32, backend_url: &str) -> Self {
        let provider_surface = format!("/rest/client/{provider_version}/programme");
        Self::new(vec![
            UpstreamTarget::new("/api/pmu/races", Upstream::Backend, backend_url)
                .with_rewrite("/api/races"),
            UpstreamTarget::new("/api/pmu/daily", Upstream::Backend, backend_url)
                .with_rewrite("/api/daily"),
            UpstreamTarget::new("/api/pmu/betting", Upstream::Backend, backend_url)
                .with_rewrite("/api/betting"),
            UpstreamTarget::new("/api/pmu", Upstream::Provider, provider_url)
                .with_rewrite(&provider_surface)
                .insecure(),
        ])
    }

    pub fn targets(&self) -> &[UpstreamTarget] {
        &self.targets
    }

    pub fn route(&self, path: &str) -> Result<Route<'_>, ExecError> {
        let target = self
            .targets
            .iter()
            .find(|t| t.matches(path))
            .ok_or_else(|| ExecError::NoRoute(path.to_string()))?;
        let rewritten = target.rewrite_path(path);
        debug!("route {} -> {} {}", path, target.upstream, rewritten);
        Ok(Route {
            target,
            path: rewritten,
        })
    }

    /// `(later, earlier)` index pairs where the later entry can never match
    /// because the earlier one already covers its prefix.
    pub fn shadowed(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (later, target) in self.targets.iter().enumerate() {
            if let Some(earlier) = self.targets[..later]
                .iter()
                .position(|e| e.matches(&target.prefix))
            {
                pairs.push((later, earlier));
            }
        }
        pairs
    }
}

/// Routes descriptors through the table and hands them to the executor.
#[derive(Clone)]
pub struct Gateway {
    table: RoutingTable,
    executor: RequestExecutor,
}

impl Gateway {
    pub fn new(table: RoutingTable, executor: RequestExecutor) -> Self {
        Self { table, executor }
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Resolve a descriptor into a concrete call without touching the network.
    pub fn prepare(&self, request: &RequestDescriptor) -> Result<HttpCall, ExecError> {
        let path = request.path()?;
        let route = self.table.route(&path)?;
        Ok(HttpCall {
            method: request.method(),
            url: route.url(),
            query: request.query().to_vec(),
            body: request.body().cloned(),
            accept_invalid_certs: route.target.accept_invalid_certs,
        })
    }

    pub async fn dispatch(&self, request: &RequestDescriptor) -> Result<RawBody, ExecError> {
        let call = self.prepare(request)?;
        self.execute(&call, request.timeout()).await
    }

    /// Execute a call already resolved by `prepare`.
    pub async fn execute(&self, call: &HttpCall, timeout: Duration) -> Result<RawBody, ExecError> {
        self.executor.execute(call, timeout).await
    }
}
