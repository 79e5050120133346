//! Tenant resolution: pick a slug from the request's signals, then fetch the
//! tenant it names.
//!
//! Slug sources are tried in a fixed priority order (query override, path
//! parameter, subdomain, configured default); the first non-blank candidate
//! wins. Each source is a [`SlugStrategy`] so it can be tested on its own.

use serde::Serialize;
use std::sync::Arc;
use storefront_core::config::TenancyConfig;
use storefront_core::types::{Tenant, TenantStatus};
use storefront_datastore::TenantDirectory;
use thiserror::Error;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

/// The request signals a slug may come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// `?tenant=<slug>`
    pub query_tenant: Option<String>,
    /// `/s/<slug>/...`
    pub path_slug: Option<String>,
    /// Raw `Host` header, port included.
    pub host: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query_tenant(mut self, slug: impl Into<String>) -> Self {
        self.query_tenant = Some(slug.into());
        self
    }

    pub fn with_path_slug(mut self, slug: impl Into<String>) -> Self {
        self.path_slug = Some(slug.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SlugSource {
    Query,
    Path,
    Subdomain,
    Default,
}

pub trait SlugStrategy: Send + Sync {
    fn source(&self) -> SlugSource;

    /// Candidate slug, or `None` when this signal is absent or blank.
    fn candidate(&self, ctx: &RequestContext) -> Option<String>;
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub struct QueryOverride;

impl SlugStrategy for QueryOverride {
    fn source(&self) -> SlugSource {
        SlugSource::Query
    }

    fn candidate(&self, ctx: &RequestContext) -> Option<String> {
        non_blank(ctx.query_tenant.as_deref())
    }
}

pub struct PathParam;

impl SlugStrategy for PathParam {
    fn source(&self) -> SlugSource {
        SlugSource::Path
    }

    fn candidate(&self, ctx: &RequestContext) -> Option<String> {
        non_blank(ctx.path_slug.as_deref())
    }
}

/// First host label, unless it is reserved or numeric (an IP address).
pub struct Subdomain {
    reserved: Vec<String>,
}

impl Subdomain {
    pub fn new(reserved: &[String]) -> Self {
        Self {
            reserved: reserved.iter().map(|r| r.to_ascii_lowercase()).collect(),
        }
    }
}

impl SlugStrategy for Subdomain {
    fn source(&self) -> SlugSource {
        SlugSource::Subdomain
    }

    fn candidate(&self, ctx: &RequestContext) -> Option<String> {
        let host = ctx.host.as_deref()?.trim();
        let hostname = host.split(':').next().unwrap_or(host);
        let labels: Vec<&str> = hostname.split('.').collect();
        if labels.len() < 2 {
            return None;
        }

        let first = labels[0].trim().to_ascii_lowercase();
        if first.is_empty()
            || self.reserved.contains(&first)
            || first.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        Some(first)
    }
}

pub struct ConfiguredDefault {
    slug: Option<String>,
}

impl ConfiguredDefault {
    pub fn new(slug: Option<String>) -> Self {
        Self { slug }
    }
}

impl SlugStrategy for ConfiguredDefault {
    fn source(&self) -> SlugSource {
        SlugSource::Default
    }

    fn candidate(&self, _ctx: &RequestContext) -> Option<String> {
        non_blank(self.slug.as_deref())
    }
}

/// Ordered slug strategies; the first candidate wins.
pub struct SlugChain {
    strategies: Vec<Box<dyn SlugStrategy>>,
}

impl SlugChain {
    pub fn new(strategies: Vec<Box<dyn SlugStrategy>>) -> Self {
        Self { strategies }
    }

    /// Query, path, subdomain, then default.
    pub fn from_config(config: &TenancyConfig) -> Self {
        Self::new(vec![
            Box::new(QueryOverride),
            Box::new(PathParam),
            Box::new(Subdomain::new(&config.reserved_subdomains)),
            Box::new(ConfiguredDefault::new(config.default_slug.clone())),
        ])
    }

    pub fn pick(&self, ctx: &RequestContext) -> Option<(String, SlugSource)> {
        self.strategies
            .iter()
            .find_map(|s| s.candidate(ctx).map(|slug| (slug, s.source())))
    }
}

/// Which tenant statuses a resolution accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPredicate {
    ActiveOnly,
    /// Used on the guarded storefront path so a blocked tenant can still be
    /// shown its block state.
    AnyStatus,
}

impl AccessPredicate {
    pub fn admits(&self, tenant: &Tenant) -> bool {
        match self {
            Self::ActiveOnly => tenant.status == TenantStatus::Active,
            Self::AnyStatus => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedTenant {
    pub tenant: Tenant,
    pub source: SlugSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("no store was specified for this request")]
    NoSlug,

    /// Unknown slug, excluded status, and lookup failure all read the same to
    /// the caller.
    #[error("store not found or inactive")]
    TenantNotFound { slug: String },
}

pub struct TenantResolver {
    chain: SlugChain,
    directory: Arc<dyn TenantDirectory>,
}

impl TenantResolver {
    pub fn new(chain: SlugChain, directory: Arc<dyn TenantDirectory>) -> Self {
        Self { chain, directory }
    }

    pub fn slug_for(&self, ctx: &RequestContext) -> Option<(String, SlugSource)> {
        self.chain.pick(ctx)
    }

    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        predicate: AccessPredicate,
    ) -> Result<ResolvedTenant, ResolutionError> {
        let Some((slug, source)) = self.chain.pick(ctx) else {
            debug!("No tenant slug in request");
            metrics::counter!("tenancy.no_slug").increment(1);
            return Err(ResolutionError::NoSlug);
        };

        let not_found = || {
            metrics::counter!("tenancy.not_found").increment(1);
            ResolutionError::TenantNotFound { slug: slug.clone() }
        };

        match self.directory.find_by_slug(&slug).await {
            Ok(Some(tenant)) if predicate.admits(&tenant) => {
                info!(
                    tenant_id = %tenant.id,
                    slug = %slug,
                    source = ?source,
                    status = %tenant.status,
                    "Tenant resolved"
                );
                metrics::counter!("tenancy.resolved").increment(1);
                Ok(ResolvedTenant { tenant, source })
            }
            Ok(Some(tenant)) => {
                info!(slug = %slug, status = %tenant.status, predicate = ?predicate, "Tenant excluded by predicate");
                Err(not_found())
            }
            Ok(None) => {
                info!(slug = %slug, "Unknown tenant slug");
                Err(not_found())
            }
            Err(e) => {
                warn!(slug = %slug, error = %e, "Tenant lookup failed");
                Err(not_found())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use storefront_datastore::{DatastoreError, DatastoreResult, InMemoryDatastore};

    fn chain() -> SlugChain {
        SlugChain::from_config(&TenancyConfig {
            default_slug: Some("fallback".into()),
            ..Default::default()
        })
    }

    fn subdomain_of(host: &str) -> Option<String> {
        Subdomain::new(&TenancyConfig::default().reserved_subdomains)
            .candidate(&RequestContext::new().with_host(host))
    }

    #[test]
    fn test_subdomain_rules() {
        assert_eq!(subdomain_of("farmavida.example.com").as_deref(), Some("farmavida"));
        assert_eq!(subdomain_of("farmavida.localhost:5173").as_deref(), Some("farmavida"));
        assert_eq!(subdomain_of("FarmaVida.example.com").as_deref(), Some("farmavida"));
        assert_eq!(subdomain_of("localhost:5173"), None);
        assert_eq!(subdomain_of("www.example.com"), None);
        assert_eq!(subdomain_of("api.example.com"), None);
        assert_eq!(subdomain_of("192.168.0.10:8080"), None);
    }

    #[test]
    fn test_query_override_wins() {
        let ctx = RequestContext::new()
            .with_query_tenant("from-query")
            .with_path_slug("from-path")
            .with_host("from-host.example.com");
        assert_eq!(
            chain().pick(&ctx),
            Some(("from-query".to_string(), SlugSource::Query))
        );
    }

    #[test]
    fn test_priority_falls_through_blank_candidates() {
        let ctx = RequestContext::new()
            .with_query_tenant("   ")
            .with_path_slug("")
            .with_host("from-host.example.com");
        assert_eq!(
            chain().pick(&ctx),
            Some(("from-host".to_string(), SlugSource::Subdomain))
        );

        let ctx = RequestContext::new().with_host("www.example.com");
        assert_eq!(
            chain().pick(&ctx),
            Some(("fallback".to_string(), SlugSource::Default))
        );
    }

    #[test]
    fn test_no_candidate_without_default() {
        let chain = SlugChain::from_config(&TenancyConfig::default());
        assert_eq!(chain.pick(&RequestContext::new().with_host("localhost")), None);
    }

    fn resolver_with(store: Arc<InMemoryDatastore>) -> TenantResolver {
        TenantResolver::new(SlugChain::from_config(&TenancyConfig::default()), store)
    }

    #[tokio::test]
    async fn test_resolve_respects_predicate() {
        let store = Arc::new(InMemoryDatastore::new());
        store.seed_demo();
        let resolver = resolver_with(store);

        let active = RequestContext::new().with_path_slug("farmavida");
        let resolved = resolver
            .resolve(&active, AccessPredicate::ActiveOnly)
            .await
            .unwrap();
        assert_eq!(resolved.tenant.slug, "farmavida");
        assert_eq!(resolved.source, SlugSource::Path);

        let suspended = RequestContext::new().with_query_tenant("saude-mais");
        assert_eq!(
            resolver
                .resolve(&suspended, AccessPredicate::ActiveOnly)
                .await
                .unwrap_err(),
            ResolutionError::TenantNotFound {
                slug: "saude-mais".into()
            }
        );
        let guarded = resolver
            .resolve(&suspended, AccessPredicate::AnyStatus)
            .await
            .unwrap();
        assert_eq!(guarded.tenant.status, TenantStatus::Suspended);
    }

    #[tokio::test]
    async fn test_resolve_without_slug() {
        let store = Arc::new(InMemoryDatastore::new());
        let err = resolver_with(store)
            .resolve(&RequestContext::new(), AccessPredicate::AnyStatus)
            .await
            .unwrap_err();
        assert_eq!(err, ResolutionError::NoSlug);
    }

    struct Unreachable;

    #[async_trait]
    impl TenantDirectory for Unreachable {
        async fn find_by_slug(&self, _slug: &str) -> DatastoreResult<Option<Tenant>> {
            Err(DatastoreError::Transport("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_lookup_failure_reads_as_not_found() {
        let resolver = TenantResolver::new(
            SlugChain::from_config(&TenancyConfig::default()),
            Arc::new(Unreachable),
        );
        let unknown = RequestContext::new().with_path_slug("farmavida");
        let err = resolver
            .resolve(&unknown, AccessPredicate::AnyStatus)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "store not found or inactive");
    }
}
