//! Long-lived graph state: the shared type cache, the FK lookup and the
//! last published build, plus generation-based cancellation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::builder::build_graph;
use super::enhancer::enhance_edges;
use super::{GraphBuild, PrimaryModelChecker, TransformOptions, TypeFilter};
use crate::error::{Result, TypegraphError};
use crate::fk::{build_fk_lookup, FkBuildStats, FkLookup, PgForeignKey};
use crate::introspection::{TypeCache, TypeFetcher};
use crate::names::NameMapper;

/// Identifies one build generation. A token stops being current as soon as
/// a newer generation begins.
#[derive(Debug, Clone)]
pub struct BuildToken {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl BuildToken {
    /// A token nothing can supersede, for one-off builds.
    pub fn detached() -> Self {
        Self {
            generation: 0,
            current: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }

    pub fn ensure_current(&self) -> Result<()> {
        if self.is_current() {
            Ok(())
        } else {
            Err(TypegraphError::Superseded {
                generation: self.generation,
            })
        }
    }
}

/// Parameters that change between rebuilds. Unset filter and checker fall
/// back to the session's base options.
#[derive(Debug, Clone)]
pub struct GraphRequest {
    pub roots: Vec<String>,
    pub max_depth: usize,
    pub type_filter: Option<TypeFilter>,
    pub primary_model_checker: Option<PrimaryModelChecker>,
}

impl GraphRequest {
    pub fn new<I, S>(roots: I, max_depth: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            max_depth,
            type_filter: None,
            primary_model_checker: None,
        }
    }

    pub fn with_type_filter(mut self, filter: TypeFilter) -> Self {
        self.type_filter = Some(filter);
        self
    }

    pub fn with_primary_model_checker(mut self, checker: PrimaryModelChecker) -> Self {
        self.primary_model_checker = Some(checker);
        self
    }
}

#[derive(Default)]
struct FkState {
    rows: Vec<PgForeignKey>,
    model_names: Option<Vec<String>>,
    lookup: Option<Arc<FkLookup>>,
    stats: Option<FkBuildStats>,
    /// Cache size the current lookup was built against
    built_for: Option<usize>,
}

/// Rebuilds the graph on every parameter change.
///
/// Rebuilds may overlap. Each one takes a new generation; whichever started
/// last wins, and older builds fail with `Superseded` without publishing.
/// The type cache only ever grows, so a superseded build leaves it valid.
pub struct GraphSession {
    cache: Arc<TypeCache>,
    fetcher: Arc<dyn TypeFetcher>,
    base: TransformOptions,
    generation: Arc<AtomicU64>,
    fk: RwLock<FkState>,
    latest: RwLock<Option<Arc<GraphBuild>>>,
}

impl GraphSession {
    pub fn new(
        cache: Arc<TypeCache>,
        fetcher: Arc<dyn TypeFetcher>,
        base: TransformOptions,
    ) -> Self {
        Self {
            cache,
            fetcher,
            base,
            generation: Arc::new(AtomicU64::new(0)),
            fk: RwLock::new(FkState::default()),
            latest: RwLock::new(None),
        }
    }

    pub fn cache(&self) -> &Arc<TypeCache> {
        &self.cache
    }

    /// Replace the FK rows. The lookup is rebuilt on the next rebuild.
    pub fn set_foreign_keys(&self, rows: Vec<PgForeignKey>) {
        let mut fk = self.fk_write();
        log::debug!("Session FK rows replaced: {}", rows.len());
        fk.rows = rows;
        fk.built_for = None;
    }

    /// Map tables from authoritative model names instead of reverse-mapping
    /// the discovered type names.
    pub fn set_model_names(&self, model_names: Vec<String>) {
        let mut fk = self.fk_write();
        fk.model_names = Some(model_names);
        fk.built_for = None;
    }

    /// Start a new generation, superseding every build in flight.
    pub fn begin(&self) -> BuildToken {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        BuildToken {
            generation,
            current: Arc::clone(&self.generation),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Rebuild the FK lookup if the rows, the model names or the discovered
    /// type set changed since it was last built. Returns the current lookup.
    pub fn refresh_fk_lookup(&self) -> Option<Arc<FkLookup>> {
        let cached = self.cache.len();
        {
            let fk = self.fk_read();
            if fk.built_for == Some(cached) {
                return fk.lookup.clone();
            }
        }

        let mut fk = self.fk_write();
        if fk.built_for == Some(cached) {
            return fk.lookup.clone();
        }
        if fk.rows.is_empty() {
            fk.lookup = None;
            fk.stats = None;
            fk.built_for = Some(cached);
            return None;
        }

        let mapper = match &fk.model_names {
            Some(models) => NameMapper::from_model_names(models),
            None => NameMapper::from_type_names(self.cache.type_names()),
        };
        let result = build_fk_lookup(&fk.rows, &mapper);
        let lookup = Arc::new(result.lookup);
        fk.lookup = Some(Arc::clone(&lookup));
        fk.stats = Some(result.stats);
        fk.built_for = Some(cached);
        Some(lookup)
    }

    /// Build a new graph for `request` and publish it as [`latest`](Self::latest).
    pub async fn rebuild(&self, request: GraphRequest) -> Result<Arc<GraphBuild>> {
        let token = self.begin();
        log::debug!(
            "Generation {}: rebuilding from {} roots at depth {}",
            token.generation(),
            request.roots.len(),
            request.max_depth
        );

        let mut options = self.base.clone();
        options.max_depth = request.max_depth;
        if let Some(filter) = request.type_filter {
            options.type_filter = Some(filter);
        }
        if let Some(checker) = request.primary_model_checker {
            options.primary_model_checker = Some(checker);
        }
        options.fk_lookup = self.refresh_fk_lookup();

        let mut build = build_graph(
            &request.roots,
            &self.cache,
            &options,
            self.fetcher.as_ref(),
            &token,
        )
        .await?;

        // Fetching may have grown the type set the lookup was mapped from
        let refreshed = self.refresh_fk_lookup();
        let changed = match (&options.fk_lookup, &refreshed) {
            (Some(before), Some(after)) => !Arc::ptr_eq(before, after),
            (None, None) => false,
            _ => true,
        };
        if changed {
            let foreign_keys = enhance_edges(&mut build.edges, refreshed.as_deref());
            log::debug!(
                "Generation {}: FK lookup refreshed, {} edges re-annotated as foreign keys",
                token.generation(),
                foreign_keys
            );
        }

        let build = Arc::new(build);
        let mut latest = self.latest_write();
        token.ensure_current()?;
        *latest = Some(Arc::clone(&build));
        Ok(build)
    }

    pub fn latest(&self) -> Option<Arc<GraphBuild>> {
        self.latest
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Drop everything learned from the server. FK rows and model names are
    /// kept; in-flight builds are superseded.
    pub fn reset(&self) {
        self.begin();
        self.cache.clear();
        {
            let mut fk = self.fk_write();
            fk.lookup = None;
            fk.stats = None;
            fk.built_for = None;
        }
        *self.latest_write() = None;
        log::info!("Graph session reset");
    }

    pub fn fk_lookup(&self) -> Option<Arc<FkLookup>> {
        self.fk_read().lookup.clone()
    }

    pub fn fk_stats(&self) -> Option<FkBuildStats> {
        self.fk_read().stats.clone()
    }

    fn fk_read(&self) -> RwLockReadGuard<'_, FkState> {
        self.fk.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fk_write(&self) -> RwLockWriteGuard<'_, FkState> {
        self.fk.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn latest_write(&self) -> RwLockWriteGuard<'_, Option<Arc<GraphBuild>>> {
        self.latest
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for GraphSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphSession")
            .field("cached_types", &self.cache.len())
            .field("generation", &self.generation())
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::device_types;
    use crate::introspection::{IntrospectionType, StaticTypeFetcher};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Notify;

    fn session(fetcher: Arc<dyn TypeFetcher>) -> GraphSession {
        let base = TransformOptions::default()
            .with_primary_model_checker(PrimaryModelChecker::from_names(["DeviceType"]));
        GraphSession::new(Arc::new(TypeCache::new()), fetcher, base)
    }

    /// Blocks any batch containing `gated` until notified.
    struct GatedFetcher {
        inner: StaticTypeFetcher,
        gate: Arc<Notify>,
        gated: String,
    }

    #[async_trait]
    impl TypeFetcher for GatedFetcher {
        async fn fetch_types(&self, names: &[String]) -> HashMap<String, IntrospectionType> {
            if names.iter().any(|name| name == &self.gated) {
                self.gate.notified().await;
            }
            self.inner.fetch_types(names).await
        }
    }

    #[test]
    fn test_token_superseded_by_newer_generation() {
        let session = session(Arc::new(StaticTypeFetcher::default()));
        let first = session.begin();
        assert!(first.is_current());
        let second = session.begin();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(matches!(
            first.ensure_current(),
            Err(TypegraphError::Superseded { generation: 1 })
        ));
    }

    #[test]
    fn test_request_builders_and_debug() {
        let request = GraphRequest::new(["DeviceType"], 3)
            .with_type_filter(TypeFilter::allow_only(["RackType"]))
            .with_primary_model_checker(PrimaryModelChecker::from_names(["DeviceType"]));
        assert_eq!(request.roots, vec!["DeviceType"]);
        assert!(request.type_filter.is_some());

        let debug = format!("{:?}", request);
        assert!(debug.contains("max_depth: 3"));
        assert!(debug.contains("PrimaryModelChecker"));
    }

    #[test]
    fn test_detached_token_is_always_current() {
        let token = BuildToken::detached();
        assert!(token.is_current());
        assert!(token.ensure_current().is_ok());
    }

    #[tokio::test]
    async fn test_rebuild_publishes_latest() {
        let session = session(Arc::new(StaticTypeFetcher::new(device_types())));
        assert!(session.latest().is_none());

        let build = session
            .rebuild(GraphRequest::new(["DeviceType"], 2))
            .await
            .unwrap();

        assert_eq!(build.nodes.len(), 3);
        assert_eq!(build.edges.len(), 2);
        let latest = session.latest().unwrap();
        assert!(Arc::ptr_eq(&latest, &build));
        assert_eq!(session.cache().len(), 3);
    }

    #[tokio::test]
    async fn test_request_checker_overrides_base() {
        let session = session(Arc::new(StaticTypeFetcher::new(device_types())));
        let request = GraphRequest::new(["DeviceType"], 2)
            .with_primary_model_checker(PrimaryModelChecker::new(|_| false));

        let build = session.rebuild(request).await.unwrap();

        assert!(build.edges.is_empty());
        assert_eq!(build.stats.edges_skipped_non_primary, 2);
    }

    #[tokio::test]
    async fn test_stale_build_is_superseded_and_not_published() {
        let gate = Arc::new(Notify::new());
        let fetcher = GatedFetcher {
            inner: StaticTypeFetcher::new(device_types()),
            gate: Arc::clone(&gate),
            gated: "DeviceType".to_string(),
        };
        let session = session(Arc::new(fetcher));

        let (stale, fresh) = tokio::join!(
            session.rebuild(GraphRequest::new(["DeviceType"], 2)),
            async {
                let result = session
                    .rebuild(GraphRequest::new(["ManufacturerType"], 1))
                    .await;
                gate.notify_one();
                result
            }
        );

        assert!(matches!(stale, Err(TypegraphError::Superseded { generation: 1 })));
        let fresh = fresh.unwrap();
        assert_eq!(fresh.nodes[0].typename, "ManufacturerType");

        let latest = session.latest().unwrap();
        assert!(Arc::ptr_eq(&latest, &fresh));
        // The stale batch was discarded before reaching the cache
        assert!(!session.cache().contains("DeviceType"));
    }

    #[tokio::test]
    async fn test_fk_lookup_follows_discovered_types() {
        let session = session(Arc::new(StaticTypeFetcher::new(device_types())));
        session.set_foreign_keys(vec![PgForeignKey::new(
            "dcim_device",
            "manufacturer_id",
            "dcim_manufacturer",
            "id",
        )]);

        // The cache is empty when the build starts, so only the refreshed
        // lookup can map dcim_device
        let build = session
            .rebuild(GraphRequest::new(["DeviceType"], 2))
            .await
            .unwrap();

        let manufacturer = build.edges.iter().find(|e| e.field_name == "manufacturer").unwrap();
        assert!(manufacturer.is_foreign_key());
        assert_eq!(session.fk_stats().unwrap().entries, 1);
        assert!(session.fk_lookup().unwrap().get("DeviceType", "manufacturer").is_some());
    }

    #[tokio::test]
    async fn test_model_names_drive_mapping() {
        let session = session(Arc::new(StaticTypeFetcher::default()));
        session.set_foreign_keys(vec![PgForeignKey::new(
            "dcim_rack",
            "location_id",
            "dcim_location",
            "id",
        )]);
        session.set_model_names(vec!["dcim.rack".to_string(), "dcim.location".to_string()]);

        let lookup = session.refresh_fk_lookup().unwrap();
        assert!(lookup.get("RackType", "location").is_some());

        // Unchanged inputs reuse the same lookup
        let again = session.refresh_fk_lookup().unwrap();
        assert!(Arc::ptr_eq(&lookup, &again));
    }

    #[tokio::test]
    async fn test_reset_clears_cache_lookup_and_latest() {
        let session = session(Arc::new(StaticTypeFetcher::new(device_types())));
        session.set_foreign_keys(vec![PgForeignKey::new(
            "dcim_device",
            "manufacturer_id",
            "dcim_manufacturer",
            "id",
        )]);
        session
            .rebuild(GraphRequest::new(["DeviceType"], 2))
            .await
            .unwrap();
        let before = session.generation();

        session.reset();

        assert!(session.cache().is_empty());
        assert!(session.latest().is_none());
        assert!(session.fk_lookup().is_none());
        assert!(session.generation() > before);

        // Rows survive a reset
        let rebuilt = session
            .rebuild(GraphRequest::new(["DeviceType"], 2))
            .await
            .unwrap();
        assert!(rebuilt.edges.iter().any(|e| e.is_foreign_key()));
    }
}
