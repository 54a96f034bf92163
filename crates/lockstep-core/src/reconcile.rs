//! Dependency reconciliation
//!
//! Walks the dependency graph from a release group or package and builds a
//! [`ReferenceVersionBag`] telling which identities still track their local
//! version and which are pinned to published releases.
//!
//! The walk runs in two phases. The local phase visits repository packages
//! sequentially and applies the private, same-group and local-satisfies rules.
//! Edges the local tree cannot satisfy become resolve requests, which the
//! registry phase answers concurrently in rounds. Each round folds its
//! answers into the bag in request order, fetches the manifests of newly seen
//! published versions and turns their edges into the next round's requests,
//! until a round produces nothing new.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument};

use crate::bag::ReferenceVersionBag;
use crate::collab::Registry;
use crate::config::Config;
use crate::error::{LockstepError, RegistryError, Result, WorkflowError};
use crate::monorepo::{Context, Identity, MonoRepoKind, Package};
use crate::range::satisfies_prerelease_tolerant;

/// Options for [`collect_version_info`]
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Package groups skipped by the walk
    pub excluded_groups: Vec<String>,
    /// Concurrent registry requests
    pub concurrency: usize,
    /// Timeout for each registry request
    pub timeout: Duration,
}

impl ReconcileOptions {
    /// Options taken from configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            excluded_groups: config.versioning.excluded_groups.clone(),
            concurrency: config.registry.concurrency,
            timeout: config.registry.timeout(),
        }
    }

    fn is_excluded(&self, package: &Package) -> bool {
        let group = package.group.as_deref();
        let release_group = package.release_group.as_ref().map(MonoRepoKind::as_str);
        self.excluded_groups
            .iter()
            .any(|g| Some(g.as_str()) == group || Some(g.as_str()) == release_group)
    }
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// An edge that has to be answered by the registry
#[derive(Debug, Clone)]
struct ResolveRequest {
    name: String,
    range: String,
    dev: bool,
    referrer: String,
}

impl ResolveRequest {
    fn key(&self) -> String {
        format!("{}@{}", self.name, self.range)
    }
}

/// Reconcile the dependency graph reachable from `target`
#[instrument(skip_all, fields(target = %target))]
pub async fn collect_version_info(
    ctx: &Context,
    target: &Identity,
    registry: Arc<dyn Registry>,
    options: &ReconcileOptions,
) -> Result<ReferenceVersionBag> {
    let seeds = ctx.members(target);
    if seeds.is_empty() {
        return Err(WorkflowError::UnknownTarget(target.to_string()).into());
    }

    let mut bag = ReferenceVersionBag::new(ctx.collect_versions()?);
    let mut walk = LocalWalk::default();
    for pkg in seeds {
        bag.add(
            pkg.identity(),
            &pkg.version,
            format!("{}@local", pkg.name),
            false,
            false,
        )?;
        walk.push(pkg);
    }

    let requests = walk.run(ctx, &mut bag, options)?;
    resolve_published(ctx, &mut bag, requests, registry, options).await?;

    info!(entries = bag.len(), "reconciled dependency versions");
    Ok(bag)
}

#[derive(Default)]
struct LocalWalk<'a> {
    stack: Vec<&'a Package>,
    visited: HashSet<&'a str>,
}

impl<'a> LocalWalk<'a> {
    fn push(&mut self, pkg: &'a Package) {
        if self.visited.insert(pkg.name.as_str()) {
            self.stack.push(pkg);
        }
    }

    fn run(
        mut self,
        ctx: &'a Context,
        bag: &mut ReferenceVersionBag,
        options: &ReconcileOptions,
    ) -> Result<Vec<ResolveRequest>> {
        let mut requests = Vec::new();

        while let Some(pkg) = self.stack.pop() {
            debug!(package = %pkg.name, "walking local dependencies");
            for dep in &pkg.dependencies {
                let Some(dep_pkg) = ctx.package(&dep.name) else {
                    continue;
                };
                if options.is_excluded(dep_pkg) {
                    continue;
                }

                let same_group = pkg.same_release_group(dep_pkg);

                if dep_pkg.private && !same_group {
                    if dep.dev {
                        continue;
                    }
                    return Err(WorkflowError::PrivateDependency {
                        package: pkg.name.clone(),
                        dependency: dep.name.clone(),
                    }
                    .into());
                }

                if same_group {
                    if dep.range != format!("^{}", dep_pkg.version) {
                        return Err(WorkflowError::ReleaseGroupRangeMismatch {
                            group: dep_pkg
                                .release_group
                                .as_ref()
                                .map(ToString::to_string)
                                .unwrap_or_default(),
                            package: pkg.name.clone(),
                            dependency: dep.name.clone(),
                            range: dep.range.clone(),
                            expected: dep_pkg.version.clone(),
                        }
                        .into());
                    }
                    continue;
                }

                if satisfies_prerelease_tolerant(&dep_pkg.version, &dep.range)? {
                    bag.add(
                        dep_pkg.identity(),
                        &dep_pkg.version,
                        format!("{} -> {}@{}", pkg.name, dep.name, dep.range),
                        dep.dev,
                        false,
                    )?;
                    for member in ctx.members(&dep_pkg.identity()) {
                        self.push(member);
                    }
                } else {
                    requests.push(ResolveRequest {
                        name: dep.name.clone(),
                        range: dep.range.clone(),
                        dev: dep.dev,
                        referrer: pkg.name.clone(),
                    });
                }
            }
        }

        debug!(requests = requests.len(), "local walk finished");
        Ok(requests)
    }
}

async fn resolve_published(
    ctx: &Context,
    bag: &mut ReferenceVersionBag,
    mut requests: Vec<ResolveRequest>,
    registry: Arc<dyn Registry>,
    options: &ReconcileOptions,
) -> Result<()> {
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut resolved: HashMap<String, Option<String>> = HashMap::new();
    let mut round = 0usize;

    while !requests.is_empty() {
        round += 1;

        let mut lookups = Vec::new();
        for request in &requests {
            if bag.mark_published_range(&request.name, &request.range) {
                lookups.push((request.name.clone(), request.range.clone()));
            }
        }
        debug!(round, requests = requests.len(), lookups = lookups.len(), "registry round");

        let mut handles = Vec::with_capacity(lookups.len());
        for (name, range) in lookups {
            handles.push((
                format!("{}@{}", name, range),
                tokio::spawn(resolve_one(
                    Arc::clone(&registry),
                    Arc::clone(&semaphore),
                    name,
                    range,
                    options.timeout,
                )),
            ));
        }
        for (key, handle) in handles {
            resolved.insert(key, join(handle).await?);
        }

        let mut manifests = Vec::new();
        for request in &requests {
            let Some(dep_pkg) = ctx.package(&request.name) else {
                continue;
            };
            let version = resolved
                .get(&request.key())
                .cloned()
                .flatten()
                .ok_or_else(|| RegistryError::NoMatchingVersion {
                    name: request.name.clone(),
                    range: request.range.clone(),
                    referrer: request.referrer.clone(),
                })?;

            bag.add(
                dep_pkg.identity(),
                &version,
                format!("{} -> {}@{}", request.referrer, request.name, request.range),
                request.dev,
                true,
            )?;

            if bag.mark_published_package(&request.name, &version) {
                manifests.push((dep_pkg, version));
            }
        }

        let mut handles = Vec::with_capacity(manifests.len() * 2);
        for (dep_pkg, version) in &manifests {
            for dev in [false, true] {
                handles.push((
                    *dep_pkg,
                    version.clone(),
                    dev,
                    tokio::spawn(fetch_dependencies(
                        Arc::clone(&registry),
                        Arc::clone(&semaphore),
                        dep_pkg.name.clone(),
                        version.clone(),
                        dev,
                        options.timeout,
                    )),
                ));
            }
        }

        let mut next = Vec::new();
        for (published, version, dev, handle) in handles {
            let deps = join(handle).await?;
            for (name, range) in deps {
                let Some(dep_pkg) = ctx.package(&name) else {
                    continue;
                };
                if options.is_excluded(dep_pkg) || dep_pkg.private {
                    continue;
                }
                if published.same_release_group(dep_pkg) {
                    continue;
                }
                next.push(ResolveRequest {
                    name,
                    range,
                    dev,
                    referrer: format!("{}@{}", published.name, version),
                });
            }
        }

        requests = next;
    }

    Ok(())
}

async fn join<T>(handle: tokio::task::JoinHandle<Result<T>>) -> Result<T> {
    handle
        .await
        .map_err(|e| LockstepError::other(format!("Registry task failed: {}", e)))?
}

async fn resolve_one(
    registry: Arc<dyn Registry>,
    semaphore: Arc<Semaphore>,
    name: String,
    range: String,
    timeout: Duration,
) -> Result<Option<String>> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| LockstepError::other(e.to_string()))?;
    let spec = format!("{}@{}", name, range);
    debug!(spec = %spec, "resolving published version");

    match tokio::time::timeout(timeout, registry.resolve_version(&name, &range)).await {
        Ok(result) => result,
        Err(_) => Err(RegistryError::Timeout { spec, timeout }.into()),
    }
}

async fn fetch_dependencies(
    registry: Arc<dyn Registry>,
    semaphore: Arc<Semaphore>,
    name: String,
    version: String,
    dev: bool,
    timeout: Duration,
) -> Result<BTreeMap<String, String>> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| LockstepError::other(e.to_string()))?;
    let spec = format!("{}@{}", name, version);
    debug!(spec = %spec, dev, "fetching published dependencies");

    match tokio::time::timeout(
        timeout,
        registry.manifest_dependencies(&name, &version, dev),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(RegistryError::Timeout { spec, timeout }.into()),
    }
}
