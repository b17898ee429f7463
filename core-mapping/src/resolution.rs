//! Reconciliation shared by the local and workspace resolvers.
//!
//! Given seeded sources, the manifests found next to them and the declared
//! configuration entries:
//! 1. attach every manifest to the source with the same base name, failing on
//!    orphans;
//! 2. clone each source once per configuration entry that names it;
//! 3. report configuration entries that named no source.

use async_trait::async_trait;
use bridge_traits::PhysicalItem;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::configuration::MappingConfiguration;
use crate::error::{MappingError, Result};
use crate::source::MappingSource;

/// Groups multi-part physical sources into single logical sources
#[async_trait]
pub trait SourceSlicer: Send + Sync {
    async fn slice(&self, sources: Vec<MappingSource>) -> Result<Vec<MappingSource>>;
}

/// Outcome of a successful resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSources {
    pub sources: Vec<MappingSource>,
    /// Configured source names with no physical counterpart, tolerated
    /// because the job run being processed had failed
    pub skipped_missing: Vec<String>,
}

impl ResolvedSources {
    pub fn into_sources(self) -> Vec<MappingSource> {
        self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

pub(crate) fn reconcile(
    seeds: Vec<MappingSource>,
    manifests: Vec<PhysicalItem>,
    configurations: &[MappingConfiguration],
    is_failed_job_run: bool,
) -> Result<ResolvedSources> {
    let mut sources: Vec<MappingSource> = Vec::with_capacity(seeds.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(seeds.len());

    for seed in seeds {
        let name = seed.source_name().to_string();
        if index.contains_key(&name) {
            warn!(source = %name, "Duplicate source name, keeping the first item");
            continue;
        }
        index.insert(name, sources.len());
        sources.push(seed);
    }

    for manifest in manifests {
        match index.get(manifest.source_name()) {
            Some(&position) => {
                debug!(manifest = %manifest.name, "Attached manifest");
                sources[position].set_manifest(manifest);
            }
            None => {
                return Err(MappingError::OrphanedManifest {
                    manifest: manifest.name,
                });
            }
        }
    }

    let mut by_source: HashMap<&str, Vec<&MappingConfiguration>> = HashMap::new();
    for configuration in configurations {
        by_source
            .entry(configuration.source_name())
            .or_default()
            .push(configuration);
    }

    let mut resolved = Vec::with_capacity(sources.len().max(configurations.len()));
    for source in sources {
        match by_source.get(source.source_name()) {
            Some(matching) => {
                for configuration in matching {
                    let mut clone = source.clone();
                    clone.set_mapping((*configuration).clone());
                    resolved.push(clone);
                }
            }
            None => resolved.push(source),
        }
    }

    let mut seen = HashSet::new();
    let missing: Vec<String> = configurations
        .iter()
        .map(|c| c.source_name())
        .filter(|name| !index.contains_key(*name))
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect();

    if !missing.is_empty() {
        if !is_failed_job_run {
            return Err(MappingError::MissingMappedSource { sources: missing });
        }
        warn!(
            sources = ?missing,
            "Mapped sources not found; tolerated because the job run failed"
        );
    }

    Ok(ResolvedSources {
        sources: resolved,
        skipped_missing: missing,
    })
}

pub(crate) async fn apply_slicing(
    mut resolved: ResolvedSources,
    slicer: Option<&dyn SourceSlicer>,
    use_slicing: bool,
) -> Result<ResolvedSources> {
    if !use_slicing {
        return Ok(resolved);
    }

    let slicer = slicer.ok_or(MappingError::SlicerUnavailable)?;
    resolved.sources = slicer.slice(resolved.sources).await?;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceItem;

    fn seed(name: &str) -> MappingSource {
        MappingSource::new(SourceItem::Physical(PhysicalItem::new(name, "out/tables")))
    }

    fn manifest(name: &str) -> PhysicalItem {
        PhysicalItem::new(format!("{}.manifest", name), "out/tables")
    }

    #[test]
    fn test_attaches_manifests_and_keeps_default_mapped() {
        let resolved = reconcile(
            vec![seed("a.csv"), seed("b.csv")],
            vec![manifest("b.csv")],
            &[],
            false,
        )
        .unwrap();

        assert_eq!(resolved.len(), 2);
        assert!(resolved.sources[0].manifest().is_none());
        assert_eq!(
            resolved.sources[1].manifest().map(|m| m.name.as_str()),
            Some("b.csv.manifest")
        );
        assert!(resolved.sources.iter().all(|s| s.configuration().is_none()));
    }

    #[test]
    fn test_orphaned_manifest_is_fatal_even_on_failed_run() {
        for is_failed in [false, true] {
            let err = reconcile(vec![seed("a.csv")], vec![manifest("c.csv")], &[], is_failed)
                .unwrap_err();
            assert!(
                matches!(err, MappingError::OrphanedManifest { ref manifest } if manifest == "c.csv.manifest")
            );
        }
    }

    #[test]
    fn test_duplicate_seed_names_keep_first() {
        let resolved = reconcile(vec![seed("a"), seed("a/")], vec![], &[], false).unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn test_missing_names_are_deduplicated() {
        let configurations = vec![
            MappingConfiguration::new("x.csv"),
            MappingConfiguration::new("x.csv"),
            MappingConfiguration::new("y.csv"),
        ];
        let err = reconcile(vec![], vec![], &configurations, false).unwrap_err();
        match err {
            MappingError::MissingMappedSource { sources } => {
                assert_eq!(sources, vec!["x.csv".to_string(), "y.csv".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_slicing_without_slicer() {
        let resolved = ResolvedSources::default();
        let err = apply_slicing(resolved.clone(), None, true).await.unwrap_err();
        assert!(matches!(err, MappingError::SlicerUnavailable));

        let untouched = apply_slicing(resolved, None, false).await.unwrap();
        assert!(untouched.is_empty());
    }
}
