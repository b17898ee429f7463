//! Pairwise join of data items, configuration entries and manifests.
//!
//! Unlike the resolvers the combiner never fails: unmatched configuration
//! entries are dropped and unmatched manifests become synthesized sources.
//! Orphan and missing-source checks belong to whoever validates the combined
//! result.

use bridge_traits::PhysicalItem;

use crate::configuration::MappingConfiguration;
use crate::source::{MappingSource, SourceItem, WorkspaceItem};

/// A data item paired with at most one configuration entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedItem {
    pub item: PhysicalItem,
    pub configuration: Option<MappingConfiguration>,
}

pub struct MappingCombiner {
    workspace_id: String,
}

impl MappingCombiner {
    /// `workspace_id` owns the sources synthesized from unclaimed manifests
    pub fn new(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
        }
    }

    /// Pair every data item with every configuration entry sharing its name
    ///
    /// Items without a matching entry are kept with no configuration.
    pub fn combine_data_items_with_configurations(
        &self,
        data_items: &[PhysicalItem],
        configurations: &[MappingConfiguration],
    ) -> Vec<CombinedItem> {
        let mut combined = Vec::with_capacity(data_items.len());

        for item in data_items {
            let mut matched = false;
            for configuration in configurations
                .iter()
                .filter(|c| c.source_name() == item.source_name())
            {
                matched = true;
                combined.push(CombinedItem {
                    item: item.clone(),
                    configuration: Some(configuration.clone()),
                });
            }

            if !matched {
                combined.push(CombinedItem {
                    item: item.clone(),
                    configuration: None,
                });
            }
        }

        combined
    }

    /// Attach manifests to combined items by base name
    ///
    /// Every manifest no item claims is turned into a synthesized workspace
    /// source so it is never silently dropped.
    pub fn combine_sources_with_manifests(
        &self,
        sources: Vec<CombinedItem>,
        manifests: &[PhysicalItem],
    ) -> Vec<MappingSource> {
        let mut claimed = vec![false; manifests.len()];
        let mut combined = Vec::with_capacity(sources.len());

        for CombinedItem {
            item,
            configuration,
        } in sources
        {
            let manifest = manifests
                .iter()
                .position(|m| m.source_name() == item.source_name());

            let mut source = MappingSource::new(SourceItem::Physical(item));
            if let Some(position) = manifest {
                claimed[position] = true;
                source.set_manifest(manifests[position].clone());
            }
            if let Some(configuration) = configuration {
                source.set_mapping(configuration);
            }
            combined.push(source);
        }

        for (manifest, _) in manifests
            .iter()
            .zip(claimed)
            .filter(|(_, claimed)| !claimed)
        {
            let item = WorkspaceItem::new(manifest.source_name(), self.workspace_id.clone());
            combined.push(
                MappingSource::new(SourceItem::Workspace(item)).with_manifest(manifest.clone()),
            );
        }

        combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> PhysicalItem {
        PhysicalItem::new(name, "tables")
    }

    #[test]
    fn test_cross_product_on_duplicate_names() {
        let combiner = MappingCombiner::new("ws-1");
        let configurations = vec![
            MappingConfiguration::new("orders").with_destination("out.c-a.orders"),
            MappingConfiguration::new("orders").with_destination("out.c-b.orders"),
            MappingConfiguration::new("unknown"),
        ];

        let combined = combiner
            .combine_data_items_with_configurations(&[item("orders"), item("events")], &configurations);

        assert_eq!(combined.len(), 3);
        assert_eq!(
            combined[0].configuration.as_ref().and_then(|c| c.destination.as_deref()),
            Some("out.c-a.orders")
        );
        assert_eq!(
            combined[1].configuration.as_ref().and_then(|c| c.destination.as_deref()),
            Some("out.c-b.orders")
        );
        assert_eq!(combined[2].item.name, "events");
        assert!(combined[2].configuration.is_none());
    }

    #[test]
    fn test_unclaimed_manifest_becomes_source() {
        let combiner = MappingCombiner::new("ws-1");
        let pairs = combiner.combine_data_items_with_configurations(&[item("orders")], &[]);
        let manifests = vec![item("orders.manifest"), item("ghost.manifest")];

        let sources = combiner.combine_sources_with_manifests(pairs, &manifests);

        assert_eq!(sources.len(), 2);
        assert_eq!(
            sources[0].manifest().map(|m| m.name.as_str()),
            Some("orders.manifest")
        );
        assert!(matches!(sources[0].source(), SourceItem::Physical(_)));

        match sources[1].source() {
            SourceItem::Workspace(ws) => {
                assert_eq!(ws.name, "ghost");
                assert_eq!(ws.workspace_id, "ws-1");
            }
            other => panic!("expected synthesized source, got {:?}", other),
        }
        assert!(sources[1].configuration().is_none());
    }

    #[test]
    fn test_manifest_shared_by_cloned_pairs() {
        let combiner = MappingCombiner::new("ws-1");
        let configurations = vec![
            MappingConfiguration::new("orders"),
            MappingConfiguration::new("orders/"),
        ];
        let pairs =
            combiner.combine_data_items_with_configurations(&[item("orders")], &configurations);
        let sources = combiner.combine_sources_with_manifests(pairs, &[item("orders.manifest")]);

        assert_eq!(sources.len(), 2);
        assert!(sources.iter().all(|s| s.manifest().is_some()));
    }
}
