use crate::features::FeatureRecord;
use crate::pipeline::NodeSpec;

/// Lookup of packaged features by content hash or by name.
pub trait FeatureCatalog: Send + Sync {
    fn by_hash(&self, hash: &str) -> Option<FeatureRecord>;

    /// Latest published version for `name`
    fn by_name(&self, name: &str) -> Option<FeatureRecord>;

    /// Resolve a node's reference: by hash when given, else by name.
    fn resolve(&self, node: &NodeSpec) -> Option<FeatureRecord> {
        match (&node.feature_hash, &node.feature_name) {
            (Some(hash), _) if !hash.is_empty() => self.by_hash(hash),
            (_, Some(name)) if !name.is_empty() => self.by_name(name),
            _ => None,
        }
    }
}
