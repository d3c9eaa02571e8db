//! Merging of parsed documents into one canonical tree

use std::sync::Arc;

use settle_config::LimitsConfig;

use crate::error::{MergeError, MergeResult, ResourceLimit};
use crate::node::{Mapping, Node, Source};

/// Identifier of the strategy used when none is requested
pub const DEFAULT_STRATEGY: &str = "default";

/// Identifier of the strategy rejecting overlapping leaves
pub const ERROR_ON_CONFLICT_STRATEGY: &str = "errorOnConflict";

/// Guards applied to the documents of one cycle before merging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    pub max_aliases: usize,
    pub code_point_limit: usize,
}

impl ResourceLimits {
    /// Fail when `actual` is over the bound for `limit`
    pub fn check(&self, limit: ResourceLimit, actual: usize) -> MergeResult<()> {
        let max = match limit {
            ResourceLimit::Aliases => self.max_aliases,
            ResourceLimit::CodePoints => self.code_point_limit,
        };
        if actual > max {
            return Err(MergeError::ResourceLimitExceeded { limit, actual, max });
        }
        Ok(())
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::from(&LimitsConfig::default())
    }
}

impl From<&LimitsConfig> for ResourceLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            max_aliases: config.max_aliases,
            code_point_limit: config.code_point_limit(),
        }
    }
}

/// One parsed document with the counts the resource guards need
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub source: Source,
    pub root: Node,
    pub aliases: usize,
    pub code_points: usize,
}

impl RawDocument {
    pub fn new(source: Source, root: impl Into<Node>) -> Self {
        Self {
            source,
            root: root.into(),
            aliases: 0,
            code_points: 0,
        }
    }

    pub fn with_counts(mut self, aliases: usize, code_points: usize) -> Self {
        self.aliases = aliases;
        self.code_points = code_points;
        self
    }
}

/// How a later document combines with what was merged so far
pub trait MergeStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn merge(&self, target: &mut Mapping, incoming: Mapping, origin: &Source) -> MergeResult<()>;
}

/// Mappings merge key by key; anything else is replaced by the later document
#[derive(Debug, Default)]
pub struct DefaultMergeStrategy;

impl MergeStrategy for DefaultMergeStrategy {
    fn name(&self) -> &str {
        DEFAULT_STRATEGY
    }

    fn merge(&self, target: &mut Mapping, incoming: Mapping, origin: &Source) -> MergeResult<()> {
        merge_mappings(target, incoming, "", origin, false)
    }
}

/// Like [`DefaultMergeStrategy`], but a leaf defined twice is an error
#[derive(Debug, Default)]
pub struct ErrorOnConflictMergeStrategy;

impl MergeStrategy for ErrorOnConflictMergeStrategy {
    fn name(&self) -> &str {
        ERROR_ON_CONFLICT_STRATEGY
    }

    fn merge(&self, target: &mut Mapping, incoming: Mapping, origin: &Source) -> MergeResult<()> {
        merge_mappings(target, incoming, "", origin, true)
    }
}

fn merge_mappings(
    target: &mut Mapping,
    incoming: Mapping,
    path: &str,
    origin: &Source,
    reject_conflicts: bool,
) -> MergeResult<()> {
    for (key, value) in incoming {
        let key_path = if path.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", path, key)
        };

        if let Some(existing) = target.get_mut(&key) {
            match (existing, value) {
                (Node::Mapping(existing), Node::Mapping(nested)) => {
                    merge_mappings(existing, nested, &key_path, origin, reject_conflicts)?;
                }
                (existing, value) => {
                    if reject_conflicts {
                        return Err(MergeError::Conflict {
                            path: key_path,
                            first: existing
                                .source()
                                .map(|source| source.origin.clone())
                                .unwrap_or_else(|| "<unknown>".to_string()),
                            second: origin.origin.clone(),
                        });
                    }
                    *existing = value;
                }
            }
            continue;
        }
        target.insert(key, value);
    }
    Ok(())
}

/// Merges documents under a named strategy
pub struct Merger {
    limits: ResourceLimits,
    strategies: Vec<Arc<dyn MergeStrategy>>,
}

impl Merger {
    /// Merger with the built-in strategies
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            strategies: vec![
                Arc::new(DefaultMergeStrategy),
                Arc::new(ErrorOnConflictMergeStrategy),
            ],
        }
    }

    /// Register an additional strategy; a later registration shadows an
    /// earlier one with the same name.
    pub fn with_strategy(mut self, strategy: Arc<dyn MergeStrategy>) -> Self {
        self.strategies.insert(0, strategy);
        self
    }

    pub fn limits(&self) -> ResourceLimits {
        self.limits
    }

    /// Strategy registered under `id`; blank or missing means `default`
    pub fn strategy(&self, id: Option<&str>) -> MergeResult<&Arc<dyn MergeStrategy>> {
        let id = match id.map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ => DEFAULT_STRATEGY,
        };
        self.strategies
            .iter()
            .find(|strategy| strategy.name() == id)
            .ok_or_else(|| MergeError::UnknownStrategy(id.to_string()))
    }

    /// Merge `documents` in order into one mapping
    pub fn merge(&self, documents: Vec<RawDocument>, strategy: Option<&str>) -> MergeResult<Mapping> {
        let strategy = self.strategy(strategy)?;
        self.check_limits(&documents)?;

        let mut merged = Mapping::new();
        for document in documents {
            let root = match document.root {
                Node::Mapping(mapping) => mapping,
                other => {
                    return Err(MergeError::NotAMapping {
                        origin: document.source.to_string(),
                        found: other.node_type(),
                    });
                }
            };
            strategy.merge(&mut merged, root, &document.source)?;
        }

        tracing::debug!(
            target: "merge",
            strategy = strategy.name(),
            keys = merged.len(),
            "Documents merged"
        );
        Ok(merged)
    }

    /// Totals across every document of the cycle; each document was
    /// already held to the same bounds when it was loaded
    fn check_limits(&self, documents: &[RawDocument]) -> MergeResult<()> {
        let aliases: usize = documents.iter().map(|d| d.aliases).sum();
        self.limits.check(ResourceLimit::Aliases, aliases)?;

        let code_points: usize = documents.iter().map(|d| d.code_points).sum();
        self.limits.check(ResourceLimit::CodePoints, code_points)
    }
}

impl Default for Merger {
    fn default() -> Self {
        Self::new(ResourceLimits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Scalar, Sequence};

    fn scalar(value: &str, origin: &str) -> Node {
        Node::Scalar(Scalar::new(value).with_source(Source::origin(origin)))
    }

    fn value_at<'a>(mapping: &'a Mapping, path: &[&str]) -> &'a str {
        let mut node = mapping.get(path[0]).unwrap();
        for key in &path[1..] {
            node = node.as_mapping().unwrap().get(key).unwrap();
        }
        node.as_scalar().unwrap().value()
    }

    fn documents() -> Vec<RawDocument> {
        let first = Mapping::new()
            .with(
                "server",
                Mapping::new()
                    .with("port", scalar("8080", "a.yaml"))
                    .with("host", scalar("localhost", "a.yaml")),
            )
            .with("tags", Sequence::new().with("a").with("b"));
        let second = Mapping::new()
            .with("server", Mapping::new().with("port", scalar("9090", "b.yaml")))
            .with("tags", Sequence::new().with("c"))
            .with("tool", Mapping::new().with("name", "git"));
        vec![
            RawDocument::new(Source::origin("a.yaml"), first),
            RawDocument::new(Source::origin("b.yaml"), second),
        ]
    }

    #[test]
    fn test_default_strategy_merges_recursively() {
        let merged = Merger::default().merge(documents(), None).unwrap();

        assert_eq!(value_at(&merged, &["server", "port"]), "9090");
        assert_eq!(value_at(&merged, &["server", "host"]), "localhost");
        assert_eq!(merged.get("tags").unwrap().as_sequence().unwrap().len(), 1);
        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["server", "tags", "tool"]);

        let port = merged.get("server").unwrap().as_mapping().unwrap().get("port").unwrap();
        assert_eq!(port.source(), Some(&Source::origin("b.yaml")));
    }

    #[test]
    fn test_merge_is_deterministic() {
        let merger = Merger::default();
        let first = merger.merge(documents(), Some("default")).unwrap();
        let second = merger.merge(documents(), Some("  ")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_error_on_conflict_names_path_and_sources() {
        let err = Merger::default()
            .merge(documents(), Some(ERROR_ON_CONFLICT_STRATEGY))
            .unwrap_err();
        match err {
            MergeError::Conflict { path, first, second } => {
                assert_eq!(path, "server.port");
                assert_eq!(first, "a.yaml");
                assert_eq!(second, "b.yaml");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_unknown_strategy() {
        let err = Merger::default().merge(Vec::new(), Some("smart")).unwrap_err();
        assert!(matches!(err, MergeError::UnknownStrategy(ref id) if id == "smart"));
    }

    #[test]
    fn test_non_mapping_root_rejected() {
        let documents = vec![RawDocument::new(Source::origin("list.yaml"), Sequence::new())];
        let err = Merger::default().merge(documents, None).unwrap_err();
        assert!(err.to_string().contains("list.yaml"));
    }

    #[test]
    fn test_alias_limit_counts_all_documents() {
        let limits = ResourceLimits {
            max_aliases: 3,
            code_point_limit: 1024,
        };
        let documents = vec![
            RawDocument::new(Source::origin("a.yaml"), Mapping::new()).with_counts(2, 10),
            RawDocument::new(Source::origin("b.yaml"), Mapping::new()).with_counts(2, 10),
        ];
        let err = Merger::new(limits).merge(documents, None).unwrap_err();
        assert!(matches!(
            err,
            MergeError::ResourceLimitExceeded {
                limit: ResourceLimit::Aliases,
                actual: 4,
                max: 3
            }
        ));
    }

    #[test]
    fn test_code_point_limit() {
        let limits = ResourceLimits {
            max_aliases: 50,
            code_point_limit: 15,
        };
        let documents = vec![
            RawDocument::new(Source::origin("a.yaml"), Mapping::new()).with_counts(0, 10),
            RawDocument::new(Source::origin("b.yaml"), Mapping::new()).with_counts(0, 10),
        ];
        let err = Merger::new(limits).merge(documents, None).unwrap_err();
        assert!(matches!(
            err,
            MergeError::ResourceLimitExceeded {
                limit: ResourceLimit::CodePoints,
                ..
            }
        ));
    }

    #[test]
    fn test_custom_strategy_registration() {
        struct KeepFirst;

        impl MergeStrategy for KeepFirst {
            fn name(&self) -> &str {
                "keepFirst"
            }

            fn merge(&self, target: &mut Mapping, incoming: Mapping, _: &Source) -> MergeResult<()> {
                for (key, value) in incoming {
                    if !target.contains_key(&key) {
                        target.insert(key, value);
                    }
                }
                Ok(())
            }
        }

        let merger = Merger::default().with_strategy(Arc::new(KeepFirst));
        let merged = merger.merge(documents(), Some("keepFirst")).unwrap();
        assert_eq!(value_at(&merged, &["server", "port"]), "8080");
        assert!(merged.contains_key("tool"));
    }
}
