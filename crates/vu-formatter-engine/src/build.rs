use std::collections::HashSet;

use crate::document::AttributeSet;

pub const DEFAULT_VERSION_PREFIX: &str = "vk_version_";
pub const DEFAULT_EXTENSION_PREFIX: &str = "vk_";

/// Decides which document attribute names denote versions and extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeClassifier {
    pub version_prefix: String,
    pub extension_prefix: String,
}

impl Default for AttributeClassifier {
    fn default() -> Self {
        Self {
            version_prefix: DEFAULT_VERSION_PREFIX.to_string(),
            extension_prefix: DEFAULT_EXTENSION_PREFIX.to_string(),
        }
    }
}

impl AttributeClassifier {
    pub fn is_version(&self, name: &str) -> bool {
        name.starts_with(&self.version_prefix)
    }

    pub fn is_extension(&self, name: &str) -> bool {
        name.starts_with(&self.extension_prefix) && !self.is_version(name)
    }
}

/// The versions and extensions a document is being built with.
///
/// Derived once from the document attributes before the walk starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildConfiguration {
    pub versions: Vec<String>,
    pub extensions: Vec<String>,
    /// Every attribute name defined by the document header. These are never
    /// sent along with individual statements.
    pub baseline: HashSet<String>,
}

impl BuildConfiguration {
    pub fn resolve(attributes: &AttributeSet, classifier: &AttributeClassifier) -> Self {
        let versions = attributes
            .names()
            .filter(|n| classifier.is_version(n))
            .map(str::to_string)
            .collect();
        let extensions = attributes
            .names()
            .filter(|n| classifier.is_extension(n))
            .map(str::to_string)
            .collect();
        let baseline = attributes.names().map(str::to_string).collect();

        Self {
            versions,
            extensions,
            baseline,
        }
    }
}
