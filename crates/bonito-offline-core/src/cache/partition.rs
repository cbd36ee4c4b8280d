use std::collections::HashSet;

use crate::classify::RequestClass;

/// The partition names of one cache version.
///
/// Names must stay stable within a version and change on every version bump:
/// activation keeps exactly `valid_set()` and deletes everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
    pub app: String,
    pub static_assets: String,
    pub api: String,
    pub images: String,
}

impl PartitionNames {
    pub fn new(product: &str, version: &str) -> Self {
        Self {
            app: format!("{}-v{}", product, version),
            static_assets: format!("{}-static-v{}", product, version),
            api: format!("{}-api-v{}", product, version),
            images: format!("{}-images-v{}", product, version),
        }
    }

    pub fn valid_set(&self) -> HashSet<String> {
        [&self.app, &self.static_assets, &self.api, &self.images]
            .into_iter()
            .cloned()
            .collect()
    }

    /// Partition that holds responses for a request class.
    /// Navigations share the static partition with the precached app shell.
    pub fn for_class(&self, class: RequestClass) -> &str {
        match class {
            RequestClass::Api => &self.api,
            RequestClass::Image => &self.images,
            RequestClass::StaticAsset | RequestClass::Navigation => &self.static_assets,
        }
    }

    /// Partitions searched when reading a request of `class`: its own
    /// partition first, then the rest of this version's partitions.
    /// Precached icons live in the static partition but classify as images.
    pub fn lookup_order(&self, class: RequestClass) -> Vec<&str> {
        let own = self.for_class(class);
        std::iter::once(own)
            .chain(
                [&self.static_assets, &self.images, &self.api, &self.app]
                    .into_iter()
                    .map(String::as_str)
                    .filter(|name| *name != own),
            )
            .collect()
    }
}
