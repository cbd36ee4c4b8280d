//! Request classification.
//!
//! Every intercepted read is sorted into one traffic class, which fixes both
//! the caching strategy and the partition used for it. Classification only
//! looks at the request itself, never at stored state.

use crate::network::{Destination, Request};
use crate::strategy::Strategy;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg"];
const STATIC_EXTENSIONS: &[&str] = &["js", "css", "woff", "woff2", "ttf", "eot"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    Api,
    Image,
    StaticAsset,
    Navigation,
}

impl RequestClass {
    /// The fixed strategy for each class. API data and pages prefer
    /// freshness; images and bundles are immutable by filename.
    pub fn strategy(self) -> Strategy {
        match self {
            RequestClass::Api | RequestClass::Navigation => Strategy::NetworkFirst,
            RequestClass::Image | RequestClass::StaticAsset => Strategy::CacheFirst,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestClass::Api => "api",
            RequestClass::Image => "image",
            RequestClass::StaticAsset => "static",
            RequestClass::Navigation => "navigation",
        }
    }
}

/// Classify a request. Checks run in order: API path prefix, image, static
/// asset, and everything else is a navigation.
pub fn classify(request: &Request, api_prefix: &str) -> RequestClass {
    let path = request.url.path();

    if path.starts_with(api_prefix) {
        RequestClass::Api
    } else if is_image(request) {
        RequestClass::Image
    } else if is_static_asset(request) {
        RequestClass::StaticAsset
    } else {
        RequestClass::Navigation
    }
}

fn is_image(request: &Request) -> bool {
    request.destination == Destination::Image
        || has_extension(request.url.path(), IMAGE_EXTENSIONS)
}

fn is_static_asset(request: &Request) -> bool {
    matches!(request.destination, Destination::Script | Destination::Style)
        || has_extension(request.url.path(), STATIC_EXTENSIONS)
}

/// Case-insensitive match on the extension of the last path segment.
fn has_extension(path: &str, extensions: &[&str]) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((_, ext)) => extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)),
        None => false,
    }
}
