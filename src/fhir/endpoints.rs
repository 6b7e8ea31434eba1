//! Backend URL construction.

use url::Url;

use crate::config::BackendConfig;
use crate::fhir::client::BackendError;
use crate::fhir::model::{Bundle, ResourceKey};

/// Where a bundle is POSTed: the root for transaction/batch, the bundle
/// sub-path otherwise.
pub fn bundle_endpoint(config: &BackendConfig, bundle: &Bundle) -> Result<Url, BackendError> {
    let base = parse_base(&config.base_url)?;
    if bundle.posts_to_root() {
        return Ok(base);
    }
    let segments = config.bundle_path.split('/').filter(|s| !s.is_empty());
    append(base, segments)
}

/// `{base}/{resourceType}/{id}`, each segment percent-encoded.
pub fn resource_endpoint(config: &BackendConfig, key: &ResourceKey) -> Result<Url, BackendError> {
    let base = parse_base(&config.base_url)?;
    append(base, [key.resource_type.as_str(), key.id.as_str()])
}

fn parse_base(base_url: &str) -> Result<Url, BackendError> {
    Url::parse(base_url)
        .map_err(|e| BackendError::InvalidTarget(format!("{}: {}", base_url, e)))
}

fn append<'a, I>(mut url: Url, segments: I) -> Result<Url, BackendError>
where
    I: IntoIterator<Item = &'a str>,
{
    if url.cannot_be_a_base() {
        return Err(BackendError::InvalidTarget(format!("{} cannot be a base URL", url)));
    }
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    Ok(url)
}
