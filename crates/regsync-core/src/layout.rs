//! Registry key layout inside the object store.
//!
//! The key shapes below are shared with every other tool that reads or
//! writes the registry's backing store; they must be preserved exactly for
//! existing mirrors to interoperate.

/// Key of the repository's image index document.
#[must_use]
pub fn image_index_key(image: &str) -> String {
    format!("registry/repositories/{image}/_index_images")
}

/// Key of the tag pointer holding the resolved image id.
#[must_use]
pub fn tag_key(image: &str, tag: &str) -> String {
    format!("registry/repositories/{image}/tag_{tag}")
}

/// Key of the tag's JSON alias document.
#[must_use]
pub fn tag_json_key(image: &str, tag: &str) -> String {
    format!("registry/repositories/{image}/tag{tag}_json")
}

/// Prefix under which all of a repository's metadata lives.
#[must_use]
pub fn repository_prefix(image: &str) -> String {
    format!("registry/repositories/{image}/")
}

/// Key of an image's ancestry document (ordered layer ids, self included).
#[must_use]
pub fn ancestry_key(image_id: &str) -> String {
    format!("registry/images/{image_id}/ancestry")
}

/// Prefix under which all of an image's objects live.
#[must_use]
pub fn image_prefix(image_id: &str) -> String {
    format!("registry/images/{image_id}/")
}
