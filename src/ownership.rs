/// Ownership guard
///
/// The single authorization check shared by every mutate/delete endpoint on
/// an owned resource: the identifier must be well formed, the resource must
/// exist, and its declared owner must equal the calling principal.
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

/// Anything that declares an owning principal
pub trait HasOwner {
    /// Owning principal id, if the resource carries one
    fn owner_id(&self) -> Option<&str>;
}

/// Kinds of owned resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Video,
    Playlist,
    Tweet,
    Comment,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Video => "Video",
            ResourceKind::Playlist => "Playlist",
            ResourceKind::Tweet => "Tweet",
            ResourceKind::Comment => "Comment",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An owned resource type; the kind travels with the type
pub trait Resource: HasOwner + Send + Sync + 'static {
    const KIND: ResourceKind;
}

/// Storage capability: load a resource of type `R` by id
#[async_trait]
pub trait ResourceLookup<R: Resource>: Send + Sync {
    async fn find_by_id(&self, id: &str) -> ApiResult<Option<R>>;
}

/// Check that `raw` is a well-formed identifier (canonical UUID text)
pub fn validate_identifier(raw: &str, what: &str) -> ApiResult<()> {
    Uuid::parse_str(raw)
        .map(|_| ())
        .map_err(|_| ApiError::InvalidIdentifier(format!("Invalid {} ID", what)))
}

/// Authorize `principal_id` against the resource `resource_id`.
///
/// Returns the loaded resource so callers do not look it up a second time.
pub async fn authorize<R, L>(lookup: &L, resource_id: &str, principal_id: &str) -> ApiResult<R>
where
    R: Resource,
    L: ResourceLookup<R> + ?Sized,
{
    let kind = R::KIND;
    validate_identifier(resource_id, &kind.as_str().to_lowercase())?;

    let resource = lookup
        .find_by_id(resource_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{} not found", kind)))?;

    match resource.owner_id() {
        Some(owner) if owner == principal_id => Ok(resource),
        _ => {
            tracing::warn!(
                resource_id,
                principal_id,
                kind = kind.as_str(),
                "Ownership check failed"
            );
            Err(ApiError::Forbidden(format!(
                "You are not authorized to access this {}",
                kind
            )))
        }
    }
}
