use async_trait::async_trait;
use thiserror::Error;

use super::types::{DependencyItem, ModuleDescriptor};

/// Failure raised by a module while enumerating or reassigning its records
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// A business module's view of the records it lets users own.
///
/// `items` must not have side effects. Ownership defaults to an exact match
/// between `owner_id` and the queried user id; override `is_owned_by` when a
/// record can be owned through more than one field.
#[async_trait]
pub trait DependencySource: Send + Sync + 'static {
    type Item: Send + Sync;

    async fn items(&self) -> Result<Vec<Self::Item>, SourceError>;

    fn owner_id<'a>(&self, item: &'a Self::Item) -> Option<&'a str>;

    fn is_owned_by(&self, item: &Self::Item, user_id: &str) -> bool {
        self.owner_id(item) == Some(user_id)
    }

    fn item_id(&self, item: &Self::Item) -> String;

    fn item_name(&self, item: &Self::Item) -> String;

    fn item_url(&self, _item: &Self::Item) -> Option<String> {
        None
    }

    /// Point the record at `to_user_id`, or clear its owner when `None`
    async fn reassign(&self, item_id: &str, to_user_id: Option<&str>) -> Result<(), SourceError>;

    fn can_reassign(&self) -> bool {
        true
    }
}

/// Object-safe form of [`DependencySource`] stored by the registry
#[async_trait]
pub(crate) trait ErasedSource: Send + Sync {
    async fn owned_items(&self, user_id: &str, descriptor: &ModuleDescriptor) -> Result<Vec<DependencyItem>, SourceError>;

    async fn reassign_item(&self, item_id: &str, to_user_id: Option<&str>) -> Result<(), SourceError>;

    fn allows_reassign(&self) -> bool;
}

pub(crate) struct SourceAdapter<S>(pub S);

#[async_trait]
impl<S: DependencySource> ErasedSource for SourceAdapter<S> {
    async fn owned_items(&self, user_id: &str, descriptor: &ModuleDescriptor) -> Result<Vec<DependencyItem>, SourceError> {
        let source = &self.0;
        let items = source.items().await?;

        Ok(items
            .iter()
            .filter(|item| source.is_owned_by(item, user_id))
            .map(|item| DependencyItem {
                id: source.item_id(item),
                name: source.item_name(item),
                item_type: descriptor.label.clone(),
                module: descriptor.module.clone(),
                url: source.item_url(item),
            })
            .collect())
    }

    async fn reassign_item(&self, item_id: &str, to_user_id: Option<&str>) -> Result<(), SourceError> {
        self.0.reassign(item_id, to_user_id).await
    }

    fn allows_reassign(&self) -> bool {
        self.0.can_reassign()
    }
}
