//! Post reads and writes routed through the cache.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::auth::{AuthError, Principal};
use crate::application::repos::{CreatePostParams, PostsRepo, RepoError};
use crate::cache::{CacheState, InvalidationTarget, ResourceKind, ResourceScope, WriteInterrupted};
use crate::domain::entities::{PostId, PostRecord};
use crate::domain::error::{DomainError, require_text};
use crate::domain::permissions::{CREATE_POST, DELETE_POST};

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("post not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Interrupted(#[from] WriteInterrupted),
}

#[derive(Debug, Clone, Default)]
pub struct CreatePostCommand {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    cache: CacheState,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostsRepo>, cache: CacheState) -> Self {
        Self { posts, cache }
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<PostRecord>, PostServiceError> {
        let key = self.cache.read_key(
            ResourceKind::Post,
            ResourceScope::Collection,
            &principal.fingerprint,
        );
        let posts = self.posts.clone();
        self.cache
            .reads
            .read_through(&key, || async move {
                posts.list_posts().await.map_err(PostServiceError::from)
            })
            .await
    }

    /// Missing posts surface as `NotFound` and are never cached.
    pub async fn get(
        &self,
        principal: &Principal,
        id: PostId,
    ) -> Result<PostRecord, PostServiceError> {
        let key = self.cache.read_key(
            ResourceKind::Post,
            ResourceScope::Item(id),
            &principal.fingerprint,
        );
        let posts = self.posts.clone();
        self.cache
            .reads
            .read_through(&key, || async move {
                posts
                    .find_post(id)
                    .await?
                    .ok_or(PostServiceError::NotFound)
            })
            .await
    }

    pub async fn create(
        &self,
        principal: &Principal,
        command: CreatePostCommand,
    ) -> Result<PostRecord, PostServiceError> {
        principal.require(CREATE_POST)?;
        let title = require_text(command.title, "title")?;
        let content = require_text(command.content, "content")?;

        let posts = self.posts.clone();
        let params = CreatePostParams {
            title,
            content,
            user_id: principal.user_id,
        };

        let post = self
            .cache
            .writes
            .mutate(
                async move { posts.create_post(params).await.map_err(PostServiceError::from) },
                |post| InvalidationTarget::item_and_collection(ResourceKind::Post, post.id),
            )
            .await?;

        info!(post_id = post.id, user_id = principal.user_id, "created post");
        Ok(post)
    }

    pub async fn delete(&self, principal: &Principal, id: PostId) -> Result<(), PostServiceError> {
        principal.require(DELETE_POST)?;

        let posts = self.posts.clone();
        self.cache
            .writes
            .mutate(
                async move {
                    if posts.delete_post(id).await? {
                        Ok(id)
                    } else {
                        Err(PostServiceError::NotFound)
                    }
                },
                |id| InvalidationTarget::item_and_collection(ResourceKind::Post, *id),
            )
            .await?;

        info!(post_id = id, user_id = principal.user_id, "deleted post");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, CacheStore, CallerFingerprint, MemoryCacheStore};
    use crate::domain::permissions::{PermissionSet, VIEW_POST};
    use crate::infra::memory::InMemoryRepositories;
    use crate::application::repos::{CreateUserParams, UsersRepo};

    async fn fixture() -> (PostService, Arc<MemoryCacheStore>, Principal) {
        let repos = Arc::new(InMemoryRepositories::new());
        let user = repos
            .create_user(CreateUserParams {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .expect("user");
        let store = Arc::new(MemoryCacheStore::new());
        let service = PostService::new(
            repos,
            CacheState::new(&CacheConfig::default(), store.clone()),
        );
        let principal = Principal {
            user_id: user.id,
            name: user.name,
            fingerprint: CallerFingerprint::from_credential("token"),
            permissions: PermissionSet::new([VIEW_POST, CREATE_POST, DELETE_POST]),
        };
        (service, store, principal)
    }

    fn command(title: &str) -> CreatePostCommand {
        CreatePostCommand {
            title: Some(title.to_string()),
            content: Some("B".to_string()),
        }
    }

    #[tokio::test]
    async fn create_requires_permission_before_validation() {
        let (service, store, mut principal) = fixture().await;
        principal.permissions = PermissionSet::new([VIEW_POST]);

        let err = service
            .create(&principal, CreatePostCommand::default())
            .await
            .expect_err("forbidden");
        assert!(matches!(err, PostServiceError::Auth(AuthError::Forbidden { .. })));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let (service, _, principal) = fixture().await;
        let err = service
            .create(&principal, command("   "))
            .await
            .expect_err("blank");
        assert!(matches!(err, PostServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn create_invalidates_cached_listing() {
        let (service, store, principal) = fixture().await;
        assert!(service.list(&principal).await.expect("list").is_empty());
        assert!(store.contains_key("collection:post"));

        let post = service.create(&principal, command("A")).await.expect("create");
        assert!(!store.contains_key("collection:post"));

        let listed = service.list(&principal).await.expect("list");
        assert_eq!(listed, vec![post]);
    }

    #[tokio::test]
    async fn missing_post_is_not_cached() {
        let (service, store, principal) = fixture().await;
        let err = service.get(&principal, 42).await.expect_err("missing");
        assert!(matches!(err, PostServiceError::NotFound));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn delete_clears_item_and_collection() {
        let (service, store, principal) = fixture().await;
        let post = service.create(&principal, command("A")).await.expect("create");
        service.get(&principal, post.id).await.expect("get");
        service.list(&principal).await.expect("list");
        assert_eq!(store.len(), 2);

        service.delete(&principal, post.id).await.expect("delete");
        assert!(store.is_empty());
        assert!(matches!(
            service.get(&principal, post.id).await,
            Err(PostServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn deleting_missing_post_is_not_found() {
        let (service, store, principal) = fixture().await;
        store
            .set("collection:post", "[]".to_string(), 60)
            .await
            .expect("seed");
        let err = service.delete(&principal, 7).await.expect_err("missing");
        assert!(matches!(err, PostServiceError::NotFound));
        assert!(store.contains_key("collection:post"));
    }
}
