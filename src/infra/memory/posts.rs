use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{CreatePostParams, PostsRepo, RepoError};
use crate::domain::entities::{PostId, PostRecord};

use super::{InMemoryRepositories, ResourceState, StoredPost};

const UNKNOWN_AUTHOR: &str = "unknown";

fn to_record(state: &ResourceState, post: &StoredPost) -> PostRecord {
    let author = state
        .users
        .get(&post.user_id)
        .map(|user| user.record.name.clone())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
    PostRecord {
        id: post.id,
        title: post.title.clone(),
        content: post.content.clone(),
        user_id: post.user_id,
        author,
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}

#[async_trait]
impl PostsRepo for InMemoryRepositories {
    async fn list_posts(&self) -> Result<Vec<PostRecord>, RepoError> {
        let state = self.read("list_posts");
        Ok(state
            .posts
            .values()
            .rev()
            .map(|post| to_record(&state, post))
            .collect())
    }

    async fn find_post(&self, id: PostId) -> Result<Option<PostRecord>, RepoError> {
        let state = self.read("find_post");
        Ok(state.posts.get(&id).map(|post| to_record(&state, post)))
    }

    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.write("create_post");
        if !state.users.contains_key(&params.user_id) {
            return Err(RepoError::NotFound);
        }

        state.next_post_id += 1;
        let now = OffsetDateTime::now_utc();
        let post = StoredPost {
            id: state.next_post_id,
            title: params.title,
            content: params.content,
            user_id: params.user_id,
            created_at: now,
            updated_at: now,
        };
        let record = to_record(&state, &post);
        state.posts.insert(post.id, post);
        Ok(record)
    }

    async fn delete_post(&self, id: PostId) -> Result<bool, RepoError> {
        let mut state = self.write("delete_post");
        Ok(state.posts.remove(&id).is_some())
    }
}
