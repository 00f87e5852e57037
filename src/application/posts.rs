//! Write side of posts: creation and author-only editing.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::info;

use crate::application::accounts::CurrentUser;
use crate::application::forms::{FieldErrors, PostFormInput, PostFormRejection};
use crate::application::repos::{
    CreatePostParams, GroupsRepo, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;
use crate::presentation::views::{GroupOption, PostFormContext};

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error("post not found")]
    NotFound,
    #[error("user {user_id} is not the author of post {post_id}")]
    NotAuthor { post_id: i64, user_id: i64 },
    #[error("post form is invalid")]
    Invalid(FieldErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<PostFormRejection> for PostServiceError {
    fn from(rejection: PostFormRejection) -> Self {
        match rejection {
            PostFormRejection::Invalid(errors) => Self::Invalid(errors),
            PostFormRejection::Repo(err) => Self::Repo(err),
        }
    }
}

#[derive(Clone)]
pub struct PostService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
}

impl PostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
    ) -> Self {
        Self {
            reader,
            writer,
            groups,
        }
    }

    pub async fn create(
        &self,
        author: &CurrentUser,
        input: &PostFormInput,
    ) -> Result<PostRecord, PostServiceError> {
        let draft = input.validate(self.groups.as_ref()).await?;

        let post = self
            .writer
            .create_post(CreatePostParams {
                author_id: author.id,
                text: draft.text,
                group_id: draft.group_id,
            })
            .await?;

        counter!("yatube_posts_created_total").increment(1);
        info!(
            target = "yatube::posts",
            post_id = post.id,
            author = %author.username,
            group_id = ?post.group.as_ref().map(|group| group.id),
            "post created"
        );
        Ok(post)
    }

    /// Load a post for its author. Anyone else gets `NotAuthor`.
    pub async fn load_for_edit(
        &self,
        id: i64,
        editor: &CurrentUser,
    ) -> Result<PostRecord, PostServiceError> {
        let post = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(PostServiceError::NotFound)?;

        if post.author.id != editor.id {
            return Err(PostServiceError::NotAuthor {
                post_id: id,
                user_id: editor.id,
            });
        }
        Ok(post)
    }

    /// Replace text and group. The author and publication date never change.
    pub async fn update(
        &self,
        id: i64,
        editor: &CurrentUser,
        input: &PostFormInput,
    ) -> Result<PostRecord, PostServiceError> {
        self.load_for_edit(id, editor).await?;
        let draft = input.validate(self.groups.as_ref()).await?;

        let post = self
            .writer
            .update_post(UpdatePostParams {
                id,
                text: draft.text,
                group_id: draft.group_id,
            })
            .await?;

        counter!("yatube_posts_updated_total").increment(1);
        info!(
            target = "yatube::posts",
            post_id = post.id,
            editor = %editor.username,
            "post updated"
        );
        Ok(post)
    }

    /// Form page content; `post_id` switches it to edit mode.
    pub async fn form_context(
        &self,
        post_id: Option<i64>,
        input: &PostFormInput,
        errors: FieldErrors,
    ) -> Result<PostFormContext, PostServiceError> {
        let selected = input.selected_group();
        let groups = self
            .groups
            .list_all()
            .await?
            .into_iter()
            .map(|group| {
                let value = group.id.to_string();
                GroupOption {
                    selected: selected == Some(value.as_str()),
                    value,
                    title: group.title,
                }
            })
            .collect();

        Ok(PostFormContext {
            is_edit: post_id.is_some(),
            action: match post_id {
                Some(id) => format!("/posts/{id}/edit"),
                None => "/create/".to_string(),
            },
            text: input.text.clone(),
            groups,
            no_group_selected: selected.is_none(),
            errors,
        })
    }
}
