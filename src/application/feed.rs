//! Read side of the site: the paginated feeds and single-post pages.

use std::sync::Arc;

use thiserror::Error;

use crate::application::pagination::{Page, Paginator};
use crate::application::repos::{GroupsRepo, PostFilter, PostsRepo, RepoError, UsersRepo};
use crate::domain::entities::PostRecord;
use crate::presentation::views::{
    AuthorView, GroupListContext, GroupView, IndexContext, PaginatorView, PostCard,
    PostDetailContext, ProfileContext,
};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    paginator: Paginator,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        paginator: Paginator,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            paginator,
        }
    }

    /// One page of posts matching `filter`, newest first.
    pub async fn list(
        &self,
        filter: PostFilter,
        page: Option<&str>,
    ) -> Result<Page<PostRecord>, FeedError> {
        let total = self.posts.count_posts(filter).await?;
        let window = self.paginator.resolve(page, total);
        let items = self.posts.list_posts(filter, window.request()).await?;
        Ok(Page::new(items, window))
    }

    pub async fn index(&self, page: Option<&str>) -> Result<IndexContext, FeedError> {
        let (posts, paginator) = self.cards(PostFilter::All, page).await?;
        Ok(IndexContext { posts, paginator })
    }

    pub async fn group(
        &self,
        slug: &str,
        page: Option<&str>,
    ) -> Result<Option<GroupListContext>, FeedError> {
        let Some(group) = self.groups.find_by_slug(slug).await? else {
            return Ok(None);
        };

        let (posts, paginator) = self.cards(PostFilter::Group(group.id), page).await?;
        Ok(Some(GroupListContext {
            group: GroupView::from(&group),
            posts,
            paginator,
        }))
    }

    pub async fn profile(
        &self,
        username: &str,
        page: Option<&str>,
    ) -> Result<Option<ProfileContext>, FeedError> {
        let Some(author) = self.users.find_by_username(username).await? else {
            return Ok(None);
        };

        let page = self.list(PostFilter::Author(author.id), page).await?;
        let post_count = page.window.total;
        let paginator = PaginatorView::from(page.window);
        Ok(Some(ProfileContext {
            author: AuthorView::from(&author),
            post_count,
            posts: page.items.iter().map(PostCard::from_record).collect(),
            paginator,
        }))
    }

    /// `viewer` is the id of the signed-in user, used to offer the edit link.
    pub async fn post_detail(
        &self,
        id: i64,
        viewer: Option<i64>,
    ) -> Result<Option<PostDetailContext>, FeedError> {
        let Some(post) = self.posts.find_by_id(id).await? else {
            return Ok(None);
        };

        let author_post_count = self
            .posts
            .count_posts(PostFilter::Author(post.author.id))
            .await?;

        Ok(Some(PostDetailContext {
            can_edit: viewer == Some(post.author.id),
            post: PostCard::from_record(&post),
            author_post_count,
        }))
    }

    async fn cards(
        &self,
        filter: PostFilter,
        page: Option<&str>,
    ) -> Result<(Vec<PostCard>, PaginatorView), FeedError> {
        let page = self.list(filter, page).await?;
        let cards = page.items.iter().map(PostCard::from_record).collect();
        Ok((cards, PaginatorView::from(page.window)))
    }
}
