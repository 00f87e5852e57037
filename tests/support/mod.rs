#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::{Router, body::Body, http::Request, response::Response};
use http_body_util::BodyExt;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

use yatube::application::accounts::{AccountService, PasswordError, PasswordService};
use yatube::application::chrome::ChromeService;
use yatube::application::feed::FeedService;
use yatube::application::pagination::{PageRequest, Paginator};
use yatube::application::posts::PostService;
use yatube::application::repos::{
    CreateGroupParams, CreatePostParams, CreateSessionParams, CreateUserParams, GroupsRepo,
    GroupsWriteRepo, HealthRepo, PostFilter, PostsRepo, PostsWriteRepo, RepoError, SessionsRepo,
    UpdatePostParams, UsersRepo, UsersWriteRepo,
};
use yatube::domain::entities::{
    GroupRecord, PostAuthor, PostGroup, PostRecord, SessionRecord, UserRecord,
};
use yatube::infra::http::{CookiePolicy, HttpState, SESSION_COOKIE, build_router};

pub const TEST_PASSWORD: &str = "correct-horse-1";

#[derive(Debug, Clone)]
struct StoredPost {
    id: i64,
    text: String,
    pub_date: OffsetDateTime,
    author_id: i64,
    group_id: Option<i64>,
}

#[derive(Default)]
struct StoreState {
    next_id: i64,
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<StoredPost>,
    sessions: Vec<SessionRecord>,
}

impl StoreState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn record(&self, post: &StoredPost) -> Result<PostRecord, RepoError> {
        let author = self
            .users
            .iter()
            .find(|user| user.id == post.author_id)
            .ok_or(RepoError::NotFound)?;
        let group = post
            .group_id
            .and_then(|id| self.groups.iter().find(|group| group.id == id));

        Ok(PostRecord {
            id: post.id,
            text: post.text.clone(),
            pub_date: post.pub_date,
            author: PostAuthor {
                id: author.id,
                username: author.username.clone(),
                first_name: author.first_name.clone(),
                last_name: author.last_name.clone(),
            },
            group: group.map(|group| PostGroup {
                id: group.id,
                slug: group.slug.clone(),
                title: group.title.clone(),
            }),
        })
    }

    fn matching(&self, filter: PostFilter) -> Vec<&StoredPost> {
        let mut posts: Vec<&StoredPost> = self
            .posts
            .iter()
            .filter(|post| match filter {
                PostFilter::All => true,
                PostFilter::Group(id) => post.group_id == Some(id),
                PostFilter::Author(id) => post.author_id == id,
            })
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        posts
    }
}

/// Repository fake backing every port with one locked state.
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    healthy: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            healthy: AtomicBool::new(true),
        }
    }
}

impl InMemoryStore {
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub async fn seed_user(&self, username: &str) -> UserRecord {
        self.create_user(CreateUserParams {
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: format!("{username}@example.com"),
            password_hash: PlainPasswords.hash(TEST_PASSWORD).expect("hash"),
        })
        .await
        .expect("seed user")
    }

    pub async fn seed_group(&self, title: &str, slug: &str) -> GroupRecord {
        self.create_group(CreateGroupParams {
            title: title.to_string(),
            slug: slug.to_string(),
            description: format!("About {title}"),
        })
        .await
        .expect("seed group")
    }

    pub async fn seed_post(&self, author_id: i64, text: &str, group_id: Option<i64>) -> PostRecord {
        self.create_post(CreatePostParams {
            author_id,
            text: text.to_string(),
            group_id,
        })
        .await
        .expect("seed post")
    }

    pub async fn post_count(&self) -> usize {
        self.state.lock().await.posts.len()
    }

    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    pub async fn post_text(&self, id: i64) -> Option<String> {
        let state = self.state.lock().await;
        state
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| post.text.clone())
    }

    /// Push every session's expiry into the past.
    pub async fn expire_sessions(&self) {
        let mut state = self.state.lock().await;
        for session in &mut state.sessions {
            session.expires_at = OffsetDateTime::now_utc() - Duration::minutes(1);
        }
    }
}

#[async_trait]
impl PostsRepo for InMemoryStore {
    async fn list_posts(
        &self,
        filter: PostFilter,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let state = self.state.lock().await;
        state
            .matching(filter)
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .map(|post| state.record(post))
            .collect()
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let state = self.state.lock().await;
        Ok(state.matching(filter).len() as u64)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let state = self.state.lock().await;
        state
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| state.record(post))
            .transpose()
    }
}

#[async_trait]
impl PostsWriteRepo for InMemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let post = StoredPost {
            id,
            text: params.text,
            pub_date: OffsetDateTime::now_utc(),
            author_id: params.author_id,
            group_id: params.group_id,
        };
        let record = state.record(&post)?;
        state.posts.push(post);
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        let post = post.clone();
        state.record(&post)
    }
}

#[async_trait]
impl GroupsRepo for InMemoryStore {
    async fn list_all(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let mut groups = self.state.lock().await.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.groups.iter().find(|group| group.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.groups.iter().find(|group| group.slug == slug).cloned())
    }
}

#[async_trait]
impl GroupsWriteRepo for InMemoryStore {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.groups.iter().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".to_string(),
            });
        }
        let group = GroupRecord {
            id: state.next_id(),
            title: params.title,
            slug: params.slug,
            description: params.description,
        };
        state.groups.push(group.clone());
        Ok(group)
    }

    async fn delete_group(&self, slug: &str) -> Result<bool, RepoError> {
        let mut state = self.state.lock().await;
        let Some(index) = state.groups.iter().position(|group| group.slug == slug) else {
            return Ok(false);
        };
        let group = state.groups.remove(index);
        for post in &mut state.posts {
            if post.group_id == Some(group.id) {
                post.group_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl UsersRepo for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }
}

#[async_trait]
impl UsersWriteRepo for InMemoryStore {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|user| user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let user = UserRecord {
            id: state.next_id(),
            username: params.username,
            first_name: params.first_name,
            last_name: params.last_name,
            email: params.email,
            password_hash: params.password_hash,
            date_joined: OffsetDateTime::now_utc(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn delete_user(&self, username: &str) -> Result<bool, RepoError> {
        let mut state = self.state.lock().await;
        let Some(index) = state.users.iter().position(|user| user.username == username) else {
            return Ok(false);
        };
        let user = state.users.remove(index);
        state.posts.retain(|post| post.author_id != user.id);
        state.sessions.retain(|session| session.user_id != user.id);
        Ok(true)
    }
}

#[async_trait]
impl SessionsRepo for InMemoryStore {
    async fn create_session(&self, params: CreateSessionParams) -> Result<SessionRecord, RepoError> {
        let mut state = self.state.lock().await;
        let session = SessionRecord {
            id: state.next_id(),
            user_id: params.user_id,
            prefix: params.prefix,
            secret_hash: params.secret_hash,
            created_at: OffsetDateTime::now_utc(),
            expires_at: params.expires_at,
        };
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<SessionRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .iter()
            .find(|session| session.prefix == prefix)
            .cloned())
    }

    async fn delete_session(&self, prefix: &str) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        state.sessions.retain(|session| session.prefix != prefix);
        Ok(())
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state.sessions.retain(|session| session.expires_at > now);
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl HealthRepo for InMemoryStore {
    async fn health_check(&self) -> Result<(), RepoError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepoError::Timeout)
        }
    }
}

/// Reversible stand-in for Argon2 so tests stay fast.
pub struct PlainPasswords;

impl PasswordService for PlainPasswords {
    fn hash(&self, password: &str) -> Result<String, PasswordError> {
        Ok(format!("plain${password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        Ok(hash.strip_prefix("plain$") == Some(password))
    }
}

pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub accounts: Arc<AccountService>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::default());
        let accounts = Arc::new(AccountService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(PlainPasswords),
            Duration::hours(1),
        ));
        let state = HttpState {
            feed: Arc::new(FeedService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                Paginator::default(),
            )),
            posts: Arc::new(PostService::new(store.clone(), store.clone(), store.clone())),
            accounts: accounts.clone(),
            chrome: Arc::new(ChromeService::new("Yatube")),
            health: store.clone(),
            cookies: CookiePolicy::default(),
        };

        Self {
            router: build_router(state),
            store,
            accounts,
        }
    }

    /// Open a session for `user` and return the matching `Cookie` header value.
    pub async fn cookie_for(&self, user: &UserRecord) -> String {
        let issued = self
            .accounts
            .start_session(user)
            .await
            .expect("session opens");
        format!("{SESSION_COOKIE}={}", issued.token)
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        use tower::ServiceExt;

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router responds")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        self.send(builder.body(Body::empty()).expect("request")).await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::post(uri).header("content-type", "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).expect("request"))
            .await
    }
}

pub async fn body_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get("location")
        .and_then(|value| value.to_str().ok())
}

pub fn card_count(body: &str) -> usize {
    body.matches("class=\"post-card\"").count()
}
