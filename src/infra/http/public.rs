use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::{
    application::{
        accounts::AccountService, chrome::ChromeService, error::HttpError, feed::FeedService,
        posts::PostService, repos::HealthRepo,
    },
    presentation::views::{
        GroupListTemplate, IndexTemplate, LayoutContext, PostDetailTemplate, ProfileTemplate,
        render_not_found_response, render_template_response,
    },
};

use super::{
    auth, db_health_response,
    middleware::{log_responses, set_request_context},
    parse_id, posts,
    session::{CookiePolicy, Viewer, resolve_session},
};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub accounts: Arc<AccountService>,
    pub chrome: Arc<ChromeService>,
    pub health: Arc<dyn HealthRepo>,
    pub cookies: CookiePolicy,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/group/{slug}/", get(group_posts))
        .route("/profile/{username}/", get(profile))
        .route("/posts/{id}/", get(post_detail))
        .route(
            "/create/",
            get(posts::create_form).post(posts::create_submit),
        )
        .route(
            "/posts/{id}/edit",
            get(posts::edit_form).post(posts::edit_submit),
        )
        .route(
            "/auth/signup/",
            get(auth::signup_form).post(auth::signup_submit),
        )
        .route(
            "/auth/login/",
            get(auth::login_form).post(auth::login_submit),
        )
        .route("/auth/logout/", get(auth::logout).post(auth::logout))
        .route("/_health/db", get(db_health))
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(state.clone(), resolve_session))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<String>,
}

async fn index(
    State(state): State<HttpState>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = state.chrome.load(viewer.user());

    match state.feed.index(query.page.as_deref()).await {
        Ok(content) => {
            let view = LayoutContext::new(chrome.with_title("Latest updates"), content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn group_posts(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = state.chrome.load(viewer.user());

    match state.feed.group(&slug, query.page.as_deref()).await {
        Ok(Some(content)) => {
            let title = format!("Posts in {}", content.group.title);
            let view = LayoutContext::new(chrome.with_title(title), content);
            render_template_response(GroupListTemplate { view }, StatusCode::OK)
        }
        Ok(None) => render_not_found_response(chrome),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn profile(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = state.chrome.load(viewer.user());

    match state.feed.profile(&username, query.page.as_deref()).await {
        Ok(Some(content)) => {
            let title = format!("Profile of {}", content.author.display_name);
            let view = LayoutContext::new(chrome.with_title(title), content);
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Ok(None) => render_not_found_response(chrome),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(raw_id): Path<String>,
) -> Response {
    let chrome = state.chrome.load(viewer.user());
    let Some(id) = parse_id(&raw_id) else {
        return render_not_found_response(chrome);
    };

    match state.feed.post_detail(id, viewer.id()).await {
        Ok(Some(content)) => {
            let title = format!("Post {}", content.post.preview);
            let view = LayoutContext::new(chrome.with_title(title), content);
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Ok(None) => render_not_found_response(chrome),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn db_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.health_check().await)
}

async fn fallback(State(state): State<HttpState>, viewer: Viewer) -> Response {
    render_not_found_response(state.chrome.load(viewer.user()))
}
