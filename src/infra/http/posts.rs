use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    application::{
        forms::{FieldErrors, PostFormInput},
        posts::PostServiceError,
    },
    presentation::views::{
        LayoutChrome, LayoutContext, PostFormTemplate, post_href, profile_href,
        render_not_found_response, render_template_response,
    },
};

use super::{HttpState, parse_id, repo_error_to_http, session::RequireUser};

const SOURCE: &str = "infra::http::posts";

pub(super) async fn create_form(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
) -> Response {
    let chrome = state.chrome.load(Some(&user));
    render_post_form(
        &state,
        chrome,
        None,
        &PostFormInput::default(),
        FieldErrors::default(),
    )
    .await
}

pub(super) async fn create_submit(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Form(input): Form<PostFormInput>,
) -> Response {
    let chrome = state.chrome.load(Some(&user));

    match state.posts.create(&user, &input).await {
        Ok(_) => Redirect::to(&profile_href(&user.username)).into_response(),
        Err(PostServiceError::Invalid(errors)) => {
            render_post_form(&state, chrome, None, &input, errors).await
        }
        Err(err) => post_error_response(err, chrome),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(raw_id): Path<String>,
) -> Response {
    let chrome = state.chrome.load(Some(&user));
    let Some(id) = parse_id(&raw_id) else {
        return render_not_found_response(chrome);
    };

    match state.posts.load_for_edit(id, &user).await {
        Ok(post) => {
            let input = PostFormInput::from_post(&post);
            render_post_form(&state, chrome, Some(id), &input, FieldErrors::default()).await
        }
        Err(err) => post_error_response(err, chrome),
    }
}

pub(super) async fn edit_submit(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(raw_id): Path<String>,
    Form(input): Form<PostFormInput>,
) -> Response {
    let chrome = state.chrome.load(Some(&user));
    let Some(id) = parse_id(&raw_id) else {
        return render_not_found_response(chrome);
    };

    match state.posts.update(id, &user, &input).await {
        Ok(post) => Redirect::to(&post_href(post.id)).into_response(),
        Err(PostServiceError::Invalid(errors)) => {
            render_post_form(&state, chrome, Some(id), &input, errors).await
        }
        Err(err) => post_error_response(err, chrome),
    }
}

async fn render_post_form(
    state: &HttpState,
    chrome: LayoutChrome,
    post_id: Option<i64>,
    input: &PostFormInput,
    errors: FieldErrors,
) -> Response {
    match state.posts.form_context(post_id, input, errors).await {
        Ok(content) => {
            let title = if content.is_edit { "Edit post" } else { "New post" };
            let view = LayoutContext::new(chrome.with_title(title), content);
            render_template_response(PostFormTemplate { view }, StatusCode::OK)
        }
        Err(err) => post_error_response(err, chrome),
    }
}

fn post_error_response(err: PostServiceError, chrome: LayoutChrome) -> Response {
    match err {
        PostServiceError::NotFound => render_not_found_response(chrome),
        // someone else's post: back to its page, nothing changed
        PostServiceError::NotAuthor { post_id, .. } => {
            Redirect::to(&post_href(post_id)).into_response()
        }
        PostServiceError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY.into_response(),
        PostServiceError::Repo(err) => repo_error_to_http(SOURCE, err).into_response(),
    }
}
