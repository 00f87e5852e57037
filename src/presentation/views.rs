use crate::application::error::{ErrorReport, HttpError};
use crate::application::forms::FieldErrors;
use crate::application::pagination::PageWindow;
use crate::domain::entities::{GroupRecord, PostRecord, UserRecord};
use crate::domain::posts;
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;

/// Pages on either side of the current one that the paginator links to.
const PAGINATOR_SPREAD: u32 = 2;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let content = ErrorPageView::not_found();
    let view = LayoutContext::new(chrome.with_title(content.title.clone()), content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct NavigationView {
    pub entries: Vec<NavigationLinkView>,
    /// Username of the signed-in visitor, if any.
    pub viewer: Option<String>,
}

#[derive(Clone)]
pub struct FooterView {
    pub copy: String,
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
}

impl NavigationLinkView {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
        }
    }
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub footer: FooterView,
    pub meta: PageMetaView,
}

impl LayoutChrome {
    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            meta: self.meta.with_title(title.into()),
            ..self
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub footer: FooterView,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            navigation: chrome.navigation,
            footer: chrome.footer,
            meta: chrome.meta,
            content,
        }
    }
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub site_title: String,
}

impl PageMetaView {
    pub fn with_title(self, title: String) -> Self {
        Self { title, ..self }
    }

    /// `<title>` text: the page title followed by the site name.
    pub fn document_title(&self) -> String {
        if self.title.is_empty() {
            self.site_title.clone()
        } else {
            format!("{} | {}", self.title, self.site_title)
        }
    }
}

#[derive(Clone, Debug)]
pub struct GroupBadge {
    pub title: String,
    pub href: String,
}

/// A post as shown in listings and on its own page.
#[derive(Clone, Debug)]
pub struct PostCard {
    pub id: i64,
    pub href: String,
    pub edit_href: String,
    pub lines: Vec<String>,
    pub preview: String,
    pub published: String,
    pub iso_date: String,
    pub author_username: String,
    pub author_name: String,
    pub author_href: String,
    pub group: Option<GroupBadge>,
}

impl PostCard {
    pub fn from_record(record: &PostRecord) -> Self {
        Self {
            id: record.id,
            href: post_href(record.id),
            edit_href: format!("/posts/{}/edit", record.id),
            lines: posts::text_lines(&record.text),
            preview: posts::preview(&record.text),
            published: posts::format_human_date(record.pub_date.date()),
            iso_date: record.pub_date.format(&Rfc3339).unwrap_or_default(),
            author_username: record.author.username.clone(),
            author_name: record.author.display_name(),
            author_href: profile_href(&record.author.username),
            group: record.group.as_ref().map(|group| GroupBadge {
                title: group.title.clone(),
                href: group_href(&group.slug),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageLink {
    pub number: u32,
    pub current: bool,
}

#[derive(Clone, Debug)]
pub struct PaginatorView {
    pub number: u32,
    pub num_pages: u32,
    pub previous: Option<u32>,
    pub next: Option<u32>,
    pub pages: Vec<PageLink>,
}

impl PaginatorView {
    pub fn is_paginated(&self) -> bool {
        self.num_pages > 1
    }

    pub fn shows_first(&self) -> bool {
        self.pages.first().is_some_and(|link| link.number > 1)
    }

    pub fn shows_last(&self) -> bool {
        self.pages
            .last()
            .is_some_and(|link| link.number < self.num_pages)
    }
}

impl From<PageWindow> for PaginatorView {
    fn from(window: PageWindow) -> Self {
        let first = window.number.saturating_sub(PAGINATOR_SPREAD).max(1);
        let last = window
            .number
            .saturating_add(PAGINATOR_SPREAD)
            .min(window.num_pages);
        let pages = (first..=last)
            .map(|number| PageLink {
                number,
                current: number == window.number,
            })
            .collect();

        Self {
            number: window.number,
            num_pages: window.num_pages,
            previous: window.previous_page_number(),
            next: window.next_page_number(),
            pages,
        }
    }
}

pub struct IndexContext {
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexContext>,
}

pub struct GroupView {
    pub title: String,
    pub slug: String,
    pub description_lines: Vec<String>,
}

impl From<&GroupRecord> for GroupView {
    fn from(group: &GroupRecord) -> Self {
        Self {
            title: group.title.clone(),
            slug: group.slug.clone(),
            description_lines: posts::text_lines(&group.description),
        }
    }
}

pub struct GroupListContext {
    pub group: GroupView,
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupListTemplate {
    pub view: LayoutContext<GroupListContext>,
}

pub struct AuthorView {
    pub username: String,
    pub display_name: String,
    pub href: String,
}

impl From<&UserRecord> for AuthorView {
    fn from(user: &UserRecord) -> Self {
        Self {
            username: user.username.clone(),
            display_name: user.display_name(),
            href: profile_href(&user.username),
        }
    }
}

pub struct ProfileContext {
    pub author: AuthorView,
    pub post_count: u64,
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileContext>,
}

pub struct PostDetailContext {
    pub post: PostCard,
    pub author_post_count: u64,
    pub can_edit: bool,
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

#[derive(Clone, Debug)]
pub struct GroupOption {
    pub value: String,
    pub title: String,
    pub selected: bool,
}

/// Shared by the create and edit pages.
pub struct PostFormContext {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub no_group_selected: bool,
    pub errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormContext>,
}

/// Signup values echoed back on a failed submission; passwords never are.
#[derive(Default)]
pub struct SignupContext {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "users/signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupContext>,
}

#[derive(Default)]
pub struct LoginContext {
    pub username: String,
    pub next: String,
    pub errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "users/login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginContext>,
}

pub struct LoggedOutContext;

#[derive(Template)]
#[template(path = "users/logged_out.html")]
pub struct LoggedOutTemplate {
    pub view: LayoutContext<LoggedOutContext>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page not found".to_string(),
            message: "The page you requested does not exist.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to the feed".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

pub fn post_href(id: i64) -> String {
    format!("/posts/{id}/")
}

pub fn profile_href(username: &str) -> String {
    format!("/profile/{username}/")
}

pub fn group_href(slug: &str) -> String {
    format!("/group/{slug}/")
}
