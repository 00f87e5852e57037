use crate::application::accounts::CurrentUser;
use crate::presentation::views::{
    BrandView, FooterView, LayoutChrome, NavigationLinkView, NavigationView, PageMetaView,
    profile_href,
};

/// Builds the page frame shared by every template: brand, navigation, footer.
#[derive(Clone)]
pub struct ChromeService {
    site_title: String,
}

impl ChromeService {
    pub fn new(site_title: impl Into<String>) -> Self {
        Self {
            site_title: site_title.into(),
        }
    }

    pub fn load(&self, viewer: Option<&CurrentUser>) -> LayoutChrome {
        let mut entries = vec![NavigationLinkView::new("Home", "/")];
        match viewer {
            Some(user) => {
                entries.push(NavigationLinkView::new("New post", "/create/"));
                entries.push(NavigationLinkView::new(
                    "My posts",
                    profile_href(&user.username),
                ));
                entries.push(NavigationLinkView::new("Log out", "/auth/logout/"));
            }
            None => {
                entries.push(NavigationLinkView::new("Log in", "/auth/login/"));
                entries.push(NavigationLinkView::new("Sign up", "/auth/signup/"));
            }
        }

        LayoutChrome {
            brand: BrandView {
                title: self.site_title.clone(),
                href: "/".to_string(),
            },
            navigation: NavigationView {
                entries,
                viewer: viewer.map(|user| user.username.clone()),
            },
            footer: FooterView {
                copy: format!("© {}", self.site_title),
            },
            meta: PageMetaView {
                title: String::new(),
                site_title: self.site_title.clone(),
            },
        }
    }
}
