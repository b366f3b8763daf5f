//! Page templates, compiled once at startup

use axum::response::Html;
use serde::Serialize;
use tera::{Context, Tera};

use crate::{
    error::AppResult,
    forms::{Form, FormView},
    session::Session,
};

/// Pages the portal renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Signup,
    Login,
    Dashboard,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Signup, Page::Login, Page::Dashboard];

    pub fn template_name(self) -> &'static str {
        match self {
            Page::Signup => "signup.page.html",
            Page::Login => "login.page.html",
            Page::Dashboard => "dashboard.page.html",
        }
    }
}

const SOURCES: [(&str, &str); 4] = [
    (
        "base.layout.html",
        include_str!("../ui/html/base.layout.html"),
    ),
    (
        "signup.page.html",
        include_str!("../ui/html/signup.page.html"),
    ),
    ("login.page.html", include_str!("../ui/html/login.page.html")),
    (
        "dashboard.page.html",
        include_str!("../ui/html/dashboard.page.html"),
    ),
];

/// Data every page is rendered with
#[derive(Debug, Serialize)]
pub struct TemplateData<'a> {
    pub csrf_token: &'a str,
    pub flash: Option<String>,
    pub authenticated: bool,
    pub form: FormView<'a>,
}

/// Compiled templates, read-only after construction
pub struct Templates {
    tera: Tera,
}

impl Templates {
    /// Compile the embedded templates and check every [`Page`] resolves
    pub fn new() -> tera::Result<Self> {
        Self::from_sources(SOURCES)
    }

    fn from_sources<'s>(
        sources: impl IntoIterator<Item = (&'s str, &'s str)>,
    ) -> tera::Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(sources)?;

        for page in Page::ALL {
            tera.get_template(page.template_name())?;
        }

        Ok(Self { tera })
    }

    pub fn render_data(&self, page: Page, data: &TemplateData<'_>) -> tera::Result<String> {
        let context = Context::from_serialize(data)?;
        self.tera.render(page.template_name(), &context)
    }

    /// Render `page` for the current session. The flash queue is consumed
    /// once the page has rendered.
    pub fn render(&self, page: Page, session: &mut Session, form: &Form) -> AppResult<Html<String>> {
        let html = {
            let data = TemplateData {
                csrf_token: session.csrf_token(),
                flash: session.peek_flash().map(str::to_string),
                authenticated: session.user_id().is_some(),
                form: form.view(),
            };
            self.render_data(page, &data)?
        };

        session.take_flash();
        Ok(Html(html))
    }
}
