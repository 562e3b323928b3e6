use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use time::OffsetDateTime;
use tower_sessions::{session::Error as SessionError, Session};
use tracing::error;

use crate::records::UploadedFile;
use crate::server::utils::format_datetime_utc;
use crate::sessions;

/// Shared layout context injected into all templates
#[derive(Clone, Debug)]
pub struct LayoutContext {
    pub title: String,
    pub authenticated: bool,
    pub user: String,
    pub current_year: i32,
}

impl LayoutContext {
    /// Layout for a visitor with no session information.
    pub fn anonymous(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            authenticated: false,
            user: String::new(),
            current_year: OffsetDateTime::now_utc().year(),
        }
    }

    /// Layout reflecting the login state stored in the session.
    pub async fn from_session(
        session: &Session,
        title: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let snapshot = sessions::snapshot(session).await?;
        Ok(Self {
            authenticated: snapshot.authenticated,
            user: snapshot.user,
            ..Self::anonymous(title)
        })
    }
}

/// Wrapper that converts Askama templates into Axum responses with logging
pub struct HtmlTemplate<T: Template> {
    template: T,
    status: StatusCode,
}

impl<T: Template> HtmlTemplate<T> {
    pub fn new(template: T) -> Self {
        Self {
            template,
            status: StatusCode::OK,
        }
    }

    pub fn with_status(template: T, status: StatusCode) -> Self {
        Self { template, status }
    }
}

impl<T: Template> From<T> for HtmlTemplate<T> {
    fn from(template: T) -> Self {
        Self::new(template)
    }
}

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.template.render() {
            Ok(html) => (self.status, Html(html)).into_response(),
            Err(err) => {
                error!(target: "templates", error = %err, "failed to render template");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Template rendering error",
                )
                    .into_response()
            }
        }
    }
}

/// Display fields for one upload, shared by the listing and detail pages.
#[derive(Clone, Debug)]
pub struct UploadView {
    pub id: i64,
    pub title: String,
    pub uploader: String,
    pub file_path: String,
    pub created_display: String,
    pub href: String,
    pub raw_href: String,
    pub mime_type: String,
    /// Top-level media type (`text`, `image`, ...).
    pub kind: String,
}

impl From<&UploadedFile> for UploadView {
    fn from(record: &UploadedFile) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            uploader: record.uploader.clone(),
            file_path: record.file_path.clone(),
            created_display: format_datetime_utc(record.created),
            href: record.page_href(),
            raw_href: record.raw_href(),
            mime_type: record.mime_type(),
            kind: record.media_type(),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html", escape = "html")]
pub struct IndexTemplate {
    pub layout: LayoutContext,
    pub uploads: Vec<UploadView>,
}

impl IndexTemplate {
    pub fn new(layout: LayoutContext, uploads: Vec<UploadView>) -> Self {
        Self { layout, uploads }
    }
}

#[derive(Template)]
#[template(path = "login.html", escape = "html")]
pub struct LoginTemplate {
    pub layout: LayoutContext,
    pub username: String,
    pub bad_login: bool,
}

impl LoginTemplate {
    pub fn new(layout: LayoutContext) -> Self {
        Self {
            layout,
            username: String::new(),
            bad_login: false,
        }
    }

    /// Flag a rejected login, keeping the submitted username in the form.
    pub fn bad_login(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self.bad_login = true;
        self
    }
}

#[derive(Template)]
#[template(path = "text.html", escape = "html")]
pub struct TextFormTemplate {
    pub layout: LayoutContext,
    pub error_message: Option<String>,
}

impl TextFormTemplate {
    pub fn new(layout: LayoutContext) -> Self {
        Self {
            layout,
            error_message: None,
        }
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

#[derive(Template)]
#[template(path = "files.html", escape = "html")]
pub struct FileFormTemplate {
    pub layout: LayoutContext,
    pub max_file_size_display: String,
    pub error_message: Option<String>,
}

impl FileFormTemplate {
    pub fn new(layout: LayoutContext, max_file_size_display: String) -> Self {
        Self {
            layout,
            max_file_size_display,
            error_message: None,
        }
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

#[derive(Template)]
#[template(path = "upload_success.html", escape = "html")]
pub struct UploadSuccessTemplate {
    pub layout: LayoutContext,
    pub upload_title: String,
    /// Absolute shareable link, e.g. `https://paste.example/t/12`.
    pub link: String,
}

#[derive(Template)]
#[template(path = "text_page.html", escape = "html")]
pub struct TextPageTemplate {
    pub layout: LayoutContext,
    pub upload: UploadView,
    pub content: String,
}

#[derive(Template)]
#[template(path = "file_page.html", escape = "html")]
pub struct FilePageTemplate {
    pub layout: LayoutContext,
    pub upload: UploadView,
    pub size_display: String,
    pub is_image: bool,
}
