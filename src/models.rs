use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub type Id = i64;

/// Maximum length of a group title.
pub const GROUP_TITLE_MAX: usize = 200;
/// Maximum length of a post body.
pub const POST_TEXT_MAX: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Id,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Group {
    pub id: Id,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// Raw post row. `pub_date` is assigned at insert and never updated.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Post {
    pub id: Id,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: Id,
    pub group_id: Option<Id>,
    pub image: Option<String>, // media path reference, e.g. "posts/<hash>"
}

/// Post as shown in listings and detail views: author, group and comment
/// count come pre-joined so listings never issue per-row queries.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct PostView {
    pub id: Id,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author: String,
    pub group_id: Option<Id>,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
    pub image: Option<String>,
    pub comment_count: i64,
}

/// Form payload for creating or editing a post. Author and `pub_date` are
/// never part of the payload; the server assigns both.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostInput {
    pub text: String,
    pub group: Option<Id>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Comment {
    pub id: Id,
    pub post_id: Option<Id>,
    pub author_id: Id,
    pub text: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct CommentView {
    pub id: Id,
    pub author: String,
    pub text: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentInput {
    pub text: String,
}

/// A directed follow edge: `user` follows `author`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Follow {
    pub id: Id,
    pub user_id: Id,
    pub author_id: Id,
}

/// One failed field in a mutation payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

impl NewGroup {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(FieldError::new("title", "title is required"));
        }
        if self.title.chars().count() > GROUP_TITLE_MAX {
            errors.push(FieldError::new("title", "title exceeds 200 characters"));
        }
        if self.slug.is_empty()
            || !self.slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            errors.push(FieldError::new("slug", "slug must be a URL-safe token"));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl PostInput {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.text.trim().is_empty() {
            errors.push(FieldError::new("text", "text is required"));
        }
        if self.text.chars().count() > POST_TEXT_MAX {
            errors.push(FieldError::new("text", "text is too long"));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl CommentInput {
    pub fn is_valid(&self) -> bool {
        !self.text.trim().is_empty()
    }
}
