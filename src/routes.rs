use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::auth::Auth;
use crate::cache::{ResponseCache, INDEX_CACHE_KEY};
use crate::error::ApiError;
use crate::models::*;
use crate::pagination::{paginate, parse_page_param, POSTS_PER_PAGE};
use crate::repo::{Repo, RepoError};
use crate::storage::{MediaStore, MediaStoreError};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(web::resource("/posts").route(web::get().to(index)).route(web::post().to(create_post)))
            .service(web::resource("/posts/{id}").route(web::get().to(post_detail)))
            .service(web::resource("/posts/{id}/edit").route(web::post().to(edit_post)))
            .service(
                web::resource("/posts/{id}/comments").route(web::post().to(add_comment)),
            )
            .service(
                web::resource("/groups")
                    .route(web::get().to(list_groups))
                    .route(web::post().to(create_group)),
            )
            .service(web::resource("/groups/{slug}/posts").route(web::get().to(group_posts)))
            .service(web::resource("/profiles/{username}").route(web::get().to(profile)))
            .service(
                web::resource("/profiles/{username}/follow").route(web::post().to(follow_author)),
            )
            .service(
                web::resource("/profiles/{username}/unfollow")
                    .route(web::post().to(unfollow_author)),
            )
            .service(web::resource("/feed").route(web::get().to(feed)))
            .service(web::resource("/media").route(web::post().to(upload_media)))
            // Admin moderation endpoints
            .service(web::resource("/admin/groups/{id}").route(web::delete().to(admin_delete_group)))
            .service(web::resource("/admin/posts/{id}").route(web::delete().to(admin_delete_post)))
            .service(
                web::resource("/admin/users/{username}").route(web::delete().to(admin_delete_user)),
            )
            .service(web::resource("/admin/cache/clear").route(web::post().to(admin_clear_cache))),
    );
    // public fetch route (no /api/v1 prefix so <img src="/media/..."> works)
    cfg.route("/media/{path:.*}", web::get().to(serve_media));
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub media: Arc<dyn MediaStore>,
    pub cache: Arc<ResponseCache>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

fn redirect(location: String) -> HttpResponse {
    HttpResponse::Found()
        .insert_header(("Location", location))
        .finish()
}

fn profile_path(username: &str) -> String {
    format!("/api/v1/profiles/{username}")
}

fn detail_path(post_id: Id) -> String {
    format!("/api/v1/posts/{post_id}")
}

#[utoipa::path(
    get,
    path = "/api/v1/posts",
    params(("page" = Option<String>, Query, description = "1-indexed page; invalid values fall back to 1, out of range clamps")),
    responses(
        (status = 200, description = "Home listing context: page_obj over all posts, newest first. Served from the response cache within its TTL.")
    )
)]
pub async fn index(
    data: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    // the cache holds one entry for the whole page, identity- and
    // query-agnostic; fresh posts only show up after expiry or clear
    if let Some(hit) = data.cache.get(INDEX_CACHE_KEY) {
        return Ok(HttpResponse::Ok()
            .content_type(hit.content_type)
            .body(hit.body));
    }
    let page_number = parse_page_param(query.page.as_deref());
    let posts = data.repo.list_posts().await?;
    let page_obj = paginate(posts, POSTS_PER_PAGE, page_number);
    let ctx = serde_json::json!({
        "text": "Latest updates on the site",
        "page_obj": page_obj,
    });
    let body = serde_json::to_vec(&ctx).map_err(|_| ApiError::Internal)?;
    data.cache.set(INDEX_CACHE_KEY, body.clone(), "application/json");
    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}

#[utoipa::path(
    get,
    path = "/api/v1/groups",
    responses((status = 200, description = "Group directory", body = [Group]))
)]
pub async fn list_groups(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let groups = data.repo.list_groups().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "groups": groups })))
}

#[utoipa::path(
    post,
    path = "/api/v1/groups",
    request_body = NewGroup,
    responses(
        (status = 201, description = "Group created", body = Group),
        (status = 400, description = "Validation failed (including a taken slug)"),
        (status = 403, description = "Admins only")
    )
)]
pub async fn create_group(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewGroup>,
) -> Result<HttpResponse, ApiError> {
    if !auth.0.is_admin() {
        return Err(ApiError::Forbidden);
    }
    payload.validate().map_err(ApiError::Validation)?;
    let group = match data.repo.create_group(payload.into_inner()).await {
        Ok(g) => g,
        Err(RepoError::Conflict) => {
            return Err(ApiError::Validation(vec![FieldError::new(
                "slug",
                "slug is already in use",
            )]))
        }
        Err(e) => return Err(e.into()),
    };
    Ok(HttpResponse::Created().json(group))
}

#[utoipa::path(
    get,
    path = "/api/v1/groups/{slug}/posts",
    params(
        ("slug" = String, Path, description = "Group slug"),
        ("page" = Option<String>, Query, description = "1-indexed page")
    ),
    responses(
        (status = 200, description = "Group listing context: group plus page_obj"),
        (status = 404, description = "Group not found")
    )
)]
pub async fn group_posts(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let group = data.repo.get_group_by_slug(&path.into_inner()).await?;
    let posts = data.repo.list_posts_by_group(group.id).await?;
    let page_obj = paginate(posts, POSTS_PER_PAGE, parse_page_param(query.page.as_deref()));
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "group": group,
        "page_obj": page_obj,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/profiles/{username}",
    params(
        ("username" = String, Path, description = "Author username"),
        ("page" = Option<String>, Query, description = "1-indexed page")
    ),
    responses(
        (status = 200, description = "Profile context: author, page_obj and the viewer's follow flag"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn profile(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let author = data.repo.get_user_by_username(&path.into_inner()).await?;
    let posts = data.repo.list_posts_by_author(author.id).await?;
    let page_obj = paginate(posts, POSTS_PER_PAGE, parse_page_param(query.page.as_deref()));
    let following = match auth {
        Some(a) => match data.repo.get_user_by_username(&a.0.username).await {
            Ok(viewer) => data.repo.is_following(viewer.id, author.id).await?,
            Err(_) => false, // viewer has no row yet, so no edges either
        },
        None => false,
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "author": author,
        "page_obj": page_obj,
        "following": following,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}",
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 200, description = "Detail context: post, comments (newest first) and is_edit for the author"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn post_detail(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let post = data.repo.get_post(path.into_inner()).await?;
    let comments = data.repo.list_comments(post.id).await?;
    let is_edit = auth.map(|a| a.0.username == post.author).unwrap_or(false);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "post": post,
        "comments": comments,
        "is_edit": is_edit,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/feed",
    params(("page" = Option<String>, Query, description = "1-indexed page")),
    responses(
        (status = 200, description = "Followed-authors listing for the viewer"),
        (status = 302, description = "Login required")
    )
)]
pub async fn feed(
    auth: Auth,
    data: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let viewer = data.repo.ensure_user(&auth.0.username).await?;
    let posts = data.repo.list_feed(viewer.id).await?;
    let page_obj = paginate(posts, POSTS_PER_PAGE, parse_page_param(query.page.as_deref()));
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "text": "Latest posts from authors you follow",
        "page_obj": page_obj,
    })))
}

/// Resolve the optional group on a post payload to a validation error
/// instead of a bare 404: the form redisplays with a field message.
async fn check_group(data: &AppState, input: &PostInput) -> Result<(), ApiError> {
    if let Some(gid) = input.group {
        if data.repo.get_group(gid).await.is_err() {
            return Err(ApiError::Validation(vec![FieldError::new(
                "group",
                "unknown group",
            )]));
        }
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/posts",
    request_body = PostInput,
    responses(
        (status = 302, description = "Created; redirects to the author's profile"),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_post(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<PostInput>,
) -> Result<HttpResponse, ApiError> {
    payload.validate().map_err(ApiError::Validation)?;
    check_group(&data, &payload).await?;
    let author = data.repo.ensure_user(&auth.0.username).await?;
    data.repo.create_post(author.id, payload.into_inner()).await?;
    Ok(redirect(profile_path(&author.username)))
}

#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/edit",
    request_body = PostInput,
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 302, description = "Redirects to the post detail view; a non-author is redirected without mutation"),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn edit_post(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<PostInput>,
) -> Result<HttpResponse, ApiError> {
    let post = data.repo.get_post(path.into_inner()).await?;
    if post.author != auth.0.username {
        // silent authorization failure: read-only view, no error surfaced
        return Ok(redirect(detail_path(post.id)));
    }
    payload.validate().map_err(ApiError::Validation)?;
    check_group(&data, &payload).await?;
    data.repo.update_post(post.id, payload.into_inner()).await?;
    Ok(redirect(detail_path(post.id)))
}

#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/comments",
    request_body = CommentInput,
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 302, description = "Redirects to the post detail view; blank text is dropped without persisting"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn add_comment(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<CommentInput>,
) -> Result<HttpResponse, ApiError> {
    let post = data.repo.get_post(path.into_inner()).await?;
    if payload.is_valid() {
        let author = data.repo.ensure_user(&auth.0.username).await?;
        data.repo
            .create_comment(post.id, author.id, payload.text.trim().to_string())
            .await?;
    }
    Ok(redirect(detail_path(post.id)))
}

#[utoipa::path(
    post,
    path = "/api/v1/profiles/{username}/follow",
    params(("username" = String, Path, description = "Author to follow")),
    responses(
        (status = 302, description = "Redirects to the author's profile; repeat and self follows are no-ops"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn follow_author(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let author = data.repo.get_user_by_username(&path.into_inner()).await?;
    let viewer = data.repo.ensure_user(&auth.0.username).await?;
    match data.repo.follow(viewer.id, author.id).await {
        // self-follow and duplicate edges are no-ops, never errors
        Ok(()) | Err(RepoError::Conflict) => {}
        Err(e) => return Err(e.into()),
    }
    Ok(redirect(profile_path(&author.username)))
}

#[utoipa::path(
    post,
    path = "/api/v1/profiles/{username}/unfollow",
    params(("username" = String, Path, description = "Author to unfollow")),
    responses(
        (status = 302, description = "Redirects to the author's profile; absent edges are a no-op"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn unfollow_author(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let author = data.repo.get_user_by_username(&path.into_inner()).await?;
    let viewer = data.repo.ensure_user(&auth.0.username).await?;
    data.repo.unfollow(viewer.id, author.id).await?;
    Ok(redirect(profile_path(&author.username)))
}

// ---------------- Admin moderation handlers -----------------------

macro_rules! ensure_admin {
    ($auth:expr) => {
        if !$auth.0.is_admin() {
            return Err(ApiError::Forbidden);
        }
    };
}

pub async fn admin_delete_group(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    // posts referencing the group survive with group = null
    data.repo.delete_group(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn admin_delete_post(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    let post = data.repo.get_post(path.into_inner()).await?;
    data.repo.delete_post(post.id).await?;
    // blob cleanup is best-effort; the row is already gone
    if let Some(image) = post.image {
        if let Err(e) = data.media.delete(&image).await {
            log::warn!("failed to remove media '{image}': {e}");
        }
    }
    Ok(HttpResponse::NoContent().finish())
}

pub async fn admin_delete_user(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    let username = path.into_inner();
    // collect media references before the cascade removes the posts
    let images: Vec<String> = match data.repo.get_user_by_username(&username).await {
        Ok(user) => data
            .repo
            .list_posts_by_author(user.id)
            .await?
            .into_iter()
            .filter_map(|p| p.image)
            .collect(),
        Err(_) => Vec::new(),
    };
    data.repo.delete_user(&username).await?;
    for image in images {
        if let Err(e) = data.media.delete(&image).await {
            log::warn!("failed to remove media '{image}': {e}");
        }
    }
    Ok(HttpResponse::NoContent().finish())
}

pub async fn admin_clear_cache(
    auth: Auth,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    ensure_admin!(auth);
    data.cache.clear();
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}

// ---------------- Media upload / fetch ----------------------------

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct MediaUploadResponse {
    pub path: String,
    pub mime: String,
    pub size: usize,
    pub duplicate: bool, // true when the bytes were already stored (idempotent)
}

const MEDIA_SIZE_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

const ALLOWED_MIME: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

#[utoipa::path(
    post,
    path = "/api/v1/media",
    responses(
        (status = 201, description = "Image stored", body = MediaUploadResponse),
        (status = 200, description = "Image already existed (idempotent)", body = MediaUploadResponse),
        (status = 415, description = "Unsupported media type"),
        (status = 413, description = "Payload too large")
    )
)]
pub async fn upload_media(
    _auth: Auth,
    data: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    use actix_web::http::StatusCode;
    let mut bytes: Vec<u8> = Vec::new();
    while let Some(field) = payload.try_next().await.map_err(|e| {
        log::error!("multipart error: {e}");
        ApiError::Internal
    })? {
        match field.content_disposition().get_name() {
            Some("file") => {}
            _ => continue,
        }
        let mut field_stream = field;
        let mut hasher = Sha256::new();
        while let Some(chunk) = field_stream.try_next().await.map_err(|e| {
            log::error!("stream read error: {e}");
            ApiError::Internal
        })? {
            if bytes.len() + chunk.len() > MEDIA_SIZE_LIMIT {
                return Ok(HttpResponse::build(StatusCode::PAYLOAD_TOO_LARGE).finish());
            }
            hasher.update(&chunk);
            bytes.extend_from_slice(&chunk);
        }
        let hash = format!("{:x}", hasher.finalize());
        let mime = infer::get(&bytes)
            .map(|t| t.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        if !ALLOWED_MIME.contains(&mime.as_str()) {
            return Ok(HttpResponse::UnsupportedMediaType().finish());
        }
        // content-addressed path, this is what Post.image stores
        let path = format!("posts/{hash}");
        let (status, duplicate) = match data.media.save(&path, &mime, &bytes).await {
            Ok(()) => (StatusCode::CREATED, false),
            Err(MediaStoreError::Duplicate) => (StatusCode::OK, true),
            Err(e) => {
                log::error!("media save error: {e}");
                return Err(ApiError::Internal);
            }
        };
        let resp = MediaUploadResponse { path, mime, size: bytes.len(), duplicate };
        return Ok(HttpResponse::build(status).json(resp));
    }
    Ok(HttpResponse::BadRequest().finish())
}

pub async fn serve_media(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let path = path.into_inner();
    match data.media.load(&path).await {
        Ok((bytes, mime)) => Ok(HttpResponse::Ok()
            .insert_header(("Content-Type", mime))
            .body(bytes)),
        Err(MediaStoreError::NotFound) => Err(ApiError::NotFound),
        Err(e) => {
            log::error!("media load error: {e}");
            Err(ApiError::Internal)
        }
    }
}
