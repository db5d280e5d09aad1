use crate::models::{
    Comment, CommentInput, CommentView, FieldError, Follow, Group, NewGroup, Post, PostInput,
    PostView, User,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::index,
        crate::routes::list_groups,
        crate::routes::create_group,
        crate::routes::group_posts,
        crate::routes::profile,
        crate::routes::post_detail,
        crate::routes::feed,
        crate::routes::create_post,
        crate::routes::edit_post,
        crate::routes::add_comment,
        crate::routes::follow_author,
        crate::routes::unfollow_author,
        crate::routes::upload_media,
    ),
    components(schemas(
        User, Group, NewGroup, Post, PostView, PostInput,
        Comment, CommentView, CommentInput, Follow, FieldError,
        crate::routes::MediaUploadResponse
    )),
    tags(
        (name = "posts", description = "Post listings and authoring"),
        (name = "groups", description = "Group directory"),
        (name = "profiles", description = "Author profiles and follow edges"),
    )
)]
pub struct ApiDoc;
