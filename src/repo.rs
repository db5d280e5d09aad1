use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("store error: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

use async_trait::async_trait;

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Materialize a user row for an identity-provider username. Idempotent.
    async fn ensure_user(&self, username: &str) -> RepoResult<User>;
    async fn get_user_by_username(&self, username: &str) -> RepoResult<User>;
    /// Deletes the user and, by cascade, their posts, comments and follow
    /// edges in both directions.
    async fn delete_user(&self, username: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait GroupRepo: Send + Sync {
    async fn list_groups(&self) -> RepoResult<Vec<Group>>;
    async fn get_group(&self, id: Id) -> RepoResult<Group>;
    async fn get_group_by_slug(&self, slug: &str) -> RepoResult<Group>;
    async fn create_group(&self, new: NewGroup) -> RepoResult<Group>;
    /// Referencing posts survive with `group_id` set to NULL.
    async fn delete_group(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn list_posts(&self) -> RepoResult<Vec<PostView>>;
    async fn list_posts_by_group(&self, group_id: Id) -> RepoResult<Vec<PostView>>;
    async fn list_posts_by_author(&self, author_id: Id) -> RepoResult<Vec<PostView>>;
    /// Posts whose author has a follow edge with `follower == viewer`.
    async fn list_feed(&self, viewer_id: Id) -> RepoResult<Vec<PostView>>;
    async fn get_post(&self, id: Id) -> RepoResult<PostView>;
    async fn create_post(&self, author_id: Id, input: PostInput) -> RepoResult<PostView>;
    /// Replaces text/group/image. `pub_date` and author are untouchable.
    async fn update_post(&self, id: Id, input: PostInput) -> RepoResult<PostView>;
    async fn delete_post(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    /// Newest-first.
    async fn list_comments(&self, post_id: Id) -> RepoResult<Vec<CommentView>>;
    async fn create_comment(&self, post_id: Id, author_id: Id, text: String) -> RepoResult<CommentView>;
}

#[async_trait]
pub trait FollowRepo: Send + Sync {
    /// Self-follow is rejected with `Conflict`; an existing edge makes this
    /// a no-op. Never creates a duplicate edge.
    async fn follow(&self, user_id: Id, author_id: Id) -> RepoResult<()>;
    /// No-op when no edge exists.
    async fn unfollow(&self, user_id: Id, author_id: Id) -> RepoResult<()>;
    async fn is_following(&self, user_id: Id, author_id: Id) -> RepoResult<bool>;
}

pub trait Repo: UserRepo + GroupRepo + PostRepo + CommentRepo + FollowRepo {}

impl<T> Repo for T where T: UserRepo + GroupRepo + PostRepo + CommentRepo + FollowRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use chrono::Utc;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, RwLock};

    const SNAPSHOT_PATH: &str = "data/state.json";

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        users: HashMap<Id, User>,
        groups: HashMap<Id, Group>,
        posts: HashMap<Id, Post>,
        comments: HashMap<Id, Comment>,
        follows: HashMap<Id, Follow>,
        next_id: Id,
    }

    impl State {
        fn view_of(&self, p: &Post) -> Option<PostView> {
            let author = self.users.get(&p.author_id)?;
            let group = p.group_id.and_then(|gid| self.groups.get(&gid));
            let comment_count = self
                .comments
                .values()
                .filter(|c| c.post_id == Some(p.id))
                .count() as i64;
            Some(PostView {
                id: p.id,
                text: p.text.clone(),
                pub_date: p.pub_date,
                author: author.username.clone(),
                group_id: group.map(|g| g.id),
                group_slug: group.map(|g| g.slug.clone()),
                group_title: group.map(|g| g.title.clone()),
                image: p.image.clone(),
                comment_count,
            })
        }

        fn sorted_views<'a, I: Iterator<Item = &'a Post>>(&self, posts: I) -> Vec<PostView> {
            let mut v: Vec<PostView> = posts.filter_map(|p| self.view_of(p)).collect();
            // newest first, id breaks same-instant ties
            v.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
            v
        }
    }

    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Arc<PathBuf>,
    }

    impl InMemRepo {
        fn snapshot_path() -> PathBuf {
            match std::env::var("QUILL_DATA_DIR") {
                Ok(dir) => {
                    let mut p = PathBuf::from(dir);
                    p.push("state.json");
                    p
                }
                Err(_) => PathBuf::from(SNAPSHOT_PATH),
            }
        }

        fn load_state_from(path: &Path) -> State {
            match std::fs::read(path) {
                Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                    Ok(s) => s,
                    Err(e) => {
                        log::warn!("failed to parse snapshot '{}': {e}; starting empty", path.display());
                        State::default()
                    }
                },
                Err(_) => State::default(),
            }
        }

        fn persist(&self) {
            let path = self.snapshot_path.clone();
            if let Ok(s) = serde_json::to_vec_pretty(&*self.state.read().unwrap()) {
                if let Some(dir) = path.parent() {
                    let _ = std::fs::create_dir_all(dir);
                }
                if let Err(e) = std::fs::write(&*path, s) {
                    log::error!("failed to write snapshot '{}': {e}", path.display());
                }
            }
        }

        pub fn new() -> Self {
            let snapshot_path = Self::snapshot_path();
            let state = Self::load_state_from(&snapshot_path);
            Self {
                state: Arc::new(RwLock::new(state)),
                snapshot_path: Arc::new(snapshot_path),
            }
        }

        fn next_id(state: &mut State) -> Id {
            state.next_id += 1;
            state.next_id
        }
    }

    impl Default for InMemRepo {
        fn default() -> Self { Self::new() }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn ensure_user(&self, username: &str) -> RepoResult<User> {
            let mut s = self.state.write().unwrap();
            if let Some(u) = s.users.values().find(|u| u.username == username) {
                return Ok(u.clone());
            }
            let id = Self::next_id(&mut s);
            let user = User { id, username: username.to_string() };
            s.users.insert(id, user.clone());
            drop(s);
            self.persist();
            Ok(user)
        }
        async fn get_user_by_username(&self, username: &str) -> RepoResult<User> {
            let s = self.state.read().unwrap();
            s.users
                .values()
                .find(|u| u.username == username)
                .cloned()
                .ok_or(RepoError::NotFound)
        }
        async fn delete_user(&self, username: &str) -> RepoResult<()> {
            let mut s = self.state.write().unwrap();
            let user = s
                .users
                .values()
                .find(|u| u.username == username)
                .cloned()
                .ok_or(RepoError::NotFound)?;
            s.users.remove(&user.id);
            let dead_posts: Vec<Id> = s
                .posts
                .values()
                .filter(|p| p.author_id == user.id)
                .map(|p| p.id)
                .collect();
            s.posts.retain(|_, p| p.author_id != user.id);
            s.comments.retain(|_, c| {
                c.author_id != user.id
                    && !c.post_id.map(|pid| dead_posts.contains(&pid)).unwrap_or(false)
            });
            s.follows
                .retain(|_, f| f.user_id != user.id && f.author_id != user.id);
            drop(s);
            self.persist();
            Ok(())
        }
    }

    #[async_trait]
    impl GroupRepo for InMemRepo {
        async fn list_groups(&self) -> RepoResult<Vec<Group>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s.groups.values().cloned().collect();
            v.sort_by_key(|g| g.id);
            Ok(v)
        }
        async fn get_group(&self, id: Id) -> RepoResult<Group> {
            let s = self.state.read().unwrap();
            s.groups.get(&id).cloned().ok_or(RepoError::NotFound)
        }
        async fn get_group_by_slug(&self, slug: &str) -> RepoResult<Group> {
            let s = self.state.read().unwrap();
            s.groups
                .values()
                .find(|g| g.slug == slug)
                .cloned()
                .ok_or(RepoError::NotFound)
        }
        async fn create_group(&self, new: NewGroup) -> RepoResult<Group> {
            let mut s = self.state.write().unwrap();
            if s.groups.values().any(|g| g.slug == new.slug) {
                return Err(RepoError::Conflict);
            }
            let id = Self::next_id(&mut s);
            let group = Group { id, title: new.title, slug: new.slug, description: new.description };
            s.groups.insert(id, group.clone());
            drop(s);
            self.persist();
            Ok(group)
        }
        async fn delete_group(&self, id: Id) -> RepoResult<()> {
            let mut s = self.state.write().unwrap();
            s.groups.remove(&id).ok_or(RepoError::NotFound)?;
            // SET NULL, never cascade: posts outlive their group
            for p in s.posts.values_mut() {
                if p.group_id == Some(id) {
                    p.group_id = None;
                }
            }
            drop(s);
            self.persist();
            Ok(())
        }
    }

    #[async_trait]
    impl PostRepo for InMemRepo {
        async fn list_posts(&self) -> RepoResult<Vec<PostView>> {
            let s = self.state.read().unwrap();
            Ok(s.sorted_views(s.posts.values()))
        }
        async fn list_posts_by_group(&self, group_id: Id) -> RepoResult<Vec<PostView>> {
            let s = self.state.read().unwrap();
            Ok(s.sorted_views(s.posts.values().filter(|p| p.group_id == Some(group_id))))
        }
        async fn list_posts_by_author(&self, author_id: Id) -> RepoResult<Vec<PostView>> {
            let s = self.state.read().unwrap();
            Ok(s.sorted_views(s.posts.values().filter(|p| p.author_id == author_id)))
        }
        async fn list_feed(&self, viewer_id: Id) -> RepoResult<Vec<PostView>> {
            let s = self.state.read().unwrap();
            let followed: Vec<Id> = s
                .follows
                .values()
                .filter(|f| f.user_id == viewer_id)
                .map(|f| f.author_id)
                .collect();
            Ok(s.sorted_views(s.posts.values().filter(|p| followed.contains(&p.author_id))))
        }
        async fn get_post(&self, id: Id) -> RepoResult<PostView> {
            let s = self.state.read().unwrap();
            let p = s.posts.get(&id).ok_or(RepoError::NotFound)?;
            s.view_of(p).ok_or(RepoError::NotFound)
        }
        async fn create_post(&self, author_id: Id, input: PostInput) -> RepoResult<PostView> {
            let mut s = self.state.write().unwrap();
            if !s.users.contains_key(&author_id) {
                return Err(RepoError::NotFound);
            }
            if let Some(gid) = input.group {
                if !s.groups.contains_key(&gid) {
                    return Err(RepoError::NotFound);
                }
            }
            let id = Self::next_id(&mut s);
            let post = Post {
                id,
                text: input.text,
                pub_date: Utc::now(),
                author_id,
                group_id: input.group,
                image: input.image,
            };
            s.posts.insert(id, post.clone());
            let view = s.view_of(&post).ok_or(RepoError::NotFound)?;
            drop(s);
            self.persist();
            Ok(view)
        }
        async fn update_post(&self, id: Id, input: PostInput) -> RepoResult<PostView> {
            let mut s = self.state.write().unwrap();
            if let Some(gid) = input.group {
                if !s.groups.contains_key(&gid) {
                    return Err(RepoError::NotFound);
                }
            }
            let post = s.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
            post.text = input.text;
            post.group_id = input.group;
            post.image = input.image;
            // pub_date deliberately untouched
            let post = post.clone();
            let view = s.view_of(&post).ok_or(RepoError::NotFound)?;
            drop(s);
            self.persist();
            Ok(view)
        }
        async fn delete_post(&self, id: Id) -> RepoResult<()> {
            let mut s = self.state.write().unwrap();
            s.posts.remove(&id).ok_or(RepoError::NotFound)?;
            // comments cascade with their post
            s.comments.retain(|_, c| c.post_id != Some(id));
            drop(s);
            self.persist();
            Ok(())
        }
    }

    #[async_trait]
    impl CommentRepo for InMemRepo {
        async fn list_comments(&self, post_id: Id) -> RepoResult<Vec<CommentView>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<CommentView> = s
                .comments
                .values()
                .filter(|c| c.post_id == Some(post_id))
                .filter_map(|c| {
                    let author = s.users.get(&c.author_id)?;
                    Some(CommentView {
                        id: c.id,
                        author: author.username.clone(),
                        text: c.text.clone(),
                        created: c.created,
                    })
                })
                .collect();
            v.sort_by(|a, b| b.id.cmp(&a.id)); // newest first
            Ok(v)
        }
        async fn create_comment(&self, post_id: Id, author_id: Id, text: String) -> RepoResult<CommentView> {
            let mut s = self.state.write().unwrap();
            if !s.posts.contains_key(&post_id) {
                return Err(RepoError::NotFound);
            }
            let author = s.users.get(&author_id).cloned().ok_or(RepoError::NotFound)?;
            let id = Self::next_id(&mut s);
            let comment = Comment {
                id,
                post_id: Some(post_id),
                author_id,
                text: text.clone(),
                created: Utc::now(),
            };
            s.comments.insert(id, comment.clone());
            drop(s);
            self.persist();
            Ok(CommentView { id, author: author.username, text, created: comment.created })
        }
    }

    #[async_trait]
    impl FollowRepo for InMemRepo {
        async fn follow(&self, user_id: Id, author_id: Id) -> RepoResult<()> {
            if user_id == author_id {
                return Err(RepoError::Conflict); // self-follow never creates an edge
            }
            let mut s = self.state.write().unwrap();
            if !s.users.contains_key(&user_id) || !s.users.contains_key(&author_id) {
                return Err(RepoError::NotFound);
            }
            if s.follows
                .values()
                .any(|f| f.user_id == user_id && f.author_id == author_id)
            {
                return Ok(()); // already following
            }
            let id = Self::next_id(&mut s);
            s.follows.insert(id, Follow { id, user_id, author_id });
            drop(s);
            self.persist();
            Ok(())
        }
        async fn unfollow(&self, user_id: Id, author_id: Id) -> RepoResult<()> {
            let mut s = self.state.write().unwrap();
            s.follows
                .retain(|_, f| !(f.user_id == user_id && f.author_id == author_id));
            drop(s);
            self.persist();
            Ok(())
        }
        async fn is_following(&self, user_id: Id, author_id: Id) -> RepoResult<bool> {
            let s = self.state.read().unwrap();
            Ok(s.follows
                .values()
                .any(|f| f.user_id == user_id && f.author_id == author_id))
        }
    }
}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::{Pool, Postgres};

    // One JOINed listing query; comment counts come from a correlated
    // subquery instead of per-row round trips.
    const POST_VIEW_SELECT: &str = r#"
        SELECT p.id, p.text, p.pub_date, u.username AS author,
               p.group_id, g.slug AS group_slug, g.title AS group_title,
               p.image,
               (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
        FROM posts p
        JOIN users u ON u.id = p.author_id
        LEFT JOIN "groups" g ON g.id = p.group_id
    "#;

    fn map_db(e: sqlx::Error) -> RepoError {
        match e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() || db.is_check_violation() => {
                RepoError::Conflict
            }
            other => RepoError::Internal(other.to_string()),
        }
    }

    #[derive(Clone)]
    pub struct PgRepo {
        pool: Pool<Postgres>,
    }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self {
            Self { pool }
        }

        async fn post_views(&self, tail: &str, binds: &[Id]) -> RepoResult<Vec<PostView>> {
            let sql = format!("{POST_VIEW_SELECT} {tail} ORDER BY p.pub_date DESC, p.id DESC");
            let mut q = sqlx::query_as::<_, PostView>(&sql);
            for b in binds {
                q = q.bind(*b);
            }
            q.fetch_all(&self.pool).await.map_err(map_db)
        }
    }

    #[async_trait]
    impl UserRepo for PgRepo {
        async fn ensure_user(&self, username: &str) -> RepoResult<User> {
            sqlx::query_as::<_, User>(
                "INSERT INTO users (username) VALUES ($1)
                 ON CONFLICT (username) DO UPDATE SET username = EXCLUDED.username
                 RETURNING id, username",
            )
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db)
        }
        async fn get_user_by_username(&self, username: &str) -> RepoResult<User> {
            sqlx::query_as::<_, User>("SELECT id, username FROM users WHERE username = $1")
                .bind(username)
                .fetch_one(&self.pool)
                .await
                .map_err(map_db)
        }
        async fn delete_user(&self, username: &str) -> RepoResult<()> {
            let res = sqlx::query("DELETE FROM users WHERE username = $1")
                .bind(username)
                .execute(&self.pool)
                .await
                .map_err(map_db)?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl GroupRepo for PgRepo {
        async fn list_groups(&self) -> RepoResult<Vec<Group>> {
            sqlx::query_as::<_, Group>(
                r#"SELECT id, title, slug, description FROM "groups" ORDER BY id"#,
            )
            .fetch_all(&self.pool)
            .await
            .map_err(map_db)
        }
        async fn get_group(&self, id: Id) -> RepoResult<Group> {
            sqlx::query_as::<_, Group>(
                r#"SELECT id, title, slug, description FROM "groups" WHERE id = $1"#,
            )
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db)
        }
        async fn get_group_by_slug(&self, slug: &str) -> RepoResult<Group> {
            sqlx::query_as::<_, Group>(
                r#"SELECT id, title, slug, description FROM "groups" WHERE slug = $1"#,
            )
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db)
        }
        async fn create_group(&self, new: NewGroup) -> RepoResult<Group> {
            sqlx::query_as::<_, Group>(
                r#"INSERT INTO "groups" (title, slug, description) VALUES ($1, $2, $3)
                   RETURNING id, title, slug, description"#,
            )
            .bind(&new.title)
            .bind(&new.slug)
            .bind(&new.description)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db)
        }
        async fn delete_group(&self, id: Id) -> RepoResult<()> {
            // posts.group_id is ON DELETE SET NULL in the schema
            let res = sqlx::query(r#"DELETE FROM "groups" WHERE id = $1"#)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(map_db)?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PostRepo for PgRepo {
        async fn list_posts(&self) -> RepoResult<Vec<PostView>> {
            self.post_views("", &[]).await
        }
        async fn list_posts_by_group(&self, group_id: Id) -> RepoResult<Vec<PostView>> {
            self.post_views("WHERE p.group_id = $1", &[group_id]).await
        }
        async fn list_posts_by_author(&self, author_id: Id) -> RepoResult<Vec<PostView>> {
            self.post_views("WHERE p.author_id = $1", &[author_id]).await
        }
        async fn list_feed(&self, viewer_id: Id) -> RepoResult<Vec<PostView>> {
            // follows is UNIQUE (user_id, author_id) so the join cannot fan out
            self.post_views(
                "JOIN follows f ON f.author_id = p.author_id WHERE f.user_id = $1",
                &[viewer_id],
            )
            .await
        }
        async fn get_post(&self, id: Id) -> RepoResult<PostView> {
            let sql = format!("{POST_VIEW_SELECT} WHERE p.id = $1");
            sqlx::query_as::<_, PostView>(&sql)
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(map_db)
        }
        async fn create_post(&self, author_id: Id, input: PostInput) -> RepoResult<PostView> {
            let rec: (Id,) = sqlx::query_as(
                "INSERT INTO posts (text, author_id, group_id, image)
                 VALUES ($1, $2, $3, $4) RETURNING id",
            )
            .bind(&input.text)
            .bind(author_id)
            .bind(input.group)
            .bind(&input.image)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db)?;
            self.get_post(rec.0).await
        }
        async fn update_post(&self, id: Id, input: PostInput) -> RepoResult<PostView> {
            // pub_date and author_id are never part of an UPDATE
            let res = sqlx::query(
                "UPDATE posts SET text = $2, group_id = $3, image = $4 WHERE id = $1",
            )
            .bind(id)
            .bind(&input.text)
            .bind(input.group)
            .bind(&input.image)
            .execute(&self.pool)
            .await
            .map_err(map_db)?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            self.get_post(id).await
        }
        async fn delete_post(&self, id: Id) -> RepoResult<()> {
            let res = sqlx::query("DELETE FROM posts WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(map_db)?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CommentRepo for PgRepo {
        async fn list_comments(&self, post_id: Id) -> RepoResult<Vec<CommentView>> {
            sqlx::query_as::<_, CommentView>(
                "SELECT c.id, u.username AS author, c.text, c.created
                 FROM comments c
                 JOIN users u ON u.id = c.author_id
                 WHERE c.post_id = $1
                 ORDER BY c.id DESC",
            )
            .bind(post_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db)
        }
        async fn create_comment(&self, post_id: Id, author_id: Id, text: String) -> RepoResult<CommentView> {
            let rec: (Id,) = sqlx::query_as(
                "INSERT INTO comments (post_id, author_id, text) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(post_id)
            .bind(author_id)
            .bind(&text)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                // FK violation on post_id means the post is gone
                if let sqlx::Error::Database(db) = &e {
                    if db.is_foreign_key_violation() {
                        return RepoError::NotFound;
                    }
                }
                map_db(e)
            })?;
            sqlx::query_as::<_, CommentView>(
                "SELECT c.id, u.username AS author, c.text, c.created
                 FROM comments c JOIN users u ON u.id = c.author_id WHERE c.id = $1",
            )
            .bind(rec.0)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db)
        }
    }

    #[async_trait]
    impl FollowRepo for PgRepo {
        async fn follow(&self, user_id: Id, author_id: Id) -> RepoResult<()> {
            if user_id == author_id {
                return Err(RepoError::Conflict);
            }
            // A concurrent duplicate insert hits the unique constraint and
            // degrades to "already following" via DO NOTHING.
            sqlx::query(
                "INSERT INTO follows (user_id, author_id) VALUES ($1, $2)
                 ON CONFLICT (user_id, author_id) DO NOTHING",
            )
            .bind(user_id)
            .bind(author_id)
            .execute(&self.pool)
            .await
            .map_err(map_db)?;
            Ok(())
        }
        async fn unfollow(&self, user_id: Id, author_id: Id) -> RepoResult<()> {
            sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
                .bind(user_id)
                .bind(author_id)
                .execute(&self.pool)
                .await
                .map_err(map_db)?;
            Ok(())
        }
        async fn is_following(&self, user_id: Id, author_id: Id) -> RepoResult<bool> {
            let rec: (bool,) = sqlx::query_as(
                "SELECT EXISTS(SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
            )
            .bind(user_id)
            .bind(author_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db)?;
            Ok(rec.0)
        }
    }
}
