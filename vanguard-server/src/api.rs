use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Form, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use vanguard::cluster::{self, FeedItem};
use vanguard::form::{self, post_meta_from_form, required_field};
use vanguard::models::{Category, Comment, CommentId, NewComment, NewPost, Post, PostFilter, PostId, ReactionCount, UserId};
use vanguard::notify::PostEvent;
use vanguard::pagination::{paginate, PageQuery, PaginatedResult};
use vanguard::reactions::validate_emoji;
use vanguard::storage::{StoreError, StoreStats};
use vanguard::threading::{thread_comments, CommentThread};

use crate::error::ApiError;
use crate::AppState;

pub const USER_HEADER: &str = "x-vanguard-user";
const MAX_COMMENT_CHARS: usize = 2000;

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

// Identity is established by the fronting proxy; we only read the id it forwards.
fn current_user(headers: &HeaderMap) -> Result<UserId, ApiError> {
    headers
        .get(USER_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.trim().parse::<UserId>().ok())
        .ok_or(ApiError::Unauthorized)
}

fn spawn_publish_notification(state: &AppState, post: &Post) {
    let notifier = state.notifier.clone();
    let event = PostEvent::published(post);
    tokio::spawn(async move {
        if let Err(e) = notifier.publish(&event).await {
            warn!("notify failed for post {}: {e}", event.post_id);
        }
    });
}

fn published_post(state: &AppState, id: PostId) -> Result<Post, ApiError> {
    state.store.get_post(id)?.filter(|p| p.published).ok_or(ApiError::NotFound)
}

async fn fetch_posts(state: &AppState, filter: PostFilter, cursor: Option<&str>) -> Result<PaginatedResult<Post>, StoreError> {
    let store = state.store.clone();
    paginate(
        move |q: PageQuery<PostFilter>| async move { store.list_posts(&q.params, q.offset, q.limit) },
        filter,
        cursor,
        state.per_page,
    )
    .await
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<StoreStats>, ApiError> {
    Ok(Json(state.store.stats()?))
}

pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.store.list_categories()?))
}

#[derive(Deserialize)]
pub struct CategoryReq {
    pub name: String,
}

pub async fn put_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Json(req): Json<CategoryReq>,
) -> Result<Json<Category>, ApiError> {
    current_user(&headers)?;
    let slug = slug.trim().to_ascii_lowercase();
    let valid = !slug.is_empty() && slug.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-');
    if !valid || req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("category needs a slug of [a-z0-9-] and a name".into()));
    }
    let category = Category { slug, name: req.name.trim().to_string() };
    state.store.upsert_category(category.clone())?;
    Ok(Json(category))
}

#[derive(Deserialize)]
pub struct PostsQuery {
    pub cursor: Option<String>,
    pub category: Option<String>,
    pub author: Option<UserId>,
}

pub async fn list_posts(
    State(state): State<AppState>,
    Query(q): Query<PostsQuery>,
) -> Result<Json<PaginatedResult<Post>>, ApiError> {
    let filter = PostFilter { category: q.category, author: q.author };
    Ok(Json(fetch_posts(&state, filter, q.cursor.as_deref()).await?))
}

#[derive(Deserialize)]
pub struct HomeQuery {
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct HomeResp {
    pub featured: Option<Post>,
    pub items: Vec<FeedItem<Post>>,
    pub cursor: String,
    pub per_page: usize,
    pub next_cursor: String,
    pub prev_cursor: String,
}

/// Clustered home feed. Only the first page leads with a featured post.
pub async fn home(State(state): State<AppState>, Query(q): Query<HomeQuery>) -> Result<Json<HomeResp>, ApiError> {
    let page = fetch_posts(&state, PostFilter::default(), q.cursor.as_deref()).await?;
    let (featured, items) = if page.has_prev() {
        (None, cluster::cluster_posts(page.result, &state.clustered))
    } else {
        let feed = cluster::home_feed(page.result, &state.clustered);
        (feed.featured, feed.items)
    };
    Ok(Json(HomeResp {
        featured,
        items,
        cursor: page.cursor,
        per_page: page.per_page,
        next_cursor: page.next_cursor,
        prev_cursor: page.prev_cursor,
    }))
}

#[derive(Serialize)]
pub struct PostDetail {
    pub post: Post,
    pub comments: CommentThread,
    pub reactions: Vec<ReactionCount>,
}

pub async fn post_detail(State(state): State<AppState>, Path(id): Path<PostId>) -> Result<Json<PostDetail>, ApiError> {
    let post = published_post(&state, id)?;
    let comments = thread_comments(state.store.comments_for_post(id)?);
    let reactions = state.store.reaction_counts(id)?;
    Ok(Json(PostDetail { post, comments, reactions }))
}

/// Editor form submit. Accepts `title`, `body`, `category`, `meta[i].label`,
/// `meta[i].value` and an optional `publish` flag.
pub async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let author_id = current_user(&headers)?;
    let new_post = NewPost {
        author_id,
        category: required_field(&pairs, "category")?,
        title: required_field(&pairs, "title")?,
        body: required_field(&pairs, "body")?,
        meta: post_meta_from_form(&pairs)?,
        created_at: now_secs(),
    };
    let mut post = state.store.create_post(new_post)?;
    info!("post {} created by {author_id} in {}", post.id, post.category);

    let publish = form::field(&pairs, "publish").is_some_and(|v| matches!(v.trim(), "true" | "on" | "1"));
    if publish {
        post = state.store.publish_post(post.id, now_secs())?;
        spawn_publish_notification(&state, &post);
    }
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn publish_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<PostId>,
) -> Result<Json<Post>, ApiError> {
    let user = current_user(&headers)?;
    let draft = state.store.get_post(id)?.ok_or(ApiError::NotFound)?;
    if draft.author_id != user {
        return Err(ApiError::Forbidden);
    }
    if draft.published {
        return Ok(Json(draft));
    }
    let post = state.store.publish_post(id, now_secs())?;
    info!("post {id} published");
    spawn_publish_notification(&state, &post);
    Ok(Json(post))
}

#[derive(Deserialize)]
pub struct CommentReq {
    pub body: String,
    pub parent_id: Option<CommentId>,
}

pub async fn add_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<PostId>,
    Json(req): Json<CommentReq>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let author_id = current_user(&headers)?;
    published_post(&state, id)?;
    let body = req.body.trim();
    if body.is_empty() {
        return Err(ApiError::BadRequest("comment cannot be empty".into()));
    }
    if body.chars().count() > MAX_COMMENT_CHARS {
        return Err(ApiError::BadRequest(format!("comment too long (max {MAX_COMMENT_CHARS} characters)")));
    }
    let comment = state.store.add_comment(NewComment {
        post_id: id,
        parent_id: req.parent_id,
        author_id,
        body: body.to_string(),
        created_at: now_secs(),
    })?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<CommentId>,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&headers)?;
    let comment = state.store.get_comment(id)?.filter(|c| !c.deleted).ok_or(ApiError::NotFound)?;
    if comment.author_id != user {
        return Err(ApiError::Forbidden);
    }
    state.store.delete_comment(id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ReactionReq {
    pub emoji: String,
}

#[derive(Serialize)]
pub struct ReactionResp {
    pub active: bool,
    pub reactions: Vec<ReactionCount>,
}

pub async fn react(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<PostId>,
    Json(req): Json<ReactionReq>,
) -> Result<Json<ReactionResp>, ApiError> {
    let user = current_user(&headers)?;
    let emoji = validate_emoji(&req.emoji)?;
    published_post(&state, id)?;
    let active = state.store.toggle_reaction(id, user, &emoji)?;
    Ok(Json(ReactionResp { active, reactions: state.store.reaction_counts(id)? }))
}
