use serde::{Deserialize, Serialize};

pub type PostId = u64;
pub type CommentId = u64;
pub type UserId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub slug: String,
    pub name: String,
}

/// Labelled link or fact attached to a post (e.g. "Ticket" -> "OPS-1182").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMeta {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    /// Category slug.
    pub category: String,
    pub title: String,
    /// Markdown source, rendered by the client.
    pub body: String,
    pub meta: Vec<PostMeta>,
    pub published: bool,
    pub created_at: u64,
    pub published_at: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: UserId,
    pub category: String,
    pub title: String,
    pub body: String,
    pub meta: Vec<PostMeta>,
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub author_id: UserId,
    pub body: String,
    pub created_at: u64,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub author_id: UserId,
    pub body: String,
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCount {
    pub emoji: String,
    pub count: usize,
}

/// Narrowing applied to the post feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostFilter {
    pub category: Option<String>,
    pub author: Option<UserId>,
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        self.category.as_deref().is_none_or(|c| c == post.category) && self.author.is_none_or(|a| a == post.author_id)
    }
}
