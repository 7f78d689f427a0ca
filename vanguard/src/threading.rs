//! Groups a post's flat comment list into top-level comments and their replies.
//!
//! Only one level of nesting is produced. A reply to a reply is keyed under its
//! direct parent, which is never a top-level comment, so [`CommentThread::children_of`]
//! will not surface it when walking from the top level. Keep threads shallow.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{Comment, CommentId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommentThread {
    pub top_level: Vec<Comment>,
    pub children: HashMap<CommentId, Vec<Comment>>,
}

impl CommentThread {
    /// Replies keyed under `id`, oldest first. Empty when there are none.
    pub fn children_of(&self, id: CommentId) -> &[Comment] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Comments reachable from the top level: top-level ones plus their direct replies.
    pub fn visible_len(&self) -> usize {
        self.top_level.iter().map(|c| 1 + self.children_of(c.id).len()).sum()
    }
}

/// Single pass over comments ordered by `created_at` ascending.
///
/// Ordering is the caller's responsibility and is only checked in debug builds.
/// Soft-deleted comments are skipped even though the store already filters them.
pub fn thread_comments<I>(comments: I) -> CommentThread
where
    I: IntoIterator<Item = Comment>,
{
    let mut thread = CommentThread::default();
    let mut last_ts = 0u64;
    for comment in comments {
        debug_assert!(comment.created_at >= last_ts, "comments must be ordered by created_at");
        last_ts = comment.created_at;
        if comment.deleted {
            continue;
        }
        match comment.parent_id {
            None => thread.top_level.push(comment),
            Some(parent) => thread.children.entry(parent).or_default().push(comment),
        }
    }
    thread
}
