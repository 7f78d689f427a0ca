use crate::models::{Category, Comment, CommentId, NewComment, NewPost, Post, PostFilter, PostId, ReactionCount, UserId};
use std::sync::Arc;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("post {0} not found")]
    PostNotFound(PostId),
    #[error("comment {0} not found")]
    CommentNotFound(CommentId),
    #[error("unknown category {0:?}")]
    UnknownCategory(String),
    #[error("parent comment {parent} is not a live comment on post {post}")]
    InvalidParent { post: PostId, parent: CommentId },
    #[error("internal error")]
    Internal,
}

pub type Store = Arc<dyn StoreTrait + Send + Sync + 'static>;

pub trait StoreTrait {
    fn upsert_category(&self, category: Category) -> Result<(), StoreError>;
    fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    fn create_post(&self, post: NewPost) -> Result<Post, StoreError>;
    fn get_post(&self, id: PostId) -> Result<Option<Post>, StoreError>;
    /// Mark a post published. Publishing twice keeps the first timestamp.
    fn publish_post(&self, id: PostId, at: u64) -> Result<Post, StoreError>;
    /// Published posts, newest first.
    fn list_posts(&self, filter: &PostFilter, offset: usize, limit: usize) -> Result<Vec<Post>, StoreError>;

    fn add_comment(&self, comment: NewComment) -> Result<Comment, StoreError>;
    fn get_comment(&self, id: CommentId) -> Result<Option<Comment>, StoreError>;
    fn delete_comment(&self, id: CommentId) -> Result<Comment, StoreError>;
    /// Live comments for a post, oldest first.
    fn comments_for_post(&self, post_id: PostId) -> Result<Vec<Comment>, StoreError>;

    /// Add the reaction, or remove it if the user already reacted with that emoji.
    /// Returns whether the reaction is now present.
    fn toggle_reaction(&self, post_id: PostId, user_id: UserId, emoji: &str) -> Result<bool, StoreError>;
    /// Counts per emoji in order of first use.
    fn reaction_counts(&self, post_id: PostId) -> Result<Vec<ReactionCount>, StoreError>;

    fn stats(&self) -> Result<StoreStats, StoreError>;
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub categories: usize,
    pub posts: usize,
    pub comments: usize,
    pub reactions: usize,
}

#[cfg(feature = "mem-store")]
pub use mem::MemStore;

#[cfg(feature = "mem-store")]
mod mem {
    use super::*;
    use itertools::Itertools;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Tables {
        categories: BTreeMap<String, Category>,
        posts: BTreeMap<PostId, Post>,
        comments: BTreeMap<CommentId, Comment>,
        reactions: HashMap<PostId, Vec<(UserId, String)>>, // insertion ordered
        next_post_id: PostId,
        next_comment_id: CommentId,
    }

    /// Everything in one mutex so id allocation and referential checks stay atomic.
    #[derive(Default)]
    pub struct MemStore {
        tables: Mutex<Tables>,
    }

    impl MemStore {
        pub fn new() -> Self {
            Self::default()
        }

        fn tables(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StoreError> {
            self.tables.lock().map_err(|_| StoreError::Internal)
        }
    }

    impl StoreTrait for MemStore {
        fn upsert_category(&self, category: Category) -> Result<(), StoreError> {
            self.tables()?.categories.insert(category.slug.clone(), category);
            Ok(())
        }

        fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
            Ok(self.tables()?.categories.values().cloned().collect())
        }

        fn create_post(&self, post: NewPost) -> Result<Post, StoreError> {
            let mut t = self.tables()?;
            if !t.categories.contains_key(&post.category) {
                return Err(StoreError::UnknownCategory(post.category));
            }
            t.next_post_id += 1;
            let row = Post {
                id: t.next_post_id,
                author_id: post.author_id,
                category: post.category,
                title: post.title,
                body: post.body,
                meta: post.meta,
                published: false,
                created_at: post.created_at,
                published_at: None,
            };
            t.posts.insert(row.id, row.clone());
            Ok(row)
        }

        fn get_post(&self, id: PostId) -> Result<Option<Post>, StoreError> {
            Ok(self.tables()?.posts.get(&id).cloned())
        }

        fn publish_post(&self, id: PostId, at: u64) -> Result<Post, StoreError> {
            let mut t = self.tables()?;
            let post = t.posts.get_mut(&id).ok_or(StoreError::PostNotFound(id))?;
            if !post.published {
                post.published = true;
                post.published_at = Some(at);
            }
            Ok(post.clone())
        }

        fn list_posts(&self, filter: &PostFilter, offset: usize, limit: usize) -> Result<Vec<Post>, StoreError> {
            let t = self.tables()?;
            let mut rows: Vec<&Post> = t.posts.values().filter(|p| p.published && filter.matches(p)).collect();
            rows.sort_by(|a, b| b.published_at.cmp(&a.published_at).then(b.id.cmp(&a.id)));
            Ok(rows.into_iter().skip(offset).take(limit).cloned().collect())
        }

        fn add_comment(&self, comment: NewComment) -> Result<Comment, StoreError> {
            let mut t = self.tables()?;
            if !t.posts.contains_key(&comment.post_id) {
                return Err(StoreError::PostNotFound(comment.post_id));
            }
            if let Some(parent) = comment.parent_id {
                let live_parent = t.comments.get(&parent).is_some_and(|c| c.post_id == comment.post_id && !c.deleted);
                if !live_parent {
                    return Err(StoreError::InvalidParent { post: comment.post_id, parent });
                }
            }
            t.next_comment_id += 1;
            let row = Comment {
                id: t.next_comment_id,
                post_id: comment.post_id,
                parent_id: comment.parent_id,
                author_id: comment.author_id,
                body: comment.body,
                created_at: comment.created_at,
                deleted: false,
            };
            t.comments.insert(row.id, row.clone());
            Ok(row)
        }

        fn get_comment(&self, id: CommentId) -> Result<Option<Comment>, StoreError> {
            Ok(self.tables()?.comments.get(&id).cloned())
        }

        fn delete_comment(&self, id: CommentId) -> Result<Comment, StoreError> {
            let mut t = self.tables()?;
            let row = t.comments.get_mut(&id).ok_or(StoreError::CommentNotFound(id))?;
            row.deleted = true;
            Ok(row.clone())
        }

        fn comments_for_post(&self, post_id: PostId) -> Result<Vec<Comment>, StoreError> {
            let t = self.tables()?;
            let mut rows: Vec<Comment> = t.comments.values().filter(|c| c.post_id == post_id && !c.deleted).cloned().collect();
            rows.sort_by_key(|c| (c.created_at, c.id));
            Ok(rows)
        }

        fn toggle_reaction(&self, post_id: PostId, user_id: UserId, emoji: &str) -> Result<bool, StoreError> {
            let mut t = self.tables()?;
            if !t.posts.contains_key(&post_id) {
                return Err(StoreError::PostNotFound(post_id));
            }
            let list = t.reactions.entry(post_id).or_default();
            match list.iter().position(|(u, e)| *u == user_id && e == emoji) {
                Some(idx) => {
                    list.remove(idx);
                    Ok(false)
                }
                None => {
                    list.push((user_id, emoji.to_string()));
                    Ok(true)
                }
            }
        }

        fn reaction_counts(&self, post_id: PostId) -> Result<Vec<ReactionCount>, StoreError> {
            let t = self.tables()?;
            let Some(list) = t.reactions.get(&post_id) else { return Ok(vec![]) };
            let counts = list.iter().map(|(_, e)| e.as_str()).counts();
            let order = list.iter().map(|(_, e)| e.as_str()).unique();
            Ok(order.map(|emoji| ReactionCount { emoji: emoji.to_string(), count: counts[emoji] }).collect())
        }

        fn stats(&self) -> Result<StoreStats, StoreError> {
            let t = self.tables()?;
            Ok(StoreStats {
                categories: t.categories.len(),
                posts: t.posts.len(),
                comments: t.comments.values().filter(|c| !c.deleted).count(),
                reactions: t.reactions.values().map(Vec::len).sum(),
            })
        }
    }
}

pub fn new_store() -> Result<Store, StoreError> {
    #[cfg(feature = "mem-store")]
    {
        return Ok(Arc::new(MemStore::new()));
    }
    #[allow(unreachable_code)]
    Err(StoreError::Internal)
}

#[cfg(all(test, feature = "mem-store"))]
mod tests {
    use super::*;
    use crate::models::PostMeta;

    fn seeded() -> MemStore {
        let store = MemStore::new();
        for slug in ["news", "shipped"] {
            store.upsert_category(Category { slug: slug.into(), name: slug.to_uppercase() }).unwrap();
        }
        store
    }

    fn draft(store: &MemStore, category: &str, author_id: UserId, at: u64) -> Post {
        store
            .create_post(NewPost {
                author_id,
                category: category.into(),
                title: format!("post at {at}"),
                body: "# hello".into(),
                meta: vec![PostMeta { label: "Ticket".into(), value: "OPS-1".into() }],
                created_at: at,
            })
            .unwrap()
    }

    fn comment(store: &MemStore, post_id: PostId, parent_id: Option<CommentId>, at: u64) -> Result<Comment, StoreError> {
        store.add_comment(NewComment { post_id, parent_id, author_id: 3, body: "nice".into(), created_at: at })
    }

    #[test]
    fn unknown_category_is_rejected() {
        let store = seeded();
        let err = store
            .create_post(NewPost {
                author_id: 1,
                category: "gossip".into(),
                title: "t".into(),
                body: "b".into(),
                meta: vec![],
                created_at: 1,
            })
            .unwrap_err();
        assert_eq!(err, StoreError::UnknownCategory("gossip".into()));
    }

    #[test]
    fn only_published_posts_are_listed_newest_first() {
        let store = seeded();
        let a = draft(&store, "news", 1, 10);
        let b = draft(&store, "shipped", 2, 20);
        let _hidden = draft(&store, "news", 1, 30);
        store.publish_post(a.id, 100).unwrap();
        store.publish_post(b.id, 200).unwrap();

        let ids: Vec<_> = store.list_posts(&PostFilter::default(), 0, 10).unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);

        let by_cat = store.list_posts(&PostFilter { category: Some("news".into()), author: None }, 0, 10).unwrap();
        assert_eq!(by_cat.len(), 1);
        let by_author = store.list_posts(&PostFilter { category: None, author: Some(2) }, 0, 10).unwrap();
        assert_eq!(by_author[0].id, b.id);

        assert_eq!(store.list_posts(&PostFilter::default(), 1, 10).unwrap().len(), 1);
        assert!(store.list_posts(&PostFilter::default(), 5, 10).unwrap().is_empty());
    }

    #[test]
    fn republishing_keeps_original_timestamp() {
        let store = seeded();
        let p = draft(&store, "news", 1, 1);
        store.publish_post(p.id, 5).unwrap();
        assert_eq!(store.publish_post(p.id, 9).unwrap().published_at, Some(5));
        assert_eq!(store.publish_post(999, 9), Err(StoreError::PostNotFound(999)));
    }

    #[test]
    fn comment_parent_must_share_post() {
        let store = seeded();
        let p1 = draft(&store, "news", 1, 1);
        let p2 = draft(&store, "news", 1, 2);
        let root = comment(&store, p1.id, None, 1).unwrap();

        assert!(comment(&store, p1.id, Some(root.id), 2).is_ok());
        assert_eq!(comment(&store, p2.id, Some(root.id), 3), Err(StoreError::InvalidParent { post: p2.id, parent: root.id }));
        assert_eq!(comment(&store, p1.id, Some(77), 4), Err(StoreError::InvalidParent { post: p1.id, parent: 77 }));
        assert_eq!(comment(&store, 404, None, 5), Err(StoreError::PostNotFound(404)));
    }

    #[test]
    fn replies_to_deleted_comments_are_rejected() {
        let store = seeded();
        let p = draft(&store, "news", 1, 1);
        let root = comment(&store, p.id, None, 1).unwrap();
        store.delete_comment(root.id).unwrap();

        assert_eq!(comment(&store, p.id, Some(root.id), 2), Err(StoreError::InvalidParent { post: p.id, parent: root.id }));
        assert!(store.comments_for_post(p.id).unwrap().is_empty());
        assert_eq!(store.stats().unwrap().comments, 0);
    }

    #[test]
    fn deleted_comments_are_hidden_and_order_is_chronological() {
        let store = seeded();
        let p = draft(&store, "news", 1, 1);
        let late = comment(&store, p.id, None, 50).unwrap();
        let early = comment(&store, p.id, None, 10).unwrap();
        let gone = comment(&store, p.id, None, 20).unwrap();
        store.delete_comment(gone.id).unwrap();

        let ids: Vec<_> = store.comments_for_post(p.id).unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
        assert_eq!(store.stats().unwrap().comments, 2);
        assert_eq!(store.delete_comment(12345), Err(StoreError::CommentNotFound(12345)));
    }

    #[test]
    fn reactions_toggle_and_count_in_first_use_order() {
        let store = seeded();
        let p = draft(&store, "news", 1, 1);
        assert!(store.toggle_reaction(p.id, 1, "🎉").unwrap());
        assert!(store.toggle_reaction(p.id, 2, "👍").unwrap());
        assert!(store.toggle_reaction(p.id, 3, "🎉").unwrap());
        assert!(!store.toggle_reaction(p.id, 1, "🎉").unwrap());

        assert_eq!(
            store.reaction_counts(p.id).unwrap(),
            vec![ReactionCount { emoji: "👍".into(), count: 1 }, ReactionCount { emoji: "🎉".into(), count: 1 }]
        );
        assert!(store.reaction_counts(999).unwrap().is_empty());
        assert_eq!(store.toggle_reaction(999, 1, "🎉"), Err(StoreError::PostNotFound(999)));
    }
}
