//! Feed shaping for the home page.
//!
//! Consecutive posts from a clustered category collapse into one block. Every
//! other post stays a standalone entry in its original position.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::Post;

pub trait Categorized {
    fn category(&self) -> &str;
}

impl Categorized for Post {
    fn category(&self) -> &str {
        &self.category
    }
}

/// Categories whose consecutive posts are grouped together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSet(BTreeSet<String>);

impl ClusterSet {
    pub fn new<I, S>(slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(slugs.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.0.contains(slug)
    }

    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for ClusterSet {
    fn default() -> Self {
        Self::new(["shipped"])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedItem<T> {
    Single { post: T },
    Cluster { category: String, posts: Vec<T> },
}

impl<T> FeedItem<T> {
    pub fn len(&self) -> usize {
        match self {
            FeedItem::Single { .. } => 1,
            FeedItem::Cluster { posts, .. } => posts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Group consecutive clustered posts. Post count and relative order are preserved.
pub fn cluster_posts<T: Categorized>(posts: Vec<T>, clustered: &ClusterSet) -> Vec<FeedItem<T>> {
    let mut items = Vec::new();
    let mut pending: Vec<T> = Vec::new();

    for post in posts {
        let clusterable = clustered.contains(post.category());
        let breaks_run = pending.first().is_some_and(|head| !clusterable || head.category() != post.category());
        if breaks_run {
            flush(&mut pending, &mut items);
        }
        if clusterable {
            pending.push(post);
        } else {
            items.push(FeedItem::Single { post });
        }
    }
    flush(&mut pending, &mut items);
    items
}

fn flush<T: Categorized>(pending: &mut Vec<T>, items: &mut Vec<FeedItem<T>>) {
    if let Some(head) = pending.first() {
        let category = head.category().to_string();
        items.push(FeedItem::Cluster { category, posts: std::mem::take(pending) });
    }
}

/// Pull the first non-clustered post out of the feed so it can lead the page.
pub fn extract_featured<T: Categorized>(mut posts: Vec<T>, clustered: &ClusterSet) -> (Option<T>, Vec<T>) {
    match posts.iter().position(|p| !clustered.contains(p.category())) {
        Some(idx) => {
            let featured = posts.remove(idx);
            (Some(featured), posts)
        }
        None => (None, posts),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HomeFeed<T> {
    pub featured: Option<T>,
    pub items: Vec<FeedItem<T>>,
}

impl<T> HomeFeed<T> {
    pub fn post_count(&self) -> usize {
        usize::from(self.featured.is_some()) + self.items.iter().map(FeedItem::len).sum::<usize>()
    }
}

/// Home page layout: the featured post first, then the clustered remainder.
pub fn home_feed<T: Categorized>(posts: Vec<T>, clustered: &ClusterSet) -> HomeFeed<T> {
    let (featured, rest) = extract_featured(posts, clustered);
    HomeFeed { featured, items: cluster_posts(rest, clustered) }
}
