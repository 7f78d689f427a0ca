//! Opaque offset cursors and the paginator that hands them out.
//!
//! A cursor is the plain string `"<offset>:<limit>"`. It is round-tripped through
//! the client URL and never stored server side, so decoding is lenient: anything
//! that does not parse falls back to the first page instead of failing the request.

use std::fmt;
use std::future::Future;

use serde::Serialize;

/// Page size used when neither the caller nor the cursor supplies one.
pub const DEFAULT_PER_PAGE: usize = 50;

/// Decoded pagination window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor {
    pub offset: usize,
    pub limit: usize,
}

impl Cursor {
    pub fn first_page(per_page: usize) -> Self {
        Self { offset: 0, limit: per_page.max(1) }
    }

    /// Decode an incoming cursor, degrading to the first page on any malformed input.
    ///
    /// Only the first two `:`-separated segments are read. A zero limit counts as
    /// malformed so a client cannot negotiate an empty page by editing the cursor.
    pub fn decode(raw: Option<&str>, per_page: usize) -> Self {
        raw.and_then(Self::parse).unwrap_or_else(|| Self::first_page(per_page))
    }

    fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(':');
        let offset = parts.next()?.trim().parse::<usize>().ok()?;
        let limit = parts.next()?.trim().parse::<usize>().ok()?;
        if limit == 0 {
            return None;
        }
        Some(Self { offset, limit })
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn next(&self) -> Self {
        Self { offset: self.offset.saturating_add(self.limit), limit: self.limit }
    }

    /// Cursor for the preceding page, or `None` on the first page.
    pub fn prev(&self) -> Option<Self> {
        if self.offset == 0 {
            return None;
        }
        Some(Self { offset: self.offset.saturating_sub(self.limit), limit: self.limit })
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.offset, self.limit)
    }
}

/// Parameters handed to a fetch function: the caller's own filter plus the window.
///
/// `limit` is one larger than the page size so the fetch can reveal whether a
/// further page exists without a separate count query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageQuery<P> {
    pub params: P,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaginatedResult<T> {
    pub result: Vec<T>,
    pub cursor: String,
    pub per_page: usize,
    /// Empty when there is no following page.
    pub next_cursor: String,
    /// Empty when this is the first page.
    pub prev_cursor: String,
}

impl<T> PaginatedResult<T> {
    pub fn has_next(&self) -> bool {
        !self.next_cursor.is_empty()
    }

    pub fn has_prev(&self) -> bool {
        !self.prev_cursor.is_empty()
    }

    /// Reshape the page items while keeping the cursors.
    pub fn map<U, F>(self, f: F) -> PaginatedResult<U>
    where
        F: FnOnce(Vec<T>) -> Vec<U>,
    {
        PaginatedResult {
            result: f(self.result),
            cursor: self.cursor,
            per_page: self.per_page,
            next_cursor: self.next_cursor,
            prev_cursor: self.prev_cursor,
        }
    }
}

/// Fetch one page through `fetch` and compute the neighbouring cursors.
///
/// Errors from `fetch` are returned untouched.
pub async fn paginate<T, P, E, F, Fut>(
    fetch: F,
    params: P,
    cursor: Option<&str>,
    per_page: usize,
) -> Result<PaginatedResult<T>, E>
where
    F: FnOnce(PageQuery<P>) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let window = Cursor::decode(cursor, per_page);
    let query = PageQuery { params, offset: window.offset, limit: window.limit.saturating_add(1) };
    let mut rows = fetch(query).await?;

    let has_next = rows.len() > window.limit;
    rows.truncate(window.limit);

    Ok(PaginatedResult {
        result: rows,
        cursor: window.encode(),
        per_page: window.limit,
        next_cursor: if has_next { window.next().encode() } else { String::new() },
        prev_cursor: window.prev().map(|c| c.encode()).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    async fn page_of(rows: usize, cursor: Option<&str>, per_page: usize) -> PaginatedResult<usize> {
        let fetch = |q: PageQuery<()>| async move { Ok::<_, Infallible>((q.offset..q.offset + rows.min(q.limit)).collect()) };
        paginate(fetch, (), cursor, per_page).await.unwrap()
    }

    #[test]
    fn cursor_round_trips() {
        for (offset, limit) in [(0, 1), (0, 50), (50, 50), (7, 3), (1_000_000, 25)] {
            let encoded = Cursor { offset, limit }.encode();
            assert_eq!(Cursor::decode(Some(&encoded), 99), Cursor { offset, limit });
        }
    }

    #[test]
    fn malformed_cursors_fall_back_to_first_page() {
        for raw in ["", "abc", "5", ":", "3:", ":4", "-1:10", "10:-1", "1.5:2", "x:y"] {
            assert_eq!(Cursor::decode(Some(raw), 50), Cursor { offset: 0, limit: 50 }, "cursor {raw:?}");
        }
        assert_eq!(Cursor::decode(None, 20), Cursor { offset: 0, limit: 20 });
    }

    #[test]
    fn zero_limit_is_replaced_by_page_size() {
        assert_eq!(Cursor::decode(Some("40:0"), 25), Cursor { offset: 0, limit: 25 });
    }

    #[test]
    fn extra_segments_are_ignored() {
        assert_eq!(Cursor::decode(Some("10:5:junk"), 50), Cursor { offset: 10, limit: 5 });
    }

    #[tokio::test]
    async fn fetch_is_asked_for_one_extra_row() {
        let page = paginate(
            |q: PageQuery<&str>| async move {
                assert_eq!(q.params, "shipped");
                assert_eq!((q.offset, q.limit), (20, 11));
                Ok::<Vec<u8>, Infallible>(Vec::new())
            },
            "shipped",
            Some("20:10"),
            50,
        )
        .await
        .unwrap();
        assert!(page.result.is_empty());
    }

    #[tokio::test]
    async fn exact_page_has_no_next_cursor() {
        let page = page_of(10, Some("0:10"), 50).await;
        assert_eq!(page.result.len(), 10);
        assert_eq!(page.next_cursor, "");
        assert!(!page.has_next());
    }

    #[tokio::test]
    async fn overflow_row_yields_next_cursor_and_is_trimmed() {
        let page = page_of(11, Some("30:10"), 50).await;
        assert_eq!(page.result, (30..40).collect::<Vec<_>>());
        assert_eq!(Cursor::decode(Some(&page.next_cursor), 1), Cursor { offset: 40, limit: 10 });
        assert_eq!(page.cursor, "30:10");
        assert_eq!(page.per_page, 10);
    }

    #[tokio::test]
    async fn prev_cursor_clamps_to_zero() {
        let first = page_of(3, None, 5).await;
        assert_eq!(first.prev_cursor, "");
        assert!(!first.has_prev());

        let partial = page_of(3, Some("3:5"), 5).await;
        assert_eq!(partial.prev_cursor, "0:5");

        let later = page_of(3, Some("15:5"), 5).await;
        assert_eq!(later.prev_cursor, "10:5");
    }

    #[tokio::test]
    async fn fetch_errors_propagate() {
        let fetch = |_q: PageQuery<()>| async { Err::<Vec<u8>, _>("store offline") };
        let err = paginate(fetch, (), Some("garbage"), 10).await.unwrap_err();
        assert_eq!(err, "store offline");
    }
}
