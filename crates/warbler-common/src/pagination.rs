//! Continuation-token pagination
//!
//! A [`PageCursor`] is embedded in the query value it paginates (see
//! [`Paged`]). Every successful call through the query feeds the reply's
//! continuation token back into the cursor, so invoking the same value again
//! fetches the following page.

use smol_str::SmolStr;

use crate::client::ApiClient;
use crate::error::{ClientResult, EncodeError};
use crate::http_client::HttpClient;
use crate::query::{ApiRequest, Query};

/// Tracks the server-issued continuation token between calls.
///
/// [`has_more_pages`](Self::has_more_pages) is true until a reply without a
/// continuation token has been observed. A fresh cursor therefore reports
/// more pages before anything has been fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageCursor {
    token: Option<SmolStr>,
    exhausted: bool,
}

impl PageCursor {
    /// Cursor positioned on the first page
    pub fn new() -> Self {
        Self::default()
    }

    /// The token to send with the next call, if any
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// False only after a reply declared that no further pages exist.
    pub fn has_more_pages(&self) -> bool {
        !self.exhausted || self.token.is_some()
    }

    /// Go back to the first page. Idempotent.
    pub fn reset_page_token(&mut self) {
        self.token = None;
        self.exhausted = false;
    }

    /// Record the continuation token of a reply; `None` or an empty token
    /// marks the end of the result set.
    pub fn advance(&mut self, next: Option<&str>) {
        match next.filter(|t| !t.is_empty()) {
            Some(token) => {
                self.token = Some(SmolStr::new(token));
                self.exhausted = false;
            }
            None => {
                self.token = None;
                self.exhausted = true;
            }
        }
        tracing::trace!(token = ?self.token, exhausted = self.exhausted, "page cursor advanced");
    }
}

/// A reply that may carry a continuation token.
pub trait PageReply {
    /// The token for the following page, if the server reported one
    fn next_token(&self) -> Option<&str>;
}

/// A one-shot query that can be resumed at a continuation token.
pub trait PagedQuery: Query<Reply: PageReply> {
    /// Name of the parameter carrying the continuation token
    const PAGE_TOKEN_PARAM: &'static str = "pagination_token";
}

/// A [`PagedQuery`] with its embedded [`PageCursor`].
///
/// Invoking a `Paged` value through [`ApiClient::invoke`] sends the current
/// token (if any) and advances the cursor from the reply.
#[derive(Debug, Clone)]
pub struct Paged<Q> {
    query: Q,
    cursor: PageCursor,
}

impl<Q: PagedQuery> Paged<Q> {
    /// Paginate `query` from its first page.
    pub fn new(query: Q) -> Self {
        Self {
            query,
            cursor: PageCursor::new(),
        }
    }

    /// See [`PageCursor::has_more_pages`].
    pub fn has_more_pages(&self) -> bool {
        self.cursor.has_more_pages()
    }

    /// See [`PageCursor::reset_page_token`].
    pub fn reset_page_token(&mut self) {
        self.cursor.reset_page_token();
    }

    /// The embedded cursor
    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    /// The wrapped query
    pub fn inner(&self) -> &Q {
        &self.query
    }

    /// Unwrap the query, dropping the cursor
    pub fn into_inner(self) -> Q {
        self.query
    }

    /// Fetch the next page, or `None` without calling out once exhausted.
    pub async fn next_page<C: HttpClient>(
        &mut self,
        client: &ApiClient<C>,
    ) -> ClientResult<Option<Q::Reply>> {
        if !self.has_more_pages() {
            return Ok(None);
        }
        client.invoke(self).await.map(Some)
    }

    /// Fetch pages until exhaustion or until `max_pages` replies were collected.
    pub async fn all_pages<C: HttpClient>(
        &mut self,
        client: &ApiClient<C>,
        max_pages: Option<usize>,
    ) -> ClientResult<Vec<Q::Reply>> {
        let mut pages = Vec::new();
        while max_pages.is_none_or(|max| pages.len() < max) {
            match self.next_page(client).await? {
                Some(page) => pages.push(page),
                None => break,
            }
        }
        Ok(pages)
    }
}

impl<Q: PagedQuery> Query for Paged<Q> {
    type Reply = Q::Reply;

    fn request(&self) -> Result<ApiRequest, EncodeError> {
        let mut request = self.query.request()?;
        if let Some(token) = self.cursor.token() {
            request.params.set(Q::PAGE_TOKEN_PARAM, token);
        }
        Ok(request)
    }

    fn decode_reply(&self, body: &[u8]) -> Result<Self::Reply, crate::error::DecodeError> {
        self.query.decode_reply(body)
    }

    fn observe_reply(&mut self, reply: &Self::Reply) {
        self.cursor.advance(reply.next_token());
        self.query.observe_reply(reply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cursor_reports_more_pages() {
        let cursor = PageCursor::new();
        assert!(cursor.has_more_pages());
        assert_eq!(cursor.token(), None);
    }

    #[test]
    fn tokenless_reply_exhausts_until_reset() {
        let mut cursor = PageCursor::new();
        cursor.advance(Some("abc"));
        assert!(cursor.has_more_pages());
        assert_eq!(cursor.token(), Some("abc"));

        cursor.advance(None);
        assert!(!cursor.has_more_pages());
        assert_eq!(cursor.token(), None);

        cursor.reset_page_token();
        assert!(cursor.has_more_pages());
    }

    #[test]
    fn empty_token_counts_as_absent() {
        let mut cursor = PageCursor::new();
        cursor.advance(Some(""));
        assert!(!cursor.has_more_pages());
    }

    #[test]
    fn reset_is_idempotent() {
        let mut once = PageCursor::new();
        once.advance(Some("t1"));
        once.reset_page_token();

        let mut twice = PageCursor::new();
        twice.advance(Some("t1"));
        twice.reset_page_token();
        twice.reset_page_token();

        assert_eq!(once, twice);
        assert_eq!(twice.token(), None);
        assert!(twice.has_more_pages());
    }
}
