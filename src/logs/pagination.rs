//! Cursor pagination over the deployment-logs endpoint.
//!
//! A [`LogFeed`] holds the accumulated pages for one query:
//!
//! 1. `load_first` discards whatever was loaded and fetches page 1.
//! 2. `load_more` asks for the page after the stored cursor and appends it.
//! 3. Once a page arrives with `next == None` the feed is exhausted and
//!    `load_more` returns `Ok(false)` without touching the network.
//!
//! Every reset bumps a generation counter. A [`PageRequest`] remembers the
//! generation and cursor it was issued for; [`LogFeed::apply`] drops
//! responses whose generation or cursor no longer match, so a slow reply
//! for an old query (or a duplicate "more") never lands in the feed.

use async_trait::async_trait;

use crate::errors::ClientError;
use crate::models::{DeploymentLog, LogPage};
use crate::platform::{LogQuery, Queries};

/// Anything that can answer a log page request.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, query: &LogQuery) -> Result<LogPage, ClientError>;
}

#[async_trait]
impl PageSource for Queries {
    async fn fetch_page(&self, query: &LogQuery) -> Result<LogPage, ClientError> {
        self.fetch_deployment_logs(query).await
    }
}

/// Append `next` to `current`. `next` supplies the new cursor; `total`
/// keeps the first page's non-zero total, else becomes the merged length.
pub fn merge_next_page(current: LogPage, next: LogPage) -> LogPage {
    let mut data = current.data;
    data.extend(next.data);
    let total = match current.total {
        Some(total) if total > 0 => total,
        _ => data.len() as u64,
    };
    LogPage {
        data,
        next: next.next,
        total: Some(total),
    }
}

/// A page fetch issued by a [`LogFeed`], to be handed back to
/// [`LogFeed::apply`] together with its response.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub generation: u64,
    pub query: LogQuery,
    first: bool,
}

#[derive(Debug, Clone)]
pub struct LogFeed {
    query: LogQuery,
    page: Option<LogPage>,
    generation: u64,
    pages_loaded: usize,
}

impl LogFeed {
    /// A feed for `query`. A `page_token` on the query is where the first
    /// page starts.
    pub fn new(query: LogQuery) -> Self {
        Self {
            query,
            page: None,
            generation: 0,
            pages_loaded: 0,
        }
    }

    pub fn query(&self) -> &LogQuery {
        &self.query
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    /// Accumulated page, `None` before the first load.
    pub fn page(&self) -> Option<&LogPage> {
        self.page.as_ref()
    }

    pub fn logs(&self) -> &[DeploymentLog] {
        self.page.as_ref().map(|p| p.data.as_slice()).unwrap_or(&[])
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.page.as_ref().and_then(|p| p.next.as_deref())
    }

    /// True once a page with no continuation has been applied.
    pub fn is_exhausted(&self) -> bool {
        matches!(&self.page, Some(page) if page.next.is_none())
    }

    /// Switch to a different query, dropping everything loaded so far.
    pub fn reset(&mut self, query: LogQuery) {
        self.query = query;
        self.page = None;
        self.pages_loaded = 0;
        self.generation += 1;
    }

    /// Start over with the current query. Invalidates in-flight requests.
    pub fn first_request(&mut self) -> PageRequest {
        self.page = None;
        self.pages_loaded = 0;
        self.generation += 1;
        PageRequest {
            generation: self.generation,
            query: self.query.clone(),
            first: true,
        }
    }

    /// Request for the page after the stored cursor. `None` before the first
    /// page has loaded and after the last one.
    pub fn next_request(&self) -> Option<PageRequest> {
        let cursor = self.next_cursor()?;
        Some(PageRequest {
            generation: self.generation,
            query: self.query.with_page_token(cursor),
            first: false,
        })
    }

    /// Fold a response into the feed. Returns `false` (and leaves the feed
    /// untouched) when the request is stale.
    pub fn apply(&mut self, request: &PageRequest, page: LogPage) -> bool {
        if request.generation != self.generation {
            tracing::debug!(
                request_generation = request.generation,
                generation = self.generation,
                "Dropping log page for superseded query"
            );
            return false;
        }

        if request.first {
            if self.page.is_some() {
                return false;
            }
            self.page = Some(page);
        } else {
            if request.query.page_token.as_deref() != self.next_cursor() {
                tracing::debug!("Dropping log page for an already consumed cursor");
                return false;
            }
            let Some(current) = self.page.take() else {
                return false;
            };
            self.page = Some(merge_next_page(current, page));
        }
        self.pages_loaded += 1;
        true
    }

    pub async fn load_first<S>(&mut self, source: &S) -> Result<(), ClientError>
    where
        S: PageSource + ?Sized,
    {
        let request = self.first_request();
        let page = source.fetch_page(&request.query).await?;
        self.apply(&request, page);
        Ok(())
    }

    /// Fetch and merge the next page. `Ok(false)` means there was nothing
    /// left to load and no request was made. On error the feed is unchanged.
    pub async fn load_more<S>(&mut self, source: &S) -> Result<bool, ClientError>
    where
        S: PageSource + ?Sized,
    {
        let Some(request) = self.next_request() else {
            return Ok(false);
        };
        let page = source.fetch_page(&request.query).await?;
        Ok(self.apply(&request, page))
    }
}

/// Load up to `max_pages` pages of `query`. Stops early once the feed is
/// exhausted. A failure after the first page keeps what was loaded and is
/// returned alongside the feed.
pub async fn collect_pages<S>(
    source: &S,
    query: LogQuery,
    max_pages: usize,
) -> (LogFeed, Option<ClientError>)
where
    S: PageSource + ?Sized,
{
    let mut feed = LogFeed::new(query);
    if let Err(e) = feed.load_first(source).await {
        return (feed, Some(e));
    }

    while feed.pages_loaded() < max_pages.max(1) {
        match feed.load_more(source).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                tracing::warn!(
                    pages = feed.pages_loaded(),
                    error = %e,
                    "Stopped paging deployment logs"
                );
                return (feed, Some(e));
            }
        }
    }
    (feed, None)
}
