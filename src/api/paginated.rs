//! Fans one notice query out over a range of pages.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::{ClientError, RequestManager};
use crate::config::PaginationConfig;
use crate::models::{Notice, PageRange, ParamBuilder, SearchData};

/// Delay inserted between launching concurrent page tasks.
///
/// Launch spacing applies to every page, including pages that turn out to
/// be cache hits. Spacing of actual network calls is always enforced by the
/// manager's rate limiter, whatever is chosen here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaunchSpacing {
    /// Wait the manager's rate-limit interval between launches
    #[default]
    RateLimitInterval,
    /// Wait a fixed delay between launches
    Fixed(Duration),
    /// Launch every page immediately
    None,
}

impl LaunchSpacing {
    fn delay(&self, manager: &RequestManager) -> Duration {
        match self {
            LaunchSpacing::RateLimitInterval => manager.rate_limit_interval(),
            LaunchSpacing::Fixed(delay) => *delay,
            LaunchSpacing::None => Duration::ZERO,
        }
    }
}

/// How page requests are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Fetch one page at a time, in order
    Sequential,
    /// Spawn one task per page
    Concurrent(LaunchSpacing),
}

impl Default for FetchStrategy {
    fn default() -> Self {
        FetchStrategy::Concurrent(LaunchSpacing::default())
    }
}

impl FetchStrategy {
    pub fn from_config(config: &PaginationConfig) -> Self {
        match (config.concurrent, config.space_launches) {
            (false, _) => FetchStrategy::Sequential,
            (true, true) => FetchStrategy::Concurrent(LaunchSpacing::RateLimitInterval),
            (true, false) => FetchStrategy::Concurrent(LaunchSpacing::None),
        }
    }
}

/// A notice query over an inclusive range of pages.
///
/// Results are merged in ascending page order. If any page fails the whole
/// search fails with that page's error and no partial list is returned.
#[derive(Debug, Clone)]
pub struct PaginatedSearch {
    base: ParamBuilder,
    range: PageRange,
    strategy: FetchStrategy,
}

impl PaginatedSearch {
    /// Search page 1 of `base` with the default strategy
    pub fn new(base: ParamBuilder) -> Self {
        Self {
            base,
            range: PageRange::default(),
            strategy: FetchStrategy::default(),
        }
    }

    /// Results per page
    pub fn with_amount_per_page(mut self, per_page: u32) -> Result<Self, ClientError> {
        self.base = self.base.with_amount(per_page)?;
        Ok(self)
    }

    /// Pages `start..=end`; fails if `start < 1` or `start > end`
    pub fn with_page_range(mut self, start: u32, end: u32) -> Result<Self, ClientError> {
        self.range = PageRange::new(start, end)?;
        Ok(self)
    }

    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn query(&self) -> &ParamBuilder {
        &self.base
    }

    pub fn range(&self) -> PageRange {
        self.range
    }

    pub fn strategy(&self) -> FetchStrategy {
        self.strategy
    }

    /// One independent builder per page, in page order, built as iterated
    pub fn page_requests(&self) -> impl Iterator<Item = (u32, ParamBuilder)> + '_ {
        self.range
            .pages()
            .map(|page| (page, self.base.clone().with_page(page)))
    }

    /// Fetch every page and return its search data, in page order
    pub async fn search_pages(&self, manager: &RequestManager) -> Result<Vec<SearchData>, ClientError> {
        if self.base.is_empty() {
            return Err(ClientError::EmptyQuery);
        }

        tracing::debug!(
            "Fetching pages {}..={} ({:?})",
            self.range.start(),
            self.range.end(),
            self.strategy
        );

        match self.strategy {
            FetchStrategy::Sequential => self.fetch_sequential(manager).await,
            FetchStrategy::Concurrent(spacing) => {
                self.fetch_concurrent(manager, spacing.delay(manager)).await
            }
        }
    }

    /// Fetch every page and concatenate the notices
    pub async fn search(&self, manager: &RequestManager) -> Result<Vec<Notice>, ClientError> {
        let pages = self.search_pages(manager).await?;
        Ok(pages.into_iter().flat_map(|page| page.notices).collect())
    }

    async fn fetch_sequential(&self, manager: &RequestManager) -> Result<Vec<SearchData>, ClientError> {
        let mut results = Vec::new();
        for (page, query) in self.page_requests() {
            match manager.search(&query).await {
                Ok(data) => results.push(data),
                Err(e) => {
                    tracing::warn!("Page {} failed: {}", page, e);
                    return Err(e);
                }
            }
        }
        Ok(results)
    }

    async fn fetch_concurrent(
        &self,
        manager: &RequestManager,
        launch_delay: Duration,
    ) -> Result<Vec<SearchData>, ClientError> {
        let mut tasks = PageTasks::default();
        let mut results = Vec::new();

        for (i, (page, query)) in self.page_requests().enumerate() {
            if i > 0 {
                if launch_delay.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(launch_delay).await;
                }
            }
            // Collect leading pages that already finished so a failure stops further launches
            while let Some((page, handle)) = tasks.pop_finished() {
                results.push(join_page(page, handle).await?);
            }
            let manager = manager.clone();
            tasks.push(page, tokio::spawn(async move { manager.search(&query).await }));
        }

        while let Some((page, handle)) = tasks.pop() {
            results.push(join_page(page, handle).await?);
        }
        Ok(results)
    }
}

type PageHandle = JoinHandle<Result<SearchData, ClientError>>;

/// In-flight page tasks in page order. Whatever is still queued when this
/// is dropped gets aborted.
#[derive(Default)]
struct PageTasks(VecDeque<(u32, PageHandle)>);

impl PageTasks {
    fn push(&mut self, page: u32, handle: PageHandle) {
        self.0.push_back((page, handle));
    }

    fn pop(&mut self) -> Option<(u32, PageHandle)> {
        self.0.pop_front()
    }

    fn pop_finished(&mut self) -> Option<(u32, PageHandle)> {
        match self.0.front() {
            Some((_, handle)) if handle.is_finished() => self.0.pop_front(),
            _ => None,
        }
    }
}

impl Drop for PageTasks {
    fn drop(&mut self) {
        for (_, handle) in &self.0 {
            handle.abort();
        }
    }
}

async fn join_page(page: u32, handle: PageHandle) -> Result<SearchData, ClientError> {
    let outcome = match handle.await {
        Ok(outcome) => outcome,
        Err(e) => Err(ClientError::Task(format!("page {}: {}", page, e))),
    };
    if let Err(e) = &outcome {
        tracing::warn!("Page {} failed: {}", page, e);
    }
    outcome
}
