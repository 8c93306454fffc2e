//! Per-invocation session state
use google_gmail1::api::Filter as ApiFilter;
use tracing::{debug, info};

use crate::client::GmailClient;
use crate::error::{GfmError, Result};
use crate::label_resolver::LabelResolver;

/// Gmail client plus the filters and labels fetched through it
///
/// Each list is fetched on first access and reused until
/// [`clear_cache`](Self::clear_cache).
pub struct GmailContext {
    client: Box<dyn GmailClient>,
    filters: Option<Vec<ApiFilter>>,
    labels: Option<LabelResolver>,
}

impl GmailContext {
    pub fn new(client: Box<dyn GmailClient>) -> Self {
        Self {
            client,
            filters: None,
            labels: None,
        }
    }

    pub fn client(&self) -> &dyn GmailClient {
        self.client.as_ref()
    }

    /// Filters of the account, fetched once
    pub async fn filters(&mut self) -> Result<&[ApiFilter]> {
        let filters = match self.filters.take() {
            Some(cached) => cached,
            None => {
                let fetched = self.client.list_filters().await?;
                info!("Fetched {} filters", fetched.len());
                fetched
            }
        };
        Ok(self.filters.insert(filters).as_slice())
    }

    /// Labels of the account, fetched once
    pub async fn labels(&mut self) -> Result<&LabelResolver> {
        let labels = match self.labels.take() {
            Some(cached) => cached,
            None => {
                let fetched = self.client.list_labels().await?;
                info!("Fetched {} labels", fetched.len());
                LabelResolver::new(fetched)
            }
        };
        Ok(&*self.labels.insert(labels))
    }

    /// Both lists, for pipelines that map filters through labels
    pub async fn filters_and_labels(&mut self) -> Result<(&[ApiFilter], &LabelResolver)> {
        self.filters().await?;
        self.labels().await?;
        match (&self.filters, &self.labels) {
            (Some(filters), Some(labels)) => Ok((filters.as_slice(), labels)),
            _ => Err(GfmError::ApiError(
                "filter or label cache is empty after fetching".to_string(),
            )),
        }
    }

    /// Drops cached filters and labels so the next access refetches them
    pub fn clear_cache(&mut self) {
        debug!("Clearing filter and label cache");
        self.filters = None;
        self.labels = None;
    }
}
