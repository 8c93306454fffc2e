//! Gmail API client for filter and label resources

use async_trait::async_trait;
use google_gmail1::api::Filter as ApiFilter;
use google_gmail1::{hyper_rustls, hyper_util, Gmail};
use tracing::debug;

use crate::error::{GfmError, Result};

const SETTINGS_SCOPE: &str = "https://www.googleapis.com/auth/gmail.settings.basic";
const MODIFY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";

/// Label info returned from Gmail API
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LabelInfo {
    pub id: String,
    pub name: String,
    /// `"user"` or `"system"`
    #[serde(rename = "type")]
    pub label_type: String,
}

/// Trait defining the Gmail operations the filter manager needs
#[async_trait]
pub trait GmailClient: Send + Sync {
    /// Email address of the authenticated account
    async fn get_profile(&self) -> Result<String>;

    /// List all filters of the account
    async fn list_filters(&self) -> Result<Vec<ApiFilter>>;

    /// List all labels in the account
    async fn list_labels(&self) -> Result<Vec<LabelInfo>>;

    /// Create a filter, returning its ID
    async fn create_filter(&self, filter: &ApiFilter) -> Result<String>;

    /// Delete an existing filter by ID
    async fn delete_filter(&self, filter_id: &str) -> Result<()>;
}

/// Production Gmail client over the `google-gmail1` hub
///
/// Calls are issued one at a time and are not retried; a failure is
/// returned to the command that made it.
pub struct ProductionGmailClient {
    hub: Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>,
}

impl ProductionGmailClient {
    pub fn new(
        hub: Gmail<
            hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>,
        >,
    ) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl GmailClient for ProductionGmailClient {
    async fn get_profile(&self) -> Result<String> {
        let (_, profile) = self
            .hub
            .users()
            .get_profile("me")
            .add_scope(MODIFY_SCOPE)
            .doit()
            .await?;
        Ok(profile.email_address.unwrap_or_default())
    }

    async fn list_filters(&self) -> Result<Vec<ApiFilter>> {
        debug!("Calling Gmail API to list filters...");
        let (_, response) = self
            .hub
            .users()
            .settings_filters_list("me")
            .add_scope(SETTINGS_SCOPE)
            .doit()
            .await?;

        let filters = response.filter.unwrap_or_default();
        debug!("Fetched {} filters", filters.len());
        Ok(filters)
    }

    async fn list_labels(&self) -> Result<Vec<LabelInfo>> {
        debug!("Calling Gmail API to list labels...");
        let (_, response) = self
            .hub
            .users()
            .labels_list("me")
            .add_scope(MODIFY_SCOPE)
            .doit()
            .await?;

        let labels: Vec<LabelInfo> = response
            .labels
            .unwrap_or_default()
            .into_iter()
            .filter_map(|label| match (label.id, label.name) {
                (Some(id), Some(name)) => Some(LabelInfo {
                    id,
                    name,
                    label_type: label.type_.unwrap_or_else(|| "system".to_string()),
                }),
                _ => None,
            })
            .collect();

        debug!("Fetched {} labels", labels.len());
        Ok(labels)
    }

    async fn create_filter(&self, filter: &ApiFilter) -> Result<String> {
        let request = ApiFilter {
            id: None,
            ..filter.clone()
        };

        let (_, created) = self
            .hub
            .users()
            .settings_filters_create(request, "me")
            .add_scope(SETTINGS_SCOPE)
            .doit()
            .await?;

        created
            .id
            .ok_or_else(|| GfmError::ApiError("Created filter has no ID".to_string()))
    }

    async fn delete_filter(&self, filter_id: &str) -> Result<()> {
        self.hub
            .users()
            .settings_filters_delete("me", filter_id)
            .add_scope(SETTINGS_SCOPE)
            .doit()
            .await?;
        Ok(())
    }
}
