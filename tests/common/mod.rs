//! Common test utilities and fixtures
#![allow(dead_code)]

use google_gmail1::api::{Filter as ApiFilter, FilterAction, FilterCriteria};
use gmail_filter_manager::client::{GmailClient, LabelInfo};
use gmail_filter_manager::error::Result;
use mockall::mock;
use std::path::PathBuf;

/// Path of a file under `tests/fixtures`
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Create a test LabelInfo
pub fn create_test_label_info(id: &str, name: &str, label_type: &str) -> LabelInfo {
    LabelInfo {
        id: id.to_string(),
        name: name.to_string(),
        label_type: label_type.to_string(),
    }
}

/// A small account: a few system labels and two user labels
pub fn sample_labels() -> Vec<LabelInfo> {
    vec![
        create_test_label_info("INBOX", "INBOX", "system"),
        create_test_label_info("STARRED", "STARRED", "system"),
        create_test_label_info("UNREAD", "UNREAD", "system"),
        create_test_label_info("Label_1", "Work", "user"),
        create_test_label_info("Label_2", "Receipts", "user"),
    ]
}

/// API filter matching a sender
pub fn from_filter(
    id: Option<&str>,
    from: &str,
    add_label_ids: &[&str],
    remove_label_ids: &[&str],
) -> ApiFilter {
    let ids = |ids: &[&str]| {
        if ids.is_empty() {
            None
        } else {
            Some(ids.iter().map(|s| s.to_string()).collect())
        }
    };

    ApiFilter {
        id: id.map(str::to_string),
        criteria: Some(FilterCriteria {
            from: Some(from.to_string()),
            ..Default::default()
        }),
        action: Some(FilterAction {
            add_label_ids: ids(add_label_ids),
            remove_label_ids: ids(remove_label_ids),
            ..Default::default()
        }),
    }
}

pub fn criteria_from(filter: &ApiFilter) -> Option<&str> {
    filter.criteria.as_ref().and_then(|c| c.from.as_deref())
}

// Mock implementation of GmailClient for testing
mock! {
    pub GmailClient {}

    #[async_trait::async_trait]
    impl GmailClient for GmailClient {
        async fn get_profile(&self) -> Result<String>;
        async fn list_filters(&self) -> Result<Vec<ApiFilter>>;
        async fn list_labels(&self) -> Result<Vec<LabelInfo>>;
        async fn create_filter(&self, filter: &ApiFilter) -> Result<String>;
        async fn delete_filter(&self, filter_id: &str) -> Result<()>;
    }
}

/// Mock returning `filters` and [`sample_labels`], each at most once
pub fn mock_account(filters: Vec<ApiFilter>) -> MockGmailClient {
    let mut mock = MockGmailClient::new();
    mock.expect_list_filters()
        .times(0..=1)
        .returning(move || Ok(filters.clone()));
    mock.expect_list_labels()
        .times(0..=1)
        .returning(|| Ok(sample_labels()));
    mock
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_filter() {
        let filter = from_filter(Some("f1"), "a@example.com", &["STARRED"], &[]);
        assert_eq!(filter.id.as_deref(), Some("f1"));
        assert_eq!(criteria_from(&filter), Some("a@example.com"));
        let action = filter.action.unwrap();
        assert_eq!(action.add_label_ids, Some(vec!["STARRED".to_string()]));
        assert_eq!(action.remove_label_ids, None);
    }

    #[test]
    fn test_fixture_path() {
        assert!(fixture("mailFilters.xml").ends_with("tests/fixtures/mailFilters.xml"));
    }
}
