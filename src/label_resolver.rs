//! Label ID and name resolution over a fetched label list
use crate::client::LabelInfo;
use crate::error::{GfmError, Result};

/// Label type Gmail reports for user-created labels
pub const USER_LABEL_TYPE: &str = "user";

/// Resolves label IDs to names and back
///
/// Built once from a full `labels.list` response. Every lookup must match
/// exactly one label; zero or several candidates is a [`GfmError::LookupError`].
#[derive(Debug, Clone, Default)]
pub struct LabelResolver {
    labels: Vec<LabelInfo>,
}

impl LabelResolver {
    pub fn new(labels: Vec<LabelInfo>) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &[LabelInfo] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Name of the label with `id`
    pub fn resolve_id(&self, id: &str) -> Result<&str> {
        let candidates: Vec<&LabelInfo> = self.labels.iter().filter(|l| l.id == id).collect();
        match candidates.as_slice() {
            [label] => Ok(label.name.as_str()),
            _ => Err(GfmError::LookupError(format!(
                "Wrong label id? id: {}, candidates: {}",
                id,
                describe(&candidates)
            ))),
        }
    }

    /// ID of the label called `name`
    pub fn resolve_name(&self, name: &str) -> Result<&str> {
        let candidates: Vec<&LabelInfo> = self.labels.iter().filter(|l| l.name == name).collect();
        match candidates.as_slice() {
            [label] => Ok(label.id.as_str()),
            _ => Err(GfmError::LookupError(format!(
                "Wrong label name? name: {}, candidates: {}",
                name,
                describe(&candidates)
            ))),
        }
    }

    /// User labels and system labels, each sorted by name
    pub fn partition(&self) -> (Vec<&LabelInfo>, Vec<&LabelInfo>) {
        let (mut user, mut system): (Vec<&LabelInfo>, Vec<&LabelInfo>) = self
            .labels
            .iter()
            .partition(|l| l.label_type == USER_LABEL_TYPE);
        user.sort_by(|a, b| a.name.cmp(&b.name));
        system.sort_by(|a, b| a.name.cmp(&b.name));
        (user, system)
    }
}

fn describe(candidates: &[&LabelInfo]) -> String {
    if candidates.is_empty() {
        return "[]".to_string();
    }
    let names: Vec<String> = candidates
        .iter()
        .map(|l| format!("{} ({})", l.name, l.id))
        .collect();
    format!("[{}]", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(id: &str, name: &str, label_type: &str) -> LabelInfo {
        LabelInfo {
            id: id.to_string(),
            name: name.to_string(),
            label_type: label_type.to_string(),
        }
    }

    fn resolver() -> LabelResolver {
        LabelResolver::new(vec![
            label("INBOX", "INBOX", "system"),
            label("Label_1", "Work", "user"),
            label("Label_2", "Receipts", "user"),
            label("STARRED", "STARRED", "system"),
            label("Label_3", "Archive/2023", "user"),
        ])
    }

    #[test]
    fn test_resolve_id() {
        let resolver = resolver();
        assert_eq!(resolver.resolve_id("Label_1").unwrap(), "Work");
        assert_eq!(resolver.resolve_id("STARRED").unwrap(), "STARRED");
    }

    #[test]
    fn test_resolve_name() {
        let resolver = resolver();
        assert_eq!(resolver.resolve_name("Receipts").unwrap(), "Label_2");
        assert_eq!(resolver.resolve_name("Archive/2023").unwrap(), "Label_3");
    }

    #[test]
    fn test_unknown_id_is_lookup_error() {
        let resolver = resolver();
        let result = resolver.resolve_id("Label_404");
        match result {
            Err(GfmError::LookupError(message)) => {
                assert!(message.contains("Label_404"));
                assert!(message.contains("[]"));
            }
            other => panic!("expected LookupError, got {:?}", other),
        }
    }

    #[test]
    fn test_ambiguous_name_is_lookup_error() {
        let mut labels = resolver().labels().to_vec();
        labels.push(label("Label_9", "Work", "user"));
        let resolver = LabelResolver::new(labels);

        let result = resolver.resolve_name("Work");
        match result {
            Err(GfmError::LookupError(message)) => {
                assert!(message.contains("Label_1"));
                assert!(message.contains("Label_9"));
            }
            other => panic!("expected LookupError, got {:?}", other),
        }
    }

    #[test]
    fn test_name_lookup_is_case_sensitive() {
        assert!(resolver().resolve_name("work").is_err());
    }

    #[test]
    fn test_partition_sorts_each_group() {
        let resolver = resolver();
        let (user, system) = resolver.partition();

        let user_names: Vec<&str> = user.iter().map(|l| l.name.as_str()).collect();
        let system_names: Vec<&str> = system.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(user_names, vec!["Archive/2023", "Receipts", "Work"]);
        assert_eq!(system_names, vec!["INBOX", "STARRED"]);
    }
}
