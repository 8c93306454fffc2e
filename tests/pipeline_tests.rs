//! Tests for the API-backed pipelines against a mocked Gmail account

mod common;

use common::{criteria_from, from_filter, mock_account, MockGmailClient};
use gmail_filter_manager::cli::{ProgressReporter, PutOptions};
use gmail_filter_manager::commands;
use gmail_filter_manager::context::GmailContext;
use gmail_filter_manager::error::GfmError;
use gmail_filter_manager::yaml;

const BOSS_YAML: &str = r#"namespaces:
  apps: "http://schemas.google.com/apps/2006"
  atom: "http://www.w3.org/2005/Atom"
filter:
  - from: "boss@co"
    shouldStar: "true"
"#;

fn context(mock: MockGmailClient) -> GmailContext {
    GmailContext::new(Box::new(mock))
}

async fn write_yaml(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("mailFilters.yaml");
    tokio::fs::write(&path, content).await.unwrap();
    path
}

fn never_asked(_: &str) -> gmail_filter_manager::Result<bool> {
    panic!("confirmation should not be requested");
}

// ============================================================================
// get
// ============================================================================

#[tokio::test]
async fn test_get_writes_starred_sender() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.yaml");
    let mut ctx = context(mock_account(vec![from_filter(
        Some("f1"),
        "boss@co",
        &["STARRED"],
        &[],
    )]));

    let filter = commands::get(&mut ctx, &output, &ProgressReporter::hidden())
        .await
        .unwrap();

    assert_eq!(filter.len(), 1);
    assert_eq!(tokio::fs::read_to_string(&output).await.unwrap(), BOSS_YAML);
}

#[tokio::test]
async fn test_get_resolves_user_labels() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.yaml");
    let mut ctx = context(mock_account(vec![from_filter(
        Some("f1"),
        "billing@shop.example",
        &["Label_2", "Label_1"],
        &["INBOX"],
    )]));

    commands::get(&mut ctx, &output, &ProgressReporter::hidden())
        .await
        .unwrap();

    let filter = yaml::read(&output).await.unwrap();
    let entry = &filter.entries[0];
    assert_eq!(entry.labels(), vec!["Receipts", "Work"]);
    assert_eq!(entry.get_str("shouldArchive"), Some("true"));
}

#[tokio::test]
async fn test_get_unknown_label_is_lookup_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.yaml");
    let mut ctx = context(mock_account(vec![from_filter(
        Some("f1"),
        "x@example.com",
        &["Label_99"],
        &[],
    )]));

    let result = commands::get(&mut ctx, &output, &ProgressReporter::hidden()).await;
    assert!(matches!(result, Err(GfmError::LookupError(_))));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_api_error_is_surfaced() {
    let dir = tempfile::tempdir().unwrap();
    let mut mock = MockGmailClient::new();
    mock.expect_list_filters()
        .times(1)
        .returning(|| Err(GfmError::ApiError("HTTP 403: Forbidden".to_string())));
    mock.expect_list_labels().times(0..=1).returning(|| Ok(vec![]));
    let mut ctx = context(mock);

    let result = commands::get(
        &mut ctx,
        &dir.path().join("out.yaml"),
        &ProgressReporter::hidden(),
    )
    .await;
    match result {
        Err(GfmError::ApiError(message)) => assert!(message.contains("403")),
        other => panic!("expected ApiError, got {:?}", other),
    }
}

// ============================================================================
// put
// ============================================================================

#[tokio::test]
async fn test_put_creates_only_missing_filters() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_yaml(
        &dir,
        r#"filter:
  - from: "boss@co"
    shouldStar: "true"
  - from: "news@example.com"
    shouldArchive: "true"
    label: "Work"
"#,
    )
    .await;

    let mut mock = mock_account(vec![from_filter(Some("f1"), "boss@co", &["STARRED"], &[])]);
    mock.expect_create_filter()
        .withf(|filter| {
            let action = filter.action.clone().unwrap_or_default();
            criteria_from(filter) == Some("news@example.com")
                && action.add_label_ids == Some(vec!["Label_1".to_string()])
                && action.remove_label_ids == Some(vec!["INBOX".to_string()])
        })
        .times(1)
        .returning(|_| Ok("f2".to_string()));
    mock.expect_delete_filter().times(0);
    let mut ctx = context(mock);

    let mut out = Vec::new();
    let options = PutOptions {
        yes: true,
        ..PutOptions::default()
    };
    let report = commands::put(
        &mut ctx,
        &input,
        options,
        &ProgressReporter::hidden(),
        &mut out,
        never_asked,
    )
    .await
    .unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.unchanged, 1);
    assert_eq!(report.deleted, 0);
    assert!(report.applied);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("1 filters to create, 0 to delete, 1 already present"));
}

#[tokio::test]
async fn test_put_fans_out_labels() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_yaml(
        &dir,
        "filter:\n  - subject: \"invoice\"\n    label:\n      - \"Work\"\n      - \"Receipts\"\n",
    )
    .await;

    let mut mock = mock_account(vec![]);
    mock.expect_create_filter()
        .times(2)
        .returning(|_| Ok("new".to_string()));
    let mut ctx = context(mock);

    let report = commands::put(
        &mut ctx,
        &input,
        PutOptions {
            yes: true,
            ..PutOptions::default()
        },
        &ProgressReporter::hidden(),
        &mut Vec::new(),
        never_asked,
    )
    .await
    .unwrap();
    assert_eq!(report.created, 2);
}

#[tokio::test]
async fn test_put_dry_run_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_yaml(&dir, BOSS_YAML).await;

    let mut mock = mock_account(vec![]);
    mock.expect_create_filter().times(0);
    mock.expect_delete_filter().times(0);
    let mut ctx = context(mock);

    let mut out = Vec::new();
    let report = commands::put(
        &mut ctx,
        &input,
        PutOptions {
            dry_run: true,
            ..PutOptions::default()
        },
        &ProgressReporter::hidden(),
        &mut out,
        never_asked,
    )
    .await
    .unwrap();

    assert!(!report.applied);
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("  + from=boss@co => addLabelIds=[STARRED]"));
    assert!(text.contains("Dry run: no changes made."));
}

#[tokio::test]
async fn test_put_prune_deletes_extra_filters() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_yaml(&dir, BOSS_YAML).await;

    let mut mock = mock_account(vec![
        from_filter(Some("f1"), "boss@co", &["STARRED"], &[]),
        from_filter(Some("f2"), "old@example.com", &[], &["INBOX"]),
    ]);
    mock.expect_create_filter().times(0);
    mock.expect_delete_filter()
        .withf(|id| id == "f2")
        .times(1)
        .returning(|_| Ok(()));
    let mut ctx = context(mock);

    let mut asked = None;
    let report = commands::put(
        &mut ctx,
        &input,
        PutOptions {
            prune: true,
            ..PutOptions::default()
        },
        &ProgressReporter::hidden(),
        &mut Vec::new(),
        |prompt| {
            asked = Some(prompt.to_string());
            Ok(true)
        },
    )
    .await
    .unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(asked.as_deref(), Some("Create 0 and delete 1 filters?"));
}

#[tokio::test]
async fn test_put_declined_confirmation_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_yaml(&dir, BOSS_YAML).await;

    let mut mock = mock_account(vec![]);
    mock.expect_create_filter().times(0);
    let mut ctx = context(mock);

    let mut out = Vec::new();
    let report = commands::put(
        &mut ctx,
        &input,
        PutOptions::default(),
        &ProgressReporter::hidden(),
        &mut out,
        |_| Ok(false),
    )
    .await
    .unwrap();

    assert!(!report.applied);
    assert!(String::from_utf8(out).unwrap().contains("Aborted."));
}

#[tokio::test]
async fn test_put_unknown_label_name_is_lookup_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_yaml(&dir, "filter:\n  - from: \"a@example.com\"\n    label: \"Nope\"\n").await;

    let mut mock = mock_account(vec![]);
    mock.expect_create_filter().times(0);
    let mut ctx = context(mock);

    let result = commands::put(
        &mut ctx,
        &input,
        PutOptions {
            yes: true,
            ..PutOptions::default()
        },
        &ProgressReporter::hidden(),
        &mut Vec::new(),
        never_asked,
    )
    .await;
    assert!(matches!(result, Err(GfmError::LookupError(_))));
}

#[tokio::test]
async fn test_put_stops_at_first_failed_create() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_yaml(
        &dir,
        "filter:\n  - from: \"a@example.com\"\n    shouldStar: \"true\"\n  - from: \"b@example.com\"\n    shouldStar: \"true\"\n",
    )
    .await;

    let mut mock = mock_account(vec![]);
    mock.expect_create_filter()
        .times(1)
        .returning(|_| Err(GfmError::NetworkError("connection reset".to_string())));
    let mut ctx = context(mock);

    let result = commands::put(
        &mut ctx,
        &input,
        PutOptions {
            yes: true,
            ..PutOptions::default()
        },
        &ProgressReporter::hidden(),
        &mut Vec::new(),
        never_asked,
    )
    .await;
    assert!(matches!(result, Err(GfmError::NetworkError(_))));
}

// ============================================================================
// show_filterapi / show_labels_api
// ============================================================================

#[tokio::test]
async fn test_show_filter_api() {
    let mut ctx = context(mock_account(vec![from_filter(
        Some("f1"),
        "boss@co",
        &["STARRED"],
        &["INBOX"],
    )]));

    let mut out = Vec::new();
    commands::show_filter_api(&mut ctx, false, &ProgressReporter::hidden(), &mut out)
        .await
        .unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "criteria:\n  from: boss@co\naction:\n  addLabelIds: [STARRED]\n  removeLabelIds: [INBOX]\n\n"
    );
}

#[tokio::test]
async fn test_show_filter_api_raw_prints_json_lines() {
    let mut ctx = context(mock_account(vec![
        from_filter(Some("f1"), "a@example.com", &["STARRED"], &[]),
        from_filter(Some("f2"), "b@example.com", &[], &["INBOX"]),
    ]));

    let mut out = Vec::new();
    commands::show_filter_api(&mut ctx, true, &ProgressReporter::hidden(), &mut out)
        .await
        .unwrap();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["id"], "f1");
    assert_eq!(lines[1]["criteria"]["from"], "b@example.com");
}

#[tokio::test]
async fn test_show_labels_api() {
    let mut ctx = context(mock_account(vec![]));

    let mut out = Vec::new();
    commands::show_labels_api(&mut ctx, false, &ProgressReporter::hidden(), &mut out)
        .await
        .unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "===User labels===\nReceipts: Label_2\nWork: Label_1\n\n===System labels===\nINBOX: INBOX\nSTARRED: STARRED\nUNREAD: UNREAD\n"
    );
}

#[tokio::test]
async fn test_show_labels_api_raw() {
    let mut ctx = context(mock_account(vec![]));

    let mut out = Vec::new();
    commands::show_labels_api(&mut ctx, true, &ProgressReporter::hidden(), &mut out)
        .await
        .unwrap();

    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 5);
    assert!(text.contains(r#"{"id":"Label_1","name":"Work","type":"user"}"#));
}
