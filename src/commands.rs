//! Command pipelines
//!
//! Each subcommand is a short pipeline over the codecs, the API mapper and
//! the session context. Human-readable output goes to the `out` writer the
//! caller supplies; logs and spinners go to stderr.

use std::io::Write;
use std::path::Path;

use google_gmail1::api::Filter as ApiFilter;
use serde_json::Value;
use tracing::{debug, info};

use crate::cli::{ProgressReporter, PutOptions};
use crate::config::Config;
use crate::context::GmailContext;
use crate::error::{GfmError, Result};
use crate::filter_mapper::{self, object_fields};
use crate::models::Filter;
use crate::{xml, yaml};

/// Reads the XML export and writes it as YAML; returns the entry count
pub async fn xml_to_yaml(input: &Path, output: &Path) -> Result<usize> {
    let filter = xml::read(input).await?;
    yaml::write(output, &filter).await?;
    Ok(filter.len())
}

/// Reads the YAML file and writes it as an XML export; returns the entry count
pub async fn yaml_to_xml(input: &Path, output: &Path) -> Result<usize> {
    let filter = yaml::read(input).await?;
    xml::write(output, &filter).await?;
    Ok(filter.len())
}

/// Downloads the account's filters into a YAML file
pub async fn get(
    ctx: &mut GmailContext,
    output: &Path,
    reporter: &ProgressReporter,
) -> Result<Filter> {
    fetch(ctx, reporter, Fetch::Both).await?;
    let (filters, labels) = ctx.filters_and_labels().await?;
    let filter = filter_mapper::api_to_filter(filters, labels)?;
    yaml::write(output, &filter).await?;
    Ok(filter)
}

/// Prints the entries of the YAML file
pub async fn show_filters(input: &Path, out: &mut impl Write) -> Result<()> {
    let filter = yaml::read(input).await?;
    print_filter(&filter, out)
}

/// Prints the entries of the XML export
pub async fn show_filter_xml(input: &Path, out: &mut impl Write) -> Result<()> {
    let filter = xml::read(input).await?;
    print_filter(&filter, out)
}

pub fn print_filter(filter: &Filter, out: &mut impl Write) -> Result<()> {
    writeln!(out, "namespaces:")?;
    for (prefix, uri) in filter.namespaces.iter() {
        writeln!(out, "  {}: {}", prefix, uri)?;
    }
    writeln!(out, "entries: {}", filter.len())?;
    for (index, entry) in filter.entries.iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "entry {}:", index + 1)?;
        for (name, value) in entry.iter() {
            writeln!(out, "  {}: {}", name, value)?;
        }
    }
    Ok(())
}

/// Prints the account's filters, one JSON object per line with `raw`
pub async fn show_filter_api(
    ctx: &mut GmailContext,
    raw: bool,
    reporter: &ProgressReporter,
    out: &mut impl Write,
) -> Result<()> {
    fetch(ctx, reporter, Fetch::Filters).await?;
    for filter in ctx.filters().await? {
        if raw {
            writeln!(out, "{}", serde_json::to_string(filter)?)?;
            continue;
        }

        writeln!(out, "criteria:")?;
        if let Some(criteria) = &filter.criteria {
            for (key, value) in object_fields(criteria)? {
                writeln!(out, "  {}: {}", key, display_value(&value))?;
            }
        }
        writeln!(out, "action:")?;
        if let Some(action) = &filter.action {
            for (key, value) in object_fields(action)? {
                writeln!(out, "  {}: {}", key, display_value(&value))?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Prints user labels then system labels, each sorted by name
pub async fn show_labels_api(
    ctx: &mut GmailContext,
    raw: bool,
    reporter: &ProgressReporter,
    out: &mut impl Write,
) -> Result<()> {
    fetch(ctx, reporter, Fetch::Labels).await?;
    let labels = ctx.labels().await?;

    if raw {
        for label in labels.labels() {
            writeln!(out, "{}", serde_json::to_string(label)?)?;
        }
        return Ok(());
    }

    let (user, system) = labels.partition();
    writeln!(out, "===User labels===")?;
    for label in user {
        writeln!(out, "{}: {}", label.name, label.id)?;
    }
    writeln!(out)?;
    writeln!(out, "===System labels===")?;
    for label in system {
        writeln!(out, "{}: {}", label.name, label.id)?;
    }
    Ok(())
}

/// Changes `put` would make to the account
#[derive(Debug, Clone, Default)]
pub struct PutPlan {
    pub create: Vec<ApiFilter>,
    pub delete: Vec<ApiFilter>,
    pub unchanged: usize,
}

impl PutPlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.delete.is_empty()
    }
}

/// What `put` did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutReport {
    pub created: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub applied: bool,
}

/// Compares desired filters with the account's
///
/// Desired filters already present are left alone and duplicates among
/// them collapse to one. With `prune`, account filters matching no desired
/// filter are scheduled for deletion.
pub fn plan_put(desired: Vec<ApiFilter>, existing: &[ApiFilter], prune: bool) -> PutPlan {
    let mut unique: Vec<ApiFilter> = Vec::new();
    for filter in desired {
        if unique.iter().any(|u| filter_mapper::same_rule(u, &filter)) {
            debug!("Skipping duplicate filter {}", describe_filter(&filter));
            continue;
        }
        unique.push(filter);
    }

    let (present, create): (Vec<ApiFilter>, Vec<ApiFilter>) = unique
        .into_iter()
        .partition(|f| existing.iter().any(|e| filter_mapper::same_rule(e, f)));

    let delete = if prune {
        existing
            .iter()
            .filter(|e| !present.iter().any(|p| filter_mapper::same_rule(p, e)))
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    PutPlan {
        create,
        delete,
        unchanged: present.len(),
    }
}

/// Creates the YAML file's filters that the account lacks
///
/// `confirm` is asked before any change unless `options.yes` is set.
pub async fn put(
    ctx: &mut GmailContext,
    input: &Path,
    options: PutOptions,
    reporter: &ProgressReporter,
    out: &mut impl Write,
    confirm: impl FnOnce(&str) -> Result<bool>,
) -> Result<PutReport> {
    let filter = yaml::read(input).await?;
    fetch(ctx, reporter, Fetch::Both).await?;

    let plan = {
        let (existing, labels) = ctx.filters_and_labels().await?;
        let mut desired = Vec::new();
        for entry in &filter.entries {
            desired.extend(filter_mapper::entry_to_api(entry, labels)?);
        }
        info!(
            "{} entries map to {} API filters",
            filter.len(),
            desired.len()
        );
        plan_put(desired, existing, options.prune)
    };

    write_plan(&plan, out)?;
    let mut report = PutReport {
        unchanged: plan.unchanged,
        ..PutReport::default()
    };

    if options.dry_run {
        writeln!(out, "Dry run: no changes made.")?;
        return Ok(report);
    }
    if plan.is_empty() {
        writeln!(out, "Nothing to do.")?;
        return Ok(report);
    }

    if !options.yes {
        let prompt = format!(
            "Create {} and delete {} filters?",
            plan.create.len(),
            plan.delete.len()
        );
        if !confirm(&prompt)? {
            writeln!(out, "Aborted.")?;
            return Ok(report);
        }
    }

    let spinner = reporter.add_spinner("Applying filter changes...");
    let applied = apply_plan(ctx, &plan, &mut report).await;
    match applied {
        Ok(()) => reporter.finish_spinner(
            &spinner,
            &format!(
                "Created {} and deleted {} filters",
                report.created, report.deleted
            ),
        ),
        Err(e) => {
            spinner.finish_and_clear();
            ctx.clear_cache();
            return Err(e);
        }
    }

    ctx.clear_cache();
    report.applied = true;
    writeln!(
        out,
        "Created {} filters, deleted {} filters.",
        report.created, report.deleted
    )?;
    Ok(report)
}

async fn apply_plan(ctx: &GmailContext, plan: &PutPlan, report: &mut PutReport) -> Result<()> {
    let client = ctx.client();
    for filter in &plan.create {
        let id = client.create_filter(filter).await?;
        info!("Created filter {}: {}", id, describe_filter(filter));
        report.created += 1;
    }
    for filter in &plan.delete {
        let Some(id) = filter.id.as_deref() else {
            return Err(GfmError::ApiError(format!(
                "Cannot delete filter without ID: {}",
                describe_filter(filter)
            )));
        };
        client.delete_filter(id).await?;
        info!("Deleted filter {}", id);
        report.deleted += 1;
    }
    Ok(())
}

fn write_plan(plan: &PutPlan, out: &mut impl Write) -> Result<()> {
    writeln!(
        out,
        "{} filters to create, {} to delete, {} already present",
        plan.create.len(),
        plan.delete.len(),
        plan.unchanged
    )?;
    for filter in &plan.create {
        writeln!(out, "  + {}", describe_filter(filter))?;
    }
    for filter in &plan.delete {
        writeln!(out, "  - {}", describe_filter(filter))?;
    }
    Ok(())
}

/// Writes a default configuration file to `path`
pub async fn init_config(path: &Path, force: bool, out: &mut impl Write) -> Result<()> {
    if path.exists() && !force {
        return Err(GfmError::ConfigError(format!(
            "Configuration file already exists at {:?}. Use --force to overwrite.",
            path
        )));
    }

    Config::create_example(path).await?;
    writeln!(out, "Created configuration file at: {:?}", path)?;
    writeln!(
        out,
        "Set auth.client_id and auth.client_secret to your OAuth client before running `gfm auth`."
    )?;
    Ok(())
}

/// One-line summary, e.g. `from=boss@co => addLabelIds=STARRED`
pub fn describe_filter(filter: &ApiFilter) -> String {
    let render = |fields: Result<Vec<(String, Value)>>| -> String {
        fields
            .unwrap_or_default()
            .iter()
            .map(|(key, value)| format!("{}={}", key, display_value(value)))
            .collect::<Vec<_>>()
            .join(" ")
    };

    let criteria = filter
        .criteria
        .as_ref()
        .map(|c| render(object_fields(c)))
        .unwrap_or_default();
    let action = filter
        .action
        .as_ref()
        .map(|a| render(object_fields(a)))
        .unwrap_or_default();
    format!("{} => {}", criteria, action)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(display_value).collect();
            format!("[{}]", items.join(", "))
        }
        other => other.to_string(),
    }
}

enum Fetch {
    Filters,
    Labels,
    Both,
}

/// Fills the context cache behind a spinner
async fn fetch(ctx: &mut GmailContext, reporter: &ProgressReporter, what: Fetch) -> Result<()> {
    let spinner = reporter.add_spinner("Fetching from Gmail API...");
    let summary = match what {
        Fetch::Filters => ctx
            .filters()
            .await
            .map(|f| format!("Fetched {} filters", f.len())),
        Fetch::Labels => ctx
            .labels()
            .await
            .map(|l| format!("Fetched {} labels", l.len())),
        Fetch::Both => ctx
            .filters_and_labels()
            .await
            .map(|(f, l)| format!("Fetched {} filters and {} labels", f.len(), l.len())),
    };

    match summary {
        Ok(summary) => {
            reporter.finish_spinner(&spinner, &summary);
            Ok(())
        }
        Err(e) => {
            spinner.finish_and_clear();
            Err(e)
        }
    }
}
