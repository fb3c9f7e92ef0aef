use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;

use crate::entry::{Column, Entry};
use crate::store::Store;
use crate::tracker::{Submission, Tracker};

pub struct EditArgs {
    pub company: Option<String>,
    pub position: Option<String>,
    pub status: Option<String>,
    pub date: Option<String>,
}

fn outcome(tracker: &Tracker<impl Store>, submission: Submission) -> Result<u64> {
    match submission {
        Submission::Created(id) | Submission::Updated(id) => Ok(id),
        Submission::Invalid => bail!(
            "Invalid application:\n  {}",
            tracker.errors().messages().join("\n  ")
        ),
        Submission::Missing(id) => bail!("No application with id {}", id),
        Submission::Failed | Submission::NotOpen => {
            let text = tracker
                .notice()
                .map(|n| n.text.clone())
                .unwrap_or_else(|| "Application was not saved".to_string());
            Err(anyhow!(text))
        }
    }
}

pub fn add<S: Store>(
    tracker: &mut Tracker<S>,
    company: String,
    position: String,
    status: String,
    date: Option<String>,
    today: NaiveDate,
) -> Result<u64> {
    tracker.request_create(today);
    let date = date.unwrap_or_else(|| tracker.draft().date.clone());
    let entry = Entry::new(&company, &position, &status, &date);
    let submission = tracker.submit(entry, today);
    outcome(&*tracker, submission)
}

pub fn edit<S: Store>(
    tracker: &mut Tracker<S>,
    id: u64,
    args: EditArgs,
    today: NaiveDate,
) -> Result<u64> {
    if !tracker.request_edit(id) {
        bail!("No application with id {}", id);
    }
    let mut entry = tracker.draft().clone();
    let changes = [
        (Column::Company, args.company),
        (Column::Position, args.position),
        (Column::Status, args.status),
        (Column::Date, args.date),
    ];
    for (column, value) in changes {
        if let Some(value) = value {
            *entry.field_mut(column) = value;
        }
    }
    let submission = tracker.submit(entry, today);
    outcome(&*tracker, submission)
}

/// Applies `--sort` the same way header clicks do.
pub fn sort_by<S: Store>(tracker: &mut Tracker<S>, column: &str, descending: bool) -> Result<()> {
    let column = Column::from_key(column).ok_or_else(|| {
        let keys: Vec<&str> = Column::ALL.iter().map(|c| c.key()).collect();
        anyhow!("Unknown column '{}' (expected one of: {})", column, keys.join(", "))
    })?;
    tracker.cycle_sort(column);
    if descending {
        tracker.cycle_sort(column);
    }
    Ok(())
}

pub fn format_table<S: Store>(tracker: &Tracker<S>) -> String {
    if tracker.rows().is_empty() {
        return "No data yet".to_string();
    }

    let headers = tracker.headers();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.label().chars().count()).collect();
    for (_, entry) in tracker.rows() {
        for (i, column) in headers.iter().enumerate() {
            widths[i] = widths[i].max(entry.field(*column).chars().count());
        }
    }
    let id_width = tracker
        .rows()
        .iter()
        .map(|(id, _)| id.to_string().len())
        .max()
        .unwrap_or(1)
        .max(2);

    let mut out = format!("{:>w$}", "ID", w = id_width);
    for (i, header) in headers.iter().enumerate() {
        out.push_str(&format!("  {:<w$}", header.label(), w = widths[i]));
    }
    out = out.trim_end().to_string();

    for (id, entry) in tracker.rows() {
        let mut line = format!("{:>w$}", id, w = id_width);
        for (i, column) in headers.iter().enumerate() {
            line.push_str(&format!("  {:<w$}", entry.field(*column), w = widths[i]));
        }
        out.push('\n');
        out.push_str(line.trim_end());
    }
    out
}
