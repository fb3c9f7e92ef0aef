use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use crate::entry::{Column, Entry};
use crate::error::StoreError;
use crate::logger;
use crate::store::Store;
use crate::validate::{validate, FieldErrors, FormMode, DATE_FORMAT};

/// Per-column tri-state ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Default,
    Ascending,
    Descending,
}

impl Order {
    pub fn next(self) -> Order {
        match self {
            Order::Default => Order::Ascending,
            Order::Ascending => Order::Descending,
            Order::Descending => Order::Default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    Closed,
    Create,
    Edit { id: u64, entry: Entry },
}

impl Dialog {
    pub fn is_open(&self) -> bool {
        !matches!(self, Dialog::Closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Created(u64),
    Updated(u64),
    /// Validation failed; the dialog stays open with field errors.
    Invalid,
    /// The write did not land; the dialog stays open and nothing changed.
    Failed,
    /// The edit target no longer exists; the dialog closes.
    Missing(u64),
    NotOpen,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Settings {
    pub allow_future_dates: bool,
}

/// Session state over a [`Store`]: dialog, sorting and selection.
pub struct Tracker<S: Store> {
    store: S,
    settings: Settings,
    snapshot: Vec<(u64, Entry)>,
    rows: Vec<(u64, Entry)>,
    headers: Vec<Column>,
    ordering: BTreeMap<Column, Order>,
    active: Option<Column>,
    selected: BTreeSet<u64>,
    dialog: Dialog,
    draft: Entry,
    errors: FieldErrors,
    notice: Option<Notice>,
}

impl<S: Store> Tracker<S> {
    pub fn new(store: S, settings: Settings) -> Self {
        let mut tracker = Self {
            store,
            settings,
            snapshot: Vec::new(),
            rows: Vec::new(),
            headers: Vec::new(),
            ordering: BTreeMap::new(),
            active: None,
            selected: BTreeSet::new(),
            dialog: Dialog::Closed,
            draft: Entry::default(),
            errors: FieldErrors::default(),
            notice: None,
        };
        tracker.refresh();
        tracker
    }

    /// Re-reads the store and re-applies the active column's order.
    pub fn refresh(&mut self) {
        let collection = self.store.load();
        self.snapshot = collection.pairs().to_vec();
        self.headers = collection.headers();
        for header in &self.headers {
            self.ordering.entry(*header).or_default();
        }
        let snapshot = &self.snapshot;
        self.selected
            .retain(|id| snapshot.iter().any(|(i, _)| i == id));
        self.apply_order();
    }

    fn apply_order(&mut self) {
        self.rows = self.snapshot.clone();
        let Some(column) = self.active else {
            return;
        };
        match self.order(column) {
            Order::Default => {}
            Order::Ascending => self
                .rows
                .sort_by(|(_, a), (_, b)| a.field(column).cmp(b.field(column))),
            Order::Descending => self
                .rows
                .sort_by(|(_, a), (_, b)| b.field(column).cmp(a.field(column))),
        }
    }

    pub fn rows(&self) -> &[(u64, Entry)] {
        &self.rows
    }

    pub fn headers(&self) -> &[Column] {
        &self.headers
    }

    pub fn entry(&self, id: u64) -> Option<&Entry> {
        self.snapshot.iter().find(|(i, _)| *i == id).map(|(_, e)| e)
    }

    pub fn order(&self, column: Column) -> Order {
        self.ordering.get(&column).copied().unwrap_or_default()
    }

    pub fn active_column(&self) -> Option<Column> {
        self.active
    }

    /// Header click. The active column steps through its tri-state; any other
    /// column becomes active at `Ascending`. Stored states of other columns are kept.
    pub fn cycle_sort(&mut self, column: Column) -> Order {
        let next = if self.active == Some(column) {
            self.order(column).next()
        } else {
            Order::Ascending
        };
        self.ordering.insert(column, next);
        self.active = Some(column);
        self.apply_order();
        next
    }

    pub fn toggle_selection(&mut self, id: u64) {
        if !self.selected.remove(&id) && self.entry(id).is_some() {
            self.selected.insert(id);
        }
    }

    pub fn is_selected(&self, id: u64) -> bool {
        self.selected.contains(&id)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn dialog(&self) -> &Dialog {
        &self.dialog
    }

    /// Values the open form starts from (or was last submitted with).
    pub fn draft(&self) -> &Entry {
        &self.draft
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    fn set_notice(&mut self, level: NoticeLevel, text: String) {
        self.notice = Some(Notice { level, text });
    }

    pub fn request_create(&mut self, today: NaiveDate) -> bool {
        if self.dialog.is_open() {
            return false;
        }
        self.draft = Entry {
            date: today.format(DATE_FORMAT).to_string(),
            ..Entry::default()
        };
        self.errors = FieldErrors::default();
        self.dialog = Dialog::Create;
        true
    }

    pub fn request_edit(&mut self, id: u64) -> bool {
        if self.dialog.is_open() {
            return false;
        }
        let Some(entry) = self.entry(id).cloned() else {
            return false;
        };
        self.draft = entry.clone();
        self.errors = FieldErrors::default();
        self.dialog = Dialog::Edit { id, entry };
        true
    }

    pub fn cancel(&mut self) {
        self.close_dialog();
    }

    fn close_dialog(&mut self) {
        self.dialog = Dialog::Closed;
        self.draft = Entry::default();
        self.errors = FieldErrors::default();
    }

    pub fn submit(&mut self, entry: Entry, today: NaiveDate) -> Submission {
        let mode = match self.dialog {
            Dialog::Closed => return Submission::NotOpen,
            Dialog::Create => FormMode::Create,
            Dialog::Edit { .. } => FormMode::Edit,
        };

        let entry = Entry {
            company: entry.company.trim().to_string(),
            position: entry.position.trim().to_string(),
            status: entry.status.trim().to_string(),
            date: entry.date.trim().to_string(),
        };
        self.draft = entry.clone();

        let existing = self.store.load();
        if let Err(errors) = validate(
            &entry,
            mode,
            &existing,
            today,
            self.settings.allow_future_dates,
        ) {
            self.errors = errors;
            return Submission::Invalid;
        }
        self.errors = FieldErrors::default();

        let company = entry.company.clone();
        let result = match &self.dialog {
            Dialog::Edit { id, .. } => {
                let id = *id;
                self.store.update(id, entry).map(|_| Submission::Updated(id))
            }
            _ => self.store.create(entry).map(Submission::Created),
        };

        match result {
            Ok(submission) => {
                self.close_dialog();
                self.refresh();
                let verb = match submission {
                    Submission::Created(_) => "Added",
                    _ => "Updated",
                };
                self.set_notice(NoticeLevel::Info, format!("{} {}", verb, company));
                submission
            }
            Err(StoreError::UnknownId(id)) => {
                logger::warn(&format!("submit: edit target {} no longer exists", id));
                self.close_dialog();
                self.refresh();
                self.set_notice(
                    NoticeLevel::Warning,
                    format!("Application {} no longer exists", id),
                );
                Submission::Missing(id)
            }
            Err(e) => {
                logger::warn(&format!("submit: {}", e));
                self.set_notice(NoticeLevel::Error, format!("Not saved: {}", e));
                Submission::Failed
            }
        }
    }

    /// Removes the persisted collection and resets headers, sorting,
    /// selection and the edit target.
    pub fn clear(&mut self) -> bool {
        if let Err(e) = self.store.clear() {
            logger::warn(&format!("clear: {}", e));
            self.set_notice(NoticeLevel::Error, format!("Not cleared: {}", e));
            return false;
        }
        self.snapshot.clear();
        self.rows.clear();
        self.headers.clear();
        self.ordering.clear();
        self.active = None;
        self.selected.clear();
        self.close_dialog();
        self.set_notice(NoticeLevel::Info, "Cleared all applications".to_string());
        true
    }

    #[cfg(test)]
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}
