use serde::{Deserialize, Serialize};
use std::fmt;

/// One job application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub company: String,
    pub position: String,
    pub status: String,
    pub date: String,
}

impl Entry {
    pub fn new(company: &str, position: &str, status: &str, date: &str) -> Self {
        Self {
            company: company.to_string(),
            position: position.to_string(),
            status: status.to_string(),
            date: date.to_string(),
        }
    }

    pub fn field(&self, column: Column) -> &str {
        match column {
            Column::Company => &self.company,
            Column::Position => &self.position,
            Column::Status => &self.status,
            Column::Date => &self.date,
        }
    }

    pub fn field_mut(&mut self, column: Column) -> &mut String {
        match column {
            Column::Company => &mut self.company,
            Column::Position => &mut self.position,
            Column::Status => &mut self.status,
            Column::Date => &mut self.date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Applied,
    Interview,
    Offer,
    Rejected,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Applied,
        Status::Interview,
        Status::Offer,
        Status::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Applied => "Applied",
            Status::Interview => "Interview",
            Status::Offer => "Offer",
            Status::Rejected => "Rejected",
        }
    }

    /// Exact, case-sensitive match against the listed options.
    pub fn parse(value: &str) -> Option<Status> {
        Status::ALL.into_iter().find(|s| s.as_str() == value)
    }

    /// Steps through the options from whatever is currently typed.
    /// Unknown text starts at the first (or last, going backwards) option.
    pub fn cycle(current: &str, forward: bool) -> Status {
        let len = Status::ALL.len();
        match Status::ALL.iter().position(|s| s.as_str() == current) {
            Some(i) if forward => Status::ALL[(i + 1) % len],
            Some(i) => Status::ALL[(i + len - 1) % len],
            None => {
                // Prefix completion before falling back to the ends.
                let lower = current.to_lowercase();
                if !lower.is_empty() {
                    if let Some(s) = Status::ALL
                        .iter()
                        .find(|s| s.as_str().to_lowercase().starts_with(&lower))
                    {
                        return *s;
                    }
                }
                if forward {
                    Status::ALL[0]
                } else {
                    Status::ALL[len - 1]
                }
            }
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A table column. Declaration order is header order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Company,
    Position,
    Status,
    Date,
}

impl Column {
    pub const ALL: [Column; 4] = [
        Column::Company,
        Column::Position,
        Column::Status,
        Column::Date,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Column::Company => "company",
            Column::Position => "position",
            Column::Status => "status",
            Column::Date => "date",
        }
    }

    pub fn label(&self) -> String {
        capitalize(self.key())
    }

    pub fn from_key(key: &str) -> Option<Column> {
        let key = key.to_lowercase();
        Column::ALL.into_iter().find(|c| c.key() == key)
    }

    pub fn index(&self) -> usize {
        Column::ALL.iter().position(|c| c == self).unwrap_or(0)
    }
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Entries keyed by id, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Collection {
    entries: Vec<(u64, Entry)>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from decoded pairs. Later duplicates of an id are dropped.
    pub fn from_pairs(pairs: Vec<(u64, Entry)>) -> (Self, usize) {
        let mut collection = Self::new();
        let mut dropped = 0;
        for (id, entry) in pairs {
            if collection.get(id).is_some() {
                dropped += 1;
                continue;
            }
            collection.entries.push((id, entry));
        }
        (collection, dropped)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Entry> {
        self.entries.iter().find(|(i, _)| *i == id).map(|(_, e)| e)
    }

    pub fn pairs(&self) -> &[(u64, Entry)] {
        &self.entries
    }

    pub fn contains_company(&self, company: &str) -> bool {
        self.entries.iter().any(|(_, e)| e.company == company)
    }

    /// Next id is the collection size. A hand-edited payload can already hold
    /// that id, in which case allocation moves past the largest id.
    pub fn next_id(&self) -> u64 {
        let size = self.entries.len() as u64;
        if self.get(size).is_none() {
            return size;
        }
        self.entries.iter().map(|(i, _)| *i).max().map_or(0, |m| m + 1)
    }

    pub fn push(&mut self, id: u64, entry: Entry) {
        self.entries.push((id, entry));
    }

    pub fn replace(&mut self, id: u64, entry: Entry) -> bool {
        match self.entries.iter_mut().find(|(i, _)| *i == id) {
            Some(slot) => {
                slot.1 = entry;
                true
            }
            None => false,
        }
    }

    /// Union of field names across all entries. Every entry carries the same
    /// four fields, so this is either all columns or none.
    pub fn headers(&self) -> Vec<Column> {
        if self.is_empty() {
            Vec::new()
        } else {
            Column::ALL.to_vec()
        }
    }
}
