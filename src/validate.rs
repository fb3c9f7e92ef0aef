use chrono::NaiveDate;

use crate::entry::{Collection, Column, Entry, Status};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

/// One message per offending field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub company: Option<String>,
    pub position: Option<String>,
    pub status: Option<String>,
    pub date: Option<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.company.is_none()
            && self.position.is_none()
            && self.status.is_none()
            && self.date.is_none()
    }

    pub fn get(&self, column: Column) -> Option<&str> {
        match column {
            Column::Company => self.company.as_deref(),
            Column::Position => self.position.as_deref(),
            Column::Status => self.status.as_deref(),
            Column::Date => self.date.as_deref(),
        }
    }

    /// `field: message` pairs, in column order.
    pub fn messages(&self) -> Vec<String> {
        Column::ALL
            .iter()
            .filter_map(|c| self.get(*c).map(|m| format!("{}: {}", c.key(), m)))
            .collect()
    }
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

pub fn validate(
    entry: &Entry,
    mode: FormMode,
    existing: &Collection,
    today: NaiveDate,
    allow_future_dates: bool,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();

    if entry.company.is_empty() {
        errors.company = Some("Company is required".to_string());
    } else if mode == FormMode::Create && existing.contains_company(&entry.company) {
        errors.company = Some("Company already exists".to_string());
    }

    if entry.position.is_empty() {
        errors.position = Some("Position is required".to_string());
    }

    if Status::parse(&entry.status).is_none() {
        errors.status = Some("Status must be one of the listed options".to_string());
    }

    match parse_date(&entry.date) {
        None => errors.date = Some("Date must be valid".to_string()),
        Some(date) if !allow_future_dates && date > today => {
            errors.date = Some("Date cannot be in the future".to_string());
        }
        Some(_) => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn existing() -> Collection {
        let mut c = Collection::new();
        c.push(0, Entry::new("Acme", "Engineer", "Applied", "2024-01-10"));
        c
    }

    fn check(entry: &Entry, mode: FormMode) -> Result<(), FieldErrors> {
        validate(entry, mode, &existing(), today(), false)
    }

    #[test]
    fn accepts_complete_entry() {
        let entry = Entry::new("Globex", "Analyst", "Offer", "2024-02-29");
        assert_eq!(check(&entry, FormMode::Create), Ok(()));
    }

    #[test]
    fn reports_every_empty_field() {
        let errors = check(&Entry::default(), FormMode::Create).unwrap_err();
        assert_eq!(errors.company.as_deref(), Some("Company is required"));
        assert_eq!(errors.position.as_deref(), Some("Position is required"));
        assert_eq!(
            errors.status.as_deref(),
            Some("Status must be one of the listed options")
        );
        assert_eq!(errors.date.as_deref(), Some("Date must be valid"));
        assert_eq!(errors.messages().len(), 4);
    }

    #[test]
    fn duplicate_company_only_rejected_on_create() {
        let entry = Entry::new("Acme", "Manager", "Interview", "2024-02-01");
        let errors = check(&entry, FormMode::Create).unwrap_err();
        assert_eq!(errors.company.as_deref(), Some("Company already exists"));
        assert!(errors.position.is_none());

        assert_eq!(check(&entry, FormMode::Edit), Ok(()));
    }

    #[test]
    fn company_match_is_case_sensitive() {
        let entry = Entry::new("acme", "Engineer", "Applied", "2024-01-10");
        assert_eq!(check(&entry, FormMode::Create), Ok(()));
    }

    #[test]
    fn status_outside_options_rejected() {
        let entry = Entry::new("Globex", "Analyst", "Ghosted", "2024-02-01");
        let errors = check(&entry, FormMode::Create).unwrap_err();
        assert!(errors.status.is_some());
        assert_eq!(errors.get(Column::Status), errors.status.as_deref());
        assert!(errors.company.is_none());
    }

    #[test]
    fn impossible_dates_rejected() {
        for date in ["2023-02-29", "2024-13-01", "yesterday", "01/02/2024"] {
            let entry = Entry::new("Globex", "Analyst", "Offer", date);
            let errors = check(&entry, FormMode::Create).unwrap_err();
            assert_eq!(errors.date.as_deref(), Some("Date must be valid"), "{}", date);
        }
    }

    #[test]
    fn future_dates_follow_policy() {
        let entry = Entry::new("Globex", "Analyst", "Offer", "2024-03-02");
        let errors = check(&entry, FormMode::Create).unwrap_err();
        assert_eq!(errors.date.as_deref(), Some("Date cannot be in the future"));

        assert_eq!(
            validate(&entry, FormMode::Create, &existing(), today(), true),
            Ok(())
        );

        let same_day = Entry::new("Globex", "Analyst", "Offer", "2024-03-01");
        assert_eq!(check(&same_day, FormMode::Create), Ok(()));
    }
}
