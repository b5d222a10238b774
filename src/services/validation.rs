//! Validate → sanitize pipeline for submitted forms.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s. Every stage runs, in
//! order, over a [`SanitizedForm`]: normalizing stages rewrite values,
//! checking stages append a [`Violation`] and never stop the run, so one
//! submission reports all of its problems at once.

use chrono::{DateTime, NaiveDate};
use validator::ValidateLength;

use crate::models::{FromForm, InstanceStatus, RawInput, SanitizedForm, Violation};

/// One step of a pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Strip surrounding whitespace from every value of the field
    Trim(&'static str),
    /// Escape markup-significant characters in every value of the field
    Escape(&'static str),
    /// The field must have a non-empty first value
    Required {
        field: &'static str,
        message: &'static str,
    },
    /// Character count bounds, checked only when a value is present.
    /// Placed before `Escape`, the bounds apply to the submitted text rather
    /// than its escaped form.
    Length {
        field: &'static str,
        min: Option<u64>,
        max: Option<u64>,
        message: &'static str,
    },
    /// Optional date; a present value must parse as YYYY-MM-DD or RFC 3339
    Date {
        field: &'static str,
        message: &'static str,
    },
    /// A present value must be one of `allowed`
    OneOf {
        field: &'static str,
        allowed: &'static [&'static str],
        message: &'static str,
    },
    /// When both dates parsed, `later` may not precede `earlier`
    DateOrder {
        earlier: &'static str,
        later: &'static str,
        message: &'static str,
    },
}

impl Stage {
    pub fn apply(&self, form: &mut SanitizedForm) {
        match self {
            Stage::Trim(field) => {
                if let Some(values) = form.values_mut(field) {
                    for value in values.iter_mut() {
                        let trimmed = value.trim();
                        if trimmed.len() != value.len() {
                            *value = trimmed.to_string();
                        }
                    }
                }
            }
            Stage::Escape(field) => {
                if let Some(values) = form.values_mut(field) {
                    for value in values.iter_mut() {
                        *value = escape(value);
                    }
                }
            }
            Stage::Required { field, message } => {
                if form.text(field).is_empty() {
                    form.reject(field, message);
                }
            }
            Stage::Length {
                field,
                min,
                max,
                message,
            } => {
                let value = form.text(field);
                if !value.is_empty() && !value.validate_length(*min, *max, None) {
                    form.reject(field, message);
                }
            }
            Stage::Date { field, message } => {
                let value = form.text(field);
                if value.is_empty() {
                    return;
                }
                match parse_date(&value) {
                    Some(date) => {
                        if let Some(values) = form.values_mut(field) {
                            values[0] = date.to_string();
                        }
                        form.set_date(field, date);
                    }
                    None => form.reject(field, message),
                }
            }
            Stage::OneOf {
                field,
                allowed,
                message,
            } => {
                let value = form.text(field);
                if !value.is_empty() && !allowed.contains(&value.as_str()) {
                    form.reject(field, message);
                }
            }
            Stage::DateOrder {
                earlier,
                later,
                message,
            } => {
                if let (Some(a), Some(b)) = (form.date(earlier), form.date(later)) {
                    if b < a {
                        form.reject(later, message);
                    }
                }
            }
        }
    }
}

/// Outcome of running a submission through a pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum Validated<D> {
    Valid(D),
    Invalid { draft: D, violations: Vec<Violation> },
}

impl<D> Validated<D> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validated::Valid(_))
    }

    pub fn draft(&self) -> &D {
        match self {
            Validated::Valid(draft) | Validated::Invalid { draft, .. } => draft,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every stage in declaration order
    pub fn sanitize(&self, raw: &RawInput) -> SanitizedForm {
        let mut form = SanitizedForm::from_raw(raw);
        for stage in &self.stages {
            stage.apply(&mut form);
        }
        form
    }

    pub fn validate<D: FromForm>(&self, raw: &RawInput) -> Validated<D> {
        let form = self.sanitize(raw);
        let draft = D::from_form(&form);
        let violations = form.into_violations();
        if violations.is_empty() {
            Validated::Valid(draft)
        } else {
            Validated::Invalid { draft, violations }
        }
    }

    /// The length bound counts submitted characters; an escaped name may be
    /// longer once stored.
    pub fn genre() -> Self {
        Self::new(vec![
            Stage::Trim("name"),
            Stage::Required {
                field: "name",
                message: "Genre name required",
            },
            Stage::Length {
                field: "name",
                min: Some(3),
                max: Some(100),
                message: "Genre name must be between 3 and 100 characters",
            },
            Stage::Escape("name"),
        ])
    }

    pub fn author() -> Self {
        Self::new(vec![
            Stage::Trim("first_name"),
            Stage::Required {
                field: "first_name",
                message: "First name must be specified",
            },
            Stage::Length {
                field: "first_name",
                min: None,
                max: Some(100),
                message: "First name must be at most 100 characters",
            },
            Stage::Escape("first_name"),
            Stage::Trim("family_name"),
            Stage::Required {
                field: "family_name",
                message: "Family name must be specified",
            },
            Stage::Length {
                field: "family_name",
                min: None,
                max: Some(100),
                message: "Family name must be at most 100 characters",
            },
            Stage::Escape("family_name"),
            Stage::Trim("date_of_birth"),
            Stage::Date {
                field: "date_of_birth",
                message: "Invalid date of birth",
            },
            Stage::Trim("date_of_death"),
            Stage::Date {
                field: "date_of_death",
                message: "Invalid date of death",
            },
            Stage::DateOrder {
                earlier: "date_of_birth",
                later: "date_of_death",
                message: "Date of death must not precede date of birth",
            },
        ])
    }

    pub fn book() -> Self {
        Self::new(vec![
            Stage::Trim("title"),
            Stage::Required {
                field: "title",
                message: "Title must not be empty",
            },
            Stage::Escape("title"),
            Stage::Trim("author"),
            Stage::Required {
                field: "author",
                message: "Author must not be empty",
            },
            Stage::Escape("author"),
            Stage::Trim("summary"),
            Stage::Required {
                field: "summary",
                message: "Summary must not be empty",
            },
            Stage::Escape("summary"),
            Stage::Trim("isbn"),
            Stage::Required {
                field: "isbn",
                message: "ISBN must not be empty",
            },
            Stage::Escape("isbn"),
            Stage::Trim("genre"),
            Stage::Escape("genre"),
        ])
    }

    pub fn book_instance() -> Self {
        Self::new(vec![
            Stage::Trim("book"),
            Stage::Required {
                field: "book",
                message: "Book must be specified",
            },
            Stage::Escape("book"),
            Stage::Trim("imprint"),
            Stage::Required {
                field: "imprint",
                message: "Imprint must be specified",
            },
            Stage::Escape("imprint"),
            Stage::Trim("status"),
            Stage::OneOf {
                field: "status",
                allowed: InstanceStatus::LABELS,
                message: "Status must be Available, Maintenance, Loaned or Reserved",
            },
            Stage::Trim("due_back"),
            Stage::Date {
                field: "due_back",
                message: "Invalid date",
            },
        ])
    }
}

/// Stage lists handed to the catalog services
#[derive(Debug, Clone, PartialEq)]
pub struct Pipelines {
    pub genre: Pipeline,
    pub author: Pipeline,
    pub book: Pipeline,
    pub book_instance: Pipeline,
}

impl Default for Pipelines {
    fn default() -> Self {
        Self {
            genre: Pipeline::genre(),
            author: Pipeline::author(),
            book: Pipeline::book(),
            book_instance: Pipeline::book_instance(),
        }
    }
}

/// HTML-escape `& < > " ' /`
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            _ => out.push(c),
        }
    }
    out
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthorDraft, BookDraft, BookInstanceDraft, GenreDraft};

    #[test]
    fn test_escape() {
        assert_eq!(escape("<b>Tom & Jerry's</b>"), "&lt;b&gt;Tom &amp; Jerry&#x27;s&lt;&#x2F;b&gt;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_genre_trims_then_escapes() {
        let raw = RawInput::new().with("name", "  Sci-Fi & <Fantasy>  ");
        let Validated::Valid(draft) = Pipeline::genre().validate::<GenreDraft>(&raw) else {
            panic!("expected a valid genre");
        };
        assert_eq!(draft.name, "Sci-Fi &amp; &lt;Fantasy&gt;");
    }

    #[test]
    fn test_genre_length_bounds() {
        let short = Pipeline::genre().validate::<GenreDraft>(&RawInput::new().with("name", " ab "));
        let Validated::Invalid { draft, violations } = short else {
            panic!("two characters is too short");
        };
        assert_eq!(draft.name, "ab");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "name");

        let long = "x".repeat(101);
        assert!(!Pipeline::genre()
            .validate::<GenreDraft>(&RawInput::new().with("name", long))
            .is_valid());
        assert!(Pipeline::genre()
            .validate::<GenreDraft>(&RawInput::new().with("name", "x".repeat(100)))
            .is_valid());
    }

    #[test]
    fn test_empty_required_field_reported_once() {
        let Validated::Invalid { violations, .. } =
            Pipeline::genre().validate::<GenreDraft>(&RawInput::new().with("name", "   "))
        else {
            panic!("blank name must be rejected");
        };
        assert_eq!(violations, vec![Violation::new("name", "Genre name required")]);
    }

    #[test]
    fn test_book_collects_every_violation() {
        let raw = RawInput::new().with("title", "").with("summary", "  ");
        let Validated::Invalid { draft, violations } = Pipeline::book().validate::<BookDraft>(&raw) else {
            panic!("empty book must be rejected");
        };
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "author", "summary", "isbn"]);
        assert!(draft.genre.is_empty());
    }

    #[test]
    fn test_book_genres_deduplicated() {
        let raw = RawInput::new()
            .with("title", "Dune")
            .with("author", "a1")
            .with("summary", "Spice")
            .with("isbn", "9780441013593")
            .with_many("genre", [" g1 ", "g2", "g1", ""]);
        let Validated::Valid(draft) = Pipeline::book().validate::<BookDraft>(&raw) else {
            panic!("expected a valid book");
        };
        let genres: Vec<&str> = draft.genre.iter().map(|g| g.as_str()).collect();
        assert_eq!(genres, vec!["g1", "g2"]);
    }

    #[test]
    fn test_author_dates() {
        let raw = RawInput::new()
            .with("first_name", "Isaac")
            .with("family_name", "Asimov")
            .with("date_of_birth", "1920-01-02")
            .with("date_of_death", "1992-04-06T00:00:00Z");
        let Validated::Valid(draft) = Pipeline::author().validate::<AuthorDraft>(&raw) else {
            panic!("expected a valid author");
        };
        assert_eq!(draft.date_of_birth, NaiveDate::from_ymd_opt(1920, 1, 2));
        assert_eq!(draft.date_of_death, NaiveDate::from_ymd_opt(1992, 4, 6));

        let raw = RawInput::new()
            .with("first_name", "Isaac")
            .with("family_name", "Asimov")
            .with("date_of_birth", "not a date")
            .with("date_of_death", "");
        let Validated::Invalid { draft, violations } = Pipeline::author().validate::<AuthorDraft>(&raw) else {
            panic!("bad date must be rejected");
        };
        assert_eq!(violations, vec![Violation::new("date_of_birth", "Invalid date of birth")]);
        assert_eq!(draft.date_of_birth, None);
    }

    #[test]
    fn test_author_death_before_birth() {
        let raw = RawInput::new()
            .with("first_name", "A")
            .with("family_name", "B")
            .with("date_of_birth", "2000-01-01")
            .with("date_of_death", "1999-12-31");
        let Validated::Invalid { violations, .. } = Pipeline::author().validate::<AuthorDraft>(&raw) else {
            panic!("death before birth must be rejected");
        };
        assert_eq!(violations[0].field, "date_of_death");
    }

    #[test]
    fn test_book_instance_status_and_due_back() {
        let raw = RawInput::new()
            .with("book", "b1")
            .with("imprint", "Penguin, 1990")
            .with("status", "Available")
            .with("due_back", "2024-05-01");
        let Validated::Valid(draft) = Pipeline::book_instance().validate::<BookInstanceDraft>(&raw) else {
            panic!("expected a valid copy");
        };
        assert_eq!(draft.status, InstanceStatus::Available);
        assert_eq!(draft.due_back, None);

        let raw = RawInput::new()
            .with("book", "b1")
            .with("imprint", "Penguin, 1990")
            .with("status", "Lost");
        let Validated::Invalid { violations, .. } =
            Pipeline::book_instance().validate::<BookInstanceDraft>(&raw)
        else {
            panic!("unknown status must be rejected");
        };
        assert_eq!(violations[0].field, "status");
    }

    #[test]
    fn test_genre_length_counts_submitted_characters() {
        let raw = RawInput::new().with("name", "&".repeat(100));
        let Validated::Valid(draft) = Pipeline::genre().validate::<GenreDraft>(&raw) else {
            panic!("a hundred characters is within bounds");
        };
        assert_eq!(draft.name, "&amp;".repeat(100));
    }

    #[test]
    fn test_book_instance_without_status_starts_in_maintenance() {
        let raw = RawInput::new().with("book", "b1").with("imprint", "Penguin, 1990");
        let Validated::Valid(draft) = Pipeline::book_instance().validate::<BookInstanceDraft>(&raw) else {
            panic!("status is optional");
        };
        assert_eq!(draft.status, InstanceStatus::Maintenance);
    }
}
