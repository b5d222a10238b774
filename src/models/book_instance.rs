//! Book instance (physical copy) model

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{book::Book, form::SanitizedForm, CatalogEntity, EntityId, FromForm};
use crate::repository::Collection;

/// Circulation status of a copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum InstanceStatus {
    Available,
    #[default]
    Maintenance,
    Loaned,
    Reserved,
}

impl InstanceStatus {
    /// Accepted spellings, in display order
    pub const LABELS: &'static [&'static str] = &["Available", "Maintenance", "Loaned", "Reserved"];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Available => "Available",
            InstanceStatus::Maintenance => "Maintenance",
            InstanceStatus::Loaned => "Loaned",
            InstanceStatus::Reserved => "Reserved",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(InstanceStatus::Available),
            "Maintenance" => Ok(InstanceStatus::Maintenance),
            "Loaned" => Ok(InstanceStatus::Loaned),
            "Reserved" => Ok(InstanceStatus::Reserved),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// Stored copy document; `book` references the catalogued title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookInstance {
    pub id: EntityId,
    pub book: EntityId,
    pub imprint: String,
    #[serde(default)]
    pub status: InstanceStatus,
    /// Only set while the copy is not Available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_back: Option<NaiveDate>,
}

impl CatalogEntity for BookInstance {
    const COLLECTION: Collection = Collection::BookInstances;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> String {
        format!("{} ({})", self.imprint, self.status)
    }
}

/// Copy with its book expanded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookInstanceView {
    pub id: EntityId,
    pub book: Book,
    pub imprint: String,
    #[serde(default)]
    pub status: InstanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_back: Option<NaiveDate>,
}

impl BookInstanceView {
    pub fn url(&self) -> String {
        Collection::BookInstances.url_for(&self.id)
    }

    /// Due date as "Mar 3, 2024", empty when not set
    pub fn due_back_display(&self) -> String {
        self.due_back
            .map(|d| format!("{} {}, {}", d.format("%b"), d.day(), d.year()))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BookInstanceDraft {
    pub book: EntityId,
    pub imprint: String,
    pub status: InstanceStatus,
    pub due_back: Option<NaiveDate>,
}

impl BookInstanceDraft {
    pub fn into_instance(self, id: EntityId) -> BookInstance {
        BookInstance {
            id,
            book: self.book,
            imprint: self.imprint,
            status: self.status,
            due_back: self.due_back,
        }
    }
}

impl FromForm for BookInstanceDraft {
    fn from_form(form: &SanitizedForm) -> Self {
        // A copy submitted without a status starts in Maintenance, like a stored
        // document missing the field. An unknown status is reported by the
        // pipeline and the draft keeps the same default.
        let status = form.text("status").parse().unwrap_or_default();
        let due_back = match status {
            InstanceStatus::Available => None,
            _ => form.date("due_back"),
        };
        Self {
            book: EntityId::new(form.text("book")),
            imprint: form.text("imprint"),
            status,
            due_back,
        }
    }
}
