//! Author model and derived display values

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{form::SanitizedForm, CatalogEntity, EntityId, FromForm};
use crate::repository::Collection;

/// Stored author document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Author {
    pub id: EntityId,
    pub first_name: String,
    pub family_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_death: Option<NaiveDate>,
}

/// How long an author lived, as far as the catalog knows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifespan {
    /// No birth date recorded
    Unknown,
    /// Born, no death date recorded
    Living,
    /// Difference between death year and birth year
    Years(i32),
}

impl fmt::Display for Lifespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifespan::Unknown => f.write_str("unknown"),
            Lifespan::Living => f.write_str("living"),
            Lifespan::Years(n) => write!(f, "{} years", n),
        }
    }
}

impl Author {
    /// "family_name, first_name"
    pub fn name(&self) -> String {
        format!("{}, {}", self.family_name, self.first_name)
    }

    pub fn lifespan(&self) -> Lifespan {
        match (self.date_of_birth, self.date_of_death) {
            (None, _) => Lifespan::Unknown,
            (Some(_), None) => Lifespan::Living,
            (Some(birth), Some(death)) => Lifespan::Years(death.year() - birth.year()),
        }
    }

    /// Birth date as "March 3rd, 1920", empty when unknown
    pub fn birth_display(&self) -> String {
        self.date_of_birth.map(long_date).unwrap_or_default()
    }

    /// Death date as "March 3rd, 1920", empty when unknown
    pub fn death_display(&self) -> String {
        self.date_of_death.map(long_date).unwrap_or_default()
    }

    /// Birth date as YYYY-MM-DD for form redisplay
    pub fn date_of_birth_form(&self) -> String {
        self.date_of_birth.map(|d| d.to_string()).unwrap_or_default()
    }

    /// Death date as YYYY-MM-DD for form redisplay
    pub fn date_of_death_form(&self) -> String {
        self.date_of_death.map(|d| d.to_string()).unwrap_or_default()
    }
}

impl CatalogEntity for Author {
    const COLLECTION: Collection = Collection::Authors;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> String {
        self.name()
    }
}

fn long_date(date: NaiveDate) -> String {
    let day = date.day();
    let suffix = match (day % 10, day % 100) {
        (1, n) if n != 11 => "st",
        (2, n) if n != 12 => "nd",
        (3, n) if n != 13 => "rd",
        _ => "th",
    };
    format!("{} {}{}, {}", date.format("%B"), day, suffix, date.year())
}

/// Author fields accepted from a submitted form
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AuthorDraft {
    pub first_name: String,
    pub family_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

impl AuthorDraft {
    pub fn into_author(self, id: EntityId) -> Author {
        Author {
            id,
            first_name: self.first_name,
            family_name: self.family_name,
            date_of_birth: self.date_of_birth,
            date_of_death: self.date_of_death,
        }
    }
}

impl FromForm for AuthorDraft {
    fn from_form(form: &SanitizedForm) -> Self {
        Self {
            first_name: form.text("first_name"),
            family_name: form.text("family_name"),
            date_of_birth: form.date("date_of_birth"),
            date_of_death: form.date("date_of_death"),
        }
    }
}
