//! Person templates for the persons section of a pathway.

use rand::Rng;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

/// Demographics for one patient in a pathway. Empty string fields are
/// treated as absent; absent fields are filled in by the demographics
/// generator collaborator when the patient is created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonTemplate {
    /// Age bracket to derive a date of birth from. Only one of `age` or
    /// `date_of_birth` may be set.
    pub age: Option<Age>,
    pub date_of_birth: Option<OffsetDateTime>,
    pub gender: String,
    pub first_name: String,
    pub surname: String,
    pub nhs: String,
    pub mrn: String,
}

impl PersonTemplate {
    /// Whether every field is unset, i.e. the template carries no
    /// constraints at all.
    pub fn is_unset(&self) -> bool {
        *self == Self::default()
    }

    /// The date of birth this template asks for, deriving one from the age
    /// bracket when no explicit date is given.
    pub fn birthdate(&self, now: OffsetDateTime) -> Option<OffsetDateTime> {
        if self.date_of_birth.is_some() {
            return self.date_of_birth;
        }
        self.age.as_ref().map(|age| age.birthdate(now))
    }
}

/// An age picked as a whole number of years between `from` and `to`.
/// `day_of_year`, when nonzero, is the 1-indexed day of the year the person
/// was born, which makes it possible to generate patients with identical
/// demographics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Age {
    pub from: i32,
    pub to: i32,
    pub day_of_year: u16,
}

impl Age {
    /// A date of birth for this age bracket relative to `now`.
    pub fn birthdate(&self, now: OffsetDateTime) -> OffsetDateTime {
        let year = now.year() - self.sample_years();
        let ordinal = if self.day_of_year > 0 {
            self.day_of_year
        } else {
            rand::thread_rng().gen_range(1..=365)
        };
        let date = Date::from_ordinal_date(year, ordinal)
            .or_else(|_| Date::from_ordinal_date(year, 365))
            .unwrap_or(Date::MIN);
        date.midnight().assume_utc()
    }

    fn sample_years(&self) -> i32 {
        if self.to <= self.from {
            return self.from;
        }
        rand::thread_rng().gen_range(self.from..self.to)
    }
}

/// A date of birth so that the age lands between 1 and 100.
pub fn random_birthdate(now: OffsetDateTime) -> OffsetDateTime {
    Age {
        from: 1,
        to: 100,
        day_of_year: 0,
    }
    .birthdate(now)
}
