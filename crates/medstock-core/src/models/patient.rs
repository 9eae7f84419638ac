//! Patient models.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A hospital patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Full name
    pub full_name: String,
    /// National document number (unique)
    pub document_number: String,
    pub birth_date: Option<NaiveDate>,
    pub sex: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
    /// Health plan / insurer
    pub health_plan: Option<String>,
    /// Known allergies
    pub allergies: Option<String>,
    /// Medications in continuous use
    pub continuous_medications: Option<String>,
    pub notes: Option<String>,
    /// Soft-delete flag
    pub active: bool,
    pub created_at: NaiveDateTime,
}

impl Patient {
    /// Create a new active patient with required fields.
    pub fn new(full_name: String, document_number: String, created_at: NaiveDateTime) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            full_name,
            document_number,
            birth_date: None,
            sex: None,
            phone: None,
            email: None,
            city: None,
            health_plan: None,
            allergies: None,
            continuous_medications: None,
            notes: None,
            active: true,
            created_at,
        }
    }

    /// Age in whole years on `today`, if the birth date is known.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        self.birth_date.map(|birth| age_in_years(birth, today))
    }
}

/// Whole years elapsed between `birth` and `today` (0 if `today` precedes birth).
pub fn age_in_years(birth: NaiveDate, today: NaiveDate) -> u32 {
    today.years_since(birth).unwrap_or(0)
}

/// Age brackets used by the patient search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AgeBracket {
    /// 0 to 12 years
    Child,
    /// 13 to 17 years
    Adolescent,
    /// 18 to 64 years
    Adult,
    /// 65 years and over
    Senior,
}

impl AgeBracket {
    pub fn contains(&self, age: u32) -> bool {
        match self {
            AgeBracket::Child => age <= 12,
            AgeBracket::Adolescent => (13..=17).contains(&age),
            AgeBracket::Adult => (18..=64).contains(&age),
            AgeBracket::Senior => age >= 65,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "child" => Some(AgeBracket::Child),
            "adolescent" => Some(AgeBracket::Adolescent),
            "adult" => Some(AgeBracket::Adult),
            "senior" => Some(AgeBracket::Senior),
            _ => None,
        }
    }

    pub fn of(age: u32) -> Self {
        match age {
            0..=12 => AgeBracket::Child,
            13..=17 => AgeBracket::Adolescent,
            18..=64 => AgeBracket::Adult,
            _ => AgeBracket::Senior,
        }
    }
}

/// Patient search parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientQuery {
    /// Matched against name and document number
    pub text: Option<String>,
    pub health_plan: Option<String>,
    pub age_bracket: Option<AgeBracket>,
    pub include_inactive: bool,
}

impl PatientQuery {
    /// Whether `patient` satisfies the age bracket on `today`.
    ///
    /// Patients without a birth date never match a bracket filter.
    pub fn matches_age(&self, patient: &Patient, today: NaiveDate) -> bool {
        match self.age_bracket {
            None => true,
            Some(bracket) => patient
                .age_on(today)
                .map(|age| bracket.contains(age))
                .unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_counts_birthday() {
        let birth = date(2000, 6, 15);
        assert_eq!(age_in_years(birth, date(2024, 6, 14)), 23);
        assert_eq!(age_in_years(birth, date(2024, 6, 15)), 24);
        assert_eq!(age_in_years(birth, date(1999, 1, 1)), 0);
    }

    #[test]
    fn test_age_brackets() {
        assert_eq!(AgeBracket::of(0), AgeBracket::Child);
        assert_eq!(AgeBracket::of(12), AgeBracket::Child);
        assert_eq!(AgeBracket::of(13), AgeBracket::Adolescent);
        assert_eq!(AgeBracket::of(17), AgeBracket::Adolescent);
        assert_eq!(AgeBracket::of(18), AgeBracket::Adult);
        assert_eq!(AgeBracket::of(64), AgeBracket::Adult);
        assert_eq!(AgeBracket::of(65), AgeBracket::Senior);
        assert!(AgeBracket::Senior.contains(90));
        assert!(!AgeBracket::Adult.contains(65));
    }

    #[test]
    fn test_query_without_birth_date() {
        let now = date(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap();
        let patient = Patient::new("Ana".into(), "123".into(), now);
        let query = PatientQuery {
            age_bracket: Some(AgeBracket::Adult),
            ..Default::default()
        };
        assert!(!query.matches_age(&patient, now.date()));
        assert!(PatientQuery::default().matches_age(&patient, now.date()));
    }
}
