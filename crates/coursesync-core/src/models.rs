//! Flat entity rows, as mirrored into the relational store.
//!
//! The global kinds (terms, schools, subjects, instructors, buildings, rooms) decode
//! straight from the course data API, which uses the same snake_case field names.
//! Courses arrive nested and are flattened by [`crate::normalize`].

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::decode::null_as_default;

/// An academic term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(default)]
pub struct Term {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub start_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub end_date: String,
}

/// A school, keyed by its symbol (e.g. `WCAS`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(default)]
pub struct School {
    #[serde(deserialize_with = "null_as_default")]
    pub symbol: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

/// A subject code, keyed by its symbol (e.g. `COMP_SCI`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(default)]
pub struct Subject {
    #[serde(deserialize_with = "null_as_default")]
    pub symbol: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

/// Records that `subject` is offered by `school` in `term`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, FromRow)]
pub struct SubjectAvailability {
    pub term: i32,
    pub school: String,
    pub subject: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(default)]
pub struct Instructor {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub phone: String,
}

/// Records that an instructor teaches a subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, FromRow)]
pub struct InstructorSubject {
    pub instructor: i32,
    pub subject: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(default)]
pub struct Building {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub lat: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub lon: f64,
}

/// A room. Each room belongs to exactly one building.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(default)]
pub struct Room {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub building_id: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

/// Flattened course section row.
///
/// `instructor` is resolved from the embedded instructor's display name and is
/// [`crate::normalize::UNRESOLVED_INSTRUCTOR_ID`] when no instructor matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: i32,
    pub title: String,
    pub term: i32,
    pub school: String,
    pub instructor: i32,
    pub subject: String,
    pub catalog_num: String,
    pub section: String,
    pub room: i32,
    pub meeting_days: String,
    pub start_time: String,
    pub end_time: String,
    pub start_date: String,
    pub end_date: String,
    pub seats: i32,
    pub overview: String,
    pub topic: String,
    pub attributes: String,
    pub requirements: String,
    pub component: String,
    pub class_num: i32,
    pub course_id: i32,
}

/// A named free-text block attached to a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CourseDescription {
    pub course: i32,
    pub name: String,
    pub description: String,
}

/// A meeting pattern attached to a course (lab, discussion, ...).
///
/// `room` is the free-text label the API supplies, not a room id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CourseComponent {
    pub course: i32,
    pub component: String,
    pub meeting_days: String,
    pub start_time: String,
    pub end_time: String,
    pub section: String,
    pub room: String,
}

/// Row counts per mirrored table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub terms: i64,
    pub schools: i64,
    pub subjects: i64,
    pub subject_availabilities: i64,
    pub instructors: i64,
    pub instructor_subjects: i64,
    pub buildings: i64,
    pub rooms: i64,
    pub courses: i64,
    pub course_descriptions: i64,
    pub course_components: i64,
}
