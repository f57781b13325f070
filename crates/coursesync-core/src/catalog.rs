//! Nested course records as returned by the `courses/details` endpoint.
//!
//! These are the only catalog records that do not map one-to-one onto a stored row.
//! Unknown fields are ignored, and missing or `null` ones default, matching how
//! leniently the API populates them.

use serde::Deserialize;

use crate::decode::null_as_default;

/// One course section with its embedded instructor, room, descriptions and components.
///
/// # Examples
///
/// ```
/// use coursesync_core::catalog::CatalogCourse;
///
/// let json = r#"{
///     "id": 101,
///     "title": "Fundamentals of Computer Programming",
///     "term": "2019 Fall",
///     "instructor": {"name": "Sara Sood"},
///     "room": {"id": 12, "building_id": 3, "name": "Tech LR2"},
///     "course_descriptions": [{"name": "Overview", "desc": "Intro course."}]
/// }"#;
///
/// let course: CatalogCourse = serde_json::from_str(json).unwrap();
/// assert_eq!(course.instructor.name, "Sara Sood");
/// assert_eq!(course.room.id, 12);
/// assert_eq!(course.course_descriptions.len(), 1);
/// assert!(course.course_components.is_empty());
/// ```
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CatalogCourse {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    /// Term name as the API renders it; the stored row uses the resolved term id instead.
    #[serde(deserialize_with = "null_as_default")]
    pub term: String,
    #[serde(deserialize_with = "null_as_default")]
    pub school: String,
    #[serde(deserialize_with = "null_as_default")]
    pub instructor: CatalogInstructor,
    #[serde(deserialize_with = "null_as_default")]
    pub subject: String,
    #[serde(deserialize_with = "null_as_default")]
    pub catalog_num: String,
    #[serde(deserialize_with = "null_as_default")]
    pub section: String,
    #[serde(deserialize_with = "null_as_default")]
    pub room: CatalogRoom,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_days: String,
    #[serde(deserialize_with = "null_as_default")]
    pub start_time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub end_time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub start_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub end_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub seats: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub overview: String,
    #[serde(deserialize_with = "null_as_default")]
    pub topic: String,
    #[serde(deserialize_with = "null_as_default")]
    pub attributes: String,
    #[serde(deserialize_with = "null_as_default")]
    pub requirements: String,
    #[serde(deserialize_with = "null_as_default")]
    pub component: String,
    #[serde(deserialize_with = "null_as_default")]
    pub class_num: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub course_id: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub course_descriptions: Vec<CatalogDescription>,
    #[serde(deserialize_with = "null_as_default")]
    pub course_components: Vec<CatalogComponent>,
}

/// Instructor descriptor embedded in a course. Carries no id.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogInstructor {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub bio: String,
    #[serde(deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(deserialize_with = "null_as_default")]
    pub office_hours: String,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogRoom {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub building_id: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub building_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogDescription {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub desc: String,
}

/// Meeting component block. `room` is a display label, not an id.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogComponent {
    #[serde(deserialize_with = "null_as_default")]
    pub component: String,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_days: String,
    #[serde(deserialize_with = "null_as_default")]
    pub start_time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub end_time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub section: String,
    #[serde(deserialize_with = "null_as_default")]
    pub room: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_course_deserialization() {
        let json = r#"{
            "id": 27513,
            "title": "Data Structures",
            "term": "2019 Fall",
            "school": "MEAS",
            "instructor": {
                "name": "Vincent St-Amour",
                "bio": null,
                "office_hours": "Mon 2-4"
            },
            "subject": "COMP_SCI",
            "catalog_num": "214-0",
            "section": "20",
            "room": {"id": 55, "building_id": 9, "building_name": "Tech", "name": "Tech M345"},
            "meeting_days": "MoWeFr",
            "start_time": "10:00",
            "end_time": "10:50",
            "seats": 120,
            "class_num": 11728,
            "course_id": 4,
            "course_components": [
                {"component": "DIS", "meeting_days": "Th", "start_time": "17:00", "end_time": "17:50", "section": "21", "room": "Tech L211"}
            ]
        }"#;

        let course: CatalogCourse = serde_json::from_str(json).unwrap();
        assert_eq!(course.id, 27513);
        assert_eq!(course.instructor.bio, "");
        assert_eq!(course.instructor.office_hours, "Mon 2-4");
        assert_eq!(course.room.building_name, "Tech");
        assert_eq!(course.seats, 120);
        assert_eq!(course.course_components[0].room, "Tech L211");
        assert_eq!(course.overview, "");
    }

    #[test]
    fn test_null_fields_decode_as_defaults() {
        let json = r#"{
            "id": 1,
            "topic": null,
            "seats": null,
            "instructor": null,
            "room": null,
            "course_descriptions": null,
            "course_components": [
                {"component": "LAB", "meeting_days": null, "room": null}
            ]
        }"#;

        let course: CatalogCourse = serde_json::from_str(json).unwrap();
        assert_eq!(course.id, 1);
        assert_eq!(course.topic, "");
        assert_eq!(course.seats, 0);
        assert_eq!(course.instructor, CatalogInstructor::default());
        assert_eq!(course.room, CatalogRoom::default());
        assert!(course.course_descriptions.is_empty());
        assert_eq!(course.course_components[0].component, "LAB");
        assert_eq!(course.course_components[0].meeting_days, "");
        assert_eq!(course.course_components[0].room, "");
    }
}
