//! Course normalization: nested catalog course records into flat rows.
//!
//! Normalization is pure. It never touches the gateway or the store, and it cannot
//! fail: malformed payloads are rejected earlier, when the gateway decodes them.

use std::collections::{HashMap, HashSet};

use crate::catalog::CatalogCourse;
use crate::models::{Course, CourseComponent, CourseDescription, Instructor};

/// Instructor id stored on a course whose embedded instructor name matched nobody.
pub const UNRESOLVED_INSTRUCTOR_ID: i32 = 0;

/// Display-name → instructor-id lookup built from the full instructor set.
///
/// Names are not unique. When several instructors share one, the last instructor
/// seen wins and the name is remembered as ambiguous so callers can report it.
#[derive(Debug, Clone, Default)]
pub struct InstructorIndex {
    by_name: HashMap<String, i32>,
    ambiguous: HashSet<String>,
}

/// Outcome of joining a course's embedded instructor to a stored instructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructorMatch {
    Resolved(i32),
    /// The name belongs to more than one instructor; `chosen` was used.
    Ambiguous { name: String, chosen: i32 },
    /// No instructor has this name; [`UNRESOLVED_INSTRUCTOR_ID`] was used.
    Unresolved(String),
}

impl InstructorMatch {
    /// The instructor id to store on the course row.
    pub fn id(&self) -> i32 {
        match self {
            InstructorMatch::Resolved(id) => *id,
            InstructorMatch::Ambiguous { chosen, .. } => *chosen,
            InstructorMatch::Unresolved(_) => UNRESOLVED_INSTRUCTOR_ID,
        }
    }
}

impl InstructorIndex {
    pub fn new(instructors: &[Instructor]) -> Self {
        let mut index = Self::default();
        for instructor in instructors {
            if let Some(previous) = index
                .by_name
                .insert(instructor.name.clone(), instructor.id)
            {
                if previous != instructor.id {
                    index.ambiguous.insert(instructor.name.clone());
                }
            }
        }
        index
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Names shared by more than one instructor.
    pub fn ambiguous_names(&self) -> impl Iterator<Item = &str> {
        self.ambiguous.iter().map(String::as_str)
    }

    pub fn resolve(&self, name: &str) -> InstructorMatch {
        match self.by_name.get(name) {
            Some(&id) if self.ambiguous.contains(name) => InstructorMatch::Ambiguous {
                name: name.to_string(),
                chosen: id,
            },
            Some(&id) => InstructorMatch::Resolved(id),
            None => InstructorMatch::Unresolved(name.to_string()),
        }
    }
}

/// Rows produced from a single catalog course record.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCourse {
    pub course: Course,
    pub descriptions: Vec<CourseDescription>,
    pub components: Vec<CourseComponent>,
    pub instructor: InstructorMatch,
}

/// Flattens one catalog course into one course row plus its description and
/// component rows, all tagged with the source course id.
///
/// The stored term is `term_id`, not the term name embedded in the record. The room
/// reference is the embedded room's id as-is.
///
/// # Examples
///
/// ```
/// use coursesync_core::catalog::{CatalogCourse, CatalogDescription};
/// use coursesync_core::models::Instructor;
/// use coursesync_core::normalize::{normalize_course, InstructorIndex};
///
/// let index = InstructorIndex::new(&[Instructor {
///     id: 42,
///     name: "Sara Sood".to_string(),
///     phone: String::new(),
/// }]);
///
/// let mut record = CatalogCourse::default();
/// record.id = 101;
/// record.instructor.name = "Sara Sood".to_string();
/// record.course_descriptions.push(CatalogDescription {
///     name: "Overview".to_string(),
///     desc: "Intro course.".to_string(),
/// });
///
/// let rows = normalize_course(&record, 4760, &index);
/// assert_eq!(rows.course.instructor, 42);
/// assert_eq!(rows.course.term, 4760);
/// assert_eq!(rows.descriptions[0].course, 101);
/// ```
pub fn normalize_course(
    record: &CatalogCourse,
    term_id: i32,
    instructors: &InstructorIndex,
) -> NormalizedCourse {
    let instructor = instructors.resolve(&record.instructor.name);

    let course = Course {
        id: record.id,
        title: record.title.clone(),
        term: term_id,
        school: record.school.clone(),
        instructor: instructor.id(),
        subject: record.subject.clone(),
        catalog_num: record.catalog_num.clone(),
        section: record.section.clone(),
        room: record.room.id,
        meeting_days: record.meeting_days.clone(),
        start_time: record.start_time.clone(),
        end_time: record.end_time.clone(),
        start_date: record.start_date.clone(),
        end_date: record.end_date.clone(),
        seats: record.seats,
        overview: record.overview.clone(),
        topic: record.topic.clone(),
        attributes: record.attributes.clone(),
        requirements: record.requirements.clone(),
        component: record.component.clone(),
        class_num: record.class_num,
        course_id: record.course_id,
    };

    let descriptions = record
        .course_descriptions
        .iter()
        .map(|block| CourseDescription {
            course: record.id,
            name: block.name.clone(),
            description: block.desc.clone(),
        })
        .collect();

    let components = record
        .course_components
        .iter()
        .map(|block| CourseComponent {
            course: record.id,
            component: block.component.clone(),
            meeting_days: block.meeting_days.clone(),
            start_time: block.start_time.clone(),
            end_time: block.end_time.clone(),
            section: block.section.clone(),
            room: block.room.clone(),
        })
        .collect();

    NormalizedCourse {
        course,
        descriptions,
        components,
        instructor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogComponent, CatalogDescription, CatalogInstructor, CatalogRoom};

    fn instructor(id: i32, name: &str) -> Instructor {
        Instructor {
            id,
            name: name.to_string(),
            phone: String::new(),
        }
    }

    fn sample_record() -> CatalogCourse {
        CatalogCourse {
            id: 27513,
            title: "Data Structures".into(),
            term: "2019 Fall".into(),
            school: "MEAS".into(),
            instructor: CatalogInstructor {
                name: "Vincent St-Amour".into(),
                ..Default::default()
            },
            subject: "COMP_SCI".into(),
            catalog_num: "214-0".into(),
            section: "20".into(),
            room: CatalogRoom {
                id: 55,
                building_id: 9,
                building_name: "Tech".into(),
                name: "Tech M345".into(),
            },
            meeting_days: "MoWeFr".into(),
            start_time: "10:00".into(),
            end_time: "10:50".into(),
            seats: 120,
            class_num: 11728,
            course_id: 4,
            course_descriptions: vec![
                CatalogDescription {
                    name: "Overview of class".into(),
                    desc: "Design and analysis of data structures.".into(),
                },
                CatalogDescription {
                    name: "Prerequisites".into(),
                    desc: "COMP_SCI 111".into(),
                },
            ],
            course_components: vec![
                CatalogComponent {
                    component: "DIS".into(),
                    meeting_days: "Th".into(),
                    section: "21".into(),
                    room: "Tech L211".into(),
                    ..Default::default()
                },
                CatalogComponent {
                    component: "LAB".into(),
                    meeting_days: "Tu".into(),
                    section: "22".into(),
                    room: "Ford 2221".into(),
                    ..Default::default()
                },
                CatalogComponent {
                    component: "REC".into(),
                    meeting_days: "Fr".into(),
                    section: "23".into(),
                    room: "Annenberg G15".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_counts_and_tags() {
        let index = InstructorIndex::new(&[instructor(7, "Vincent St-Amour")]);
        let rows = normalize_course(&sample_record(), 4760, &index);

        assert_eq!(rows.course.id, 27513);
        assert_eq!(rows.descriptions.len(), 2);
        assert_eq!(rows.components.len(), 3);
        assert!(rows.descriptions.iter().all(|d| d.course == 27513));
        assert!(rows.components.iter().all(|c| c.course == 27513));
        assert_eq!(rows.descriptions[1].description, "COMP_SCI 111");
        assert_eq!(rows.components[2].room, "Annenberg G15");
    }

    #[test]
    fn test_normalize_course_fields() {
        let index = InstructorIndex::new(&[instructor(7, "Vincent St-Amour")]);
        let rows = normalize_course(&sample_record(), 4760, &index);

        assert_eq!(rows.course.term, 4760);
        assert_eq!(rows.course.room, 55);
        assert_eq!(rows.course.instructor, 7);
        assert_eq!(rows.course.catalog_num, "214-0");
        assert_eq!(rows.course.class_num, 11728);
        assert_eq!(rows.instructor, InstructorMatch::Resolved(7));
    }

    #[test]
    fn test_unknown_instructor_falls_back() {
        let index = InstructorIndex::new(&[instructor(7, "Someone Else")]);
        let first = normalize_course(&sample_record(), 4760, &index);
        let second = normalize_course(&sample_record(), 4760, &index);

        assert_eq!(first.course.instructor, UNRESOLVED_INSTRUCTOR_ID);
        assert_eq!(
            first.instructor,
            InstructorMatch::Unresolved("Vincent St-Amour".into())
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_shared_name_last_wins_and_is_flagged() {
        let index = InstructorIndex::new(&[
            instructor(1, "Alex Kim"),
            instructor(2, "Alex Kim"),
            instructor(3, "Jo Park"),
        ]);

        assert_eq!(index.len(), 2);
        assert_eq!(index.ambiguous_names().collect::<Vec<_>>(), vec!["Alex Kim"]);
        assert_eq!(
            index.resolve("Alex Kim"),
            InstructorMatch::Ambiguous {
                name: "Alex Kim".into(),
                chosen: 2
            }
        );
        assert_eq!(index.resolve("Jo Park"), InstructorMatch::Resolved(3));
    }

    #[test]
    fn test_same_instructor_listed_twice_is_not_ambiguous() {
        let index = InstructorIndex::new(&[instructor(1, "Alex Kim"), instructor(1, "Alex Kim")]);
        assert_eq!(index.resolve("Alex Kim"), InstructorMatch::Resolved(1));
    }

    #[test]
    fn test_record_without_blocks() {
        let record = CatalogCourse {
            id: 9,
            ..Default::default()
        };
        let rows = normalize_course(&record, 1, &InstructorIndex::default());
        assert!(rows.descriptions.is_empty());
        assert!(rows.components.is_empty());
        assert_eq!(rows.course.instructor, UNRESOLVED_INSTRUCTOR_ID);
    }
}
