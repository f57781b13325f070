//! In-memory gateway and store doubles for orchestrator tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::catalog::CatalogCourse;
use crate::error::AppError;
use crate::models::{
    Building, CatalogStats, Course, CourseComponent, CourseDescription, Instructor,
    InstructorSubject, Room, School, Subject, SubjectAvailability, Term,
};
use crate::traits::{CatalogGateway, CourseBatch, EntityStore};

/// Gateway answering from canned collections. Unscripted scopes return nothing.
#[derive(Default)]
pub(crate) struct ScriptedGateway {
    pub terms: Vec<Term>,
    pub schools: Vec<School>,
    pub subjects: HashMap<(i32, String), Vec<Subject>>,
    pub instructors: HashMap<String, Vec<Instructor>>,
    pub buildings: Vec<Building>,
    pub rooms: HashMap<i32, Vec<Room>>,
    pub courses: HashMap<(i32, String), Vec<CatalogCourse>>,
    /// Call key that fails with a client error instead of answering.
    pub fail_on: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn call(&self, key: String) -> Result<(), AppError> {
        let failing = self.fail_on.as_deref() == Some(key.as_str());
        self.calls.lock().unwrap().push(key.clone());
        if failing {
            return Err(AppError::ClientError(format!("HTTP 503 from {}", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogGateway for ScriptedGateway {
    async fn terms(&self) -> Result<Vec<Term>, AppError> {
        self.call("terms".into())?;
        Ok(self.terms.clone())
    }

    async fn schools(&self) -> Result<Vec<School>, AppError> {
        self.call("schools".into())?;
        Ok(self.schools.clone())
    }

    async fn subjects(&self, term: i32, school: &str) -> Result<Vec<Subject>, AppError> {
        self.call(format!("subjects:{}:{}", term, school))?;
        Ok(self
            .subjects
            .get(&(term, school.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn instructors(&self, subject: &str) -> Result<Vec<Instructor>, AppError> {
        self.call(format!("instructors:{}", subject))?;
        Ok(self.instructors.get(subject).cloned().unwrap_or_default())
    }

    async fn buildings(&self) -> Result<Vec<Building>, AppError> {
        self.call("buildings".into())?;
        Ok(self.buildings.clone())
    }

    async fn rooms(&self, building: i32) -> Result<Vec<Room>, AppError> {
        self.call(format!("rooms:{}", building))?;
        Ok(self.rooms.get(&building).cloned().unwrap_or_default())
    }

    async fn course_details(
        &self,
        term: i32,
        subject: &str,
    ) -> Result<Vec<CatalogCourse>, AppError> {
        self.call(format!("course_details:{}:{}", term, subject))?;
        Ok(self
            .courses
            .get(&(term, subject.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Full contents of a [`MemoryStore`], ordered by natural key.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct MemoryState {
    pub terms: BTreeMap<i32, Term>,
    pub schools: BTreeMap<String, School>,
    pub subjects: BTreeMap<String, Subject>,
    pub subject_availabilities: BTreeSet<SubjectAvailability>,
    pub instructors: BTreeMap<i32, Instructor>,
    pub instructor_subjects: BTreeSet<InstructorSubject>,
    pub buildings: BTreeMap<i32, Building>,
    pub rooms: BTreeMap<i32, Room>,
    pub courses: BTreeMap<i32, Course>,
    pub course_descriptions: BTreeMap<(i32, String), CourseDescription>,
    pub course_components: BTreeMap<(i32, String), CourseComponent>,
}

/// Store keeping every kind in ordered maps, logging each successful write.
#[derive(Default)]
pub(crate) struct MemoryStore {
    state: Mutex<MemoryState>,
    writes: Mutex<Vec<(String, usize)>>,
    fail_on: Option<&'static str>,
}

impl MemoryStore {
    pub fn failing_on(operation: &'static str) -> Self {
        Self {
            fail_on: Some(operation),
            ..Default::default()
        }
    }

    pub fn snapshot(&self) -> MemoryState {
        self.state.lock().unwrap().clone()
    }

    /// Names of successful write operations, in call order.
    pub fn writes(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|(op, _)| op.clone())
            .collect()
    }

    /// Input length of the most recent successful call to `operation`.
    pub fn last_batch_len(&self, operation: &str) -> Option<usize> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(op, _)| op == operation)
            .map(|(_, len)| *len)
    }

    pub fn seed_terms(&self, terms: &[Term]) {
        let mut state = self.state.lock().unwrap();
        for term in terms {
            state.terms.insert(term.id, term.clone());
        }
    }

    pub fn seed_schools(&self, schools: &[School]) {
        let mut state = self.state.lock().unwrap();
        for school in schools {
            state.schools.insert(school.symbol.clone(), school.clone());
        }
    }

    pub fn seed_subjects(&self, subjects: &[Subject]) {
        let mut state = self.state.lock().unwrap();
        for subject in subjects {
            state.subjects.insert(subject.symbol.clone(), subject.clone());
        }
    }

    pub fn seed_availabilities(&self, rows: &[SubjectAvailability]) {
        let mut state = self.state.lock().unwrap();
        state.subject_availabilities.extend(rows.iter().cloned());
    }

    pub fn seed_instructors(&self, instructors: &[Instructor]) {
        let mut state = self.state.lock().unwrap();
        for instructor in instructors {
            state.instructors.insert(instructor.id, instructor.clone());
        }
    }

    fn write<F>(&self, operation: &str, len: usize, apply: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut MemoryState),
    {
        if self.fail_on == Some(operation) {
            return Err(AppError::DatabaseError(sqlx::Error::Protocol(format!(
                "injected failure in {}",
                operation
            ))));
        }
        apply(&mut *self.state.lock().unwrap());
        self.writes
            .lock()
            .unwrap()
            .push((operation.to_string(), len));
        Ok(())
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn upsert_terms(&self, terms: &[Term]) -> Result<(), AppError> {
        self.write("upsert_terms", terms.len(), |state| {
            for term in terms {
                state.terms.insert(term.id, term.clone());
            }
        })
    }

    async fn upsert_schools(&self, schools: &[School]) -> Result<(), AppError> {
        self.write("upsert_schools", schools.len(), |state| {
            for school in schools {
                state.schools.insert(school.symbol.clone(), school.clone());
            }
        })
    }

    async fn upsert_subjects(&self, subjects: &[Subject]) -> Result<(), AppError> {
        self.write("upsert_subjects", subjects.len(), |state| {
            for subject in subjects {
                state.subjects.insert(subject.symbol.clone(), subject.clone());
            }
        })
    }

    async fn insert_subject_availabilities(
        &self,
        rows: &[SubjectAvailability],
    ) -> Result<(), AppError> {
        self.write("insert_subject_availabilities", rows.len(), |state| {
            state.subject_availabilities.extend(rows.iter().cloned());
        })
    }

    async fn delete_subject_availabilities_by_term(&self, term: i32) -> Result<(), AppError> {
        self.write("delete_subject_availabilities_by_term", 1, |state| {
            state.subject_availabilities.retain(|row| row.term != term);
        })
    }

    async fn upsert_instructors(&self, instructors: &[Instructor]) -> Result<(), AppError> {
        self.write("upsert_instructors", instructors.len(), |state| {
            for instructor in instructors {
                state.instructors.insert(instructor.id, instructor.clone());
            }
        })
    }

    async fn insert_instructor_subjects(
        &self,
        rows: &[InstructorSubject],
    ) -> Result<(), AppError> {
        self.write("insert_instructor_subjects", rows.len(), |state| {
            state.instructor_subjects.extend(rows.iter().cloned());
        })
    }

    async fn upsert_buildings(&self, buildings: &[Building]) -> Result<(), AppError> {
        self.write("upsert_buildings", buildings.len(), |state| {
            for building in buildings {
                state.buildings.insert(building.id, building.clone());
            }
        })
    }

    async fn upsert_rooms(&self, rooms: &[Room]) -> Result<(), AppError> {
        self.write("upsert_rooms", rooms.len(), |state| {
            for room in rooms {
                state.rooms.insert(room.id, room.clone());
            }
        })
    }

    async fn upsert_courses(&self, courses: &[Course]) -> Result<(), AppError> {
        self.write("upsert_courses", courses.len(), |state| {
            for course in courses {
                state.courses.insert(course.id, course.clone());
            }
        })
    }

    async fn upsert_course_descriptions(
        &self,
        rows: &[CourseDescription],
    ) -> Result<(), AppError> {
        self.write("upsert_course_descriptions", rows.len(), |state| {
            for row in rows {
                state
                    .course_descriptions
                    .insert((row.course, row.name.clone()), row.clone());
            }
        })
    }

    async fn upsert_course_components(&self, rows: &[CourseComponent]) -> Result<(), AppError> {
        self.write("upsert_course_components", rows.len(), |state| {
            for row in rows {
                state
                    .course_components
                    .insert((row.course, row.component.clone()), row.clone());
            }
        })
    }

    async fn commit_courses(&self, batch: &CourseBatch) -> Result<(), AppError> {
        let ids: BTreeSet<i32> = batch.courses.iter().map(|c| c.id).collect();

        self.upsert_courses(&batch.courses).await?;
        self.write("delete_course_children", ids.len(), |state| {
            state
                .course_descriptions
                .retain(|(course, _), _| !ids.contains(course));
            state
                .course_components
                .retain(|(course, _), _| !ids.contains(course));
        })?;
        self.upsert_course_descriptions(&batch.descriptions).await?;
        self.upsert_course_components(&batch.components).await
    }

    async fn select_all_terms(&self) -> Result<Vec<Term>, AppError> {
        Ok(self.snapshot().terms.into_values().collect())
    }

    async fn select_term_by_name(&self, name: &str) -> Result<Option<Term>, AppError> {
        Ok(self
            .snapshot()
            .terms
            .into_values()
            .filter(|term| term.name == name)
            .last())
    }

    async fn select_all_schools(&self) -> Result<Vec<School>, AppError> {
        Ok(self.snapshot().schools.into_values().collect())
    }

    async fn select_all_subjects(&self) -> Result<Vec<Subject>, AppError> {
        Ok(self.snapshot().subjects.into_values().collect())
    }

    async fn select_subjects_by_term(&self, term: i32) -> Result<Vec<Subject>, AppError> {
        let state = self.snapshot();
        let offered: BTreeSet<&str> = state
            .subject_availabilities
            .iter()
            .filter(|row| row.term == term)
            .map(|row| row.subject.as_str())
            .collect();
        Ok(offered
            .into_iter()
            .filter_map(|symbol| state.subjects.get(symbol).cloned())
            .collect())
    }

    async fn select_all_instructors(&self) -> Result<Vec<Instructor>, AppError> {
        Ok(self.snapshot().instructors.into_values().collect())
    }

    async fn select_all_buildings(&self) -> Result<Vec<Building>, AppError> {
        Ok(self.snapshot().buildings.into_values().collect())
    }

    async fn stats(&self) -> Result<CatalogStats, AppError> {
        let state = self.snapshot();
        Ok(CatalogStats {
            terms: state.terms.len() as i64,
            schools: state.schools.len() as i64,
            subjects: state.subjects.len() as i64,
            subject_availabilities: state.subject_availabilities.len() as i64,
            instructors: state.instructors.len() as i64,
            instructor_subjects: state.instructor_subjects.len() as i64,
            buildings: state.buildings.len() as i64,
            rooms: state.rooms.len() as i64,
            courses: state.courses.len() as i64,
            course_descriptions: state.course_descriptions.len() as i64,
            course_components: state.course_components.len() as i64,
        })
    }
}

mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_stats_and_subjects_by_term() {
        let store = MemoryStore::default();
        store.seed_subjects(&[
            Subject {
                symbol: "MATH".into(),
                name: "Mathematics".into(),
            },
            Subject {
                symbol: "ART".into(),
                name: "Art".into(),
            },
        ]);
        store.seed_availabilities(&[
            SubjectAvailability {
                term: 1,
                school: "WCAS".into(),
                subject: "MATH".into(),
            },
            SubjectAvailability {
                term: 1,
                school: "SESP".into(),
                subject: "MATH".into(),
            },
        ]);

        let subjects = store.select_subjects_by_term(1).await.unwrap();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].symbol, "MATH");

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.subjects, 2);
        assert_eq!(stats.subject_availabilities, 2);
    }

    #[tokio::test]
    async fn test_term_by_name_prefers_highest_id() {
        let store = MemoryStore::default();
        let term = |id: i32| Term {
            id,
            name: "2020 Summer".into(),
            ..Default::default()
        };
        store.seed_terms(&[term(4800), term(4810)]);

        let found = store.select_term_by_name("2020 Summer").await.unwrap();
        assert_eq!(found.map(|t| t.id), Some(4810));
        assert!(store.select_term_by_name("2021 Summer").await.unwrap().is_none());
    }
}
