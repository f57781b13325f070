//! Seams between the sync orchestrator and its collaborators.
//!
//! [`CatalogGateway`] is the read-only course data API; [`EntityStore`] is the
//! relational mirror. The orchestrator only ever talks to these traits, so both can
//! be swapped for in-memory doubles in tests.

use async_trait::async_trait;

use crate::catalog::CatalogCourse;
use crate::error::AppError;
use crate::models::{
    Building, CatalogStats, Course, CourseComponent, CourseDescription, Instructor,
    InstructorSubject, Room, School, Subject, SubjectAvailability, Term,
};

/// Parameterized fetches against the course data API, one per entity kind.
///
/// Each call is one logical fetch: it either returns the full collection or fails.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn terms(&self) -> Result<Vec<Term>, AppError>;

    async fn schools(&self) -> Result<Vec<School>, AppError>;

    /// Subjects offered by `school` in `term`.
    async fn subjects(&self, term: i32, school: &str) -> Result<Vec<Subject>, AppError>;

    /// Instructors teaching `subject`.
    async fn instructors(&self, subject: &str) -> Result<Vec<Instructor>, AppError>;

    async fn buildings(&self) -> Result<Vec<Building>, AppError>;

    /// Rooms inside `building`.
    async fn rooms(&self, building: i32) -> Result<Vec<Room>, AppError>;

    /// Detailed course records for `subject` in `term`.
    async fn course_details(
        &self,
        term: i32,
        subject: &str,
    ) -> Result<Vec<CatalogCourse>, AppError>;
}

/// Writes produced by one Subjects stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectBatch {
    /// When set, every availability row of this term is removed before the new
    /// rows are inserted.
    pub replace_term: Option<i32>,
    pub subjects: Vec<Subject>,
    pub availabilities: Vec<SubjectAvailability>,
}

/// Writes produced by one Instructors stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstructorBatch {
    pub instructors: Vec<Instructor>,
    pub subjects: Vec<InstructorSubject>,
}

/// Writes produced by one Courses stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseBatch {
    pub courses: Vec<Course>,
    pub descriptions: Vec<CourseDescription>,
    pub components: Vec<CourseComponent>,
}

/// Bulk persistence for the mirrored catalog.
///
/// Every write method is atomic over its whole input. Upserts overwrite by natural
/// key; association inserts skip rows that already exist.
///
/// The `commit_*` methods group one stage's writes. Their default implementations
/// call the per-kind methods in sequence, which is atomic per kind only; stores with
/// real transactions should override them so the whole stage commits at once.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn upsert_terms(&self, terms: &[Term]) -> Result<(), AppError>;

    async fn upsert_schools(&self, schools: &[School]) -> Result<(), AppError>;

    async fn upsert_subjects(&self, subjects: &[Subject]) -> Result<(), AppError>;

    async fn insert_subject_availabilities(
        &self,
        rows: &[SubjectAvailability],
    ) -> Result<(), AppError>;

    async fn delete_subject_availabilities_by_term(&self, term: i32) -> Result<(), AppError>;

    async fn upsert_instructors(&self, instructors: &[Instructor]) -> Result<(), AppError>;

    async fn insert_instructor_subjects(&self, rows: &[InstructorSubject])
        -> Result<(), AppError>;

    async fn upsert_buildings(&self, buildings: &[Building]) -> Result<(), AppError>;

    async fn upsert_rooms(&self, rooms: &[Room]) -> Result<(), AppError>;

    async fn upsert_courses(&self, courses: &[Course]) -> Result<(), AppError>;

    async fn upsert_course_descriptions(
        &self,
        rows: &[CourseDescription],
    ) -> Result<(), AppError>;

    async fn upsert_course_components(&self, rows: &[CourseComponent]) -> Result<(), AppError>;

    async fn select_all_terms(&self) -> Result<Vec<Term>, AppError>;

    async fn select_term_by_name(&self, name: &str) -> Result<Option<Term>, AppError>;

    async fn select_all_schools(&self) -> Result<Vec<School>, AppError>;

    async fn select_all_subjects(&self) -> Result<Vec<Subject>, AppError>;

    /// Subjects with at least one availability row in `term`, each listed once.
    async fn select_subjects_by_term(&self, term: i32) -> Result<Vec<Subject>, AppError>;

    async fn select_all_instructors(&self) -> Result<Vec<Instructor>, AppError>;

    async fn select_all_buildings(&self) -> Result<Vec<Building>, AppError>;

    async fn stats(&self) -> Result<CatalogStats, AppError>;

    async fn commit_subjects(&self, batch: &SubjectBatch) -> Result<(), AppError> {
        if let Some(term) = batch.replace_term {
            self.delete_subject_availabilities_by_term(term).await?;
        }
        self.upsert_subjects(&batch.subjects).await?;
        self.insert_subject_availabilities(&batch.availabilities)
            .await
    }

    async fn commit_instructors(&self, batch: &InstructorBatch) -> Result<(), AppError> {
        self.upsert_instructors(&batch.instructors).await?;
        self.insert_instructor_subjects(&batch.subjects).await
    }

    async fn commit_courses(&self, batch: &CourseBatch) -> Result<(), AppError> {
        self.upsert_courses(&batch.courses).await?;
        self.upsert_course_descriptions(&batch.descriptions).await?;
        self.upsert_course_components(&batch.components).await
    }
}
