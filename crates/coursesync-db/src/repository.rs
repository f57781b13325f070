//! Catalog repository for PostgreSQL.
//!
//! Each write runs row by row inside one transaction, so a batch is all-or-nothing.
//! The `commit_*` stage methods widen that transaction to every kind the stage
//! writes.

use async_trait::async_trait;
use coursesync_core::error::AppError;
use coursesync_core::models::{
    Building, CatalogStats, Course, CourseComponent, CourseDescription, Instructor,
    InstructorSubject, Room, School, Subject, SubjectAvailability, Term,
};
use coursesync_core::traits::{CourseBatch, EntityStore, InstructorBatch, SubjectBatch};
use sqlx::{PgConnection, PgPool, Pool, Postgres};
use tracing::debug;

/// Repository for the mirrored catalog in PostgreSQL.
///
/// # Examples
///
/// ```no_run
/// use sqlx::postgres::PgPoolOptions;
/// use coursesync_db::CatalogRepository;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = PgPoolOptions::new()
///     .max_connections(5)
///     .connect("postgresql://localhost/courses")
///     .await?;
///
/// let repo = CatalogRepository::new(pool);
/// repo.ensure_schema().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CatalogRepository {
    pool: Pool<Postgres>,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates missing tables.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        crate::schema::ensure_schema(&self.pool)
            .await
            .map_err(AppError::DatabaseError)
    }
}

async fn upsert_terms_in(conn: &mut PgConnection, terms: &[Term]) -> Result<(), sqlx::Error> {
    for term in terms {
        sqlx::query(
            r#"
            INSERT INTO terms (id, name, start_date, end_date)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date
            "#,
        )
        .bind(term.id)
        .bind(&term.name)
        .bind(&term.start_date)
        .bind(&term.end_date)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn upsert_schools_in(conn: &mut PgConnection, schools: &[School]) -> Result<(), sqlx::Error> {
    for school in schools {
        sqlx::query(
            r#"
            INSERT INTO schools (symbol, name)
            VALUES ($1, $2)
            ON CONFLICT (symbol) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(&school.symbol)
        .bind(&school.name)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn upsert_subjects_in(
    conn: &mut PgConnection,
    subjects: &[Subject],
) -> Result<(), sqlx::Error> {
    for subject in subjects {
        sqlx::query(
            r#"
            INSERT INTO subjects (symbol, name)
            VALUES ($1, $2)
            ON CONFLICT (symbol) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(&subject.symbol)
        .bind(&subject.name)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_subject_availabilities_in(
    conn: &mut PgConnection,
    rows: &[SubjectAvailability],
) -> Result<(), sqlx::Error> {
    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO subject_availabilities (term, school, subject)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(row.term)
        .bind(&row.school)
        .bind(&row.subject)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn delete_subject_availabilities_in(
    conn: &mut PgConnection,
    term: i32,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM subject_availabilities WHERE term = $1")
        .bind(term)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

async fn upsert_instructors_in(
    conn: &mut PgConnection,
    instructors: &[Instructor],
) -> Result<(), sqlx::Error> {
    for instructor in instructors {
        sqlx::query(
            r#"
            INSERT INTO instructors (id, name, phone)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                phone = EXCLUDED.phone
            "#,
        )
        .bind(instructor.id)
        .bind(&instructor.name)
        .bind(&instructor.phone)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_instructor_subjects_in(
    conn: &mut PgConnection,
    rows: &[InstructorSubject],
) -> Result<(), sqlx::Error> {
    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO instructor_subjects (instructor, subject)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(row.instructor)
        .bind(&row.subject)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn upsert_buildings_in(
    conn: &mut PgConnection,
    buildings: &[Building],
) -> Result<(), sqlx::Error> {
    for building in buildings {
        sqlx::query(
            r#"
            INSERT INTO buildings (id, name, lat, lon)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                lat = EXCLUDED.lat,
                lon = EXCLUDED.lon
            "#,
        )
        .bind(building.id)
        .bind(&building.name)
        .bind(building.lat)
        .bind(building.lon)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn upsert_rooms_in(conn: &mut PgConnection, rooms: &[Room]) -> Result<(), sqlx::Error> {
    for room in rooms {
        sqlx::query(
            r#"
            INSERT INTO rooms (id, building_id, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                building_id = EXCLUDED.building_id,
                name = EXCLUDED.name
            "#,
        )
        .bind(room.id)
        .bind(room.building_id)
        .bind(&room.name)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn upsert_courses_in(conn: &mut PgConnection, courses: &[Course]) -> Result<(), sqlx::Error> {
    for course in courses {
        sqlx::query(
            r#"
            INSERT INTO courses (
                id, title, term, school, instructor, subject, catalog_num, section, room,
                meeting_days, start_time, end_time, start_date, end_date, seats,
                overview, topic, attributes, requirements, component, class_num, course_id
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22
            )
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                term = EXCLUDED.term,
                school = EXCLUDED.school,
                instructor = EXCLUDED.instructor,
                subject = EXCLUDED.subject,
                catalog_num = EXCLUDED.catalog_num,
                section = EXCLUDED.section,
                room = EXCLUDED.room,
                meeting_days = EXCLUDED.meeting_days,
                start_time = EXCLUDED.start_time,
                end_time = EXCLUDED.end_time,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                seats = EXCLUDED.seats,
                overview = EXCLUDED.overview,
                topic = EXCLUDED.topic,
                attributes = EXCLUDED.attributes,
                requirements = EXCLUDED.requirements,
                component = EXCLUDED.component,
                class_num = EXCLUDED.class_num,
                course_id = EXCLUDED.course_id
            "#,
        )
        .bind(course.id)
        .bind(&course.title)
        .bind(course.term)
        .bind(&course.school)
        .bind(course.instructor)
        .bind(&course.subject)
        .bind(&course.catalog_num)
        .bind(&course.section)
        .bind(course.room)
        .bind(&course.meeting_days)
        .bind(&course.start_time)
        .bind(&course.end_time)
        .bind(&course.start_date)
        .bind(&course.end_date)
        .bind(course.seats)
        .bind(&course.overview)
        .bind(&course.topic)
        .bind(&course.attributes)
        .bind(&course.requirements)
        .bind(&course.component)
        .bind(course.class_num)
        .bind(course.course_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn upsert_course_descriptions_in(
    conn: &mut PgConnection,
    rows: &[CourseDescription],
) -> Result<(), sqlx::Error> {
    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO course_descriptions (course, name, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (course, name) DO UPDATE SET description = EXCLUDED.description
            "#,
        )
        .bind(row.course)
        .bind(&row.name)
        .bind(&row.description)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn upsert_course_components_in(
    conn: &mut PgConnection,
    rows: &[CourseComponent],
) -> Result<(), sqlx::Error> {
    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO course_components (
                course, component, meeting_days, start_time, end_time, section, room
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (course, component) DO UPDATE SET
                meeting_days = EXCLUDED.meeting_days,
                start_time = EXCLUDED.start_time,
                end_time = EXCLUDED.end_time,
                section = EXCLUDED.section,
                room = EXCLUDED.room
            "#,
        )
        .bind(row.course)
        .bind(&row.component)
        .bind(&row.meeting_days)
        .bind(&row.start_time)
        .bind(&row.end_time)
        .bind(&row.section)
        .bind(&row.room)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Removes description and component rows of `courses` so a re-sync replaces
/// them wholesale instead of leaving blocks the API no longer lists.
async fn delete_course_children_in(
    conn: &mut PgConnection,
    courses: &[i32],
) -> Result<(), sqlx::Error> {
    if courses.is_empty() {
        return Ok(());
    }
    sqlx::query("DELETE FROM course_descriptions WHERE course = ANY($1)")
        .bind(courses)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM course_components WHERE course = ANY($1)")
        .bind(courses)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl EntityStore for CatalogRepository {
    async fn upsert_terms(&self, terms: &[Term]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        upsert_terms_in(&mut tx, terms).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_schools(&self, schools: &[School]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        upsert_schools_in(&mut tx, schools).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_subjects(&self, subjects: &[Subject]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        upsert_subjects_in(&mut tx, subjects).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_subject_availabilities(
        &self,
        rows: &[SubjectAvailability],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        insert_subject_availabilities_in(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_subject_availabilities_by_term(&self, term: i32) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let deleted = delete_subject_availabilities_in(&mut tx, term).await?;
        tx.commit().await?;
        debug!(term, deleted, "Deleted subject availabilities");
        Ok(())
    }

    async fn upsert_instructors(&self, instructors: &[Instructor]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        upsert_instructors_in(&mut tx, instructors).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_instructor_subjects(
        &self,
        rows: &[InstructorSubject],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        insert_instructor_subjects_in(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_buildings(&self, buildings: &[Building]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        upsert_buildings_in(&mut tx, buildings).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_rooms(&self, rooms: &[Room]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        upsert_rooms_in(&mut tx, rooms).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_courses(&self, courses: &[Course]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        upsert_courses_in(&mut tx, courses).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_course_descriptions(
        &self,
        rows: &[CourseDescription],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        upsert_course_descriptions_in(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_course_components(&self, rows: &[CourseComponent]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        upsert_course_components_in(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn select_all_terms(&self) -> Result<Vec<Term>, AppError> {
        let terms = sqlx::query_as::<_, Term>(
            "SELECT id, name, start_date, end_date FROM terms ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(terms)
    }

    async fn select_term_by_name(&self, name: &str) -> Result<Option<Term>, AppError> {
        let term = sqlx::query_as::<_, Term>(
            "SELECT id, name, start_date, end_date FROM terms WHERE name = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(term)
    }

    async fn select_all_schools(&self) -> Result<Vec<School>, AppError> {
        let schools =
            sqlx::query_as::<_, School>("SELECT symbol, name FROM schools ORDER BY symbol")
                .fetch_all(&self.pool)
                .await?;
        Ok(schools)
    }

    async fn select_all_subjects(&self) -> Result<Vec<Subject>, AppError> {
        let subjects =
            sqlx::query_as::<_, Subject>("SELECT symbol, name FROM subjects ORDER BY symbol")
                .fetch_all(&self.pool)
                .await?;
        Ok(subjects)
    }

    async fn select_subjects_by_term(&self, term: i32) -> Result<Vec<Subject>, AppError> {
        let subjects = sqlx::query_as::<_, Subject>(
            r#"
            SELECT DISTINCT s.symbol, s.name
            FROM subjects s
            JOIN subject_availabilities a ON a.subject = s.symbol
            WHERE a.term = $1
            ORDER BY s.symbol
            "#,
        )
        .bind(term)
        .fetch_all(&self.pool)
        .await?;
        Ok(subjects)
    }

    async fn select_all_instructors(&self) -> Result<Vec<Instructor>, AppError> {
        let instructors = sqlx::query_as::<_, Instructor>(
            "SELECT id, name, phone FROM instructors ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(instructors)
    }

    async fn select_all_buildings(&self) -> Result<Vec<Building>, AppError> {
        let buildings = sqlx::query_as::<_, Building>(
            "SELECT id, name, lat, lon FROM buildings ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(buildings)
    }

    async fn stats(&self) -> Result<CatalogStats, AppError> {
        let row: StatsRow = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM terms) AS terms,
                (SELECT COUNT(*) FROM schools) AS schools,
                (SELECT COUNT(*) FROM subjects) AS subjects,
                (SELECT COUNT(*) FROM subject_availabilities) AS subject_availabilities,
                (SELECT COUNT(*) FROM instructors) AS instructors,
                (SELECT COUNT(*) FROM instructor_subjects) AS instructor_subjects,
                (SELECT COUNT(*) FROM buildings) AS buildings,
                (SELECT COUNT(*) FROM rooms) AS rooms,
                (SELECT COUNT(*) FROM courses) AS courses,
                (SELECT COUNT(*) FROM course_descriptions) AS course_descriptions,
                (SELECT COUNT(*) FROM course_components) AS course_components
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn commit_subjects(&self, batch: &SubjectBatch) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        if let Some(term) = batch.replace_term {
            let deleted = delete_subject_availabilities_in(&mut tx, term).await?;
            debug!(term, deleted, "Deleted subject availabilities");
        }
        upsert_subjects_in(&mut tx, &batch.subjects).await?;
        insert_subject_availabilities_in(&mut tx, &batch.availabilities).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn commit_instructors(&self, batch: &InstructorBatch) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        upsert_instructors_in(&mut tx, &batch.instructors).await?;
        insert_instructor_subjects_in(&mut tx, &batch.subjects).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn commit_courses(&self, batch: &CourseBatch) -> Result<(), AppError> {
        let ids: Vec<i32> = batch.courses.iter().map(|c| c.id).collect();

        let mut tx = self.pool.begin().await?;
        upsert_courses_in(&mut tx, &batch.courses).await?;
        delete_course_children_in(&mut tx, &ids).await?;
        upsert_course_descriptions_in(&mut tx, &batch.descriptions).await?;
        upsert_course_components_in(&mut tx, &batch.components).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Helper struct for deserializing stats query results
#[derive(sqlx::FromRow)]
struct StatsRow {
    terms: Option<i64>,
    schools: Option<i64>,
    subjects: Option<i64>,
    subject_availabilities: Option<i64>,
    instructors: Option<i64>,
    instructor_subjects: Option<i64>,
    buildings: Option<i64>,
    rooms: Option<i64>,
    courses: Option<i64>,
    course_descriptions: Option<i64>,
    course_components: Option<i64>,
}

impl From<StatsRow> for CatalogStats {
    fn from(row: StatsRow) -> Self {
        CatalogStats {
            terms: row.terms.unwrap_or(0),
            schools: row.schools.unwrap_or(0),
            subjects: row.subjects.unwrap_or(0),
            subject_availabilities: row.subject_availabilities.unwrap_or(0),
            instructors: row.instructors.unwrap_or(0),
            instructor_subjects: row.instructor_subjects.unwrap_or(0),
            buildings: row.buildings.unwrap_or(0),
            rooms: row.rooms.unwrap_or(0),
            courses: row.courses.unwrap_or(0),
            course_descriptions: row.course_descriptions.unwrap_or(0),
            course_components: row.course_components.unwrap_or(0),
        }
    }
}
