//! Table definitions for the mirrored catalog.
//!
//! Course rows carry no foreign keys to instructors or rooms: unresolved instructor
//! joins store id 0, and the API may reference rooms it never listed.

use sqlx::PgPool;
use tracing::info;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS terms (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    start_date TEXT NOT NULL DEFAULT '',
    end_date TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_terms_name ON terms (name);

CREATE TABLE IF NOT EXISTS schools (
    symbol TEXT PRIMARY KEY,
    name TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS subjects (
    symbol TEXT PRIMARY KEY,
    name TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS subject_availabilities (
    term INTEGER NOT NULL REFERENCES terms (id),
    school TEXT NOT NULL REFERENCES schools (symbol),
    subject TEXT NOT NULL REFERENCES subjects (symbol),
    PRIMARY KEY (term, school, subject)
);

CREATE TABLE IF NOT EXISTS instructors (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL DEFAULT '',
    phone TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_instructors_name ON instructors (name);

CREATE TABLE IF NOT EXISTS instructor_subjects (
    instructor INTEGER NOT NULL REFERENCES instructors (id),
    subject TEXT NOT NULL REFERENCES subjects (symbol),
    PRIMARY KEY (instructor, subject)
);

CREATE TABLE IF NOT EXISTS buildings (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL DEFAULT '',
    lat DOUBLE PRECISION NOT NULL DEFAULT 0,
    lon DOUBLE PRECISION NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS rooms (
    id INTEGER PRIMARY KEY,
    building_id INTEGER NOT NULL REFERENCES buildings (id),
    name TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS courses (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL DEFAULT '',
    term INTEGER NOT NULL REFERENCES terms (id),
    school TEXT NOT NULL DEFAULT '',
    instructor INTEGER NOT NULL DEFAULT 0,
    subject TEXT NOT NULL DEFAULT '',
    catalog_num TEXT NOT NULL DEFAULT '',
    section TEXT NOT NULL DEFAULT '',
    room INTEGER NOT NULL DEFAULT 0,
    meeting_days TEXT NOT NULL DEFAULT '',
    start_time TEXT NOT NULL DEFAULT '',
    end_time TEXT NOT NULL DEFAULT '',
    start_date TEXT NOT NULL DEFAULT '',
    end_date TEXT NOT NULL DEFAULT '',
    seats INTEGER NOT NULL DEFAULT 0,
    overview TEXT NOT NULL DEFAULT '',
    topic TEXT NOT NULL DEFAULT '',
    attributes TEXT NOT NULL DEFAULT '',
    requirements TEXT NOT NULL DEFAULT '',
    component TEXT NOT NULL DEFAULT '',
    class_num INTEGER NOT NULL DEFAULT 0,
    course_id INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_courses_term_subject ON courses (term, subject);

CREATE TABLE IF NOT EXISTS course_descriptions (
    course INTEGER NOT NULL REFERENCES courses (id),
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (course, name)
);

CREATE TABLE IF NOT EXISTS course_components (
    course INTEGER NOT NULL REFERENCES courses (id),
    component TEXT NOT NULL,
    meeting_days TEXT NOT NULL DEFAULT '',
    start_time TEXT NOT NULL DEFAULT '',
    end_time TEXT NOT NULL DEFAULT '',
    section TEXT NOT NULL DEFAULT '',
    room TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (course, component)
);
"#;

/// Splits the schema script into individual statements.
fn statements() -> impl Iterator<Item = &'static str> {
    SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty())
}

/// Creates every catalog table and index that does not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for stmt in statements() {
        sqlx::query(stmt).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    info!("Database schema is up to date");
    Ok(())
}
