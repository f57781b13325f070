//! coursesync db - PostgreSQL persistence for the mirrored catalog.
//!
//! [`CatalogRepository`] implements the
//! [`EntityStore`](coursesync_core::traits::EntityStore) trait on top of an sqlx
//! connection pool. [`schema::ensure_schema`] creates the tables it expects.

pub mod repository;
pub mod schema;

pub use repository::CatalogRepository;
