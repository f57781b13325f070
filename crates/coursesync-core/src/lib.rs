//! coursesync core - domain types, course normalization and sync orchestration.

pub mod catalog;
pub mod config;
mod decode;
pub mod error;
pub mod models;
pub mod normalize;
pub mod sync;
pub mod traits;

pub use catalog::CatalogCourse;
pub use config::{
    default_config_path, load_config, CatalogApiConfig, DbConfig, FileConfig, HttpConfig,
    DEFAULT_API_KEY_PARAMETER,
};
pub use error::{AppError, ErrorKind};
pub use models::{
    Building, CatalogStats, Course, CourseComponent, CourseDescription, Instructor,
    InstructorSubject, Room, School, Subject, SubjectAvailability, Term,
};
pub use normalize::{normalize_course, InstructorIndex, InstructorMatch, NormalizedCourse};
pub use sync::{JoinReport, Stage, StageReport, SyncMode, SyncOrchestrator, SyncPlan, SyncReport};
pub use traits::{CatalogGateway, CourseBatch, EntityStore, InstructorBatch, SubjectBatch};
