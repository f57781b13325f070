//! Stage-by-stage execution of a [`SyncPlan`] against a gateway and a store.

use tracing::{debug, error, info, info_span, warn, Instrument};

use super::dedup::KeyedRows;
use super::scopes::{course_scopes, instructor_scopes, room_scopes, subject_scopes};
use super::{JoinReport, Stage, StageAction, StageReport, SyncMode, SyncPlan, SyncReport};
use crate::error::AppError;
use crate::models::{InstructorSubject, SubjectAvailability, Term};
use crate::normalize::{normalize_course, InstructorIndex};
use crate::traits::{CatalogGateway, CourseBatch, EntityStore, InstructorBatch, SubjectBatch};

/// Drives gateway → normalizer → store data flow, one stage at a time.
///
/// Stages run strictly in sequence, and so do the fetches inside a stage. The first
/// failure aborts the invocation: stages committed before it keep their effects,
/// later stages are not attempted.
///
/// # Examples
///
/// ```no_run
/// use coursesync_core::sync::{SyncMode, SyncOrchestrator};
/// use coursesync_core::traits::{CatalogGateway, EntityStore};
///
/// # async fn example(gateway: &impl CatalogGateway, store: &impl EntityStore) -> Result<(), coursesync_core::AppError> {
/// let report = SyncOrchestrator::new(gateway, store)
///     .run(SyncMode::TermScoped { term: "2019 Fall".into() })
///     .await?;
/// println!("{} rows written", report.total_rows_written());
/// # Ok(())
/// # }
/// ```
pub struct SyncOrchestrator<'a, G: ?Sized, S: ?Sized> {
    gateway: &'a G,
    store: &'a S,
}

impl<'a, G, S> SyncOrchestrator<'a, G, S>
where
    G: CatalogGateway + ?Sized,
    S: EntityStore + ?Sized,
{
    pub fn new(gateway: &'a G, store: &'a S) -> Self {
        Self { gateway, store }
    }

    /// Executes one invocation.
    ///
    /// Term-scoped modes look their term up by name first; an unknown name fails
    /// with [`AppError::TermNotFound`] before any fetch or write. A stage failure is
    /// returned as [`AppError::SyncAborted`].
    pub async fn run(&self, mode: SyncMode) -> Result<SyncReport, AppError> {
        let mut report = SyncReport::new(mode.clone());
        let span = info_span!("sync", run_id = %report.run_id, mode = %mode);

        async move {
            let term = match mode.term_name() {
                Some(name) => Some(self.resolve_term(name).await?),
                None => None,
            };

            let plan = SyncPlan::for_mode(&mode);
            for &(stage, action) in plan.steps() {
                if action == StageAction::Skip {
                    info!("Skipping {}", stage);
                    report.stages.push(StageReport::skipped(stage));
                    continue;
                }

                info!("Starting {} stage", stage);
                match self
                    .run_stage(stage, term.as_ref(), &mut report.joins)
                    .await
                {
                    Ok(stage_report) => {
                        info!(
                            fetches = stage_report.fetches,
                            records = stage_report.records,
                            rows = stage_report.rows_written,
                            "Finished {} stage",
                            stage
                        );
                        report.stages.push(stage_report);
                    }
                    Err(e) => {
                        error!(error = %e, "{} stage failed, aborting sync", stage);
                        return Err(AppError::aborted(stage, e));
                    }
                }
            }

            report.finished_at = Some(chrono::Utc::now());
            Ok(report)
        }
        .instrument(span)
        .await
    }

    async fn resolve_term(&self, name: &str) -> Result<Term, AppError> {
        match self.store.select_term_by_name(name).await? {
            Some(term) => {
                debug!(term_id = term.id, "Resolved term {}", name);
                Ok(term)
            }
            None => Err(AppError::TermNotFound(name.to_string())),
        }
    }

    async fn run_stage(
        &self,
        stage: Stage,
        term: Option<&Term>,
        joins: &mut JoinReport,
    ) -> Result<StageReport, AppError> {
        match stage {
            Stage::Terms => self.sync_terms().await,
            Stage::Schools => self.sync_schools().await,
            Stage::Subjects => self.sync_subjects(term).await,
            Stage::Instructors => self.sync_instructors().await,
            Stage::Buildings => self.sync_buildings().await,
            Stage::Rooms => self.sync_rooms().await,
            Stage::Courses => match term {
                Some(term) => self.sync_courses(term, joins).await,
                None => Err(AppError::Generic(
                    "courses can only be synced for a named term".to_string(),
                )),
            },
        }
    }

    async fn sync_terms(&self) -> Result<StageReport, AppError> {
        info!("Fetching terms");
        let terms = self.gateway.terms().await?;

        info!("Storing {} terms", terms.len());
        self.store.upsert_terms(&terms).await?;

        Ok(StageReport::ran(Stage::Terms, 1, terms.len(), terms.len()))
    }

    async fn sync_schools(&self) -> Result<StageReport, AppError> {
        info!("Fetching schools");
        let schools = self.gateway.schools().await?;

        info!("Storing {} schools", schools.len());
        self.store.upsert_schools(&schools).await?;

        Ok(StageReport::ran(Stage::Schools, 1, schools.len(), schools.len()))
    }

    /// Fetches subjects per `(term, school)` and rebuilds availability rows.
    ///
    /// With a term given, only that term is fetched and its previous availability
    /// rows are replaced in the same commit as the new ones.
    async fn sync_subjects(&self, term: Option<&Term>) -> Result<StageReport, AppError> {
        let terms = match term {
            Some(term) => {
                info!("Fetching subjects for term {}", term.name);
                vec![term.clone()]
            }
            None => {
                info!("Fetching subjects");
                self.store.select_all_terms().await?
            }
        };
        let schools = self.store.select_all_schools().await?;
        let scopes = subject_scopes(&terms, &schools);

        let mut subjects = KeyedRows::new();
        let mut availabilities = KeyedRows::new();
        let mut records = 0;

        for scope in &scopes {
            debug!(term = scope.term, school = %scope.school, "Fetching subjects");
            let fetched = self.gateway.subjects(scope.term, &scope.school).await?;
            records += fetched.len();

            for subject in fetched {
                let row = SubjectAvailability {
                    term: scope.term,
                    school: scope.school.clone(),
                    subject: subject.symbol.clone(),
                };
                availabilities.push(row.clone(), row);
                subjects.push(subject.symbol.clone(), subject);
            }
        }

        let batch = SubjectBatch {
            replace_term: term.map(|t| t.id),
            subjects: subjects.into_rows(),
            availabilities: availabilities.into_rows(),
        };
        if let Some(term) = term {
            info!("Replacing subject availabilities for term {}", term.name);
        }
        info!(
            "Storing {} subjects and {} availabilities",
            batch.subjects.len(),
            batch.availabilities.len()
        );
        self.store.commit_subjects(&batch).await?;

        Ok(StageReport::ran(
            Stage::Subjects,
            scopes.len(),
            records,
            batch.subjects.len() + batch.availabilities.len(),
        ))
    }

    async fn sync_instructors(&self) -> Result<StageReport, AppError> {
        info!("Fetching instructors");
        let subjects = self.store.select_all_subjects().await?;
        let scopes = instructor_scopes(&subjects);

        let mut instructors = KeyedRows::new();
        let mut links = KeyedRows::new();
        let mut records = 0;

        for subject in &scopes {
            debug!(subject = %subject, "Fetching instructors");
            let fetched = self.gateway.instructors(subject).await?;
            records += fetched.len();

            for instructor in fetched {
                let link = InstructorSubject {
                    instructor: instructor.id,
                    subject: subject.clone(),
                };
                links.push(link.clone(), link);
                instructors.push(instructor.id, instructor);
            }
        }

        let batch = InstructorBatch {
            instructors: instructors.into_rows(),
            subjects: links.into_rows(),
        };
        info!(
            "Storing {} instructors and {} instructor subjects",
            batch.instructors.len(),
            batch.subjects.len()
        );
        self.store.commit_instructors(&batch).await?;

        Ok(StageReport::ran(
            Stage::Instructors,
            scopes.len(),
            records,
            batch.instructors.len() + batch.subjects.len(),
        ))
    }

    async fn sync_buildings(&self) -> Result<StageReport, AppError> {
        info!("Fetching buildings");
        let buildings = self.gateway.buildings().await?;

        info!("Storing {} buildings", buildings.len());
        self.store.upsert_buildings(&buildings).await?;

        Ok(StageReport::ran(
            Stage::Buildings,
            1,
            buildings.len(),
            buildings.len(),
        ))
    }

    async fn sync_rooms(&self) -> Result<StageReport, AppError> {
        info!("Fetching rooms");
        let buildings = self.store.select_all_buildings().await?;
        let scopes = room_scopes(&buildings);

        let mut rooms = KeyedRows::new();
        let mut records = 0;

        for building in &scopes {
            debug!(building = *building, "Fetching rooms");
            let fetched = self.gateway.rooms(*building).await?;
            records += fetched.len();

            for room in fetched {
                rooms.push(room.id, room);
            }
        }

        let rooms = rooms.into_rows();
        info!("Storing {} rooms", rooms.len());
        self.store.upsert_rooms(&rooms).await?;

        Ok(StageReport::ran(Stage::Rooms, scopes.len(), records, rooms.len()))
    }

    /// Fetches course details for every subject offered in `term` and stores the
    /// flattened rows once all subjects have been fetched.
    async fn sync_courses(
        &self,
        term: &Term,
        joins: &mut JoinReport,
    ) -> Result<StageReport, AppError> {
        info!("Fetching courses for term {}", term.name);
        let subjects = self.store.select_subjects_by_term(term.id).await?;
        let instructors = self.store.select_all_instructors().await?;

        let index = InstructorIndex::new(&instructors);
        for name in index.ambiguous_names() {
            warn!(instructor = %name, "Instructor name is shared by several instructors");
        }

        let scopes = course_scopes(term, &subjects);
        let mut courses = KeyedRows::new();
        let mut descriptions = KeyedRows::new();
        let mut components = KeyedRows::new();
        let mut records = 0;

        for scope in &scopes {
            debug!(term = scope.term, subject = %scope.subject, "Fetching course details");
            let fetched = self
                .gateway
                .course_details(scope.term, &scope.subject)
                .await?;
            records += fetched.len();

            for record in &fetched {
                let rows = normalize_course(record, term.id, &index);
                joins.record(&rows.instructor);

                for description in rows.descriptions {
                    descriptions.push(
                        (description.course, description.name.clone()),
                        description,
                    );
                }
                for component in rows.components {
                    components.push((component.course, component.component.clone()), component);
                }
                courses.push(rows.course.id, rows.course);
            }
        }

        for name in &joins.unresolved {
            warn!(instructor = %name, "No instructor matches course instructor name");
        }

        let batch = CourseBatch {
            courses: courses.into_rows(),
            descriptions: descriptions.into_rows(),
            components: components.into_rows(),
        };
        info!(
            "Storing {} courses, {} descriptions and {} components",
            batch.courses.len(),
            batch.descriptions.len(),
            batch.components.len()
        );
        self.store.commit_courses(&batch).await?;

        Ok(StageReport::ran(
            Stage::Courses,
            scopes.len(),
            records,
            batch.courses.len() + batch.descriptions.len() + batch.components.len(),
        ))
    }
}
