//! Fan-out key producers.
//!
//! Each fanning stage first builds the full list of scoping keys, then fetches once
//! per key. Keys come out in a deterministic order with duplicates removed.

use std::collections::HashSet;

use crate::models::{Building, School, Subject, Term};

/// One `(term, school)` pair to fetch subjects for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectScope {
    pub term: i32,
    pub school: String,
}

/// One `(term, subject)` pair to fetch course details for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CourseScope {
    pub term: i32,
    pub subject: String,
}

/// Every term crossed with every school, term-major.
pub fn subject_scopes(terms: &[Term], schools: &[School]) -> Vec<SubjectScope> {
    let mut seen = HashSet::new();
    terms
        .iter()
        .flat_map(|term| {
            schools.iter().map(move |school| SubjectScope {
                term: term.id,
                school: school.symbol.clone(),
            })
        })
        .filter(|scope| seen.insert(scope.clone()))
        .collect()
}

/// Subject symbols to fetch instructors for.
pub fn instructor_scopes(subjects: &[Subject]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut scopes = Vec::new();
    for subject in subjects {
        if seen.insert(subject.symbol.as_str()) {
            scopes.push(subject.symbol.clone());
        }
    }
    scopes
}

/// Building ids to fetch rooms for.
pub fn room_scopes(buildings: &[Building]) -> Vec<i32> {
    let mut seen = HashSet::new();
    buildings
        .iter()
        .map(|building| building.id)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Subjects offered in `term`, paired with it.
pub fn course_scopes(term: &Term, subjects: &[Subject]) -> Vec<CourseScope> {
    instructor_scopes(subjects)
        .into_iter()
        .map(|subject| CourseScope {
            term: term.id,
            subject,
        })
        .collect()
}
