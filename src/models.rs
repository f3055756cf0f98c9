use serde::Deserialize;

use crate::entities::movie;

/// A movie as submitted for insertion, before it has a database id.
#[derive(Clone, Debug, PartialEq)]
pub struct MovieCandidate {
    pub name: String,
    pub year: i32,
    pub rating: f64,
    pub director: String,
}

/// Value side of the name-keyed movie listings returned by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct MovieDetails {
    pub id: i32,
    pub year: i32,
    pub rating: f64,
    pub director: String,
}

impl From<movie::Model> for MovieDetails {
    fn from(m: movie::Model) -> Self {
        Self { id: m.id, year: m.year, rating: m.rating, director: m.director }
    }
}

/// Outcome of probing the store for a candidate's (name, director) key.
#[derive(Clone, Debug, PartialEq)]
pub enum MovieMatch {
    /// No stored movie shares the candidate's name and director.
    Absent,
    /// A stored movie matches on name, director, year and rating.
    Exact(movie::Model),
    /// A stored movie shares name and director but differs in year or
    /// rating; the stored row is returned for the caller to resolve.
    Conflicting(movie::Model),
}

/// Metadata returned by the enrichment service for a title.
#[derive(Clone, Debug, PartialEq)]
pub struct MovieFacts {
    pub director: String,
    pub year: i32,
    pub rating: f64,
}

/// Result of running the reconciliation workflow for one submission.
#[derive(Clone, Debug, PartialEq)]
pub enum Reconciliation {
    /// The movie was new: inserted and attached to the user's favorites.
    Attached(movie::Model),
    /// An identical movie already exists; the caller must confirm before
    /// its id is attached.
    ExistsExact(movie::Model),
    /// A movie with the same name and director but different year or
    /// rating exists; the caller chooses to accept it or abandon.
    ExistsConflicting(movie::Model),
}

#[derive(Debug, Deserialize)]
pub struct AddUserForm {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMovieForm {
    pub title: String,
    pub director: String,
    /// Set by the confirmation form when the user accepts an already
    /// stored movie instead of inserting a new row.
    pub existing_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMovieForm {
    pub name: String,
    pub year: i32,
    pub rating: f64,
    pub director: String,
}
