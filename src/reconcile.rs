use tracing::debug;

use crate::{
    error::{AppError, AppResult},
    models::{MovieCandidate, MovieFacts, MovieMatch, Reconciliation},
    omdb::OmdbClient,
    store::MovieStore,
};

/// Builds an insertable candidate from a submitted title and asserted
/// director, taking year and rating from the enrichment service.
///
/// The asserted director must match the upstream director (case-insensitive);
/// there is no fallback to trusting the user's input.
pub async fn resolve_candidate(
    omdb: &OmdbClient,
    title: &str,
    asserted_director: &str,
) -> AppResult<MovieCandidate> {
    let title = title.trim();
    let asserted_director = asserted_director.trim();
    if title.is_empty() || asserted_director.is_empty() {
        return Err(AppError::validation("both a movie title and a director are required"));
    }

    let Some(facts) = omdb.lookup(title).await? else {
        return Err(AppError::not_found(format!(
            "the movie information service does not know \"{title}\""
        )));
    };

    verify_director(asserted_director, &facts)?;

    Ok(MovieCandidate {
        name: title.to_string(),
        year: facts.year,
        rating: facts.rating,
        director: facts.director,
    })
}

fn verify_director(asserted: &str, facts: &MovieFacts) -> AppResult<()> {
    if !asserted.eq_ignore_ascii_case(facts.director.trim()) {
        return Err(AppError::conflict(format!(
            "director \"{}\" does not match \"{}\" on record for this title",
            asserted, facts.director
        )));
    }
    Ok(())
}

/// Reconciles a resolved candidate against the store for one user.
///
/// A brand-new movie is inserted and attached to the user's favorites in
/// that order; should the attach fail after the insert, the movie row stays
/// (an orphan with no favorite pointing at it, accepted as non-fatal).
/// Exact and conflicting matches are handed back unchanged so the caller
/// can ask the end user to confirm or abandon; nothing is written for them.
pub async fn add_movie_for_user(
    store: &MovieStore,
    user_id: i32,
    candidate: &MovieCandidate,
) -> AppResult<Reconciliation> {
    match store.movie_exists(candidate).await? {
        MovieMatch::Exact(existing) => {
            debug!(movie_id = existing.id, "exact match found, awaiting confirmation");
            Ok(Reconciliation::ExistsExact(existing))
        }
        MovieMatch::Conflicting(existing) => {
            debug!(movie_id = existing.id, "conflicting match found, awaiting resolution");
            Ok(Reconciliation::ExistsConflicting(existing))
        }
        MovieMatch::Absent => {
            let movie = store.add_movie(candidate).await?;
            store.add_favorite(user_id, movie.id).await?;
            debug!(movie_id = movie.id, user_id, "new movie inserted and attached");
            Ok(Reconciliation::Attached(movie))
        }
    }
}
