use std::collections::BTreeMap;

use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use tracing::warn;

use crate::{
    entities::{movie, user, user_favorite},
    error::{AppError, AppResult},
    models::{MovieCandidate, MovieDetails, MovieMatch},
};

/// Data-access layer over the users / movies / user_favorites schema.
///
/// Owns the connection pool by constructor injection; every operation runs
/// against the pool without holding a transaction across calls. Storage
/// faults are classified into the [`AppError`] taxonomy at this boundary and
/// never propagate raw to callers.
#[derive(Clone)]
pub struct MovieStore {
    db: DatabaseConnection,
}

impl MovieStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn list_users(&self) -> AppResult<Vec<user::Model>> {
        Ok(user::Entity::find().order_by_asc(user::Column::Id).all(&self.db).await?)
    }

    pub async fn get_user(&self, user_id: i32) -> AppResult<user::Model> {
        user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {user_id} not found")))
    }

    /// A user's favorite movies, keyed by movie name.
    pub async fn list_favorites(&self, user_id: i32) -> AppResult<BTreeMap<String, MovieDetails>> {
        self.get_user(user_id).await?;

        let favorites = user_favorite::Entity::find()
            .filter(user_favorite::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?;
        let movie_ids: Vec<i32> = favorites.iter().map(|f| f.movie_id).collect();

        let movies = movie::Entity::find()
            .filter(movie::Column::Id.is_in(movie_ids))
            .all(&self.db)
            .await?;

        Ok(movies.into_iter().map(|m| (m.name.clone(), MovieDetails::from(m))).collect())
    }

    pub async fn list_movies(&self) -> AppResult<BTreeMap<String, MovieDetails>> {
        let movies = movie::Entity::find().all(&self.db).await?;
        Ok(movies.into_iter().map(|m| (m.name.clone(), MovieDetails::from(m))).collect())
    }

    pub async fn get_movie(&self, movie_id: i32) -> AppResult<Option<movie::Model>> {
        Ok(movie::Entity::find_by_id(movie_id).one(&self.db).await?)
    }

    /// Probes for a stored movie under the candidate's (name, director) key.
    ///
    /// Year and rating take no part in the lookup; they are compared only
    /// after a key match, to tell an exact duplicate from a conflicting one.
    pub async fn movie_exists(&self, candidate: &MovieCandidate) -> AppResult<MovieMatch> {
        let existing = movie::Entity::find()
            .filter(movie::Column::Name.eq(&candidate.name))
            .filter(movie::Column::Director.eq(&candidate.director))
            .one(&self.db)
            .await?;

        Ok(match existing {
            None => MovieMatch::Absent,
            Some(m) if m.year == candidate.year && rating_eq(m.rating, candidate.rating) => {
                MovieMatch::Exact(m)
            }
            Some(m) => MovieMatch::Conflicting(m),
        })
    }

    pub async fn add_user(&self, name: &str) -> AppResult<user::Model> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("user name is required"));
        }

        let model = user::ActiveModel { id: NotSet, name: Set(name.to_string()) };
        let inserted = match user::Entity::insert(model).exec(&self.db).await {
            Ok(res) => res,
            Err(err) if is_unique_violation(&err) => {
                warn!(%err, name, "duplicate user name rejected");
                return Err(AppError::conflict(format!("user \"{name}\" already exists")));
            }
            Err(err) => return Err(err.into()),
        };

        self.get_user(inserted.last_insert_id).await
    }

    /// Inserts a new movie, re-checking the (name, director) key immediately
    /// beforehand. Any existing row under that key refuses the insert,
    /// regardless of year or rating; the storage-level unique constraint is
    /// the final arbiter if a concurrent insert wins the race.
    pub async fn add_movie(&self, candidate: &MovieCandidate) -> AppResult<movie::Model> {
        match self.movie_exists(candidate).await? {
            MovieMatch::Absent => {}
            MovieMatch::Exact(m) | MovieMatch::Conflicting(m) => {
                return Err(AppError::conflict(format!(
                    "movie \"{}\" by {} already exists (id {})",
                    m.name, m.director, m.id
                )));
            }
        }

        let model = movie::ActiveModel {
            id: NotSet,
            name: Set(candidate.name.clone()),
            year: Set(candidate.year),
            rating: Set(candidate.rating),
            director: Set(candidate.director.clone()),
        };
        let inserted = match movie::Entity::insert(model).exec(&self.db).await {
            Ok(res) => res,
            Err(err) if is_unique_violation(&err) => {
                warn!(%err, name = %candidate.name, "movie insert lost race to duplicate");
                return Err(AppError::conflict(format!(
                    "movie \"{}\" by {} already exists",
                    candidate.name, candidate.director
                )));
            }
            Err(err) => return Err(err.into()),
        };

        movie::Entity::find_by_id(inserted.last_insert_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("inserted movie not found".to_string()))
    }

    /// Attaches a movie to a user's favorites. Preconditions are checked in
    /// order: user exists, movie exists, pair not already present. Nothing
    /// is written unless all three hold.
    pub async fn add_favorite(&self, user_id: i32, movie_id: i32) -> AppResult<()> {
        self.get_user(user_id).await?;
        self.get_movie(movie_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("movie {movie_id} not found")))?;

        let pair = user_favorite::Entity::find_by_id((user_id, movie_id)).one(&self.db).await?;
        if pair.is_some() {
            return Err(AppError::conflict("movie is already in this user's favorites"));
        }

        let model =
            user_favorite::ActiveModel { user_id: Set(user_id), movie_id: Set(movie_id) };
        match user_favorite::Entity::insert(model).exec(&self.db).await {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                warn!(%err, user_id, movie_id, "favorite insert lost race to duplicate");
                Err(AppError::conflict("movie is already in this user's favorites"))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Updates a movie in place. Refused when the new (name, director) key
    /// already belongs to a different row; updating a row onto its own key
    /// is allowed.
    pub async fn update_movie(&self, updated: &movie::Model) -> AppResult<()> {
        let holder = movie::Entity::find()
            .filter(movie::Column::Name.eq(&updated.name))
            .filter(movie::Column::Director.eq(&updated.director))
            .one(&self.db)
            .await?;
        if let Some(holder) = holder
            && holder.id != updated.id
        {
            return Err(AppError::conflict(format!(
                "another movie (id {}) already has name \"{}\" and director {}",
                holder.id, holder.name, holder.director
            )));
        }

        let model = movie::ActiveModel {
            id: NotSet,
            name: Set(updated.name.clone()),
            year: Set(updated.year),
            rating: Set(updated.rating),
            director: Set(updated.director.clone()),
        };
        let res = movie::Entity::update_many()
            .set(model)
            .filter(movie::Column::Id.eq(updated.id))
            .exec(&self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(AppError::not_found(format!("movie {} not found", updated.id)));
        }
        Ok(())
    }

    /// Deletes a user and, in the same transaction, every favorite row that
    /// references them.
    pub async fn delete_user(&self, user_id: i32) -> AppResult<()> {
        let txn = self.db.begin().await?;

        let res = user::Entity::delete_by_id(user_id).exec(&txn).await?;
        if res.rows_affected == 0 {
            txn.rollback().await?;
            return Err(AppError::not_found(format!("user {user_id} not found")));
        }
        user_favorite::Entity::delete_many()
            .filter(user_favorite::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    /// Deletes a movie and any favorite rows referencing it.
    pub async fn delete_movie(&self, movie_id: i32) -> AppResult<()> {
        let txn = self.db.begin().await?;

        let res = movie::Entity::delete_by_id(movie_id).exec(&txn).await?;
        if res.rows_affected == 0 {
            txn.rollback().await?;
            return Err(AppError::not_found(format!("movie {movie_id} not found")));
        }
        user_favorite::Entity::delete_many()
            .filter(user_favorite::Column::MovieId.eq(movie_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    /// Removes one movie from one user's favorites; the user and movie rows
    /// themselves are untouched.
    pub async fn delete_favorite(&self, user_id: i32, movie_id: i32) -> AppResult<()> {
        let res = user_favorite::Entity::delete_by_id((user_id, movie_id))
            .exec(&self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(AppError::not_found("movie is not in this user's favorites".to_string()));
        }
        Ok(())
    }
}

// Stored ratings round-trip through SQLite REAL; compare with a tolerance
// rather than bit equality.
fn rating_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    err.to_string().contains("UNIQUE constraint failed")
}

#[cfg(test)]
mod tests {
    use sea_orm::{ConnectOptions, Database, EntityTrait, PaginatorTrait};

    use super::*;
    use crate::entities::{movie, user, user_favorite};
    use crate::models::{MovieCandidate, MovieMatch};

    // Single-connection pool so every pooled call sees the same in-memory
    // database.
    async fn memory_store() -> MovieStore {
        let mut opts = ConnectOptions::new("sqlite::memory:".to_owned());
        opts.max_connections(1).sqlx_logging(false);
        let db = Database::connect(opts).await.unwrap();
        crate::db::migrate(&db).await.unwrap();
        MovieStore::new(db)
    }

    fn titanic() -> MovieCandidate {
        MovieCandidate {
            name: "Titanic".to_string(),
            year: 1997,
            rating: 7.8,
            director: "James Cameron".to_string(),
        }
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let store = memory_store().await;
        assert!(store.list_users().await.unwrap().is_empty());
        assert!(store.list_movies().await.unwrap().is_empty());
        assert!(store.get_movie(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn added_movie_is_an_exact_match() {
        let store = memory_store().await;
        let candidate = titanic();

        let added = store.add_movie(&candidate).await.unwrap();
        assert_eq!(added.name, "Titanic");
        assert_eq!(added.year, 1997);
        assert_eq!(added.director, "James Cameron");

        match store.movie_exists(&candidate).await.unwrap() {
            MovieMatch::Exact(m) => assert_eq!(m, added),
            other => panic!("expected exact match, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn conflicting_match_carries_stored_values() {
        let store = memory_store().await;
        let stored = store.add_movie(&titanic()).await.unwrap();

        let mut candidate = titanic();
        candidate.year = 1998;
        candidate.rating = 9.1;

        match store.movie_exists(&candidate).await.unwrap() {
            MovieMatch::Conflicting(m) => {
                assert_eq!(m.year, stored.year);
                assert!(rating_eq(m.rating, stored.rating));
                assert_eq!(m.id, stored.id);
            }
            other => panic!("expected conflicting match, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn add_movie_refuses_any_name_director_match() {
        let store = memory_store().await;
        store.add_movie(&titanic()).await.unwrap();

        // Same key, different year/rating: still refused.
        let mut conflicting = titanic();
        conflicting.year = 2005;
        let err = store.add_movie(&conflicting).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let count = movie::Entity::find().count(store.db()).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn duplicate_user_name_is_a_conflict() {
        let store = memory_store().await;
        store.add_user("Alice").await.unwrap();
        let err = store.add_user("Alice").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = store.add_user("   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn add_favorite_is_idempotent_in_effect() {
        let store = memory_store().await;
        let alice = store.add_user("Alice").await.unwrap();
        let movie = store.add_movie(&titanic()).await.unwrap();

        store.add_favorite(alice.id, movie.id).await.unwrap();
        let err = store.add_favorite(alice.id, movie.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        assert_eq!(store.list_favorites(alice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn add_favorite_requires_both_rows() {
        let store = memory_store().await;
        let alice = store.add_user("Alice").await.unwrap();
        let movie = store.add_movie(&titanic()).await.unwrap();

        let err = store.add_favorite(999, movie.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = store.add_favorite(alice.id, 999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let count = user_favorite::Entity::find().count(store.db()).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn update_refused_when_key_taken_by_other_movie() {
        let store = memory_store().await;
        let first = store.add_movie(&titanic()).await.unwrap();
        let second = store
            .add_movie(&MovieCandidate {
                name: "Avatar".to_string(),
                year: 2009,
                rating: 7.9,
                director: "James Cameron".to_string(),
            })
            .await
            .unwrap();

        // Renaming Avatar onto Titanic's key collides with a different id.
        let mut moved = second.clone();
        moved.name = "Titanic".to_string();
        let err = store.update_movie(&moved).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Updating a row onto its own key is allowed.
        let mut rerated = first.clone();
        rerated.rating = 8.0;
        store.update_movie(&rerated).await.unwrap();
        let fetched = store.get_movie(first.id).await.unwrap().unwrap();
        assert!(rating_eq(fetched.rating, 8.0));

        // Moving to a genuinely free key is allowed too.
        let mut renamed = second.clone();
        renamed.name = "Avatar 2".to_string();
        store.update_movie(&renamed).await.unwrap();
    }

    #[tokio::test]
    async fn update_of_missing_movie_is_not_found() {
        let store = memory_store().await;
        let ghost = movie::Model {
            id: 42,
            name: "Ghost".to_string(),
            year: 1990,
            rating: 7.0,
            director: "Jerry Zucker".to_string(),
        };
        let err = store.update_movie(&ghost).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn deleting_missing_rows_fails_without_side_effects() {
        let store = memory_store().await;
        store.add_user("Alice").await.unwrap();
        store.add_movie(&titanic()).await.unwrap();

        assert!(matches!(store.delete_user(999).await.unwrap_err(), AppError::NotFound(_)));
        assert!(matches!(store.delete_movie(999).await.unwrap_err(), AppError::NotFound(_)));
        assert!(matches!(
            store.delete_favorite(999, 999).await.unwrap_err(),
            AppError::NotFound(_)
        ));

        assert_eq!(user::Entity::find().count(store.db()).await.unwrap(), 1);
        assert_eq!(movie::Entity::find().count(store.db()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn deleting_user_cascades_their_favorites() {
        let store = memory_store().await;
        let alice = store.add_user("Alice").await.unwrap();
        let bob = store.add_user("Bob").await.unwrap();
        let movie = store.add_movie(&titanic()).await.unwrap();
        store.add_favorite(alice.id, movie.id).await.unwrap();
        store.add_favorite(bob.id, movie.id).await.unwrap();

        store.delete_user(alice.id).await.unwrap();

        assert_eq!(user_favorite::Entity::find().count(store.db()).await.unwrap(), 1);
        // The movie itself and Bob's favorite survive.
        assert!(store.get_movie(movie.id).await.unwrap().is_some());
        assert_eq!(store.list_favorites(bob.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_movie_cascades_referencing_favorites() {
        let store = memory_store().await;
        let alice = store.add_user("Alice").await.unwrap();
        let movie = store.add_movie(&titanic()).await.unwrap();
        store.add_favorite(alice.id, movie.id).await.unwrap();

        store.delete_movie(movie.id).await.unwrap();

        assert_eq!(user_favorite::Entity::find().count(store.db()).await.unwrap(), 0);
        assert!(store.list_favorites(alice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_favorite_leaves_user_and_movie() {
        let store = memory_store().await;
        let alice = store.add_user("Alice").await.unwrap();
        let movie = store.add_movie(&titanic()).await.unwrap();
        store.add_favorite(alice.id, movie.id).await.unwrap();

        store.delete_favorite(alice.id, movie.id).await.unwrap();

        assert!(store.list_favorites(alice.id).await.unwrap().is_empty());
        assert!(store.get_movie(movie.id).await.unwrap().is_some());
        store.get_user(alice.id).await.unwrap();
    }

    #[tokio::test]
    async fn favorites_of_missing_user_are_not_found() {
        let store = memory_store().await;
        let err = store.list_favorites(7).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn alice_titanic_scenario() {
        let store = memory_store().await;

        let alice = store.add_user("Alice").await.unwrap();
        let titanic = store.add_movie(&titanic()).await.unwrap();
        store.add_favorite(alice.id, titanic.id).await.unwrap();

        let favorites = store.list_favorites(alice.id).await.unwrap();
        assert_eq!(favorites.len(), 1);
        let details = &favorites["Titanic"];
        assert_eq!(details.year, 1997);
        assert!(rating_eq(details.rating, 7.8));
        assert_eq!(details.director, "James Cameron");
        assert_eq!(details.id, titanic.id);
    }
}
