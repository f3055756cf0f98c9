use std::sync::Arc;

use axum::{
    extract::{Form, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};

use crate::{
    AppState,
    entities::movie,
    error::{AppError, AppResult},
    models::{AddMovieForm, AddUserForm, Reconciliation, UpdateMovieForm},
    reconcile, templates,
};

pub async fn home() -> Html<String> {
    Html(templates::home_page())
}

pub async fn list_users(State(state): State<Arc<AppState>>) -> AppResult<Html<String>> {
    let users = state.store.list_users().await?;
    Ok(Html(templates::users_page(&users)))
}

pub async fn user_movies(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> AppResult<Html<String>> {
    let user = state.store.get_user(user_id).await?;
    let movies = state.store.list_favorites(user_id).await?;
    Ok(Html(templates::user_movies_page(&user, &movies)))
}

pub async fn add_user_form() -> Html<String> {
    Html(templates::add_user_page())
}

pub async fn add_user(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AddUserForm>,
) -> AppResult<Redirect> {
    state.store.add_user(&form.name).await?;
    Ok(Redirect::to("/users"))
}

pub async fn add_movie_form(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> AppResult<Html<String>> {
    let user = state.store.get_user(user_id).await?;
    Ok(Html(templates::add_movie_page(&user)))
}

pub async fn add_movie(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
    Form(form): Form<AddMovieForm>,
) -> AppResult<Response> {
    let user = state.store.get_user(user_id).await?;

    // A re-post with existing_id set is the user's explicit confirmation to
    // attach an already stored movie instead of inserting a new one.
    if let Some(movie_id) = form.existing_id {
        state.store.add_favorite(user_id, movie_id).await?;
        return Ok(Redirect::to(&format!("/users/{user_id}")).into_response());
    }

    let candidate = reconcile::resolve_candidate(&state.omdb, &form.title, &form.director).await?;
    let outcome = reconcile::add_movie_for_user(&state.store, user_id, &candidate).await?;

    Ok(match outcome {
        Reconciliation::Attached(_) => {
            Redirect::to(&format!("/users/{user_id}")).into_response()
        }
        Reconciliation::ExistsExact(existing) => Html(templates::confirm_movie_page(
            &user,
            &existing,
            false,
            &form.title,
            &form.director,
        ))
        .into_response(),
        Reconciliation::ExistsConflicting(existing) => Html(templates::confirm_movie_page(
            &user,
            &existing,
            true,
            &form.title,
            &form.director,
        ))
        .into_response(),
    })
}

pub async fn update_movie_form(
    State(state): State<Arc<AppState>>,
    Path((user_id, movie_id)): Path<(i32, i32)>,
) -> AppResult<Html<String>> {
    state.store.get_user(user_id).await?;
    let movie = state
        .store
        .get_movie(movie_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("movie {movie_id} not found")))?;
    Ok(Html(templates::update_movie_page(user_id, &movie)))
}

pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    Path((user_id, movie_id)): Path<(i32, i32)>,
    Form(form): Form<UpdateMovieForm>,
) -> AppResult<Redirect> {
    state.store.get_user(user_id).await?;

    let updated = movie::Model {
        id: movie_id,
        name: form.name.trim().to_string(),
        year: form.year,
        rating: form.rating,
        director: form.director.trim().to_string(),
    };
    if updated.name.is_empty() || updated.director.is_empty() {
        return Err(AppError::validation("movie name and director are required"));
    }

    state.store.update_movie(&updated).await?;
    Ok(Redirect::to(&format!("/users/{user_id}")))
}

/// Removes the movie from the user's favorites; the movie row itself stays.
pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Path((user_id, movie_id)): Path<(i32, i32)>,
) -> AppResult<Redirect> {
    state.store.delete_favorite(user_id, movie_id).await?;
    Ok(Redirect::to(&format!("/users/{user_id}")))
}
