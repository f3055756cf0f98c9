use std::collections::BTreeMap;

use maud::{DOCTYPE, Markup, html};

use crate::{
    entities::{movie, user},
    models::MovieDetails,
};

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";

pub fn home_page() -> String {
    page(
        "MovieWeb",
        html! {
            div class="min-h-screen bg-gray-50" {
                div class="max-w-2xl mx-auto px-6 py-12" {
                    div class="bg-white shadow rounded-lg p-8" {
                        h1 class="text-3xl font-bold text-gray-900" { "Welcome to MovieWeb App!" }
                        p class="mt-2 text-gray-600" { "Keep personal lists of your favorite movies." }
                        div class="mt-8 flex gap-4" {
                            a class="rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700" href="/users" { "Browse users" }
                            a class="rounded-md border border-gray-300 px-4 py-2 font-semibold text-gray-700 hover:bg-gray-100" href="/add_user" { "Add a user" }
                        }
                    }
                }
            }
        },
    )
}

pub fn users_page(users: &[user::Model]) -> String {
    page(
        "Users",
        html! {
            div class="min-h-screen bg-gray-50" {
                div class="max-w-2xl mx-auto px-6 py-12" {
                    div class="bg-white shadow rounded-lg p-8" {
                        div class="flex items-start justify-between" {
                            h1 class="text-3xl font-bold text-gray-900" { "Users" }
                            a class="text-sm text-blue-600 hover:text-blue-800" href="/add_user" { "Add user" }
                        }
                        @if users.is_empty() {
                            p class="mt-6 text-gray-600" { "No users yet." }
                        } @else {
                            ul class="mt-6 divide-y divide-gray-200" {
                                @for user in users {
                                    li class="py-3" {
                                        a class="text-blue-600 hover:text-blue-800" href=(format!("/users/{}", user.id)) { (user.name) }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn user_movies_page(user: &user::Model, movies: &BTreeMap<String, MovieDetails>) -> String {
    page(
        &format!("{}'s movies", user.name),
        html! {
            div class="min-h-screen bg-gray-50" {
                div class="max-w-3xl mx-auto px-6 py-12" {
                    div class="bg-white shadow rounded-lg p-8" {
                        div class="flex items-start justify-between gap-6" {
                            div {
                                h1 class="text-3xl font-bold text-gray-900" { (user.name) "'s favorite movies" }
                                a class="mt-2 inline-block text-sm text-blue-600 hover:text-blue-800" href="/users" { "All users" }
                            }
                            a class="rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700" href=(format!("/users/{}/add_movie", user.id)) { "Add movie" }
                        }

                        @if movies.is_empty() {
                            p class="mt-6 text-gray-600" { "No favorite movies yet." }
                        } @else {
                            div class="mt-6 space-y-4" {
                                @for (name, details) in movies {
                                    (movie_card(user.id, name, details))
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}

fn movie_card(user_id: i32, name: &str, details: &MovieDetails) -> Markup {
    html! {
        div class="rounded-lg border border-gray-200 p-4" {
            div class="flex items-start justify-between gap-4" {
                div {
                    h2 class="text-lg font-semibold text-gray-900" { (name) " (" (details.year) ")" }
                    p class="text-sm text-gray-600" { "Directed by " (details.director) " · rated " (details.rating) }
                }
                div class="flex gap-3 text-sm" {
                    a class="text-blue-600 hover:text-blue-800" href=(format!("/users/{}/update_movie/{}", user_id, details.id)) { "Edit" }
                    a class="text-red-600 hover:text-red-800" href=(format!("/users/{}/delete_movie/{}", user_id, details.id)) { "Remove" }
                }
            }
        }
    }
}

pub fn add_user_page() -> String {
    page(
        "Add user",
        html! {
            div class="min-h-screen bg-gray-50" {
                div class="max-w-xl mx-auto px-6 py-12" {
                    div class="bg-white shadow rounded-lg p-8" {
                        h1 class="text-2xl font-bold text-gray-900" { "Add a user" }
                        form class="mt-6 space-y-6" method="post" action="/add_user" {
                            div {
                                label class="block text-sm font-medium text-gray-700" for="name" { "Name" }
                                input class=(INPUT_CLASS) name="name" id="name" required;
                            }
                            button class=(BUTTON_CLASS) type="submit" { "Add user" }
                        }
                    }
                }
            }
        },
    )
}

pub fn add_movie_page(user: &user::Model) -> String {
    page(
        "Add movie",
        html! {
            div class="min-h-screen bg-gray-50" {
                div class="max-w-xl mx-auto px-6 py-12" {
                    div class="bg-white shadow rounded-lg p-8" {
                        h1 class="text-2xl font-bold text-gray-900" { "Add a movie for " (user.name) }
                        p class="mt-2 text-sm text-gray-500" { "Year and rating are filled in from the movie information service." }
                        form class="mt-6 space-y-6" method="post" action=(format!("/users/{}/add_movie", user.id)) {
                            div {
                                label class="block text-sm font-medium text-gray-700" for="title" { "Title" }
                                input class=(INPUT_CLASS) name="title" id="title" required;
                            }
                            div {
                                label class="block text-sm font-medium text-gray-700" for="director" { "Director" }
                                input class=(INPUT_CLASS) name="director" id="director" required;
                            }
                            button class=(BUTTON_CLASS) type="submit" { "Add movie" }
                        }
                    }
                }
            }
        },
    )
}

/// Asks the end user to resolve an exact or conflicting match. The form
/// re-posts the original submission with `existing_id` set, which the
/// handler treats as explicit confirmation to attach the stored movie.
pub fn confirm_movie_page(
    user: &user::Model,
    existing: &movie::Model,
    conflicting: bool,
    submitted_title: &str,
    submitted_director: &str,
) -> String {
    page(
        "Movie already exists",
        html! {
            div class="min-h-screen bg-gray-50" {
                div class="max-w-xl mx-auto px-6 py-12" {
                    div class="bg-white shadow rounded-lg p-8" {
                        @if conflicting {
                            h1 class="text-2xl font-bold text-gray-900" { "Conflicting movie on record" }
                            p class="mt-4 text-gray-700" {
                                "\"" (existing.name) "\" by " (existing.director)
                                " is already stored with year " (existing.year)
                                " and rating " (existing.rating)
                                ", which differs from the details just looked up."
                            }
                        } @else {
                            h1 class="text-2xl font-bold text-gray-900" { "Movie already on record" }
                            p class="mt-4 text-gray-700" {
                                "\"" (existing.name) "\" (" (existing.year) ") by "
                                (existing.director) " is already stored."
                            }
                        }
                        p class="mt-2 text-gray-700" { "Add the stored movie to " (user.name) "'s favorites?" }

                        div class="mt-6 flex gap-4" {
                            form method="post" action=(format!("/users/{}/add_movie", user.id)) {
                                input type="hidden" name="title" value=(submitted_title);
                                input type="hidden" name="director" value=(submitted_director);
                                input type="hidden" name="existing_id" value=(existing.id);
                                button class=(BUTTON_CLASS) type="submit" { "Use stored movie" }
                            }
                            a class="rounded-md border border-gray-300 px-4 py-2 font-semibold text-gray-700 hover:bg-gray-100" href=(format!("/users/{}", user.id)) { "Abandon" }
                        }
                    }
                }
            }
        },
    )
}

pub fn update_movie_page(user_id: i32, movie: &movie::Model) -> String {
    page(
        "Update movie",
        html! {
            div class="min-h-screen bg-gray-50" {
                div class="max-w-xl mx-auto px-6 py-12" {
                    div class="bg-white shadow rounded-lg p-8" {
                        h1 class="text-2xl font-bold text-gray-900" { "Update \"" (movie.name) "\"" }
                        form class="mt-6 space-y-6" method="post" action=(format!("/users/{}/update_movie/{}", user_id, movie.id)) {
                            div {
                                label class="block text-sm font-medium text-gray-700" for="name" { "Title" }
                                input class=(INPUT_CLASS) name="name" id="name" value=(movie.name) required;
                            }
                            div {
                                label class="block text-sm font-medium text-gray-700" for="director" { "Director" }
                                input class=(INPUT_CLASS) name="director" id="director" value=(movie.director) required;
                            }
                            div {
                                label class="block text-sm font-medium text-gray-700" for="year" { "Year" }
                                input class=(INPUT_CLASS) name="year" id="year" type="number" value=(movie.year) required;
                            }
                            div {
                                label class="block text-sm font-medium text-gray-700" for="rating" { "Rating" }
                                input class=(INPUT_CLASS) name="rating" id="rating" type="number" step="0.1" value=(movie.rating) required;
                            }
                            button class=(BUTTON_CLASS) type="submit" { "Save" }
                        }
                    }
                }
            }
        },
    )
}

pub fn error_page(message: String) -> String {
    page(
        "Error",
        html! {
            div class="min-h-screen bg-gray-50 flex items-center justify-center" {
                div class="max-w-xl w-full px-6" {
                    div class="bg-white shadow rounded-lg p-8" {
                        h1 class="text-2xl font-bold text-gray-900" { "Error" }
                        p class="mt-4 text-gray-700" { (message) }
                        a class="mt-6 inline-block text-blue-600 hover:text-blue-800" href="/" { "Back" }
                    }
                }
            }
        },
    )
}

const INPUT_CLASS: &str = "mt-2 w-full rounded-md border border-gray-300 px-3 py-2 focus:border-blue-500 focus:outline-none focus:ring-1 focus:ring-blue-500";
const BUTTON_CLASS: &str =
    "rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700";

fn page(title: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                script src=(TAILWIND_CDN) {}
            }
            body { (body) }
        }
    }
    .into_string()
}
