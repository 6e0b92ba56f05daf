use axum::http::StatusCode;
use maud::{DOCTYPE, Markup, html};

use crate::{
    admin::DashboardStats,
    catalog::{CatalogFilter, MoviePage},
    entities::{category, movie},
    models::{CategoryForm, FieldErrors, MovieForm},
};

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";
const SEARCH_POSTER_BASE: &str = "https://image.tmdb.org/t/p/w200";

const INPUT: &str = "mt-1 w-full rounded-md border border-gray-600 bg-gray-800 px-3 py-2 text-white focus:border-yellow-500 focus:outline-none";
const BUTTON: &str = "rounded-md bg-yellow-500 px-4 py-2 font-semibold text-gray-900 hover:bg-yellow-400";

pub fn index_page(
    filter: &CatalogFilter,
    categories: &[category::Model],
    page: &MoviePage,
) -> String {
    let page_count = page.page_count();

    site_page(
        "Movies",
        categories,
        html! {
            main class="container mx-auto px-4 py-8" {
                form class="mx-auto flex max-w-2xl gap-2" method="get" action="/" {
                    input class=(INPUT) type="search" name="search" placeholder="Search movies..." value=[filter.search.as_deref()];
                    @if let Some(genre) = &filter.genre {
                        input type="hidden" name="genre" value=(genre);
                    }
                    @if let Some(year) = filter.year {
                        input type="hidden" name="year" value=(year);
                    }
                    @if filter.featured {
                        input type="hidden" name="featured" value="1";
                    }
                    button class=(BUTTON) type="submit" { "Search" }
                }

                div class="mt-6 flex flex-wrap justify-center gap-2" {
                    (badge("All", &filter.with_genre(None).href(), filter.genre.is_none()))
                    @for c in categories {
                        (badge(&c.name, &filter.with_genre(Some(&c.slug)).href(), filter.genre.as_deref() == Some(c.slug.as_str())))
                    }
                    (badge("Featured", &filter.with_featured(!filter.featured).href(), filter.featured))
                }

                div class="mt-12" {
                    @if page.movies.is_empty() {
                        div class="py-20 text-center" {
                            p class="text-2xl text-gray-400" { "No movies found" }
                        }
                    } @else {
                        div class="grid grid-cols-2 gap-6 md:grid-cols-3 lg:grid-cols-4 xl:grid-cols-5" {
                            @for m in &page.movies {
                                (movie_card(m))
                            }
                        }
                        @if page_count > 1 {
                            nav class="mt-12 flex justify-center gap-1" {
                                @if filter.page > 1 {
                                    a class="rounded px-3 py-1 hover:bg-gray-700" href=(filter.with_page(filter.page - 1).href()) { "Previous" }
                                }
                                @for n in 1..=page_count {
                                    @let class = if n == filter.page { "rounded bg-gray-700 px-3 py-1" } else { "rounded px-3 py-1 hover:bg-gray-700" };
                                    a class=(class) href=(filter.with_page(n).href()) { (n) }
                                }
                                @if filter.page < page_count {
                                    a class="rounded px-3 py-1 hover:bg-gray-700" href=(filter.with_page(filter.page + 1).href()) { "Next" }
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn movie_page(
    m: &movie::Model,
    category: Option<&category::Model>,
    categories: &[category::Model],
) -> String {
    site_page(
        &m.title,
        categories,
        html! {
            div class="relative h-[60vh] overflow-hidden" {
                @if let Some(banner) = &m.banner_url {
                    img class="h-full w-full object-cover" src=(banner) alt=(m.title);
                }
                div class="absolute inset-0 bg-gradient-to-t from-gray-900 via-gray-900/60 to-transparent" {}
                a class="absolute left-4 top-4 rounded px-3 py-1 text-white hover:bg-white/20" href="/" { "← Back" }
            }
            div class="container relative z-10 mx-auto -mt-32 px-4" {
                div class="flex flex-col gap-8 md:flex-row" {
                    @if let Some(poster) = &m.poster_url {
                        img class="h-96 w-64 flex-shrink-0 rounded-lg border-2 border-gray-700 object-cover shadow-2xl" src=(poster) alt=(m.title);
                    }
                    div class="flex-1 space-y-6" {
                        div {
                            h1 class="mb-2 text-4xl font-bold md:text-5xl" { (m.title) }
                            @if let Some(c) = category {
                                a class="rounded-full bg-gray-700 px-3 py-1 text-sm" href=(CatalogFilter::default().with_genre(Some(&c.slug)).href()) { (c.name) }
                            }
                        }
                        div class="flex flex-wrap gap-4 text-gray-400" {
                            @if let Some(year) = m.year { span { "📅 " (year) } }
                            @if let Some(duration) = m.duration { span { "⏱ " (duration) " min" } }
                            @if let Some(rating) = m.rating { span { "★ " (rating) "/10" } }
                        }
                        @if let Some(description) = &m.description {
                            div {
                                h2 class="mb-2 text-xl font-semibold" { "Overview" }
                                p class="leading-relaxed text-gray-400" { (description) }
                            }
                        }
                        div class="flex flex-wrap gap-4" {
                            @if let Some(trailer) = &m.trailer_url {
                                a class=(BUTTON) href=(trailer) target="_blank" rel="noopener noreferrer" { "▶ Watch Trailer" }
                            }
                            @if let Some(download) = &m.download_url {
                                a class="rounded-md border border-gray-500 px-4 py-2 hover:bg-gray-800" href=(download) target="_blank" rel="noopener noreferrer" { "Download" }
                            }
                        }
                    }
                }
            }
            div class="h-32" {}
        },
    )
}

pub fn about_page(categories: &[category::Model]) -> String {
    site_page(
        "About Us",
        categories,
        html! {
            main class="container mx-auto max-w-3xl space-y-4 px-4 py-8" {
                h1 class="text-4xl font-bold" { "About Us" }
                p class="text-lg text-gray-300" {
                    "Welcome to Marquee, your destination for everything related to movies. "
                    "We are a small team of film enthusiasts collecting the latest releases "
                    "and the classics worth revisiting."
                }
                p class="text-lg text-gray-300" {
                    "Browse by category, search by title, or jump straight to the featured "
                    "picks. Whether you are after blockbuster hits or indie gems, there is "
                    "something here for you."
                }
            }
        },
    )
}

/// Contact form; there is no mail backend, so the form only reloads the page.
pub fn contact_page(categories: &[category::Model]) -> String {
    site_page(
        "Contact Us",
        categories,
        html! {
            main class="container mx-auto max-w-3xl px-4 py-8" {
                h1 class="mb-4 text-4xl font-bold" { "Contact Us" }
                p class="text-lg text-gray-300" {
                    "We'd love to hear from you. Questions, feedback and suggestions are all welcome."
                }
                form class="mt-8 space-y-4" method="get" action="/contact-us" {
                    div {
                        label class="block text-sm" for="name" { "Name" }
                        input class=(INPUT) id="name" name="name" type="text";
                    }
                    div {
                        label class="block text-sm" for="email" { "Email" }
                        input class=(INPUT) id="email" name="email" type="email";
                    }
                    div {
                        label class="block text-sm" for="message" { "Message" }
                        textarea class=(INPUT) id="message" name="message" rows="5" {}
                    }
                    button class=(BUTTON) type="submit" { "Submit" }
                }
            }
        },
    )
}

pub fn error_page(status: StatusCode, message: String) -> String {
    page(
        "Error",
        html! {
            div class="flex min-h-screen items-center justify-center" {
                div class="w-full max-w-xl px-6" {
                    div class="rounded-lg bg-gray-800 p-8 shadow" {
                        h1 class="text-2xl font-bold" { (status.canonical_reason().unwrap_or("Error")) }
                        p class="mt-4 text-gray-300" { (message) }
                        a class="mt-6 inline-block text-yellow-400 hover:text-yellow-300" href="/" { "Back" }
                    }
                }
            }
        },
    )
}

pub fn login_page(error: Option<&str>) -> String {
    page(
        "Admin login",
        html! {
            div class="flex min-h-screen items-center justify-center" {
                form class="w-full max-w-sm space-y-4 rounded-lg bg-gray-800 p-8 shadow" method="post" action="/admin/login" {
                    h1 class="text-2xl font-bold" { "Admin login" }
                    @if let Some(error) = error {
                        p class="text-sm text-red-400" { (error) }
                    }
                    label class="block text-sm" { "Username" input class=(INPUT) name="username" required; }
                    label class="block text-sm" { "Password" input class=(INPUT) type="password" name="password" required; }
                    button class={ (BUTTON) " w-full" } type="submit" { "Sign in" }
                }
            }
        },
    )
}

pub fn dashboard_page(stats: &DashboardStats) -> String {
    admin_page(
        "Dashboard",
        None,
        html! {
            div class="grid gap-6 md:grid-cols-3" {
                (stat_card("Total Movies", stats.movies.to_string(), "border-blue-400"))
                (stat_card("Categories", stats.categories.to_string(), "border-purple-400"))
                (stat_card("Total Views", stats.views.to_string(), "border-green-400"))
            }
        },
    )
}

pub fn admin_movies_page(
    rows: &[(movie::Model, Option<category::Model>)],
    notice: Option<&str>,
) -> String {
    admin_page(
        "Movies",
        notice,
        html! {
            div class="mb-4 flex justify-end gap-2" {
                a class=(BUTTON) href="/admin/import" { "Import from TMDB" }
                a class=(BUTTON) href="/admin/movies/new" { "Add Movie" }
            }
            table class="w-full text-left text-sm" {
                thead class="border-b border-gray-700 text-gray-400" {
                    tr { th class="py-2" { "Title" } th { "Category" } th { "Year" } th { "Rating" } th { "Views" } th { "Added" } th {} }
                }
                tbody {
                    @for (m, c) in rows {
                        tr class="border-b border-gray-800" {
                            td class="py-2 font-medium" { a class="hover:underline" href=(format!("/movies/{}", m.id)) { (m.title) } }
                            td { (c.as_ref().map(|c| c.name.as_str()).unwrap_or("—")) }
                            td { (optional(m.year)) }
                            td { (optional(m.rating)) }
                            td { (m.views) }
                            td { (format_timestamp(m.created_at)) }
                            td class="text-right" {
                                a class="mr-3 text-yellow-400" href=(format!("/admin/movies/{}/edit", m.id)) { "Edit" }
                                (delete_button(&format!("/admin/movies/{}/delete", m.id), "Delete this movie?"))
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn movie_form_page(
    action: &str,
    form: &MovieForm,
    errors: &FieldErrors,
    categories: &[category::Model],
    editing: bool,
) -> String {
    let title = if editing { "Edit Movie" } else { "Add New Movie" };

    admin_page(
        title,
        None,
        html! {
            form class="max-w-2xl space-y-6" method="post" action=(action) {
                (field("Title", "title", &form.title, errors))
                div {
                    label class="block text-sm" for="description" { "Description" }
                    textarea class=(INPUT) id="description" name="description" rows="4" { (form.description) }
                    (field_error(errors, "description"))
                }
                div class="grid gap-6 md:grid-cols-2" {
                    (field("Poster URL", "poster_url", &form.poster_url, errors))
                    (field("Banner URL", "banner_url", &form.banner_url, errors))
                    (field("Trailer URL", "trailer_url", &form.trailer_url, errors))
                    (field("Download URL", "download_url", &form.download_url, errors))
                }
                div class="grid gap-6 md:grid-cols-3" {
                    (field("Year", "year", &form.year, errors))
                    (field("Rating (e.g. 7.5)", "rating", &form.rating, errors))
                    (field("Duration (minutes)", "duration", &form.duration, errors))
                }
                div {
                    label class="block text-sm" for="category_id" { "Category" }
                    select class=(INPUT) id="category_id" name="category_id" {
                        option value="" { "No category" }
                        @for c in categories {
                            @let id = c.id.to_string();
                            option value=(id) selected[form.category_id == id] { (c.name) }
                        }
                    }
                    (field_error(errors, "category_id"))
                }
                div class="flex gap-2" {
                    a class="rounded-md border border-gray-600 px-4 py-2" href="/admin/movies" { "Cancel" }
                    button class=(BUTTON) type="submit" { @if editing { "Update" } @else { "Add Movie" } }
                }
            }
        },
    )
}

pub fn admin_categories_page(
    categories: &[category::Model],
    form: &CategoryForm,
    errors: &FieldErrors,
    editing: Option<i32>,
    notice: Option<&str>,
) -> String {
    let action = match editing {
        Some(id) => format!("/admin/categories/{id}"),
        None => "/admin/categories".to_string(),
    };

    admin_page(
        "Categories",
        notice,
        html! {
            form class="mb-8 flex max-w-2xl flex-wrap items-end gap-4" method="post" action=(action) {
                div class="flex-1" { (field("Name", "name", &form.name, errors)) }
                div class="flex-1" {
                    (field("Slug (derived from name when blank)", "slug", &form.slug, errors))
                }
                button class=(BUTTON) type="submit" { @if editing.is_some() { "Update" } @else { "Add Category" } }
                @if editing.is_some() {
                    a class="rounded-md border border-gray-600 px-4 py-2" href="/admin/categories" { "Cancel" }
                }
            }
            table class="w-full text-left text-sm" {
                thead class="border-b border-gray-700 text-gray-400" {
                    tr { th class="py-2" { "Name" } th { "Slug" } th {} }
                }
                tbody {
                    @for c in categories {
                        tr class="border-b border-gray-800" {
                            td class="py-2 font-medium" { (c.name) }
                            td { (c.slug) }
                            td class="text-right" {
                                a class="mr-3 text-yellow-400" href=(format!("/admin/categories/{}/edit", c.id)) { "Edit" }
                                (delete_button(&format!("/admin/categories/{}/delete", c.id), "Delete this category?"))
                            }
                        }
                    }
                }
            }
        },
    )
}

/// Import page; `results` is the provider search payload, rendered as-is.
pub fn import_page(
    query: Option<&str>,
    results: Option<&serde_json::Value>,
    categories: &[category::Model],
    notice: Option<&str>,
) -> String {
    let hits = results
        .and_then(|r| r.get("results"))
        .and_then(serde_json::Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    admin_page(
        "Import from TMDB",
        notice,
        html! {
            form class="mb-8 flex max-w-2xl gap-2" method="get" action="/admin/import" {
                input class=(INPUT) type="search" name="q" placeholder="Search TMDB..." value=[query] required;
                button class=(BUTTON) type="submit" { "Search" }
            }
            @if results.is_some() && hits.is_empty() {
                p class="text-gray-400" { "No results" }
            }
            div class="grid gap-4 md:grid-cols-2" {
                @for hit in hits {
                    @let id = hit.get("id").and_then(serde_json::Value::as_i64);
                    @let title = hit.get("title").and_then(serde_json::Value::as_str).unwrap_or("Untitled");
                    @if let Some(id) = id {
                        div class="flex gap-4 rounded-lg border border-gray-700 p-4" {
                            @if let Some(poster) = hit.get("poster_path").and_then(serde_json::Value::as_str) {
                                img class="h-36 w-24 rounded object-cover" src=(format!("{SEARCH_POSTER_BASE}{poster}")) alt=(title);
                            }
                            div class="flex-1 space-y-2" {
                                h3 class="font-semibold" { (title) }
                                p class="text-xs text-gray-400" {
                                    (hit.get("release_date").and_then(serde_json::Value::as_str).unwrap_or(""))
                                    @if let Some(vote) = hit.get("vote_average").and_then(serde_json::Value::as_f64) {
                                        " · ★ " (vote)
                                    }
                                }
                                p class="line-clamp-3 text-sm text-gray-300" {
                                    (hit.get("overview").and_then(serde_json::Value::as_str).unwrap_or(""))
                                }
                                form class="flex gap-2" method="post" action="/admin/import" {
                                    input type="hidden" name="movie_id" value=(id);
                                    select class="rounded-md border border-gray-600 bg-gray-800 px-2 py-1 text-sm" name="category_id" {
                                        option value="" { "No category" }
                                        @for c in categories {
                                            option value=(c.id) { (c.name) }
                                        }
                                    }
                                    button class=(BUTTON) type="submit" { "Import" }
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}

fn page(title: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " · Marquee" }
                script src=(TAILWIND_CDN) {}
            }
            body class="min-h-screen bg-gray-900 text-white" { (body) }
        }
    }
    .into_string()
}

fn site_page(title: &str, categories: &[category::Model], body: Markup) -> String {
    page(
        title,
        html! {
            nav class="border-b border-gray-800 bg-gray-900/95" {
                div class="container mx-auto flex items-center gap-6 px-4 py-4" {
                    a class="text-2xl font-bold text-yellow-500" href="/" { "Marquee" }
                    div class="hidden gap-4 text-sm text-gray-300 md:flex" {
                        @for c in categories.iter().take(6) {
                            a class="hover:text-white" href=(CatalogFilter::default().with_genre(Some(&c.slug)).href()) { (c.name) }
                        }
                    }
                    div class="ml-auto flex gap-4 text-sm text-gray-300" {
                        a class="hover:text-white" href="/about-us" { "About Us" }
                        a class="hover:text-white" href="/contact-us" { "Contact Us" }
                    }
                }
            }
            (body)
        },
    )
}

fn admin_page(title: &str, notice: Option<&str>, body: Markup) -> String {
    page(
        title,
        html! {
            div class="flex min-h-screen" {
                aside class="w-56 border-r border-gray-800 bg-gray-950 p-4" {
                    a class="block text-xl font-bold text-yellow-500" href="/admin" { "Marquee admin" }
                    nav class="mt-6 space-y-1 text-sm" {
                        @for (label, href) in [
                            ("Dashboard", "/admin"),
                            ("Movies", "/admin/movies"),
                            ("Add Movie", "/admin/movies/new"),
                            ("Categories", "/admin/categories"),
                            ("Import", "/admin/import"),
                            ("View site", "/"),
                        ] {
                            a class="block rounded px-3 py-2 hover:bg-gray-800" href=(href) { (label) }
                        }
                    }
                    form class="mt-6" method="post" action="/admin/logout" {
                        button class="px-3 text-sm text-gray-400 hover:text-white" type="submit" { "Sign out" }
                    }
                }
                main class="flex-1 p-8" {
                    h1 class="mb-6 text-3xl font-bold" { (title) }
                    @if let Some(notice) = notice {
                        div class="mb-6 rounded-md border border-green-700 bg-green-900/40 px-4 py-2 text-green-200" { (notice) }
                    }
                    (body)
                }
            }
        },
    )
}

fn movie_card(m: &movie::Model) -> Markup {
    html! {
        a class="group block" href=(format!("/movies/{}", m.id)) {
            div class="aspect-[2/3] overflow-hidden rounded-lg bg-gray-800" {
                @if let Some(poster) = &m.poster_url {
                    img class="h-full w-full object-cover transition group-hover:scale-105" src=(poster) alt=(m.title) loading="lazy";
                }
            }
            h3 class="mt-2 truncate font-semibold" { (m.title) }
            p class="text-sm text-gray-400" {
                (optional(m.year))
                @if let Some(rating) = m.rating { " · ★ " (rating) }
            }
        }
    }
}

fn badge(label: &str, href: &str, active: bool) -> Markup {
    let class = if active {
        "rounded-full bg-yellow-500 px-4 py-2 text-sm text-gray-900"
    } else {
        "rounded-full border border-gray-600 px-4 py-2 text-sm hover:bg-gray-800"
    };
    html! { a class=(class) href=(href) { (label) } }
}

fn stat_card(label: &str, value: String, border: &str) -> Markup {
    html! {
        div class=(format!("rounded-lg border-t-4 {border} bg-gray-800/50 p-6")) {
            p class="text-sm text-gray-400" { (label) }
            p class="mt-2 text-3xl font-bold" { (value) }
        }
    }
}

fn field(label: &str, name: &str, value: &str, errors: &FieldErrors) -> Markup {
    html! {
        div {
            label class="block text-sm" for=(name) { (label) }
            input class=(INPUT) id=(name) name=(name) value=(value);
            (field_error(errors, name))
        }
    }
}

fn field_error(errors: &FieldErrors, name: &str) -> Markup {
    html! {
        @if let Some(message) = errors.get(name) {
            p class="mt-1 text-sm text-red-400" { (message) }
        }
    }
}

fn delete_button(action: &str, confirm: &str) -> Markup {
    html! {
        form class="inline" method="post" action=(action) onsubmit=(format!("return confirm('{confirm}')")) {
            button class="text-red-400 hover:text-red-300" type="submit" { "Delete" }
        }
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "—".to_string())
}

fn format_timestamp(secs: i64) -> String {
    jiff::Timestamp::from_second(secs)
        .map(|ts| ts.strftime("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
