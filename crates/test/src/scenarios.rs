use bookfinder_api::ApiClient;
use bookfinder_application::{
    AppContext, CATALOG_FAILED, Command, Focus, Now, RECOMMENDATIONS_LOADED,
};
use bookfinder_core::{ToastKind, keys};
use bookfinder_storage::Storage;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::{later, make_book, make_ctx, make_settings, perform, temp_db_path};

fn dune() -> serde_json::Value {
    json!({
        "title": "Dune",
        "author": "Frank Herbert",
        "publisher": "Ace",
        "year": 1965,
        "image_url": "http://covers.example/dune.jpg"
    })
}

async fn run(api: &ApiClient, ctx: &mut AppContext, commands: Vec<Command>, now: Now) {
    let mut queue = commands;
    while let Some(command) = queue.pop() {
        if let Some(event) = perform(api, command).await {
            queue.extend(ctx.apply(event, now));
        }
    }
}

/// Types "dune", waits out the debounce and applies the suggestion response.
async fn type_dune(api: &ApiClient, ctx: &mut AppContext, now: Now) -> anyhow::Result<()> {
    for (i, query) in ["d", "du", "dun", "dune"].iter().enumerate() {
        ctx.on_search_input(query.to_string(), later(now, i as u64 * 50));
    }
    let commands = ctx.tick(later(now, 500));
    assert_eq!(commands.len(), 1, "one suggestion request for the burst");
    run(api, ctx, commands, later(now, 600)).await;
    Ok(())
}

#[tokio::test]
async fn dune_from_keystroke_to_recommendations() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("q", "dune"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "books": [dune()] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/recommend"))
        .and(query_param("book", "Dune"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "input_book": dune(),
            "recommendations": [
                { "title": "Children of Dune", "author": "Frank Herbert", "year": "1976" },
                { "title": "Hyperion", "author": "Dan Simmons", "year": "1989" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::new(&server.uri())?;
    let mut ctx = make_ctx(make_settings(50));
    let now = Now::current();

    type_dune(&api, &mut ctx, now).await?;
    assert!(ctx.search.shows_suggestions());
    let suggestions = ctx.search.suggestions.as_ref().expect("suggestions");
    assert_eq!(suggestions.items().len(), 1);
    assert_eq!(suggestions.items()[0].title, "Dune");

    let commands = ctx.select_suggestion(0, later(now, 1_000));
    assert_eq!(ctx.search.query, "Dune");
    assert!(!ctx.search.shows_suggestions());
    assert_eq!(ctx.history.entries()[0].title, "Dune");
    assert!(ctx.loading);

    run(&api, &mut ctx, commands, later(now, 1_200)).await;
    assert!(!ctx.loading);
    assert!(!ctx.popular_visible);
    let titles: Vec<_> = ctx.grid_books().iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Children of Dune", "Hyperion"]);
    assert_eq!(ctx.selected_book.as_ref().map(|b| b.year.as_str()), Some("1965"));

    let toast = ctx.toasts.latest().expect("toast");
    assert_eq!(toast.kind, ToastKind::Success);
    assert_eq!(toast.message, RECOMMENDATIONS_LOADED);
    assert_eq!(ctx.total_recommendations, 1);
    Ok(())
}

#[tokio::test]
async fn dune_not_found_returns_to_popular() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "books": [dune()] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/recommend"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "not found" })))
        .mount(&server)
        .await;

    let api = ApiClient::new(&server.uri())?;
    let mut ctx = make_ctx(make_settings(50));
    ctx.popular = vec![make_book("Emma", "Jane Austen")];
    let now = Now::current();

    type_dune(&api, &mut ctx, now).await?;
    let commands = ctx.select_suggestion(0, later(now, 1_000));
    run(&api, &mut ctx, commands, later(now, 1_200)).await;

    let toast = ctx.toasts.latest().expect("toast");
    assert_eq!(toast.kind, ToastKind::Error);
    assert_eq!(toast.message, "not found");
    assert!(ctx.popular_visible);
    assert_eq!(ctx.grid_books()[0].title, "Emma");
    assert!(!ctx.loading);
    assert_eq!(ctx.total_recommendations, 0);
    // The selection is still remembered.
    assert_eq!(ctx.history.len(), 1);
    Ok(())
}

#[tokio::test]
async fn startup_loads_catalog_then_popular() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 271379,
            "books": ["Dune", "Emma"]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/popular"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "books": [dune()] })))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::new(&server.uri())?;
    let mut ctx = make_ctx(make_settings(50));
    let now = Now::current();
    let commands = ctx.start();
    run(&api, &mut ctx, commands, now).await;

    assert_eq!(ctx.catalog_total, Some(271_379));
    assert!(ctx.popular_visible);
    assert_eq!(ctx.grid_books().len(), 1);
    assert!(ctx.toasts.is_empty());
    Ok(())
}

#[tokio::test]
async fn unreachable_catalog_leaves_sticky_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/books"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let api = ApiClient::new(&server.uri())?;
    let mut ctx = make_ctx(make_settings(50));
    let now = Now::current();
    let commands = ctx.start();
    run(&api, &mut ctx, commands, now).await;

    ctx.tick(later(now, 60_000));
    let toast = ctx.toasts.latest().expect("sticky toast");
    assert_eq!(toast.message, CATALOG_FAILED);
    assert_eq!(toast.kind, ToastKind::Error);
    assert_eq!(ctx.catalog_total, None);
    Ok(())
}

#[tokio::test]
async fn history_row_opens_server_details() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/book-details"))
        .and(query_param("book", "Dune"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dune()))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::new(&server.uri())?;
    let mut ctx = make_ctx(make_settings(50));
    let now = Now::current();
    ctx.select_book("Dune", now);
    ctx.toggle_history();

    let commands = ctx.show_history_details(0);
    run(&api, &mut ctx, commands, later(now, 100)).await;

    let modal = ctx.modal.as_ref().expect("detail view");
    assert_eq!(modal.publisher, "Ace");
    assert_eq!(modal.image_url, "http://covers.example/dune.jpg");
    assert!(!ctx.history_open);
    Ok(())
}

#[test]
fn preferences_survive_restart() -> anyhow::Result<()> {
    let db = temp_db_path("restart");
    let now = Now::current();

    {
        let store = Storage::open(&db)?;
        let mut ctx = AppContext::new(make_settings(50), Box::new(store));
        let first_theme = ctx.theme;
        ctx.select_book("Dune", now);
        ctx.select_book("Emma", later(now, 1_000));
        ctx.toggle_theme(now);
        assert_ne!(ctx.theme, first_theme);
    }

    let store = Storage::open(&db)?;
    let mut ctx = AppContext::new(make_settings(50), Box::new(store));
    let titles: Vec<_> = ctx.history.entries().iter().map(|e| e.title.clone()).collect();
    assert_eq!(titles, vec!["Emma", "Dune"]);
    let persisted_theme = ctx.theme;

    // A -> B -> A returns to the persisted value.
    ctx.toggle_theme(now);
    ctx.toggle_theme(now);
    assert_eq!(ctx.theme, persisted_theme);
    let stored = ctx.preferences().store().get(keys::THEME)?;
    assert_eq!(stored.as_deref(), Some(persisted_theme.as_str()));

    if let Some(dir) = db.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
    Ok(())
}

#[test]
fn history_capacity_drops_oldest() {
    let mut ctx = make_ctx(make_settings(3));
    let now = Now::current();
    for (i, title) in ["a", "b", "c", "d"].iter().enumerate() {
        ctx.select_book(title, later(now, i as u64));
    }
    let titles: Vec<_> = ctx.history.entries().iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["d", "c", "b"]);
}

#[test]
fn keyboard_walk_through_suggestions() {
    let mut ctx = make_ctx(make_settings(50));
    let now = Now::current();
    assert_eq!(ctx.focus, Focus::Search);
    ctx.search.suggestions = Some(bookfinder_application::SuggestionList::new(
        vec![make_book("Dune", "Frank Herbert"), make_book("Emma", "Jane Austen")],
        None,
    ));
    ctx.search.visible = true;

    ctx.highlight_next_suggestion();
    ctx.highlight_next_suggestion();
    ctx.highlight_next_suggestion();
    let commands = ctx.commit_highlighted(now);
    assert!(matches!(
        commands.as_slice(),
        [Command::FetchRecommendations { title, .. }] if title == "Dune"
    ));
}
