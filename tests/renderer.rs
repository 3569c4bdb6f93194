mod common;

use axum::http::StatusCode;
use registrar::config::AppSettings;
use registrar::{RenderContext, Renderer, TemplateError};

const MARKER: &str = "MARKER-5f0c";

fn app() -> AppSettings {
    common::settings(std::path::Path::new("views"), false).app
}

#[test]
fn view_content_lands_inside_the_layout_exactly_once() {
    let dir = common::views();
    common::write(dir.path(), "students/index.html", "<p>{{ marker }}</p>");
    let renderer = Renderer::new(dir.path());

    let ctx = RenderContext::new().with("marker", MARKER).unwrap();
    let html = renderer.render("students/index", &ctx).unwrap();

    assert_eq!(html.matches(MARKER).count(), 1);
    assert!(html.starts_with("<html><body><main><p>"));
    assert!(html.contains(&format!("<main><p>{}</p></main>", MARKER)));
}

#[test]
fn layout_sees_data_and_globals() {
    let dir = common::views();
    common::write(dir.path(), "layouts/admin.html", "<title>{{ title }} | {{ app_name }}</title>{{ content }}");
    common::write(dir.path(), "students/show.html", "<b>{{ name }}</b>");
    let renderer = Renderer::new(dir.path()).with_globals(&app());

    let ctx = RenderContext::new()
        .with("title", "Ada")
        .unwrap()
        .with("name", "<Ada>")
        .unwrap()
        .layout("admin");
    let html = renderer.render("students/show", &ctx).unwrap();
    // view output is not escaped twice, data is escaped once
    assert_eq!(html, "<title>Ada | Registrar Test</title><b>&lt;Ada&gt;</b>");
}

#[test]
fn missing_view_or_layout_is_template_not_found() {
    let dir = common::views();
    common::write(dir.path(), "students/index.html", "ok");
    let renderer = Renderer::new(dir.path());

    let err = renderer.render("students/missing", &RenderContext::new()).unwrap_err();
    assert!(matches!(err, TemplateError::NotFound(ref p) if p.ends_with("missing.html")));

    let ctx = RenderContext::new().layout("nope");
    let err = renderer.render("students/index", &ctx).unwrap_err();
    assert!(matches!(err, TemplateError::NotFound(ref p) if p.ends_with("nope.html")));

    let err = renderer.render("../secrets", &RenderContext::new()).unwrap_err();
    assert!(matches!(err, TemplateError::NotFound(_)));
}

#[test]
fn execution_errors_carry_the_failing_path() {
    let dir = common::views();
    common::write(dir.path(), "students/broken.html", "{% for x in %}");
    let renderer = Renderer::new(dir.path());

    let err = renderer.render("students/broken", &RenderContext::new()).unwrap_err();
    match err {
        TemplateError::Render { path, .. } => assert!(path.ends_with("broken.html")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn partials_can_be_included() {
    let dir = common::views();
    common::write(dir.path(), "partials/row.html", "<td>{{ name }}</td>");
    common::write(dir.path(), "students/index.html", "{% include 'partials/row.html' %}");
    let renderer = Renderer::new(dir.path());

    let ctx = RenderContext::new().with("name", "Ada").unwrap();
    let html = renderer.render("students/index", &ctx).unwrap();
    assert!(html.contains("<td>Ada</td>"));
}

#[test]
fn error_pages_render_through_the_pipeline() {
    let dir = common::views();
    let renderer = Renderer::new(dir.path());

    let mut data = serde_json::Map::new();
    data.insert("path".into(), "courses".into());
    let page = renderer.render_error(StatusCode::NOT_FOUND, data);
    assert_eq!(page.status, StatusCode::NOT_FOUND);
    assert!(!page.fallback);
    assert!(page.body.contains("<main><h1>Not found: courses</h1></main>"));
}

#[test]
fn broken_error_pipeline_falls_back_to_static_text() {
    let dir = common::views();
    // no errors/403 template
    let renderer = Renderer::new(dir.path());
    let page = renderer.render_error(StatusCode::FORBIDDEN, serde_json::Map::new());
    assert!(page.fallback);
    assert_eq!(page.body, "403 Forbidden");

    // a layout that fails also ends in the fallback
    common::write(dir.path(), "layouts/main.html", "{{ content | no_such_filter }}");
    let renderer = Renderer::new(dir.path());
    let page = renderer.render_error(StatusCode::INTERNAL_SERVER_ERROR, serde_json::Map::new());
    assert!(page.fallback);
    assert_eq!(page.body, "500 Internal Server Error");
}
