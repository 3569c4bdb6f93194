//! Students: list, show, create, edit and delete.

use async_trait::async_trait;
use axum::http::StatusCode;
use registrar::db::Record;
use registrar::error::{AppError, ConfigError};
use registrar::model::{Dao, Entity, TableSpec};
use registrar::router::{Callback, Context, Controller, Router};
use registrar::{AppState, RenderContext, Request, Response};
use serde::Serialize;
use serde_json::Value;

/// Columns a form may write.
const FIELDS: &[&str] = &["first_name", "last_name", "email", "status"];
const REQUIRED: &[&str] = &["first_name", "last_name"];

pub const SQLITE_SCHEMA: &str = r#"CREATE TABLE IF NOT EXISTS students (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT,
    status TEXT NOT NULL DEFAULT 'active'
)"#;

#[derive(Debug, Clone, Serialize)]
pub struct Student {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub status: String,
}

impl Entity for Student {
    const SPEC: TableSpec = TableSpec::new("students");

    fn from_record(record: Record) -> Result<Self, AppError> {
        Ok(Student {
            id: record.require_i64("students", "id")?,
            first_name: record.require_str("students", "first_name")?,
            last_name: record.require_str("students", "last_name")?,
            email: record.opt_str("email"),
            status: record.str("status").unwrap_or("active").to_string(),
        })
    }
}

pub struct StudentsController {
    state: AppState,
}

#[async_trait]
impl Controller for StudentsController {
    const NAME: &'static str = "StudentsController";
    const ACTIONS: &'static [&'static str] = &["index", "show", "create", "store", "edit", "update", "destroy"];

    fn from_state(state: &AppState) -> Self {
        StudentsController { state: state.clone() }
    }

    async fn call(&mut self, action: &str, request: Request, params: Vec<String>) -> Result<Response, AppError> {
        match action {
            "index" => self.index().await,
            "show" => self.show(parse_id(&params)?).await,
            "create" => self.create(),
            "store" => self.store(&request).await,
            "edit" => self.edit(parse_id(&params)?).await,
            "update" => self.update(parse_id(&params)?, &request).await,
            "destroy" => self.destroy(parse_id(&params)?).await,
            other => Err(AppError::NotFound(format!("action {}", other))),
        }
    }
}

impl StudentsController {
    async fn dao(&self) -> Result<Dao<Student>, AppError> {
        Dao::connect(&self.state.db).await
    }

    fn page(&self, view: &str, ctx: RenderContext) -> Result<Response, AppError> {
        Ok(Response::html(self.state.views.render(view, &ctx)?))
    }

    async fn index(&self) -> Result<Response, AppError> {
        let students = self.dao().await?.all().await?;
        let ctx = RenderContext::new()
            .with("title", "Students")?
            .with("students", &students)?;
        self.page("students/index", ctx)
    }

    async fn show(&self, id: i64) -> Result<Response, AppError> {
        let student = self.dao().await?.find_or_404(id).await?;
        let ctx = RenderContext::new()
            .with("title", &format!("{} {}", student.first_name, student.last_name))?
            .with("student", &student)?;
        self.page("students/show", ctx)
    }

    fn create(&self) -> Result<Response, AppError> {
        self.form(None, &Value::Object(Default::default()), &[], StatusCode::OK)
    }

    async fn store(&self, request: &Request) -> Result<Response, AppError> {
        let fields = request.form_fields(FIELDS);
        let errors = missing_required(&fields);
        if !errors.is_empty() {
            return self.form(None, &serde_json::to_value(&fields).unwrap_or_default(), &errors, StatusCode::UNPROCESSABLE_ENTITY);
        }
        let id = self.dao().await?.create(&fields).await?;
        tracing::info!(request_id = %request.id(), student_id = %id, "student created");
        Ok(Response::redirect(&format!("/students/{}", id)))
    }

    async fn edit(&self, id: i64) -> Result<Response, AppError> {
        let student = self.dao().await?.find_or_404(id).await?;
        let current = serde_json::to_value(&student).map_err(|e| AppError::Decode {
            entity: "students",
            message: e.to_string(),
        })?;
        self.form(Some(id), &current, &[], StatusCode::OK)
    }

    /// Unchanged values are not an error: the update reports false and we still redirect.
    async fn update(&self, id: i64, request: &Request) -> Result<Response, AppError> {
        let fields = request.form_fields(FIELDS);
        let errors = missing_required(&fields);
        if !errors.is_empty() {
            let mut submitted = serde_json::to_value(&fields).unwrap_or_default();
            if let Some(map) = submitted.as_object_mut() {
                map.insert("id".into(), id.into());
            }
            return self.form(Some(id), &submitted, &errors, StatusCode::UNPROCESSABLE_ENTITY);
        }
        let dao = self.dao().await?;
        if !dao.update(id, &fields).await? {
            // missing row or nothing changed; only the first is a 404
            dao.find_or_404(id).await?;
            tracing::debug!(student_id = id, "update changed nothing");
        }
        Ok(Response::redirect(&format!("/students/{}", id)))
    }

    async fn destroy(&self, id: i64) -> Result<Response, AppError> {
        if !self.dao().await?.delete(id).await? {
            return Err(AppError::NotFound(format!("students {}", id)));
        }
        Ok(Response::redirect("/students"))
    }

    fn form(&self, id: Option<i64>, student: &Value, errors: &[String], status: StatusCode) -> Result<Response, AppError> {
        let (title, action) = match id {
            Some(id) => ("Edit student".to_string(), format!("/students/{}", id)),
            None => ("New student".to_string(), "/students".to_string()),
        };
        let ctx = RenderContext::new()
            .with("title", &title)?
            .with("action", &action)?
            .with("editing", &id.is_some())?
            .with("student", student)?
            .with("errors", errors)?;
        Ok(Response::html_status(status, self.state.views.render("students/form", &ctx)?))
    }
}

fn missing_required(fields: &registrar::Fields) -> Vec<String> {
    REQUIRED
        .iter()
        .filter(|col| fields.get(**col).map_or(true, Value::is_null))
        .map(|col| format!("{} is required", col.replace('_', " ")))
        .collect()
}

/// Route ids arrive as text.
fn parse_id(params: &[String]) -> Result<i64, AppError> {
    let raw = params.first().ok_or_else(|| AppError::BadRequest("missing id".into()))?;
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id '{}'", raw)))
}

/// `GET /students.json`: the list as JSON instead of HTML.
async fn students_json(ctx: Context, _params: Vec<String>) -> Result<Response, AppError> {
    let students = Dao::<Student>::connect(&ctx.state.db).await?.all().await?;
    Ok(Response::json_many(students))
}

pub fn routes(router: &mut Router) -> Result<(), ConfigError> {
    router.define("home", |_ctx, _params| async { Ok(Response::redirect("/students")) });
    router
        .get("/", Callback::named("home"))?
        .get("/students.json", Callback::function(students_json))?
        .get("/students", Callback::action::<StudentsController>("index"))?
        .get("/students/new", Callback::action::<StudentsController>("create"))?
        .post("/students", Callback::action::<StudentsController>("store"))?
        .get("/students/{id}", Callback::action::<StudentsController>("show"))?
        .get("/students/{id}/edit", Callback::action::<StudentsController>("edit"))?
        .put("/students/{id}", Callback::action::<StudentsController>("update"))?
        .delete("/students/{id}", Callback::action::<StudentsController>("destroy"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use registrar::config::DatabaseSettings;
    use registrar::{db, ConnectionManager, Kernel, Renderer, Settings};

    async fn app() -> Kernel {
        let settings = Settings::from_lookup(|key| match key {
            "DB_DRIVER" => Some("sqlite".to_string()),
            "DB_DATABASE" => Some(":memory:".to_string()),
            "APP_NAME" => Some("Registrar".to_string()),
            _ => None,
        })
        .unwrap();
        let conn = db::connect(&DatabaseSettings::sqlite_memory()).await.unwrap();
        conn.execute(SQLITE_SCHEMA, &[]).await.unwrap();
        let views = Renderer::new("views").with_globals(&settings.app);
        let state = AppState::new(settings, ConnectionManager::from_connection(conn), views);

        let mut router = Router::new();
        routes(&mut router).unwrap();
        Kernel::new(router, state)
    }

    fn post(target: &str, form: &[(&str, &str)]) -> Request {
        Request::new(Method::POST, target).with_form(form)
    }

    async fn store_ada(kernel: &Kernel) -> String {
        let res = kernel
            .run(post("/students", &[("first_name", "Ada"), ("last_name", "Lovelace"), ("email", "ada@example.org")]))
            .await;
        assert_eq!(res.status(), StatusCode::FOUND);
        res.header("location").unwrap().to_string()
    }

    #[tokio::test]
    async fn store_redirects_and_pages_render_in_the_layout() {
        let kernel = app().await;
        let location = store_ada(&kernel).await;
        assert_eq!(location, "/students/1");

        let res = kernel.run(Request::new(Method::GET, &location)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.body().contains("<h1>Ada Lovelace</h1>"));
        assert!(res.body().contains("<title>Ada Lovelace · Registrar</title>"));

        let res = kernel.run(Request::new(Method::GET, "/students")).await;
        assert!(res.body().contains("Lovelace, Ada"));
        assert_eq!(res.body().matches("<main>").count(), 1);

        let res = kernel.run(Request::new(Method::GET, "/students/1/edit")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.body().contains(r#"value="PUT""#));
        assert!(res.body().contains(r#"value="Lovelace""#));
    }

    #[tokio::test]
    async fn unchanged_update_redirects_but_missing_student_is_404() {
        let kernel = app().await;
        store_ada(&kernel).await;
        let same = [("_method", "PUT"), ("first_name", "Ada"), ("last_name", "Lovelace"), ("email", "ada@example.org")];

        let res = kernel.run(post("/students/1", &same)).await;
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.header("location"), Some("/students/1"));

        let res = kernel.run(post("/students/99", &same)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(res.body().contains("Page not found"));
    }

    #[tokio::test]
    async fn missing_required_fields_rerender_the_form() {
        let kernel = app().await;
        let res = kernel
            .run(post("/students", &[("first_name", " "), ("last_name", "Hopper")]))
            .await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(res.body().contains("first name is required"));
        assert!(res.body().contains(r#"value="Hopper""#));

        let res = kernel.run(Request::new(Method::GET, "/students.json")).await;
        assert!(res.body().contains(r#""count":0"#));
    }

    #[tokio::test]
    async fn non_numeric_id_is_a_bad_request() {
        let kernel = app().await;
        let res = kernel.run(Request::new(Method::GET, "/students/abc")).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(res.body().contains("could not be understood"));
    }

    #[tokio::test]
    async fn json_list_and_delete() {
        let kernel = app().await;
        store_ada(&kernel).await;

        let res = kernel.run(Request::new(Method::GET, "/students.json")).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(res.body()).unwrap();
        assert_eq!(body["meta"]["count"], 1);
        assert_eq!(body["data"][0]["first_name"], "Ada");

        let res = kernel.run(post("/students/1", &[("_method", "DELETE")])).await;
        assert_eq!(res.header("location"), Some("/students"));
        let res = kernel.run(post("/students/1", &[("_method", "DELETE")])).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = kernel.run(Request::new(Method::GET, "/students")).await;
        assert!(res.body().contains("No students yet."));
    }
}
