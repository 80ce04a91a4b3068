use askama::Template;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::middleware::from_fn_with_state;
use axum::response::{Html, Json};
use axum::routing::get;
use migration::MigratorTrait;
use sea_orm::Database;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::auth::{AuthState, Credentials, ErrorResponse, require_basic_auth_middleware};
use crate::config::Config;
use crate::todo::api::{AddTodoRequest, TodoJson, UpdateTodoRequest, create_todo_router};
use crate::todo::{Todo, TodoService, TodoServiceError, TodoState};

/// Custom error type for web handler operations.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// Represents an error during template rendering.
    /// The specific `askama::Error` is captured as the source of this error.
    #[error("Template rendering failed")]
    Template(#[from] askama::Error),
    /// Represents a todo service error.
    #[error("Todo service error")]
    Service(#[from] TodoServiceError),
}

impl axum::response::IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        let user_facing_error_message =
            "An unexpected error occurred while processing your request. Please try again later.";
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!(
                "<h1>Internal Server Error</h1><p>{}</p>",
                user_facing_error_message
            )),
        )
            .into_response()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::todo::api::list_todos_handler,
        crate::todo::api::add_todo_handler,
        crate::todo::api::update_todo_handler,
        crate::todo::api::delete_todo_handler,
    ),
    components(schemas(TodoJson, AddTodoRequest, UpdateTodoRequest, ErrorResponse)),
    tags((name = "Todos", description = "Todo management endpoints"))
)]
struct ApiDoc;

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    // Credential loading is fatal on failure: the server must not come up
    // without a valid login.
    let credentials = Credentials::load(config.secret_file.as_deref())?;
    tracing::info!("Credentials loaded for user '{}'", credentials.username());
    let auth_state = Arc::new(AuthState::new(credentials));

    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let db = Database::connect(&config.db_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let todo_state = Arc::new(TodoState { db: Arc::new(db) });
    let app = create_router(auth_state, todo_state);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Assembles the application router: the HTML page and the JSON API sit
/// behind the Basic-auth gate; liveness and API docs stay in front of it.
pub fn create_router(auth_state: Arc<AuthState>, todo_state: Arc<TodoState>) -> Router {
    let protected_routes = Router::new()
        .route("/", get(todo_list_page_handler))
        .with_state(todo_state.clone())
        .merge(create_todo_router(todo_state))
        .layer(ServiceBuilder::new().layer(from_fn_with_state(
            auth_state,
            require_basic_auth_middleware,
        )));

    let public_routes = Router::new()
        .route("/health", get(health_check_handler))
        .route("/api-docs/openapi.json", get(openapi_handler));

    Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetSensitiveRequestHeadersLayer::new([header::AUTHORIZATION]))
                .layer(TraceLayer::new_for_http()),
        )
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Handler for GET / - renders the full todo list as an HTML page.
#[tracing::instrument(skip(state))]
pub async fn todo_list_page_handler(
    State(state): State<Arc<TodoState>>,
) -> Result<Html<String>, WebError> {
    let service = TodoService::new(&state.db);
    let todos = service.get_all_todos().await?;
    let template = TodoListTemplate::new(todos);
    template.render().map(Html).map_err(WebError::from)
}

#[derive(Template)]
#[template(path = "index.html")]
struct TodoListTemplate {
    todos: Vec<TodoRow>,
}

struct TodoRow {
    id: u32,
    title: String,
    text: String,
    is_complete: bool,
}

impl TodoListTemplate {
    pub fn new(todos: Vec<Todo>) -> Self {
        let todos = todos
            .into_iter()
            .map(|todo| TodoRow {
                id: todo.id(),
                title: todo.title().unwrap_or("").to_string(),
                text: todo.text().unwrap_or("").to_string(),
                is_complete: todo.is_complete(),
            })
            .collect();
        Self { todos }
    }
}
