use crate::auth::ErrorResponse;
use crate::todo::{Todo, TodoPatch, TodoService, TodoServiceError, TodoState};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// JSON representation of a todo for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TodoJson {
    /// Unique identifier for the todo
    id: u32,
    /// Short title, up to 100 characters
    title: Option<String>,
    /// Free-form text, up to 255 characters
    text: Option<String>,
    /// Whether the task has been completed
    is_complete: bool,
}

impl From<Todo> for TodoJson {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id(),
            title: todo.title().map(str::to_string),
            text: todo.text().map(str::to_string),
            is_complete: todo.is_complete(),
        }
    }
}

/// JSON request payload for creating a todo.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AddTodoRequest {
    /// Title for the new todo
    #[serde(default)]
    title: Option<String>,
    /// Free-form text for the new todo
    #[serde(default)]
    text: Option<String>,
}

/// JSON request payload for partially updating a todo.
///
/// Absent fields and falsy values (empty strings, `false`) leave the
/// stored field untouched.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateTodoRequest {
    /// New title for the todo; empty strings are ignored
    #[serde(default)]
    title: Option<String>,
    /// New free-form text for the todo; empty strings are ignored
    #[serde(default)]
    text: Option<String>,
    /// Marks the todo as complete; `false` is ignored
    #[serde(default)]
    is_complete: Option<bool>,
}

/// Handler for GET /list - Returns every todo as a JSON array.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/list",
    responses(
        (status = 200, description = "Successfully retrieved todos", body = [TodoJson]),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn list_todos_handler(
    State(state): State<Arc<TodoState>>,
) -> Result<Json<Vec<TodoJson>>, (StatusCode, Json<ErrorResponse>)> {
    let service = TodoService::new(&state.db);

    match service.get_all_todos().await {
        Ok(todos) => Ok(Json(todos.into_iter().map(TodoJson::from).collect())),
        Err(err) => {
            tracing::error!("Failed to list todos: {}", err);
            Err(internal_error_response("Failed to retrieve todos"))
        }
    }
}

/// Handler for POST /add - Creates a new todo.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/add",
    request_body = AddTodoRequest,
    responses(
        (status = 201, description = "Todo created", body = TodoJson),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn add_todo_handler(
    State(state): State<Arc<TodoState>>,
    Json(payload): Json<AddTodoRequest>,
) -> Result<(StatusCode, Json<TodoJson>), (StatusCode, Json<ErrorResponse>)> {
    let service = TodoService::new(&state.db);

    match service.create_todo(payload.title, payload.text).await {
        Ok(todo) => Ok((StatusCode::CREATED, Json(TodoJson::from(todo)))),
        Err(err) => {
            tracing::error!("Failed to create todo: {}", err);
            Err(internal_error_response("Failed to create todo"))
        }
    }
}

/// Handler for POST /update/{id} - Partially updates a todo.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/update/{id}",
    params(
        ("id" = u32, Path, description = "ID of the todo to update")
    ),
    request_body = UpdateTodoRequest,
    responses(
        (status = 200, description = "Todo updated", body = TodoJson),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 404, description = "Todo not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn update_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<u32>,
    Json(payload): Json<UpdateTodoRequest>,
) -> Result<Json<TodoJson>, (StatusCode, Json<ErrorResponse>)> {
    let service = TodoService::new(&state.db);
    let patch = TodoPatch {
        title: payload.title,
        text: payload.text,
        is_complete: payload.is_complete,
    };

    match service.update_todo_by_id(id, patch).await {
        Ok(todo) => Ok(Json(TodoJson::from(todo))),
        Err(TodoServiceError::TodoNotFound(id)) => Err(not_found_response(id)),
        Err(err) => {
            tracing::error!("Failed to update todo {}: {}", id, err);
            Err(internal_error_response("Failed to update todo"))
        }
    }
}

/// Handler for DELETE /delete/{id} - Deletes a todo and returns its data.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/delete/{id}",
    params(
        ("id" = u32, Path, description = "ID of the todo to delete")
    ),
    responses(
        (status = 200, description = "Todo deleted; body is the deleted record", body = TodoJson),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 404, description = "Todo not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn delete_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<u32>,
) -> Result<Json<TodoJson>, (StatusCode, Json<ErrorResponse>)> {
    let service = TodoService::new(&state.db);

    match service.delete_todo_by_id(id).await {
        Ok(todo) => Ok(Json(TodoJson::from(todo))),
        Err(TodoServiceError::TodoNotFound(id)) => Err(not_found_response(id)),
        Err(err) => {
            tracing::error!("Failed to delete todo {}: {}", id, err);
            Err(internal_error_response("Failed to delete todo"))
        }
    }
}

fn not_found_response(id: u32) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(
            "NOT_FOUND",
            format!("Todo with ID {} does not exist", id),
        )),
    )
}

fn internal_error_response(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("INTERNAL_ERROR", message)),
    )
}

/// Creates and returns the todo API router.
pub fn create_todo_router(state: Arc<TodoState>) -> Router {
    Router::new()
        .route("/list", get(list_todos_handler))
        .route("/add", post(add_todo_handler))
        .route("/update/{id}", post(update_todo_handler))
        .route("/delete/{id}", delete(delete_todo_handler))
        .with_state(state)
}
