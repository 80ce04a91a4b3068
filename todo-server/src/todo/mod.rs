use crate::entities::*;
use sea_orm::*;
use std::sync::Arc;

pub mod api;

/// A single task record.
#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct Todo {
    id: u32,
    title: Option<String>,
    text: Option<String>,
    is_complete: bool,
}

impl Todo {
    pub fn new(id: u32, title: Option<String>, text: Option<String>, is_complete: bool) -> Self {
        Self {
            id,
            title,
            text,
            is_complete,
        }
    }

    /// Returns the ID of the todo.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Returns the title of the todo, if one was set.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Returns the free-form text of the todo, if any was set.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Returns whether the todo has been completed.
    pub fn is_complete(&self) -> bool {
        self.is_complete
    }
}

impl From<todo::Model> for Todo {
    fn from(model: todo::Model) -> Self {
        Todo::new(model.id as u32, model.title, model.text, model.is_complete)
    }
}

/// Shared state for todo routes.
#[derive(Clone)]
pub struct TodoState {
    pub db: Arc<DatabaseConnection>,
}

/// Error type for TodoService operations.
#[derive(Debug, thiserror::Error)]
pub enum TodoServiceError {
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    /// Represents a todo not found error.
    #[error("Todo with ID {0} not found")]
    TodoNotFound(u32),
}

/// Partial update for a todo.
///
/// A field is applied only when it holds a truthy value: `None`, empty
/// strings and `false` leave the stored value untouched. Absent and falsy
/// fields are therefore indistinguishable to the update operation; this is
/// the documented contract of `POST /update/{id}`, not an accident.
#[derive(Debug, Default, Clone)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub text: Option<String>,
    pub is_complete: Option<bool>,
}

pub struct TodoService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl TodoService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> TodoService {
        TodoService { db }
    }

    /// Retrieves all todos from the database, in storage order.
    ///
    /// # Returns
    ///
    /// A `Result` containing a vector of `Todo` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_todos(&self) -> Result<Vec<Todo>, TodoServiceError> {
        let todos = todo::Entity::find()
            .all(self.db)
            .await?
            .into_iter()
            .map(Todo::from)
            .collect();
        Ok(todos)
    }

    /// Creates a new todo in the database.
    ///
    /// The todo always starts out incomplete; the storage layer assigns a
    /// fresh ID.
    ///
    /// # Arguments
    ///
    /// * `title` - Optional title, up to 100 characters.
    /// * `text` - Optional free-form text, up to 255 characters.
    ///
    /// # Returns
    ///
    /// A `Result` containing the created `Todo` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn create_todo(
        &self,
        title: Option<String>,
        text: Option<String>,
    ) -> Result<Todo, TodoServiceError> {
        let active_model = todo::ActiveModel {
            title: ActiveValue::Set(title),
            text: ActiveValue::Set(text),
            is_complete: ActiveValue::Set(false),
            ..Default::default()
        };
        let created_model = active_model.insert(self.db).await?;
        Ok(Todo::from(created_model))
    }

    /// Retrieves a todo by its ID.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Todo` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn get_todo_by_id(&self, id: u32) -> Result<Todo, TodoServiceError> {
        let model = todo::Entity::find_by_id(id as i32)
            .one(self.db)
            .await?
            .ok_or(TodoServiceError::TodoNotFound(id))?;
        Ok(Todo::from(model))
    }

    /// Applies a partial update to the todo with the given ID.
    ///
    /// Only truthy patch fields are applied (see [`TodoPatch`]): clearing a
    /// title or flipping `is_complete` back to `false` is deliberately not
    /// expressible through this operation.
    ///
    /// # Returns
    ///
    /// A `Result` containing the updated `Todo` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn update_todo_by_id(
        &self,
        id: u32,
        patch: TodoPatch,
    ) -> Result<Todo, TodoServiceError> {
        let todo_to_update = todo::Entity::find_by_id(id as i32)
            .one(self.db)
            .await?
            .ok_or(TodoServiceError::TodoNotFound(id))?;

        let original = todo_to_update.clone();
        let mut active_model: todo::ActiveModel = todo_to_update.into();
        if let Some(title) = patch.title.filter(|title| !title.is_empty()) {
            active_model.title = ActiveValue::Set(Some(title));
        }
        if let Some(text) = patch.text.filter(|text| !text.is_empty()) {
            active_model.text = ActiveValue::Set(Some(text));
        }
        if patch.is_complete == Some(true) {
            active_model.is_complete = ActiveValue::Set(true);
        }

        // An all-falsy patch touches nothing; skip the empty UPDATE.
        if !active_model.is_changed() {
            return Ok(Todo::from(original));
        }

        let updated_model = active_model.update(self.db).await?;
        Ok(Todo::from(updated_model))
    }

    /// Deletes a todo by its ID.
    ///
    /// # Returns
    ///
    /// A `Result` containing the deleted `Todo`'s data if successful, or an
    /// error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn delete_todo_by_id(&self, id: u32) -> Result<Todo, TodoServiceError> {
        let todo_to_delete = todo::Entity::find_by_id(id as i32)
            .one(self.db)
            .await?
            .ok_or(TodoServiceError::TodoNotFound(id))?;

        let todo_copy = Todo::from(todo_to_delete.clone());
        todo::Entity::delete_by_id(id as i32).exec(self.db).await?;
        Ok(todo_copy)
    }
}
