//! In-memory todo service served through `ApiEndpoint`s.
//!
//! Every route answers with an envelope: the todo(s) go in `data`, counts in
//! `info`, and problems are reported as coded messages.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::routing::MethodFilter;
use axum::Router;
use envelope_core::{Message, ResponseEnvelope};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::context::{RequestContext, ResponseSink};
use crate::endpoint::{ApiEndpoint, EndpointHandler};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct CreateTodo {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct UpdateTodo {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Todo>>>;

pub fn router(db: Db) -> Router {
    let list = ApiEndpoint::with_handler(ListTodos { db: db.clone() }).named("todos.list");
    let create = ApiEndpoint::with_handler(CreateTodoHandler { db: db.clone() }).named("todos.create");
    let get = ApiEndpoint::with_handler(GetTodo { db: db.clone() }).named("todos.get");
    let update = ApiEndpoint::with_handler(UpdateTodoHandler { db: db.clone() }).named("todos.update");
    let delete = ApiEndpoint::with_handler(DeleteTodo { db }).named("todos.delete");
    let health = ApiEndpoint::with_handler(Health).named("health");
    let unimplemented = ApiEndpoint::new().named("unimplemented");

    Router::new()
        .route("/health", health.on(MethodFilter::GET))
        .route(
            "/todos",
            list.on(MethodFilter::GET).merge(create.on(MethodFilter::POST)),
        )
        .route(
            "/todos/{id}",
            get.on(MethodFilter::GET)
                .merge(update.on(MethodFilter::PUT))
                .merge(delete.on(MethodFilter::DELETE)),
        )
        .route("/unimplemented", unimplemented.any())
}

/// Parse the `{id}` path segment, reporting `INVALID_ID` when it is not a
/// UUID. A route without the segment is a wiring bug and fails the request.
fn todo_id(request: &RequestContext, response: &mut ResponseEnvelope) -> anyhow::Result<Option<Uuid>> {
    let raw = request
        .path_param("id")
        .ok_or_else(|| anyhow::anyhow!("route has no id parameter"))?;
    match Uuid::parse_str(raw) {
        Ok(id) => Ok(Some(id)),
        Err(_) => {
            response.add_message(Message::with_text("INVALID_ID", format!("{raw:?} is not a valid todo id.")));
            Ok(None)
        }
    }
}

/// Deserialize the JSON body, reporting `INVALID_BODY` on failure.
fn body<T: serde::de::DeserializeOwned>(request: &RequestContext, response: &mut ResponseEnvelope) -> Option<T> {
    match request.json() {
        Ok(input) => Some(input),
        Err(e) => {
            response.add_message(Message::with_text("INVALID_BODY", e.to_string()));
            None
        }
    }
}

fn not_found(sink: &mut ResponseSink, response: &mut ResponseEnvelope, id: Uuid) {
    sink.set_status(StatusCode::NOT_FOUND);
    response.add_message(Message::with_text("NOT_FOUND", format!("Todo {id} does not exist.")));
}

struct Health;

#[async_trait]
impl EndpointHandler for Health {
    async fn handle(
        &self,
        _request: &RequestContext,
        _sink: &mut ResponseSink,
        response: &mut ResponseEnvelope,
    ) -> anyhow::Result<()> {
        response.merge_data(json!({"ok": true})).set_success();
        Ok(())
    }
}

struct ListTodos {
    db: Db,
}

#[async_trait]
impl EndpointHandler for ListTodos {
    async fn handle(
        &self,
        _request: &RequestContext,
        _sink: &mut ResponseSink,
        response: &mut ResponseEnvelope,
    ) -> anyhow::Result<()> {
        let todos = self.db.read().await;
        let mut items: Vec<Todo> = todos.values().cloned().collect();
        items.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        response
            .merge_info(json!({"count": items.len()}))
            .merge_data(json!({"todos": items}))
            .set_success();
        Ok(())
    }
}

struct CreateTodoHandler {
    db: Db,
}

#[async_trait]
impl EndpointHandler for CreateTodoHandler {
    async fn handle(
        &self,
        request: &RequestContext,
        sink: &mut ResponseSink,
        response: &mut ResponseEnvelope,
    ) -> anyhow::Result<()> {
        let Some(input) = body::<CreateTodo>(request, response) else {
            return Ok(());
        };
        let todo = Todo {
            id: Uuid::new_v4(),
            title: input.title,
            completed: input.completed,
        };
        self.db.write().await.insert(todo.id, todo.clone());
        sink.set_status(StatusCode::CREATED);
        response.merge_data(json!({"todo": todo})).set_success();
        Ok(())
    }
}

struct GetTodo {
    db: Db,
}

#[async_trait]
impl EndpointHandler for GetTodo {
    async fn handle(
        &self,
        request: &RequestContext,
        sink: &mut ResponseSink,
        response: &mut ResponseEnvelope,
    ) -> anyhow::Result<()> {
        let Some(id) = todo_id(request, response)? else {
            return Ok(());
        };
        match self.db.read().await.get(&id) {
            Some(todo) => {
                response.merge_data(json!({"todo": todo})).set_success();
            }
            None => not_found(sink, response, id),
        }
        Ok(())
    }
}

struct UpdateTodoHandler {
    db: Db,
}

#[async_trait]
impl EndpointHandler for UpdateTodoHandler {
    async fn handle(
        &self,
        request: &RequestContext,
        sink: &mut ResponseSink,
        response: &mut ResponseEnvelope,
    ) -> anyhow::Result<()> {
        let Some(id) = todo_id(request, response)? else {
            return Ok(());
        };
        let Some(input) = body::<UpdateTodo>(request, response) else {
            return Ok(());
        };
        let mut todos = self.db.write().await;
        let Some(todo) = todos.get_mut(&id) else {
            not_found(sink, response, id);
            return Ok(());
        };
        if let Some(title) = input.title {
            todo.title = title;
        }
        if let Some(completed) = input.completed {
            todo.completed = completed;
        }
        response.merge_data(json!({"todo": todo})).set_success();
        Ok(())
    }
}

struct DeleteTodo {
    db: Db,
}

#[async_trait]
impl EndpointHandler for DeleteTodo {
    async fn handle(
        &self,
        request: &RequestContext,
        sink: &mut ResponseSink,
        response: &mut ResponseEnvelope,
    ) -> anyhow::Result<()> {
        let Some(id) = todo_id(request, response)? else {
            return Ok(());
        };
        match self.db.write().await.remove(&id) {
            Some(todo) => {
                response.merge_data(json!({"todo": todo})).set_success();
            }
            None => not_found(sink, response, id),
        }
        Ok(())
    }
}
