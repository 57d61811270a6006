use axum::{extract::State, http::StatusCode, Json};

use crate::{
    db::{utc_now_iso, Store},
    error::AppError,
    extract::{ApiJson, ApiPath, ApiQuery},
    models::{Todo, TodoCreate, TodoListResponse, TodoUpdate},
    query::{ListParams, ListQuery},
    validation::{validate_create, validate_update},
};

#[utoipa::path(
    get,
    path = "/api/todos",
    params(ListParams),
    responses(
        (status = 200, description = "One page of matching todos", body = TodoListResponse),
        (status = 400, description = "Invalid query parameters")
    ),
    tag = "todos"
)]
pub async fn list_todos(
    State(store): State<Store>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<TodoListResponse>, AppError> {
    let query = ListQuery::try_from(params)?;
    let (items, total) = store.list(&query).await?;

    Ok(Json(TodoListResponse {
        items,
        page: query.page,
        page_size: query.page_size,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/todos/{id}",
    params(
        ("id" = i64, Path, description = "Todo ID")
    ),
    responses(
        (status = 200, description = "Todo details", body = Todo),
        (status = 404, description = "Todo not found")
    ),
    tag = "todos"
)]
pub async fn get_todo(
    State(store): State<Store>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Todo>, AppError> {
    let todo = store.fetch_by_id(id).await?;
    Ok(Json(todo))
}

#[utoipa::path(
    post,
    path = "/api/todos",
    request_body = TodoCreate,
    responses(
        (status = 201, description = "Todo created", body = Todo),
        (status = 400, description = "Invalid payload")
    ),
    tag = "todos"
)]
pub async fn create_todo(
    State(store): State<Store>,
    ApiJson(payload): ApiJson<TodoCreate>,
) -> Result<(StatusCode, Json<Todo>), AppError> {
    let new_todo = validate_create(payload)?;
    let now = utc_now_iso();

    let id = store.insert(&new_todo, &now).await?;
    tracing::debug!("created todo {}", id);

    let todo = store.fetch_by_id(id).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

#[utoipa::path(
    patch,
    path = "/api/todos/{id}",
    params(
        ("id" = i64, Path, description = "Todo ID")
    ),
    request_body = TodoUpdate,
    responses(
        (status = 200, description = "Todo updated", body = Todo),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Todo not found")
    ),
    tag = "todos"
)]
pub async fn update_todo(
    State(store): State<Store>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<TodoUpdate>,
) -> Result<Json<Todo>, AppError> {
    // Unknown ids are reported before the body is looked at, and nothing is
    // written unless every provided field is valid.
    store.ensure_exists(id).await?;
    let changes = validate_update(payload)?;

    let todo = store.update_partial(id, &changes, &utc_now_iso()).await?;
    tracing::debug!("updated todo {}", id);

    Ok(Json(todo))
}

#[utoipa::path(
    delete,
    path = "/api/todos/{id}",
    params(
        ("id" = i64, Path, description = "Todo ID")
    ),
    responses(
        (status = 204, description = "Todo deleted"),
        (status = 404, description = "Todo not found")
    ),
    tag = "todos"
)]
pub async fn delete_todo(
    State(store): State<Store>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    store.delete(id).await?;
    tracing::debug!("deleted todo {}", id);

    Ok(StatusCode::NO_CONTENT)
}
