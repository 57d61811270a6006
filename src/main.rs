use axum::{
    routing::get,
    Router,
};
use dotenvy::dotenv;
use std::env;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod db;
mod error;
mod extract;
mod handlers;
mod models;
mod query;
mod validation;


use config::Config;
use db::Store;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::todos::list_todos,
        handlers::todos::get_todo,
        handlers::todos::create_todo,
        handlers::todos::update_todo,
        handlers::todos::delete_todo
    ),
    components(
        schemas(
            models::Todo,
            models::TodoCreate,
            models::TodoUpdate,
            models::TodoListResponse,
            models::Health
        )
    ),
    tags(
        (name = "health", description = "Liveness check"),
        (name = "todos", description = "Todo management endpoints")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "info,todo_service=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store = Store::connect(&config.database_path).await?;
    store.ensure_schema().await?;

    let app = create_app(store, config.cors.layer());

    let addr = config.addr()?;
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn create_app(store: Store, cors: CorsLayer) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route(
            "/api/health",
            get(handlers::health::health).fallback(handlers::fallback::method_not_allowed),
        )
        .route(
            "/api/todos",
            get(handlers::todos::list_todos)
                .post(handlers::todos::create_todo)
                .fallback(handlers::fallback::method_not_allowed),
        )
        .route(
            "/api/todos/:id",
            get(handlers::todos::get_todo)
                .patch(handlers::todos::update_todo)
                .delete(handlers::todos::delete_todo)
                .fallback(handlers::fallback::method_not_allowed),
        )
        .fallback(handlers::fallback::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(store)
}
