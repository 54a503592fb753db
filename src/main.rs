//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Settings};
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

fn app_router(app_state: AppState) -> Router {
    // Rotas públicas de autenticação
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Tudo abaixo exige Bearer token
    let protected = Router::new()
        .route("/users/me", get(handlers::auth::get_me))
        .route("/permissions", get(handlers::rbac::list_permissions))
        // Administração
        .route("/admin/users", get(handlers::rbac::list_users))
        .route("/admin/users/{id}", patch(handlers::rbac::update_user))
        .route("/admin/users/{id}/permissions", put(handlers::rbac::set_user_permissions))
        // Funil de imóveis
        .route("/stages", get(handlers::properties::list_stages))
        .route(
            "/properties",
            post(handlers::properties::create_property).get(handlers::properties::list_properties),
        )
        .route(
            "/properties/{id}",
            get(handlers::properties::get_property).patch(handlers::properties::update_property),
        )
        .route("/properties/{id}/stage", post(handlers::properties::move_stage))
        .route(
            "/properties/{id}/reminder",
            get(handlers::reminders::get_property_reminder)
                .put(handlers::reminders::set_custom_interval)
                .delete(handlers::reminders::disable_reminder),
        )
        .route("/properties/{id}/captions", post(handlers::captions::generate_captions))
        // Lembretes
        .route("/reminders", get(handlers::reminders::list_reminders))
        .route("/reminders/{id}/snooze", post(handlers::reminders::snooze_reminder))
        // Locação
        .route(
            "/rentals/contracts",
            post(handlers::rentals::create_contract).get(handlers::rentals::list_contracts),
        )
        .route("/rentals/contracts/{id}", get(handlers::rentals::get_contract))
        .route("/rentals/contracts/{id}/terminate", post(handlers::rentals::terminate_contract))
        .route("/rentals/contracts/{id}/renew", post(handlers::rentals::renew_contract))
        .route("/rentals/payments", get(handlers::rentals::list_payments))
        .route("/rentals/payments/{id}", patch(handlers::rentals::adjust_payment))
        .route("/rentals/payments/{id}/confirm", post(handlers::rentals::confirm_payment))
        .route("/rentals/payments/{id}/cancel", post(handlers::rentals::cancel_payment))
        .route("/rentals/payments/{id}/receipt", get(handlers::rentals::payment_receipt))
        .route("/rentals/alerts", get(handlers::rentals::list_alerts))
        .route(
            "/rentals/alert-configs",
            get(handlers::rentals::list_alert_configs).post(handlers::rentals::create_alert_config),
        )
        .route("/rentals/alert-configs/{id}", patch(handlers::rentals::update_alert_config))
        // Configurações
        .route(
            "/settings",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api", protected)
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env()?;
    let app_state = AppState::new(&settings).await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let app = app_router(app_state);

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
