use assessment_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::cors::permissive_cors,
    routes, AppState,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("assessment_backend=info,tower_http=info")),
        )
        .init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    {
        let results = app_state.results.clone();
        let interval = Duration::from_secs(config.status_prune_interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                match results
                    .prune_expired_statuses(assessment_backend::utils::time::now())
                    .await
                {
                    Ok(0) => {}
                    Ok(pruned) => info!(pruned, "Expired test statuses removed"),
                    Err(e) => tracing::error!(error = ?e, "Status pruning error"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    let app = routes::app(app_state)
        .layer(permissive_cors())
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.server_address).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
