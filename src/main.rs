use stageconnect_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes::{self, RouterOptions},
    AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(config.log_format.as_deref());

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool, config);
    info!(
        ownership = %config.offer_ownership,
        access_policy = ?config.access_policy,
        "lifecycle policies loaded"
    );

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        if let Err(e) = app_state
            .identity_service
            .bootstrap_admin(email, password, config.admin_name.as_deref())
            .await
        {
            tracing::error!(error = %e, "admin bootstrap failed");
        }
    }

    {
        let state = app_state.clone();
        tokio::spawn(async move {
            loop {
                match state.identity_service.purge_expired_sessions().await {
                    Ok(0) => {}
                    Ok(purged) => info!(purged, "expired sessions purged"),
                    Err(e) => tracing::error!(error = ?e, "session purge failed"),
                }
                tokio::time::sleep(SESSION_PURGE_INTERVAL).await;
            }
        });
    }

    let options = RouterOptions {
        public_rps: config.public_rps,
        api_rps: config.api_rps,
        cors_origin: config.cors_origin.clone(),
        uploads_dir: config.uploads_dir.clone(),
    };
    let app = routes::app(app_state, &options);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_tracing(format: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if format.is_some_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}
