use anyhow::Context;

use rolegate_api::app::{self, AppServices};
use rolegate_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env()?;
    rolegate_observability::init(config.log_format);

    if config.uses_dev_secret() {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let services = match &config.database_url {
        Some(url) => AppServices::postgres(url).await?,
        None => {
            let (services, demo) = AppServices::in_memory_seeded()
                .await
                .context("failed to seed in-memory stores")?;
            tracing::info!(
                admin_user_id = %demo.admin.id,
                user_id = %demo.user.id,
                "running on seeded in-memory stores"
            );
            services
        }
    };

    let app = app::build_app(&config.jwt_secret, services);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
