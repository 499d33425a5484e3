use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn, Level};

use duty_journey::cache::{CacheOperations, MemoryCache, RedisClient};
use duty_journey::clients::SystemOfRecordClient;
use duty_journey::config::EnvironmentConfig;
use duty_journey::routes::create_app;
use duty_journey::services::SystemClock;
use duty_journey::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    let config = EnvironmentConfig::from_env()?;

    // Configurar logging
    let level = config.log_level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("🚚 Duty Journey - seguimiento de jornadas de conductores");
    info!("=======================================================");

    // Inicializar Redis, con fallback a memoria en desarrollo
    let cache: Arc<dyn CacheOperations> = match RedisClient::new(config.cache_config()).await {
        Ok(client) => {
            info!("✅ Redis conectado exitosamente");
            Arc::new(client)
        }
        Err(e) if config.is_development() => {
            warn!("⚠️ Redis no disponible ({}), usando cache en memoria", e);
            Arc::new(MemoryCache::new())
        }
        Err(e) => {
            error!("❌ Error conectando a Redis: {}", e);
            return Err(anyhow::anyhow!("Error de Redis: {}", e));
        }
    };

    let remote = SystemOfRecordClient::new(
        config.system_of_record_url.clone(),
        config.system_of_record_token.clone(),
        config.remote_timeout(),
    )?;
    info!("🔗 Sistema de registro: {}", config.system_of_record_url);

    let (app_state, outbox_worker) = AppState::new(
        config.clone(),
        cache,
        Arc::new(remote),
        Arc::new(SystemClock),
    );

    // Worker del outbox de eventos de pausa
    tokio::spawn(outbox_worker.run());

    // Reintento periódico de cierres pendientes y limpieza de sesiones ociosas
    let retry_state = app_state.clone();
    let retry_interval = config.finalize_retry_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(retry_interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let remaining = retry_state.retry_pending_finalizations().await;
            if remaining > 0 {
                warn!("⚠️ {} cierres de jornada siguen pendientes", remaining);
            }
            let evicted = retry_state.evict_idle_sessions().await;
            if evicted > 0 {
                info!("🧹 {} sesiones ociosas liberadas", evicted);
            }
        }
    });

    let app = create_app(app_state);
    let addr: SocketAddr = config.server_url().parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health");
    info!("   GET  /api/journey/:driver_id");
    info!("   POST /api/journey/:driver_id/vehicle");
    info!("   POST /api/journey/:driver_id/inspection/start");
    info!("   PUT  /api/journey/:driver_id/inspection/items/:item_id");
    info!("   POST /api/journey/:driver_id/inspection/complete");
    info!("   POST /api/journey/:driver_id/start | pause | resume | checkout | end | cancel | location");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("❌ Error del servidor: {}", e);
            e
        })?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
