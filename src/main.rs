use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use logos_bot::backend::lavalink::LavalinkBackend;
use logos_bot::config::Config;
use logos_bot::processor::QueueActionProcessor;
use logos_bot::store::memory::MemoryQueueStore;
use logos_bot::store::redis::RedisQueueStore;
use logos_bot::store::QueueStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("logos_bot=debug".parse()?),
        )
        .init();

    info!("🎵 Iniciando Logos Bot v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;

    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&config).await;
    }

    info!("{}", config.summary());

    // Store de colas: Redis compartido, o memoria para proceso único
    let store: Arc<dyn QueueStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisQueueStore::connect(url, config.queue_ttl_secs).await?),
        None => {
            warn!("⚠️ Sin REDIS_URL: store en memoria, sin procesos hermanos");
            Arc::new(MemoryQueueStore::new())
        }
    };

    // Backend de audio y canal de eventos
    let (backend, mut events) = LavalinkBackend::connect(&config).await?;
    let backend = Arc::new(backend);

    // Composición explícita: el procesador recibe sus colaboradores por trait
    let processor = Arc::new(QueueActionProcessor::new(store, backend));

    // Bomba de eventos: "track terminado" entra por el mismo camino que un
    // skip de usuario
    let pump = {
        let processor = Arc::clone(&processor);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                processor.handle_event(event).await;
            }
            warn!("Canal de eventos del backend cerrado");
        })
    };

    info!("🚀 Núcleo de colas iniciado");

    tokio::signal::ctrl_c().await?;
    info!("⚠️ Señal de shutdown recibida, cerrando...");
    pump.abort();

    Ok(())
}

/// Verifica las dependencias externas: Redis (si está configurado) y el
/// nodo Lavalink.
async fn health_check(config: &Config) -> Result<()> {
    if let Some(url) = &config.redis_url {
        let store = RedisQueueStore::connect(url, config.queue_ttl_secs).await?;
        store.ping().await?;
    }

    let (_backend, _events) = LavalinkBackend::connect(config).await?;

    println!("OK");
    Ok(())
}
