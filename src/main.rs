// src/main.rs

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use dripfeed::cache::{AppendCache, FileCache, RedisCache};
use dripfeed::config::Config;
use dripfeed::history::{FileHistory, HistoryStore, RedisHistory};
use dripfeed::llm::OpenAIClient;
use dripfeed::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(Config::from_env());

    // Log to a daily-rotated file alongside stdout.
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "app.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(file_writer.and(std::io::stdout))
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // The answer cache and history files share this directory.
    tokio::fs::create_dir_all(&config.cache_path).await?;

    let cache: Arc<dyn AppendCache>;
    let history: Arc<dyn HistoryStore>;
    match config.redis_url() {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            let conn = client.get_connection_manager().await?;
            info!(
                "using redis cache and history at {}:{}",
                config.redis_host.as_deref().unwrap_or_default(),
                config.redis_port
            );
            cache = Arc::new(RedisCache::new(conn.clone(), config.cache_ttl_secs));
            history = Arc::new(RedisHistory::new(conn, config.history_ttl_secs));
        }
        None => {
            info!("using file cache and history under {}", config.cache_path);
            cache = Arc::new(FileCache::new(&config.cache_path));
            history = Arc::new(FileHistory::new(&config.cache_path));
        }
    }

    let model = Arc::new(OpenAIClient::new(&config));

    server::run(config, cache, history, model).await
}
