//! # seed
//!
//! Bulk-loads generated boards (with a few replies each) into the configured
//! primary store in one transaction, then projects every board into the
//! search index. Usage: `seed [count]`, default 100.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration as Age;
use configs::{SearchBackend, Settings};
use domains::utils::{current_datetime, generate_external_id};
use domains::{Board, BoardRepository, Reply, SearchIndex};
use fake::faker::lorem::en::{Paragraph, Sentence, Word};
use fake::faker::name::en::Name;
use fake::Fake;
use secrecy::ExposeSecret;
use services::IndexSync;
use storage_adapters::sqlite::connect;
use storage_adapters::{InMemorySearchIndex, SqliteBoardRepository, SqliteSyncOutbox};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_COUNT: usize = 100;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load().context("loading settings")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log.level)),
        )
        .init();

    let count = match std::env::args().nth(1) {
        Some(arg) => arg.parse().with_context(|| format!("invalid count `{arg}`"))?,
        None => DEFAULT_COUNT,
    };

    let pool = connect(
        settings.database.url.expose_secret(),
        settings.database.max_connections,
    )
    .await
    .context("opening primary store")?;
    let store = Arc::new(SqliteBoardRepository::from_pool(pool.clone()));
    let index = search_index(&settings)?;
    let sync = IndexSync::new(store.clone(), index, Arc::new(SqliteSyncOutbox::new(pool)))
        .with_policy(settings.sync.policy);

    let now = current_datetime();
    let boards: Vec<Board> = (0..count)
        .map(|i| generated_board(now - Age::minutes((count - i) as i64)))
        .collect();
    let saved = store.insert_all(&boards).await.context("inserting boards")?;
    info!(count = saved.len(), "boards inserted");

    for board in &saved {
        sync.project(board)
            .await
            .with_context(|| format!("indexing board {}", board.bno))?;
    }
    let pending = sync.pending().await?;
    if pending > 0 {
        warn!(pending, "some boards were not indexed; the server reconciler will retry them");
    }
    info!(total = store.count().await?, "seed complete");
    Ok(())
}

fn generated_board(reg_date: chrono::NaiveDateTime) -> Board {
    let mut board = Board::new(
        generate_external_id(),
        Word().fake::<String>(),
        Sentence(3..8).fake::<String>(),
        Paragraph(1..3).fake::<String>(),
        Name().fake::<String>(),
        reg_date,
    );
    for _ in 0..(0..4).fake::<usize>() {
        board.attach_reply(Reply::new(
            board.bno.clone(),
            generate_external_id(),
            Sentence(4..10).fake::<String>(),
            Name().fake::<String>(),
            reg_date,
            true,
        ));
    }
    board
}

#[cfg(feature = "search-elastic")]
fn search_index(settings: &Settings) -> Result<Arc<dyn SearchIndex>> {
    use std::time::Duration;
    use storage_adapters::{ElasticsearchConfig, ElasticsearchIndex};

    let search = &settings.search;
    if search.backend == SearchBackend::Memory {
        return Ok(Arc::new(InMemorySearchIndex::new()));
    }
    let mut config = ElasticsearchConfig::new(&search.url, &search.index);
    config.username = search.username.clone();
    config.password = search
        .password
        .as_ref()
        .map(|p| p.expose_secret().to_owned().into());
    config.timeout = Duration::from_secs(search.timeout_secs);
    Ok(Arc::new(ElasticsearchIndex::new(config)?))
}

#[cfg(not(feature = "search-elastic"))]
fn search_index(settings: &Settings) -> Result<Arc<dyn SearchIndex>> {
    if settings.search.backend == SearchBackend::Elasticsearch {
        anyhow::bail!("search.backend = elasticsearch needs the `search-elastic` feature");
    }
    Ok(Arc::new(InMemorySearchIndex::new()))
}
