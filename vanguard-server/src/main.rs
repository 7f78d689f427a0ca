use std::net::SocketAddr;

use clap::Parser;
use log::info;
use vanguard::cluster::ClusterSet;
use vanguard::config::{self, Config};
use vanguard::models::Category;
use vanguard::notify::NotifierClient;
use vanguard::storage;
use vanguard_server::{build_cors, router, AppState};

#[derive(Parser, Debug)]
#[command(name = "vanguard-server", version, about = "Vanguard announcement platform API")]
struct Args {
    /// Address to listen on (overrides VANGUARD_BIND)
    #[arg(long)]
    bind: Option<String>,
    /// Default page size (overrides VANGUARD_PER_PAGE)
    #[arg(long)]
    per_page: Option<usize>,
    /// Clustered category slug; repeatable (overrides VANGUARD_CLUSTERED_CATEGORIES)
    #[arg(long = "clustered")]
    clustered: Vec<String>,
    /// Category to create at startup as `slug` or `slug:Name`; repeatable
    #[arg(long = "category", default_values_t = ["news:News".to_string(), "shipped:Shipped".to_string()])]
    categories: Vec<String>,
}

fn parse_category(raw: &str) -> Category {
    let (slug, name) = raw.split_once(':').unwrap_or((raw, raw));
    Category { slug: slug.trim().to_ascii_lowercase(), name: name.trim().to_string() }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut cfg = Config::from_env()?;
    if let Some(bind) = args.bind {
        cfg.bind = bind;
    }
    if let Some(per_page) = args.per_page {
        cfg.per_page = config::parse_per_page("--per-page", &per_page.to_string())?;
    }
    if !args.clustered.is_empty() {
        cfg.clustered = ClusterSet::new(args.clustered);
    }

    // Storage (in-memory by default)
    let store = storage::new_store()?;
    for raw in &args.categories {
        store.upsert_category(parse_category(raw))?;
    }

    let notifier = NotifierClient::new(&cfg.notify)?;
    if !notifier.webhook_enabled() {
        info!("no webhook configured; publish notifications are logged only");
    }

    let cors = build_cors(&cfg.cors_origins);
    let app = router(AppState::new(store, notifier, &cfg)).layer(cors);

    let addr: SocketAddr = cfg.bind.parse()?;
    let clustered = cfg.clustered.slugs().collect::<Vec<_>>().join(",");
    info!("vanguard-server on http://{addr}/ (page size {}, clustered: {clustered})", cfg.per_page);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown = async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutting down");
    };
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(())
}
