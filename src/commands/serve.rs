use crate::models::AppConfig;
use crate::server::{self, AppState};
use crate::services::{CachedSource, YahooClient};

pub async fn run(port: Option<u16>) {
    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    if let Some(port) = port {
        config.port = port;
    }

    println!("🚀 Starting monthly-variations server on port {}", config.port);
    println!(
        "📅 History window: {} → {} (last {} years per ticker)",
        config.history.start, config.history.end, config.row_window
    );
    if config.cache_ttl.is_zero() {
        println!("💾 Series cache: disabled");
    } else {
        println!("💾 Series cache: {}s TTL", config.cache_ttl.as_secs());
    }

    let client = match YahooClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("❌ Failed to create data source: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;
    let source = CachedSource::new(client, config.cache_ttl);
    let state = AppState::new(source, config);

    if let Err(e) = server::serve(state, port).await {
        eprintln!("❌ Server error: {}", e);
        std::process::exit(1);
    }
}
