use log::info;
use std::sync::Arc;

use range_stream_proxy::config::{self, AppState, Config};
use range_stream_proxy::{logger, server, source};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg.logging)?;

    // Worker threads default to the number of CPU cores
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let source = source::from_config(&cfg.source)?;
    let listener = server::create_listener(addr)?;
    logger::log_server_start(&addr, &cfg);

    let state = Arc::new(AppState::new(cfg, source));
    server::run(listener, state, server::shutdown_signal()).await;

    info!("Server stopped");
    Ok(())
}
