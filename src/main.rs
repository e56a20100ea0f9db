use std::sync::Arc;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod routing;
mod server;
#[cfg(test)]
mod testing;

use error::ServerError;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::Config::load().map_err(ServerError::Config)?;
    logger::init(&cfg).map_err(ServerError::Logger)?;

    // Site root must exist before binding
    let site = routing::SiteRoot::open(&cfg.site)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        logger::log_info(&format!("Using {workers} worker threads"));
    } else {
        logger::log_info("Using default worker threads (CPU cores)");
    }

    let runtime = runtime_builder.build().map_err(ServerError::Runtime)?;
    runtime.block_on(async_main(cfg, site))?;
    Ok(())
}

async fn async_main(cfg: config::Config, site: routing::SiteRoot) -> Result<(), ServerError> {
    let addr = cfg.get_socket_addr().map_err(ServerError::Address)?;
    let listener = server::create_reusable_listener(addr)
        .map_err(|source| ServerError::Bind { addr, source })?;

    let bound = listener.local_addr().unwrap_or(addr);
    logger::log_server_start(&bound, &cfg, site.root());

    let state = Arc::new(config::AppState::new(cfg, site));
    let signals = Arc::new(server::signal::SignalHandler::new());
    server::signal::start_signal_handler(Arc::clone(&signals));

    server::run_server_loop(listener, state, signals).await;
    Ok(())
}
