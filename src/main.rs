use contentgen::app::build_orchestrator;
use contentgen::config::AppConfig;
use contentgen::logging::{init_logging, LogFormat};
use contentgen::routes::configure_routes;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let format = match LogFormat::from_env() {
        Ok(format) => format,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    if let Err(e) = init_logging(format) {
        eprintln!("{}", e);
        std::process::exit(2);
    }

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(2);
        }
    };

    let orchestrator = match build_orchestrator(&config).await {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!(error = %e, "failed to build generation pipeline");
            std::process::exit(1);
        }
    };

    let routes = configure_routes(orchestrator.clone());
    let bind_addr = config.server.bind_addr;

    info!("Starting server on http://{}", bind_addr);
    tokio::select! {
        _ = warp::serve(routes).run(bind_addr) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    orchestrator.shutdown().await;
    info!("server stopped");
}
