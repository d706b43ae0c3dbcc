//! `serve` command — start the HTTP gateway.

use heatline_config::AppConfig;

pub async fn run(mut config: AppConfig, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port {
        config.gateway.port = port;
    }

    heatline_gateway::start(config).await
}
