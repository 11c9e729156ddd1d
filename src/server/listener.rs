use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::http::connection::Connection;
use crate::router::ConnectionContext;
use crate::server::HttpService;

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.server.listen_addr).await?;
    info!("Listening on {}", cfg.server.listen_addr);

    serve(listener, Arc::new(HttpService::from_config(cfg))).await
}

/// Accepts connections on `listener` until accepting fails.
pub async fn serve(listener: TcpListener, service: Arc<HttpService>) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        info!("Accepted connection from {}", peer);

        let service = Arc::clone(&service);
        tokio::spawn(async move {
            let context = ConnectionContext { peer: Some(peer) };
            let conn = Connection::new(socket, service, context);
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
