use tokio::net::TcpListener;

use sim::{serve, SimConfig};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8893".to_string());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "controller simulator listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::info!(%peer, "driver connected");
        tokio::spawn(async move {
            if let Err(e) = serve(stream, SimConfig::default()).await {
                tracing::warn!(%peer, error = %e, "connection ended with error");
            } else {
                tracing::info!(%peer, "driver disconnected");
            }
        });
    }
}
