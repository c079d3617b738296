//! Standalone mock server for trying requests by hand.
//!
//! Listens on `127.0.0.1:$PORT` (3000 when unset or not a port number).

use std::net::SocketAddr;

use tokio::net::TcpListener;

const DEFAULT_PORT: u16 = 3000;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port))).await?;
    let addr = listener.local_addr()?;
    println!("mock server listening on http://{addr}/");
    println!("routes: /users /echo /status/{{code}} /basic-auth /xml /latin1 /bytes/{{len}} /redirect");
    mock_server::run(listener).await
}
