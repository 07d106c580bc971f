// Connection handling module
// Serves a single accepted TCP connection with hyper's HTTP/1 driver

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Serve a connection in a task on the current `LocalSet`.
///
/// Keep-alive follows hyper's defaults; no read or write timeout is applied.
pub fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, state: Arc<AppState>) {
    tokio::task::spawn_local(async move {
        let io = TokioIo::new(stream);

        let service = service_fn(move |req| handler::handle_request(req, Arc::clone(&state), peer_addr));

        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
            // Clients closing mid-request are routine for a dev server
            if !err.is_incomplete_message() {
                logger::log_connection_error(&err);
            }
        }
    });
}
