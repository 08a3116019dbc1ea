//! Wire protocol server
//!
//! A single `POST /` endpoint. The body is a request envelope, the answer is
//! always HTTP 200 with a response envelope; detailed failure reasons are
//! only logged.

mod dispatch;

pub use dispatch::dispatch;

use crate::broker::Broker;
use crate::wire::WireResponse;
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use std::future::Future;
use tokio::net::TcpListener;

async fn handle(State(broker): State<Broker>, body: Bytes) -> Json<WireResponse> {
    Json(dispatch(&broker, &body).await)
}

/// Router serving the endpoint from `broker`
pub fn build_router(broker: Broker) -> Router {
    Router::new().route("/", post(handle)).with_state(broker)
}

/// Serve on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, broker: Broker, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener.local_addr()?;
    log::info!("Listening on {}", local_addr);

    axum::serve(listener, build_router(broker).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    log::info!("Server on {} stopped", local_addr);
    Ok(())
}

#[cfg(test)]
mod tests;
