//! Minimal HTTP/1.1 front for the charge trigger.
//!
//! Every connection is one trigger attributed to the peer's IP. The request
//! line, headers and any body are read and ignored; the reply is the
//! trigger's JSON body with `Connection: close`.

use crate::trigger::{ChargeTrigger, TriggerResponse};
use anyhow::{Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use subscription_sdk::{ChargeSigner, SolConnection};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const MAX_REQUEST_HEAD: usize = 8 * 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(5);

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        409 => "Conflict",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Unknown",
    }
}

/// Serialize `response` as a complete HTTP/1.1 message.
pub fn render_http(response: &TriggerResponse) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(&response.body)?;

    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n",
        response.status,
        reason_phrase(response.status),
        body.len()
    );
    if let Some(secs) = response.retry_after_secs {
        head.push_str(&format!("Retry-After: {secs}\r\n"));
    }
    head.push_str("Connection: close\r\n\r\n");

    let mut out = head.into_bytes();
    out.extend(body);
    Ok(out)
}

/// Resolve once `signal` fires. A signal that could not be installed never
/// resolves, so the server keeps running instead of stopping at once.
pub async fn shutdown_on(signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = signal.await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

/// Accept triggers on `listener` until `shutdown` resolves.
pub async fn serve<C, S>(
    listener: TcpListener,
    trigger: Arc<ChargeTrigger<C, S>>,
    shutdown: impl Future<Output = ()>,
) -> Result<()>
where
    C: SolConnection + 'static,
    S: ChargeSigner + 'static,
{
    let local = listener.local_addr().context("Failed to read listener address")?;
    tracing::info!(%local, "charge trigger listening");
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((socket, peer)) => {
                        let trigger = Arc::clone(&trigger);
                        tokio::spawn(async move {
                            if let Err(e) = answer(socket, peer, &trigger).await {
                                tracing::warn!(%peer, "trigger connection failed: {e:#}");
                            }
                        });
                    }
                    Err(e) => tracing::error!("accept failed: {e}"),
                }
            }
            _ = &mut shutdown => {
                tracing::info!("charge trigger stopped");
                return Ok(());
            }
        }
    }
}

async fn answer<C, S>(mut socket: TcpStream, peer: SocketAddr, trigger: &ChargeTrigger<C, S>) -> Result<()>
where
    C: SolConnection,
    S: ChargeSigner,
{
    tokio::time::timeout(READ_TIMEOUT, drain_request_head(&mut socket))
        .await
        .context("timed out reading request")??;

    let response = trigger.handle(peer.ip()).await;
    socket.write_all(&render_http(&response)?).await?;
    socket.shutdown().await?;
    Ok(())
}

async fn drain_request_head(socket: &mut TcpStream) -> Result<()> {
    let mut head = Vec::with_capacity(512);
    let mut chunk = [0u8; 512];

    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&chunk[..n]);
        if head.len() > MAX_REQUEST_HEAD {
            anyhow::bail!("request head exceeds {MAX_REQUEST_HEAD} bytes");
        }
    }
    Ok(())
}
