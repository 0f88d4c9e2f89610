//! TCP Command Server
//!
//! Owns the listening socket for the line protocol and spawns one task per
//! accepted connection. A semaphore caps the number of live connections.
//! A client that arrives while every slot is taken is answered with
//! `ERROR server busy` and closed straight away.

use crate::commands::CommandHandler;
use crate::connection::{handle_connection, ConnectionConfig, ConnectionStats};
use crate::protocol::Response;
use crate::storage::StorageEngine;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Default cap on concurrent TCP connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 1024;

/// Accept loop for the line protocol.
pub struct TcpServer {
    listener: TcpListener,
    storage: Arc<StorageEngine>,
    config: ConnectionConfig,
    stats: Arc<ConnectionStats>,
    limit: Arc<Semaphore>,
}

impl TcpServer {
    /// Binds the listener. Use port 0 to pick an ephemeral port.
    pub async fn bind(
        addr: impl ToSocketAddrs,
        storage: Arc<StorageEngine>,
        config: ConnectionConfig,
        max_connections: usize,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, storage, config, max_connections))
    }

    /// Wraps an already bound listener.
    pub fn from_listener(
        listener: TcpListener,
        storage: Arc<StorageEngine>,
        config: ConnectionConfig,
        max_connections: usize,
    ) -> Self {
        Self {
            listener,
            storage,
            config,
            stats: Arc::new(ConnectionStats::new()),
            limit: Arc::new(Semaphore::new(max_connections.max(1))),
        }
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared connection statistics.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// Connections already in flight keep running until their client leaves
    /// or their own timeouts fire.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        if let Ok(addr) = self.listener.local_addr() {
            info!(addr = %addr, "TCP command server listening");
        }

        loop {
            let (stream, addr) = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                        continue;
                    }
                },
                _ = &mut shutdown => break,
            };

            let Ok(permit) = Arc::clone(&self.limit).try_acquire_owned() else {
                warn!(client = %addr, "Connection limit reached, refusing client");
                self.stats.connection_refused();
                tokio::spawn(refuse_busy(stream, addr, self.config.write_timeout));
                continue;
            };

            let handler = CommandHandler::new(Arc::clone(&self.storage));
            let config = self.config.clone();
            let stats = Arc::clone(&self.stats);

            tokio::spawn(async move {
                handle_connection(stream, addr, handler, config, stats).await;
                drop(permit);
            });
        }

        info!("TCP command server stopped accepting connections");
    }
}

/// Tells an over-limit client the server is busy, then hangs up.
async fn refuse_busy(mut stream: TcpStream, addr: SocketAddr, write_timeout: Duration) {
    let reply = Response::error("server busy").serialize();
    let write = async {
        stream.write_all(&reply).await?;
        stream.shutdown().await
    };

    match tokio::time::timeout(write_timeout, write).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(client = %addr, error = %e, "Failed to refuse client"),
        Err(_) => debug!(client = %addr, "Timed out refusing client"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn one_shot(addr: SocketAddr, command: &[u8]) -> String {
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(command).await.unwrap();
        let mut buf = [0u8; 256];
        let n = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    }

    #[tokio::test]
    async fn test_server_shares_store_across_connections() {
        let storage = Arc::new(StorageEngine::new());
        let server = TcpServer::bind(
            "127.0.0.1:0",
            Arc::clone(&storage),
            ConnectionConfig::default(),
            DEFAULT_MAX_CONNECTIONS,
        )
        .await
        .unwrap();
        let addr = server.local_addr().unwrap();
        let (_tx, rx) = oneshot::channel::<()>();
        tokio::spawn(server.run(async {
            let _ = rx.await;
        }));

        assert_eq!(one_shot(addr, b"SET hello moto\n").await, "OK\n");
        assert_eq!(one_shot(addr, b"GET hello\n").await, "moto\n");
        assert_eq!(storage.get("hello"), Some("moto".to_string()));
    }

    #[tokio::test]
    async fn test_over_limit_client_is_refused_promptly() {
        let storage = Arc::new(StorageEngine::new());
        let server = TcpServer::bind(
            "127.0.0.1:0",
            storage,
            ConnectionConfig::default(),
            1,
        )
        .await
        .unwrap();
        let addr = server.local_addr().unwrap();
        let stats = server.stats();
        let (_tx, rx) = oneshot::channel::<()>();
        tokio::spawn(server.run(async {
            let _ = rx.await;
        }));

        // Hold the only slot with a live, chatty client
        let mut holder = TcpStream::connect(addr).await.unwrap();
        holder.write_all(b"PING\n").await.unwrap();
        let mut buf = [0u8; 16];
        let n = holder.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"PONG\n");

        // The next client is answered and closed well within the timeouts
        let mut refused = TcpStream::connect(addr).await.unwrap();
        let mut reply = Vec::new();
        tokio::time::timeout(Duration::from_secs(2), refused.read_to_end(&mut reply))
            .await
            .expect("over-limit client was left hanging")
            .unwrap();
        assert_eq!(reply, b"ERROR server busy\n");
        assert_eq!(stats.connections_refused.load(Ordering::Relaxed), 1);

        // The holder is unaffected
        holder.write_all(b"PING\n").await.unwrap();
        let n = holder.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"PONG\n");

        // Once the slot frees up, new clients get in again
        drop(holder);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(one_shot(addr, b"PING\n").await, "PONG\n");
    }

    #[tokio::test]
    async fn test_shutdown_stops_accepting() {
        let storage = Arc::new(StorageEngine::new());
        let server = TcpServer::bind(
            "127.0.0.1:0",
            storage,
            ConnectionConfig::default(),
            DEFAULT_MAX_CONNECTIONS,
        )
        .await
        .unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run(async {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("server did not stop")
            .unwrap();
    }
}
