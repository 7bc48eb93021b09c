use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, error, info, warn};

use crate::broker::Broker;
use crate::client::Client;
use crate::transport::handler::{ConnectionHandler, ConnectionState};
use crate::transport::io::write_packets;

/// Pause before retrying a failed accept.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Accepts connections on `listener` forever.
///
/// Each connection is registered with the broker right away and then served
/// on its own task. Accept failures are logged and retried.
pub async fn start_tcp_server(listener: TcpListener, broker: Arc<Broker>) {
    if let Ok(addr) = listener.local_addr() {
        info!("MQTT broker listening on {addr}");
    }

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept connection: {e}");
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                continue;
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle's algorithm for {peer}: {e}");
        }

        let (tx, rx) = mpsc::unbounded_channel::<Bytes>();
        let client = Arc::new(Client::new(tx));
        if let Err(e) = broker.register_client(client.clone()) {
            warn!("Rejecting connection from {peer}: {e}");
            continue;
        }
        debug!("Accepted {peer} as {}", client.id);

        tokio::spawn(serve_connection(stream, client, rx, broker.clone()));
    }
}

/// Serves one registered client over `stream` until the connection ends.
///
/// The write half goes to a writer task draining `packets`; the read half is
/// driven by a [`ConnectionHandler`]. A failed write deregisters the client,
/// which in turn stops the handler. Deregistration from anywhere stops both
/// tasks even if the peer has stopped reading.
pub async fn serve_connection<S>(
    stream: S,
    client: Arc<Client>,
    packets: UnboundedReceiver<Bytes>,
    broker: Arc<Broker>,
) -> ConnectionState
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, writer) = tokio::io::split(stream);

    let writer_task = {
        let broker = broker.clone();
        let client = client.clone();
        tokio::spawn(async move {
            if let Err(e) = write_packets(writer, packets, &client).await {
                warn!("Failed to write to client {}: {e}", client.id);
                broker.deregister_client(&client.id);
            }
        })
    };

    let state = ConnectionHandler::new(client, broker).run(reader).await;
    if let Err(e) = writer_task.await {
        error!("Writer task failed: {e}");
    }
    state
}
