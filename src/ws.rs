//! Websocket transport
//!
//! Connects to the game server and pumps frames between the socket and a
//! connection's [`Link`]. The socket is split into a reader task, which
//! decodes and enqueues inbound text, and a writer task, which drains the
//! outbound queue. Neither task touches session state.

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite};

use crate::{
    codec::Message,
    connection::{Link, Outgoing},
};

/// Failure to establish the websocket
#[derive(Debug, Error)]
pub enum TransportError {
    /// The handshake with the server failed
    #[error("cannot connect to {url}: {source}")]
    Connect {
        /// The server address
        url: String,
        /// The websocket error
        #[source]
        source: tungstenite::Error,
    },
}

/// Handles to the running pump tasks
#[derive(Debug)]
pub struct Transport {
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Transport {
    /// Waits for both pumps to finish
    pub async fn join(self) {
        let (reader, writer) = tokio::join!(self.reader, self.writer);

        for (pump, result) in [("reader", reader), ("writer", writer)] {
            match result {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => tracing::debug!(pump, "websocket pump aborted"),
                Err(e) => tracing::warn!(pump, error = %e, "websocket pump failed"),
            }
        }
    }

    /// Stops both pumps without a closing handshake
    pub fn abort(&self) {
        self.reader.abort();
        self.writer.abort();
    }
}

/// Opens a websocket to `url` and starts pumping frames for `link`
///
/// The link's inbox receives `Opened` once the handshake succeeds and
/// exactly one `Closed` when the socket ends for any reason, including a
/// failed handshake.
///
/// # Errors
///
/// Returns [`TransportError::Connect`] if the handshake fails.
pub async fn connect<E>(url: &str, link: Link<E>) -> Result<Transport, TransportError>
where
    E: Message + Send + 'static,
{
    let Link { inbox, mut outbox } = link;

    let stream = match connect_async(url).await {
        Ok((stream, _response)) => stream,
        Err(source) => {
            inbox.closed(source.to_string());
            return Err(TransportError::Connect {
                url: url.to_string(),
                source,
            });
        }
    };

    tracing::info!(url, "websocket connected");
    inbox.opened();

    let (mut sink, mut stream) = stream.split();

    let writer_inbox = inbox.clone();
    let writer = tokio::spawn(async move {
        while let Some(outgoing) = outbox.recv().await {
            match outgoing {
                Outgoing::Frame(frame) => {
                    if let Err(e) = sink.send(tungstenite::Message::text(frame)).await {
                        tracing::warn!(error = %e, "websocket write failed");
                        writer_inbox.closed(e.to_string());
                        return;
                    }
                }
                Outgoing::Close => break,
            }
        }

        tracing::debug!("closing websocket");
        if let Err(e) = sink.close().await {
            tracing::debug!(error = %e, "websocket close handshake failed");
        }
    });

    let reader = tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(tungstenite::Message::Text(text)) => inbox.received(text.as_str()),
                Ok(tungstenite::Message::Close(frame)) => {
                    let reason = frame
                        .map(|frame| frame.reason.to_string())
                        .filter(|reason| !reason.is_empty())
                        .unwrap_or_else(|| "closed by server".to_string());
                    inbox.closed(reason);
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "websocket read failed");
                    inbox.closed(e.to_string());
                    return;
                }
            }
        }
        inbox.closed("connection ended");
    });

    Ok(Transport { reader, writer })
}
