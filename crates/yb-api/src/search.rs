//! WebSocket bridge for search sessions.
//!
//! The socket is split into a reader task feeding the session's inbound
//! channel and a writer task draining its outbound channel. The session
//! itself only ever sees a `ChannelTransport`. Both socket tasks run apart
//! from the scan, so a client close drops the outbound receiver while the
//! scan is still going and the session's disconnect probe sees it.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;
use yb_core::search::{ChannelTransport, SearchSession, SessionSummary, SEARCH_BATCH_SIZE};

use crate::error::ApiError;
use crate::AppState;

/// `GET /yell/search/{query}`: the snapshot is taken before the upgrade so a
/// storage failure still surfaces as a plain HTTP error.
pub async fn search_socket(
    State(state): State<AppState>,
    Path(query): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let session = state.search.open(&query).await?;
    Ok(ws.on_upgrade(move |socket| serve_session(socket, session)))
}

async fn serve_session(socket: WebSocket, session: SearchSession) {
    let (sink, stream) = socket.split();
    let summary = bridge(sink, stream, session).await;
    debug!(
        session_id = %summary.session_id,
        end = ?summary.end,
        "search socket closed"
    );
}

/// Runs one session over the two halves of a text-frame socket.
pub async fn bridge<Tx, Rx, E>(
    mut sink: Tx,
    mut stream: Rx,
    session: SearchSession,
) -> SessionSummary
where
    Tx: Sink<Message> + Unpin + Send + 'static,
    Rx: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Send + 'static,
{
    let (inbound_tx, inbound_rx) = mpsc::channel::<String>(SEARCH_BATCH_SIZE);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(SEARCH_BATCH_SIZE + 1);
    let session_id = session.id();

    let mut reader = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => {
                    if inbound_tx.send(text.as_str().to_owned()).await.is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut reader => {
                    debug!(%session_id, "client stopped reading");
                    break;
                }
                next = outbound_rx.recv() => match next {
                    Some(value) => {
                        if sink.send(Message::Text(value.into())).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        let _ = sink.close().await;
                        break;
                    }
                },
            }
        }
        // Dropping the receiver here is what the scan's probe observes.
        drop(outbound_rx);
        reader.abort();
    });

    // The transport is dropped when the session returns, which closes the
    // outbound channel and lets the writer shut the socket.
    let mut transport = ChannelTransport::new(inbound_rx, outbound_tx);
    let summary = session.run(&mut transport).await;
    drop(transport);

    if let Err(err) = writer.await {
        debug!(%session_id, error = %err, "search socket writer ended abnormally");
    }
    summary
}
