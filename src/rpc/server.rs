//! The serve loop: framed reader, concurrent handler tasks, single writer.
//!
//! The reader never blocks on a handler; each request runs in its own task
//! and sends its response through one mpsc channel to the writer task, the
//! only owner of the output stream. Frames are written and flushed whole,
//! so concurrent completions cannot interleave mid-line. The writer drains
//! its channel completely before exiting, which is what guarantees a
//! `shutdown` acknowledgement reaches the host before the process ends.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::{FutureExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, warn};

use crate::rpc::codec::{Frame, RpcCodec};
use crate::rpc::command::Command;
use crate::rpc::dispatch::dispatch;
use crate::rpc::message::{
    parse_request, Response, CODE_PARSE_ERROR, CODE_REQUEST_FAILED, UNKNOWN_ID,
};
use crate::state::AgentState;
use crate::AgentError;

/// Buffered responses between handler tasks and the writer.
const RESPONSE_CHANNEL_CAPACITY: usize = 64;

/// Serve the request stream until shutdown, EOF, or cancellation.
///
/// Generic over the stream halves so tests can drive the full loop over an
/// in-memory duplex; production passes stdin and stdout.
pub async fn serve<R, W>(state: Arc<AgentState>, input: R, output: W)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let cancel = state.shutdown_token();
    let (response_tx, response_rx) = mpsc::channel::<Response>(RESPONSE_CHANNEL_CAPACITY);
    let writer_task = tokio::spawn(run_writer(output, response_rx));

    let max_line_bytes = state.config.protocol.max_line_bytes;
    let mut frames = FramedRead::new(input, RpcCodec::new(max_line_bytes));
    let mut handlers: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                info!("shutdown requested; stopping reader");
                break;
            }

            () = response_tx.closed() => {
                error!("response stream closed; stopping reader");
                break;
            }

            Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                if let Err(err) = joined {
                    error!(%err, "request task failed");
                }
            }

            maybe_frame = frames.next() => {
                match maybe_frame {
                    Some(Ok(Frame::Line(line))) => {
                        handle_line(&line, &state, &mut handlers, &response_tx).await;
                    }
                    Some(Ok(Frame::Oversized)) => {
                        // The codec has already dropped the line and resyncs
                        // at the next newline; answer and keep reading.
                        let err = AgentError::Protocol(format!(
                            "request line exceeds {max_line_bytes} bytes"
                        ));
                        warn!(%err, "rejecting oversized request line");
                        let response = Response::failure(
                            Value::String(UNKNOWN_ID.into()),
                            CODE_PARSE_ERROR,
                            &err,
                        );
                        if response_tx.send(response).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(err)) => {
                        error!(%err, "transport error; stopping reader");
                        break;
                    }
                    None => {
                        info!("input stream closed; shutting down");
                        break;
                    }
                }
            }
        }
    }

    state.begin_shutdown();

    // Abort anything still in flight; queued responses (the shutdown ack
    // included) are already in the channel and will be drained.
    handlers.shutdown().await;
    drop(response_tx);
    if let Err(err) = writer_task.await {
        error!(%err, "writer task failed");
    }
}

/// Parse one line and spawn its handler task.
async fn handle_line(
    line: &str,
    state: &Arc<AgentState>,
    handlers: &mut JoinSet<()>,
    response_tx: &mpsc::Sender<Response>,
) {
    if line.trim().is_empty() {
        return;
    }

    let envelope = match parse_request(line) {
        Ok(envelope) => envelope,
        Err(failure) => {
            warn!(error = %failure.error, "rejecting malformed request line");
            let response = Response::failure(failure.id, CODE_PARSE_ERROR, &failure.error);
            if response_tx.send(response).await.is_err() {
                warn!("response channel closed before delivery");
            }
            return;
        }
    };

    let command = match Command::parse(&envelope.method, envelope.params) {
        Ok(command) => command,
        Err(err) => {
            warn!(method = %envelope.method, %err, "rejecting request");
            let response = Response::failure(envelope.id, CODE_REQUEST_FAILED, &err);
            if response_tx.send(response).await.is_err() {
                warn!("response channel closed before delivery");
            }
            return;
        }
    };

    debug!(method = command.method_name(), id = %envelope.id, "dispatching request");
    let is_shutdown = matches!(command, Command::Shutdown);
    let task_state = Arc::clone(state);
    let tx = response_tx.clone();
    let id = envelope.id;

    handlers.spawn(async move {
        let outcome = AssertUnwindSafe(dispatch(command, &task_state))
            .catch_unwind()
            .await;

        let response = match outcome {
            Ok(Ok(result)) => Response::success(id, result),
            Ok(Err(err)) => {
                warn!(%err, "request failed");
                Response::failure(id, CODE_REQUEST_FAILED, &err)
            }
            Err(_panic) => {
                error!("request handler panicked");
                let err = AgentError::Internal("request handler panicked".into());
                Response::failure(id, CODE_REQUEST_FAILED, &err)
            }
        };

        if tx.send(response).await.is_err() {
            warn!("response channel closed before delivery");
        }

        // Ordering: the ack was queued above, ahead of this cancellation,
        // and the writer drains its queue before the process exits.
        if is_shutdown {
            task_state.begin_shutdown();
        }
    });
}

/// Own the output stream: serialize, write, and flush one frame at a time
/// until every sender is gone.
async fn run_writer<W>(mut output: W, mut response_rx: mpsc::Receiver<Response>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = response_rx.recv().await {
        let mut payload = match serde_json::to_vec(&response) {
            Ok(payload) => payload,
            Err(err) => {
                error!(%err, "failed to serialize response; dropping frame");
                continue;
            }
        };
        payload.push(b'\n');

        if let Err(err) = output.write_all(&payload).await {
            error!(%err, "failed to write response; stopping writer");
            return;
        }
        if let Err(err) = output.flush().await {
            error!(%err, "failed to flush response stream; stopping writer");
            return;
        }
    }
}
