//! Runs one `StreamingClient` exchange to completion.
//!
//! Client events arrive on a channel and are collected until the client
//! reports the end of the exchange or the run is cancelled, whichever comes
//! first. The client is disconnected exactly once on every exit path.

use tokio::sync::mpsc;

use reqflow_core::{
    merge_stream_messages, ClientError, ClientEvent, ClientEventSink, Flow, HttpResponse,
    StreamMessage, StreamingClient,
};

use crate::context::ProcessorContext;
use crate::events::Event;
use crate::progress::Progress;

/// Owns the client until it has been disconnected.
struct ClientHandle {
    client: Option<Box<dyn StreamingClient>>,
}

impl ClientHandle {
    fn new(client: Box<dyn StreamingClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    fn get(&mut self) -> Result<&mut Box<dyn StreamingClient>, ClientError> {
        self.client.as_mut().ok_or(ClientError::NotConnected)
    }

    /// No-op after the first call.
    async fn disconnect(&mut self, error: Option<&ClientError>) {
        if let Some(mut client) = self.client.take() {
            client.disconnect(error).await;
        }
    }
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        let Some(mut client) = self.client.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move { client.disconnect(None).await });
            }
            Err(_) => tracing::warn!("client dropped outside a runtime without disconnecting"),
        }
    }
}

async fn wait_cancelled(progress: Option<&Progress>) {
    match progress {
        Some(progress) => progress.cancelled().await,
        None => std::future::pending().await,
    }
}

/// Connects, optionally sends `body`, and waits for the exchange to end.
///
/// Streaming clients yield the merged response of every message; unary
/// clients yield their last message. A cancelled run yields
/// `Flow::Cancelled` unless messages were already received, in which case
/// those are merged.
pub async fn drive(
    ctx: &ProcessorContext,
    client: Box<dyn StreamingClient>,
    body: Option<&str>,
) -> Result<Flow<HttpResponse>, ClientError> {
    let progress = ctx.progress.as_ref();
    let region = ctx.region.name().to_string();
    let streaming = client.supports_streaming();
    let send_after_connect = !client.sends_request_on_connect();
    tracing::debug!(region = %region, exchange = %client.report_message(), streaming, "connecting");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let sink = ClientEventSink::new(move |event| {
        // the receiver is gone once the exchange is over
        let _ = tx.send(event);
    });
    let mut handle = ClientHandle::new(client);

    let connected = {
        let client = handle.get()?;
        tokio::select! {
            biased;
            _ = wait_cancelled(progress) => None,
            result = client.connect(sink) => Some(result),
        }
    };
    match connected {
        None => {
            handle.disconnect(None).await;
            return Ok(Flow::Cancelled);
        }
        Some(Err(e)) => {
            handle.disconnect(Some(&e)).await;
            return Err(e);
        }
        Some(Ok(())) => {}
    }

    if send_after_connect {
        let sent = handle.get()?.send(body).await;
        if let Err(e) = sent {
            handle.disconnect(Some(&e)).await;
            return Err(e);
        }
    }

    let mut messages: Vec<StreamMessage> = Vec::new();
    let mut cancelled = false;
    loop {
        let event = tokio::select! {
            biased;
            _ = wait_cancelled(progress) => {
                cancelled = true;
                break;
            }
            event = rx.recv() => event,
        };
        match event {
            Some(ClientEvent::Message(message)) => {
                ctx.emit(Event::StreamMessage {
                    run_id: ctx.run_id,
                    region: region.clone(),
                    label: message.label.clone(),
                    status_code: message.response.status_code,
                })
                .await;
                messages.push(message);
            }
            Some(ClientEvent::Closed) | None => break,
        }
    }
    handle.disconnect(None).await;

    if cancelled {
        // keep what the client delivered before the cancellation was seen
        while let Ok(ClientEvent::Message(message)) = rx.try_recv() {
            messages.push(message);
        }
        tracing::debug!(region = %region, received = messages.len(), "exchange cancelled");
        if messages.is_empty() {
            return Ok(Flow::Cancelled);
        }
    }

    let response = if streaming {
        merge_stream_messages(&messages)
    } else {
        messages.pop().map(|m| m.response)
    };
    response
        .map(Flow::Continue)
        .ok_or_else(|| ClientError::Protocol("exchange ended without a response".to_string()))
}
