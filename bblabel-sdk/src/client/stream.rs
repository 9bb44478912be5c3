//! Live-update stream client.

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};
use reqwest::Client;
use url::Url;

use super::{ClientError, ensure_success};
use crate::sse::{CONNECTED_PREFIX, SseDecoder, SseMessage};

/// An item received on the live-update stream.
///
/// Keep-alive comments are filtered out before they reach the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The acknowledgement frame; carries the server-side connection id.
    Connected { connection_id: String },
    /// A named event with its JSON payload.
    Event {
        name: String,
        data: serde_json::Value,
    },
    /// The server announced it is closing the stream.
    Closing,
}

/// Opens `GET /sse/subscribe` streams.
#[derive(Debug, Clone)]
pub struct StreamClient {
    http: Client,
    base_url: Url,
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

struct DecodeState {
    body: ByteStream,
    decoder: SseDecoder,
    pending: VecDeque<StreamEvent>,
}

impl StreamClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Subscribe with an App Bridge session token, optionally scoped to a
    /// shop.
    ///
    /// The returned stream ends when the server closes the connection.
    pub async fn subscribe(
        &self,
        session_token: &str,
        shop: Option<&str>,
    ) -> Result<impl Stream<Item = Result<StreamEvent, ClientError>> + use<>, ClientError> {
        let mut url = self.base_url.join("/sse/subscribe")?;
        if let Some(shop) = shop {
            url.query_pairs_mut().append_pair("shop", shop);
        }

        let resp = self
            .http
            .get(url)
            .bearer_auth(session_token)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let resp = ensure_success(resp).await?;

        let state = DecodeState {
            body: Box::pin(resp.bytes_stream()),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
        };

        Ok(stream::unfold(state, |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Some((Ok(event), state));
                }
                let chunk = match state.body.next().await? {
                    Ok(chunk) => chunk,
                    Err(e) => return Some((Err(ClientError::Http(e)), state)),
                };
                let messages = match state.decoder.feed(&chunk) {
                    Ok(messages) => messages,
                    Err(e) => return Some((Err(ClientError::Stream(e)), state)),
                };
                state
                    .pending
                    .extend(messages.into_iter().filter_map(to_stream_event));
            }
        }))
    }
}

fn to_stream_event(message: SseMessage) -> Option<StreamEvent> {
    match message {
        SseMessage::Comment(text) if text == "closing" => Some(StreamEvent::Closing),
        SseMessage::Comment(_) => None,
        SseMessage::Event { event: None, data } => data
            .strip_prefix(CONNECTED_PREFIX)
            .map(|id| StreamEvent::Connected {
                connection_id: id.to_owned(),
            }),
        SseMessage::Event {
            event: Some(name),
            data,
        } => {
            let data = serde_json::from_str(&data).unwrap_or(serde_json::Value::String(data));
            Some(StreamEvent::Event { name, data })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sse::{PING_FRAME, connected_frame, encode_frame};

    #[test]
    fn pings_are_dropped_and_payloads_parsed() {
        let mut decoder = SseDecoder::new();
        let wire = format!(
            "{}{}{}",
            connected_frame("c1"),
            PING_FRAME,
            encode_frame(Some("product_created"), &serde_json::json!({"id": 1}))
        );
        let events: Vec<_> = decoder
            .feed(wire.as_bytes())
            .unwrap()
            .into_iter()
            .filter_map(to_stream_event)
            .collect();
        assert_eq!(
            events,
            vec![
                StreamEvent::Connected {
                    connection_id: "c1".into()
                },
                StreamEvent::Event {
                    name: "product_created".into(),
                    data: serde_json::json!({"id": 1})
                },
            ]
        );
    }
}
