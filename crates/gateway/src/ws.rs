//! `GET /ws`: the subscriber push channel.
//!
//! Each socket registers with the [`SubscriberRegistry`](opsweave_engine::SubscriberRegistry)
//! and forwards whatever the broadcaster queues for it. Inbound text is
//! logged and otherwise ignored.

use axum::{
    extract::State,
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
};
use tracing::{debug, info};

use crate::SharedState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: SharedState) {
    let mut sub = state.registry.connect();
    info!(subscriber = sub.id, "WebSocket connection established");

    loop {
        tokio::select! {
            outbound = sub.rx.recv() => {
                let Some(payload) = outbound else { break };
                if socket.send(WsMessage::Text((&*payload).into())).await.is_err() {
                    break; // client disconnected
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        debug!(subscriber = sub.id, len = text.as_str().len(), message = %text.as_str(), "Subscriber message ignored");
                    }
                    Some(Ok(WsMessage::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {} // binary, ping, pong
                }
            }
        }
    }

    state.registry.disconnect(sub.id);
    info!(subscriber = sub.id, "WebSocket connection closed");
}
