//! Live push connection for wishlist viewers.
//!
//! A viewer opens `/ws/{slug}` and receives every event emitted for that
//! wishlist as a JSON text frame. Inbound frames are read only to notice the
//! close. Private wishlists accept only their owner, identified the same way
//! as on the REST routes.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};

use crate::auth::Requester;
use crate::errors::AppError;
use crate::hub::{BroadcastHub, Subscriber};
use crate::AppState;

/// GET /ws/:slug - Upgrade to a push connection on the wishlist's topic.
pub async fn wishlist_socket(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    requester: Requester,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let wishlist = match state.repo.require_wishlist(&slug).await {
        Ok(wishlist) => wishlist,
        Err(e) => return e.into_response(),
    };
    if !wishlist.is_public && !requester.is(&wishlist.owner_id) {
        return AppError::Forbidden("This wishlist is private".to_string()).into_response();
    }
    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let hub = Arc::clone(&state.hub);
    let buffer = state.config.subscriber_buffer;
    ws.on_upgrade(move |socket| handle_socket(socket, hub, slug, buffer))
}

/// Pump hub events into the socket until either side goes away.
async fn handle_socket(socket: WebSocket, hub: Arc<BroadcastHub>, slug: String, buffer: usize) {
    let (subscriber, mut events) = Subscriber::channel(buffer);
    let subscriber_id = subscriber.id();
    hub.subscribe(&slug, subscriber);
    tracing::info!(
        topic = %slug,
        subscriber = %subscriber_id,
        viewers = hub.subscriber_count(&slug),
        "Viewer connected"
    );

    let (mut sender, mut receiver) = socket.split();

    // Ends when the hub drops this subscriber or the socket stops accepting writes.
    let mut send_task = tokio::spawn(async move {
        while let Some(payload) = events.recv().await {
            if sender
                .send(Message::Text(payload.to_string().into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => {
            tracing::debug!(subscriber = %subscriber_id, "Send task completed, aborting receive task");
            recv_task.abort();
        },
        _ = (&mut recv_task) => {
            tracing::debug!(subscriber = %subscriber_id, "Receive task completed, aborting send task");
            send_task.abort();
        },
    }

    hub.unsubscribe(&slug, subscriber_id);
    tracing::info!(
        topic = %slug,
        subscriber = %subscriber_id,
        live_topics = hub.topic_count(),
        "Viewer disconnected"
    );
}
