//! WebSocket connection handlers.

use std::{sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{ChatEvent, ChatId, ConnectionId, Identity},
    infrastructure::dto::websocket::{ClientEventDto, RoomPayload},
    ui::state::AppState,
    usecase::UseCaseError,
};

const MIN_PING_INTERVAL: Duration = Duration::from_millis(100);

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

/// `GET /ws?token=<token>`
///
/// トークンはアップグレード前に検証する。失敗した場合は 401 を返し、接続は登録されない。
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let token = query.token.unwrap_or_default();
    let identity = match state.token_verifier.verify(&token) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!("Rejected WebSocket handshake: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, identity)))
}

/// Spawns a task that writes queued events to the WebSocket and pings periodically.
///
/// The task ends when the channel closes (the connection was unregistered) or
/// when a write fails.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
    ping_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ping_interval.max(MIN_PING_INTERVAL));
        // 最初の tick は即座に完了する
        ticker.tick().await;
        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else { break };
                    if sender.send(Message::Text(msg.into())).await.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, identity: Identity) {
    let connection_id = ConnectionId::generate();
    let (tx, rx) = mpsc::unbounded_channel();
    let user_id = identity.user_id.clone();

    if let Err(e) = state
        .connect_user_usecase
        .execute(identity, connection_id, tx)
        .await
    {
        tracing::error!("Failed to register connection for '{}': {}", user_id, e);
        return;
    }

    let (sender, mut receiver) = socket.split();
    let idle_timeout = state.idle_timeout;

    // Spawn a task to receive events from this client
    let state_clone = state.clone();
    let mut recv_task = tokio::spawn(async move {
        loop {
            // pong を含め、何かを受信すればアイドルではない
            let msg = match tokio::time::timeout(idle_timeout, receiver.next()).await {
                Err(_) => {
                    tracing::info!("Connection '{}' idle for {:?}, closing", connection_id, idle_timeout);
                    break;
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    tracing::warn!("WebSocket error on '{}': {}", connection_id, e);
                    break;
                }
                Ok(Some(Ok(msg))) => msg,
            };

            match msg {
                Message::Text(text) => {
                    handle_client_event(&state_clone, &connection_id, text.as_str()).await;
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", connection_id);
                    break;
                }
                _ => {}
            }
        }
    });

    // Spawn a task to push events from the server to this client
    let mut send_task = pusher_loop(rx, sender, idle_timeout / 2);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // 後処理は独立したタスクで最後まで実行する（このタスクが中断されても続行される）
    let cleanup = tokio::spawn(async move {
        state
            .disconnect_user_usecase
            .execute(&connection_id)
            .await
    });
    if let Err(e) = cleanup.await {
        tracing::error!("Cleanup of connection '{}' failed: {}", connection_id, e);
    }
}

/// クライアントイベントを処理し、拒否した場合は発信元の接続に `error` を返す
async fn handle_client_event(state: &AppState, connection_id: &ConnectionId, text: &str) {
    let result = match serde_json::from_str::<ClientEventDto>(text) {
        Ok(event) => dispatch(state, connection_id, event).await,
        Err(e) => Err(UseCaseError::InvalidInput(format!("malformed event: {}", e))),
    };

    if let Err(e) = result {
        tracing::debug!("Rejected event from '{}': {}", connection_id, e);
        let event = ChatEvent::Error {
            message: e.to_string(),
        };
        if let Err(e) = state.message_pusher.push_to(connection_id, &event).await {
            tracing::warn!("Failed to report error to '{}': {}", connection_id, e);
        }
    }
}

async fn dispatch(
    state: &AppState,
    connection_id: &ConnectionId,
    event: ClientEventDto,
) -> Result<(), UseCaseError> {
    match event {
        ClientEventDto::JoinRoom(payload) => {
            state
                .room_subscription_usecase
                .join(connection_id, chat_id(&payload)?)
                .await
        }
        ClientEventDto::LeaveRoom(payload) => {
            state
                .room_subscription_usecase
                .leave(connection_id, chat_id(&payload)?)
                .await
        }
        ClientEventDto::TypingStart(payload) => {
            state
                .typing_usecase
                .execute(connection_id, chat_id(&payload)?, true)
                .await
        }
        ClientEventDto::TypingStop(payload) => {
            state
                .typing_usecase
                .execute(connection_id, chat_id(&payload)?, false)
                .await
        }
    }
}

fn chat_id(payload: &RoomPayload) -> Result<ChatId, UseCaseError> {
    Ok(ChatId::parse(&payload.chat_id)?)
}
