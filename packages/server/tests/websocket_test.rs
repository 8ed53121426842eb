//! End-to-end tests: the real router on an ephemeral port, driven over
//! WebSocket (tokio-tungstenite) and HTTP (reqwest).

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{EncodingKey, Header, encode};
use kidoku_server::{
    infrastructure::{
        auth::{Claims, JwtTokenVerifier},
        message_pusher::WebSocketMessagePusher,
        registry::InMemoryConnectionRegistry,
        repository::{InMemoryChatRepository, InMemoryMessageRepository, InMemoryUserRepository},
    },
    ui::{AppState, Collaborators, Server},
};
use kidoku_shared::time::SystemClock;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message},
};

const SECRET: &[u8] = b"integration-secret";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> SocketAddr {
    let state = AppState::new(
        Collaborators {
            chat_repository: Arc::new(InMemoryChatRepository::new()),
            message_repository: Arc::new(InMemoryMessageRepository::new()),
            user_repository: Arc::new(InMemoryUserRepository::new()),
            registry: Arc::new(InMemoryConnectionRegistry::new()),
            message_pusher: Arc::new(WebSocketMessagePusher::new()),
            token_verifier: Arc::new(JwtTokenVerifier::new(SECRET)),
            clock: Arc::new(SystemClock),
        },
        Duration::from_secs(60),
    );
    let router = Server::new(state).router();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn token(user: &str) -> String {
    let claims = Claims {
        sub: user.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        name: Some(format!("{} Example", user.to_uppercase())),
        email: Some(format!("{}@example.com", user)),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
}

async fn connect(addr: SocketAddr, user: &str) -> Socket {
    let url = format!("ws://{}/ws?token={}", addr, token(user));
    let (socket, _) = connect_async(url).await.unwrap();
    socket
}

/// 指定した種類のイベントが届くまで読み進める
async fn next_event(socket: &mut Socket, event_type: &str) -> Value {
    let wait = async {
        while let Some(frame) = socket.next().await {
            if let Message::Text(text) = frame.unwrap() {
                let event: Value = serde_json::from_str(text.as_str()).unwrap();
                if event["type"] == event_type {
                    return event["payload"].clone();
                }
            }
        }
        panic!("socket closed before '{}' arrived", event_type);
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for '{}'", event_type))
}

/// `user` についての `user:status` が届くまで読み進める
async fn next_status_of(socket: &mut Socket, user: &str) -> Value {
    loop {
        let status = next_event(socket, "user:status").await;
        if status["userId"] == user {
            return status;
        }
    }
}

/// ルームに参加し、サーバーが処理し終えるまで待つ
///
/// 同じ接続のイベントは順に処理されるので、続けて送った不正なフレームへの
/// `error` が届いた時点で参加は完了している。
async fn join_room(socket: &mut Socket, chat_id: &str) {
    let join = json!({"type": "join-room", "payload": {"chatId": chat_id}});
    socket.send(Message::Text(join.to_string().into())).await.unwrap();
    socket.send(Message::Text("barrier".into())).await.unwrap();
    next_event(socket, "error").await;
}

async fn open_direct_chat(http: &reqwest::Client, addr: SocketAddr, from: &str, to: &str) -> String {
    let response = http
        .post(format!("http://{}/api/chats", addr))
        .bearer_auth(token(from))
        .json(&json!({"userId": to}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let chat: Value = response.json().await.unwrap();
    chat["id"].as_str().unwrap().to_string()
}

async fn send_text(http: &reqwest::Client, addr: SocketAddr, from: &str, chat_id: &str, body: &str) -> Value {
    let response = http
        .post(format!("http://{}/api/messages", addr))
        .bearer_auth(token(from))
        .json(&json!({"chatId": chat_id, "content": body}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    response.json().await.unwrap()
}

#[tokio::test]
async fn test_absent_recipient_gets_unread_counter_until_read() {
    // テスト項目: 会話を開いていない相手には chat:update で未読数が届き、既読操作で 0 に戻る
    // given (前提条件):
    let addr = spawn_server().await;
    let http = reqwest::Client::new();
    let _alice = connect(addr, "alice").await;
    let mut bob = connect(addr, "bob").await;
    let chat_id = open_direct_chat(&http, addr, "alice", "bob").await;
    next_event(&mut bob, "chat:new").await;

    // when (操作):
    let message = send_text(&http, addr, "alice", &chat_id, "hi").await;

    // then (期待する結果):
    assert_eq!(message["readBy"], json!(["alice"]));
    let update = next_event(&mut bob, "chat:update").await;
    assert_eq!(update["chatId"], json!(chat_id));
    assert_eq!(update["unreadCounter"], json!(1));
    assert_eq!(update["lastMessage"]["content"], json!("hi"));

    // when (操作): bob が既読にする
    let response = http
        .put(format!("http://{}/api/messages/read", addr))
        .bearer_auth(token("bob"))
        .json(&json!({"chatId": chat_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // then (期待する結果):
    let messages: Value = http
        .get(format!("http://{}/api/messages/{}", addr, chat_id))
        .bearer_auth(token("bob"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(messages[0]["readBy"], json!(["alice", "bob"]));
    let chats: Value = http
        .get(format!("http://{}/api/chats", addr))
        .bearer_auth(token("bob"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(chats[0]["unreadCounters"]["bob"], json!(0));
}

#[tokio::test]
async fn test_viewing_recipient_reads_immediately() {
    // テスト項目: 会話を開いている相手には message:new が届き、既読者に含まれる
    // given (前提条件):
    let addr = spawn_server().await;
    let http = reqwest::Client::new();
    let _alice = connect(addr, "alice").await;
    let mut bob = connect(addr, "bob").await;
    let chat_id = open_direct_chat(&http, addr, "alice", "bob").await;
    join_room(&mut bob, &chat_id).await;

    // when (操作):
    send_text(&http, addr, "alice", &chat_id, "hi").await;

    // then (期待する結果):
    let message = next_event(&mut bob, "message:new").await;
    assert_eq!(message["readBy"], json!(["alice", "bob"]));
    let update = next_event(&mut bob, "chat:update").await;
    assert_eq!(update["unreadCounter"], json!(0));
}

#[tokio::test]
async fn test_outsider_cannot_join_room() {
    // テスト項目: メンバーでない会話のルームに参加しようとすると error が返る
    // given (前提条件):
    let addr = spawn_server().await;
    let http = reqwest::Client::new();
    let chat_id = open_direct_chat(&http, addr, "alice", "bob").await;
    let mut mallory = connect(addr, "mallory").await;

    // when (操作):
    let join = json!({"type": "join-room", "payload": {"chatId": chat_id}});
    mallory.send(Message::Text(join.to_string().into())).await.unwrap();

    // then (期待する結果):
    let error = next_event(&mut mallory, "error").await;
    assert!(error["message"].as_str().unwrap().contains("not a member"));
}

#[tokio::test]
async fn test_presence_follows_connections() {
    // テスト項目: 接続すると online、最後の接続を閉じると offline が他のユーザーに届く
    // given (前提条件):
    let addr = spawn_server().await;
    let mut observer = connect(addr, "dave").await;

    // when (操作):
    let mut carol = connect(addr, "carol").await;
    let online = next_status_of(&mut observer, "carol").await;
    carol.close(None).await.unwrap();
    let offline = next_status_of(&mut observer, "carol").await;

    // then (期待する結果):
    assert_eq!(online["userId"], json!("carol"));
    assert_eq!(online["status"], json!("online"));
    assert_eq!(offline["userId"], json!("carol"));
    assert_eq!(offline["status"], json!("offline"));
    assert!(offline["lastSeen"].is_string());
}

#[tokio::test]
async fn test_handshake_without_valid_token_is_rejected() {
    // テスト項目: トークンがない・不正なハンドシェイクは 401 で拒否される
    // given (前提条件):
    let addr = spawn_server().await;

    for url in [
        format!("ws://{}/ws", addr),
        format!("ws://{}/ws?token=not-a-jwt", addr),
    ] {
        // when (操作):
        let result = connect_async(url).await;

        // then (期待する結果):
        match result {
            Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 401),
            other => panic!("expected 401, got {:?}", other.map(|_| ())),
        }
    }
}

#[tokio::test]
async fn test_http_requires_bearer_token() {
    // テスト項目: 認証ヘッダのない HTTP リクエストは 401
    // given (前提条件):
    let addr = spawn_server().await;
    let http = reqwest::Client::new();

    // when (操作):
    let response = http
        .get(format!("http://{}/api/chats", addr))
        .send()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_user_directory_search() {
    // テスト項目: 接続したことのあるユーザーを名前・メールアドレスで検索でき、自分は含まれない
    // given (前提条件):
    let addr = spawn_server().await;
    let http = reqwest::Client::new();
    let mut erin = connect(addr, "erin").await;
    let _frank = connect(addr, "frank").await;
    let _grace = connect(addr, "grace").await;
    next_status_of(&mut erin, "frank").await;
    next_status_of(&mut erin, "grace").await;

    let search = |query: &'static str| {
        let http = http.clone();
        async move {
            let response = http
                .get(format!("http://{}/api/users", addr))
                .query(&[("search", query)])
                .bearer_auth(token("erin"))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), 200);
            let users: Vec<Value> = response.json().await.unwrap();
            users
                .iter()
                .map(|u| u["id"].as_str().unwrap().to_string())
                .collect::<Vec<_>>()
        }
    };

    // when (操作):
    let by_name = search("frank ex").await;
    let by_email = search("EXAMPLE.COM").await;
    let everyone = search("").await;

    // then (期待する結果):
    assert_eq!(by_name, vec!["frank".to_string()]);
    assert_eq!(by_email, vec!["frank".to_string(), "grace".to_string()]);
    assert_eq!(everyone, vec!["frank".to_string(), "grace".to_string()]);
}
