//! HTTP API endpoint handlers.
//!
//! Every endpoint except `/api/health` requires `Authorization: Bearer <token>`.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Path, Query, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
};

use crate::{
    domain::{ChatId, GroupName, MediaRef, MessageContent, MessageKind, UserId},
    infrastructure::dto::{
        http::{
            AccessChatRequest, ChatRequest, CreateGroupRequest, GroupMemberRequest,
            MessageResponse, SearchQuery, SendMessageRequest,
        },
        resource::{ChatDto, MessageDto, UserDto},
    },
    ui::state::AppState,
    usecase::SendMessageCommand,
};

use super::error::ApiError;

/// `Authorization` ヘッダのトークンで認証されたユーザー
pub struct AuthenticatedUser(pub UserId);

impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .unwrap_or_default()
            .trim();
        let identity = state.token_verifier.verify(token)?;
        Ok(Self(identity.user_id))
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// `GET /api/users?search=`: 自分以外のユーザーを名前・メールアドレスで検索
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<UserDto>>, ApiError> {
    let users = state
        .search_users_usecase
        .execute(&user_id, query.search.as_deref())
        .await?;
    Ok(Json(users.iter().map(UserDto::from).collect()))
}

/// `POST /api/chats`: 1:1 会話の取得または作成
pub async fn access_chat(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<AccessChatRequest>,
) -> Result<(StatusCode, Json<ChatDto>), ApiError> {
    let other = UserId::new(request.user_id)?;
    let accessed = state.access_chat_usecase.access(user_id, other).await?;
    let status = if accessed.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ChatDto::from(&accessed.chat))))
}

/// `GET /api/chats`
pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<Vec<ChatDto>>, ApiError> {
    let chats = state.access_chat_usecase.list(&user_id).await?;
    Ok(Json(chats.iter().map(ChatDto::from).collect()))
}

/// `POST /api/chats/group`
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<ChatDto>), ApiError> {
    let name = GroupName::new(request.name)?;
    let members = request
        .members
        .into_iter()
        .map(UserId::new)
        .collect::<Result<Vec<_>, _>>()?;
    let chat = state
        .manage_group_usecase
        .create(user_id, name, members)
        .await?;
    Ok((StatusCode::CREATED, Json(ChatDto::from(&chat))))
}

/// `PUT /api/chats/group/add`
pub async fn add_to_group(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<GroupMemberRequest>,
) -> Result<Json<ChatDto>, ApiError> {
    let (chat_id, target) = parse_member_request(request)?;
    let chat = state
        .manage_group_usecase
        .add_member(&user_id, chat_id, target)
        .await?;
    Ok(Json(ChatDto::from(&chat)))
}

/// `PUT /api/chats/group/remove`
pub async fn remove_from_group(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<GroupMemberRequest>,
) -> Result<Json<ChatDto>, ApiError> {
    let (chat_id, target) = parse_member_request(request)?;
    let chat = state
        .manage_group_usecase
        .remove_member(&user_id, chat_id, &target)
        .await?;
    Ok(Json(ChatDto::from(&chat)))
}

/// `PUT /api/chats/group/make-admin`
pub async fn make_admin(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<GroupMemberRequest>,
) -> Result<Json<ChatDto>, ApiError> {
    let (chat_id, target) = parse_member_request(request)?;
    let chat = state
        .manage_group_usecase
        .make_admin(&user_id, chat_id, target)
        .await?;
    Ok(Json(ChatDto::from(&chat)))
}

/// `PUT /api/chats/group/leave`
pub async fn leave_group(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatDto>, ApiError> {
    let chat_id = ChatId::parse(&request.chat_id)?;
    let chat = state.manage_group_usecase.leave(&user_id, chat_id).await?;
    Ok(Json(ChatDto::from(&chat)))
}

/// `POST /api/messages`
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let command = SendMessageCommand {
        chat_id: ChatId::parse(&request.chat_id)?,
        sender: user_id,
        kind: request
            .kind
            .as_deref()
            .map(MessageKind::parse)
            .transpose()?
            .unwrap_or_default(),
        content: request.content.map(MessageContent::new).transpose()?,
        media: request.media_url.map(MediaRef::new).transpose()?,
    };
    let message = state.send_message_usecase.execute(command).await?;
    Ok((StatusCode::CREATED, Json(MessageDto::from(&message))))
}

/// `GET /api/messages/{chat_id}`
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(chat_id): Path<String>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let chat_id = ChatId::parse(&chat_id)?;
    let messages = state
        .get_messages_usecase
        .execute(chat_id, &user_id)
        .await?;
    Ok(Json(messages.iter().map(MessageDto::from).collect()))
}

/// `PUT /api/messages/read`
pub async fn mark_as_read(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<ChatRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let chat_id = ChatId::parse(&request.chat_id)?;
    let updated = state
        .mark_as_read_usecase
        .execute(chat_id, &user_id)
        .await?;
    Ok(Json(MessageResponse {
        message: format!("{} message(s) marked as read", updated),
    }))
}

fn parse_member_request(request: GroupMemberRequest) -> Result<(ChatId, UserId), ApiError> {
    Ok((
        ChatId::parse(&request.chat_id)?,
        UserId::new(request.user_id)?,
    ))
}
