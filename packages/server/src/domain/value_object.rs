//! Value Object 定義
//!
//! 識別子やメッセージ本文など、生成時にバリデーションされる不変の値。

use std::fmt;

use uuid::Uuid;

use super::error::ValueObjectError;

/// UserId の最大長
pub const USER_ID_MAX_LENGTH: usize = 128;
/// MessageContent の最大長（文字数）
pub const MESSAGE_CONTENT_MAX_LENGTH: usize = 4096;
/// GroupName の最大長（文字数）
pub const GROUP_NAME_MAX_LENGTH: usize = 100;

/// ユーザー ID
///
/// 認証済みトークンの subject をそのまま使う。空文字列と空白を含む値は不可。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.is_empty() {
            return Err(ValueObjectError::UserIdEmpty);
        }
        if value.len() > USER_ID_MAX_LENGTH {
            return Err(ValueObjectError::UserIdTooLong(value.len()));
        }
        if value.chars().any(char::is_whitespace) {
            return Err(ValueObjectError::UserIdInvalid(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Uuid);

        impl $name {
            /// 新しい ID を生成
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// 文字列表現からパース
            pub fn parse(value: &str) -> Result<Self, ValueObjectError> {
                Uuid::parse_str(value)
                    .map(Self)
                    .map_err(|_| ValueObjectError::InvalidId(value.to_string()))
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// 会話（1:1 またはグループ）の ID
    ChatId
);
uuid_id!(
    /// メッセージ ID
    MessageId
);
uuid_id!(
    /// WebSocket 接続 ID（接続ごとに発行、永続化しない）
    ConnectionId
);

/// Unix タイムスタンプ（ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// メッセージ本文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent(String);

impl MessageContent {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::MessageContentEmpty);
        }
        let length = value.chars().count();
        if length > MESSAGE_CONTENT_MAX_LENGTH {
            return Err(ValueObjectError::MessageContentTooLong(length));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// 添付メディアの参照（メディアストレージが返した URL）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef(String);

impl MediaRef {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::MediaRefEmpty);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// グループ名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupName(String);

impl GroupName {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::GroupNameEmpty);
        }
        let length = trimmed.chars().count();
        if length > GROUP_NAME_MAX_LENGTH {
            return Err(ValueObjectError::GroupNameTooLong(length));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// メッセージ種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    Video,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValueObjectError> {
        match value {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            other => Err(ValueObjectError::UnknownMessageKind(other.to_string())),
        }
    }
}

/// ユーザーのオンライン状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UserStatus {
    Online,
    #[default]
    Offline,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}
