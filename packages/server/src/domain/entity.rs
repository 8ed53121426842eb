//! Entity 定義
//!
//! - `User`: プレゼンス（online / offline）とプロフィールを持つユーザー
//! - `Chat`: 会話。メンバー・管理者・未読カウンタを保持し、不変条件を守る
//! - `Message`: メッセージ。`read_by` は単調増加のみ
//! - `Connection`: 生きている WebSocket 接続（永続化しない）

use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::{
    error::ChatError,
    value_object::{
        ChatId, ConnectionId, GroupName, MediaRef, MessageContent, MessageId, MessageKind,
        Timestamp, UserId, UserStatus,
    },
};

/// グループ作成時に必要な作成者以外のメンバー数
pub const GROUP_MIN_OTHER_MEMBERS: usize = 2;

/// トークンのクレームから得られる表示用プロフィール
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// ユーザー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    profile: UserProfile,
    status: UserStatus,
    last_seen: Option<Timestamp>,
}

impl User {
    /// 初回接続時に作られるユーザー（offline、last_seen なし）
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            profile: UserProfile::default(),
            status: UserStatus::Offline,
            last_seen: None,
        }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn status(&self) -> UserStatus {
        self.status
    }

    pub fn last_seen(&self) -> Option<Timestamp> {
        self.last_seen
    }

    /// プロフィールを置き換える。変更があった場合のみ `true`
    pub fn update_profile(&mut self, profile: UserProfile) -> bool {
        if self.profile == profile {
            return false;
        }
        self.profile = profile;
        true
    }

    /// ID・名前・メールアドレスのいずれかが `keyword` を含むか（大文字小文字を区別しない）
    pub fn matches(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        [
            Some(self.id.as_str()),
            self.profile.name.as_deref(),
            self.profile.email.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&keyword))
    }

    pub fn go_online(&mut self) {
        self.status = UserStatus::Online;
    }

    pub fn go_offline(&mut self, at: Timestamp) {
        self.status = UserStatus::Offline;
        self.last_seen = Some(at);
    }
}

/// 会話（1:1 またはグループ）
///
/// ## 不変条件
///
/// - 全メンバーがちょうど 1 つの未読カウンタを持つ
/// - `admins` は `members` の部分集合（1:1 では空）
/// - メンバーが 1 人以上いるグループには管理者が 1 人以上いる
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    id: ChatId,
    is_group: bool,
    name: Option<GroupName>,
    members: BTreeSet<UserId>,
    admins: BTreeSet<UserId>,
    unread_counters: BTreeMap<UserId, u32>,
    last_message: Option<MessageId>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Chat {
    /// 1:1 の会話を作成
    pub fn direct(id: ChatId, a: UserId, b: UserId, now: Timestamp) -> Result<Self, ChatError> {
        if a == b {
            return Err(ChatError::SelfChat);
        }
        let members: BTreeSet<UserId> = [a, b].into_iter().collect();
        Ok(Self::with_members(id, false, None, members, BTreeSet::new(), now))
    }

    /// グループを作成（作成者が唯一の管理者になる）
    pub fn group(
        id: ChatId,
        name: GroupName,
        creator: UserId,
        others: impl IntoIterator<Item = UserId>,
        now: Timestamp,
    ) -> Result<Self, ChatError> {
        let mut members: BTreeSet<UserId> = others.into_iter().filter(|m| m != &creator).collect();
        if members.len() < GROUP_MIN_OTHER_MEMBERS {
            return Err(ChatError::NotEnoughMembers {
                required: GROUP_MIN_OTHER_MEMBERS,
                actual: members.len(),
            });
        }
        members.insert(creator.clone());
        let admins = BTreeSet::from([creator]);
        Ok(Self::with_members(id, true, Some(name), members, admins, now))
    }

    fn with_members(
        id: ChatId,
        is_group: bool,
        name: Option<GroupName>,
        members: BTreeSet<UserId>,
        admins: BTreeSet<UserId>,
        now: Timestamp,
    ) -> Self {
        let unread_counters = members.iter().map(|m| (m.clone(), 0)).collect();
        Self {
            id,
            is_group,
            name,
            members,
            admins,
            unread_counters,
            last_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> ChatId {
        self.id
    }

    pub fn is_group(&self) -> bool {
        self.is_group
    }

    pub fn name(&self) -> Option<&GroupName> {
        self.name.as_ref()
    }

    pub fn members(&self) -> &BTreeSet<UserId> {
        &self.members
    }

    pub fn admins(&self) -> &BTreeSet<UserId> {
        &self.admins
    }

    pub fn unread_counters(&self) -> &BTreeMap<UserId, u32> {
        &self.unread_counters
    }

    pub fn last_message(&self) -> Option<MessageId> {
        self.last_message
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.members.contains(user_id)
    }

    pub fn is_admin(&self, user_id: &UserId) -> bool {
        self.admins.contains(user_id)
    }

    /// メンバーの未読数（非メンバーは 0）
    pub fn unread_counter(&self, user_id: &UserId) -> u32 {
        self.unread_counters.get(user_id).copied().unwrap_or(0)
    }

    /// 新着メッセージを記録する
    ///
    /// `unread_members` に含まれるメンバーのカウンタだけを 1 増やす。
    /// 非メンバーは無視される（送信後に脱退したメンバーなど）。
    pub fn record_message(&mut self, message_id: MessageId, unread_members: &[UserId], at: Timestamp) {
        for member in unread_members {
            if let Some(counter) = self.unread_counters.get_mut(member) {
                *counter = counter.saturating_add(1);
            }
        }
        self.last_message = Some(message_id);
        self.updated_at = at;
    }

    /// 未読カウンタを 0 に戻す
    pub fn reset_unread(&mut self, user_id: &UserId) -> Result<(), ChatError> {
        match self.unread_counters.get_mut(user_id) {
            Some(counter) => {
                *counter = 0;
                Ok(())
            }
            None => Err(ChatError::NotAMember(user_id.clone())),
        }
    }

    /// グループにメンバーを追加（カウンタは 0 から）
    pub fn add_member(&mut self, user_id: UserId, now: Timestamp) -> Result<(), ChatError> {
        self.ensure_group()?;
        if self.is_member(&user_id) {
            return Err(ChatError::AlreadyMember(user_id));
        }
        self.unread_counters.insert(user_id.clone(), 0);
        self.members.insert(user_id);
        self.updated_at = now;
        Ok(())
    }

    /// グループからメンバーを削除（除名・自主退出の両方）
    ///
    /// カウンタと管理者エントリも削除する。残りのメンバーがいるのに
    /// 管理者が 0 人になる場合は `LastAdmin` で拒否する。
    pub fn remove_member(&mut self, user_id: &UserId, now: Timestamp) -> Result<(), ChatError> {
        self.ensure_group()?;
        if !self.is_member(user_id) {
            return Err(ChatError::NotAMember(user_id.clone()));
        }
        let leaves_no_admin = self.is_admin(user_id) && self.admins.len() == 1;
        if leaves_no_admin && self.members.len() > 1 {
            return Err(ChatError::LastAdmin(user_id.clone()));
        }
        self.members.remove(user_id);
        self.admins.remove(user_id);
        self.unread_counters.remove(user_id);
        self.updated_at = now;
        Ok(())
    }

    /// メンバーを管理者に昇格
    pub fn promote(&mut self, user_id: UserId, now: Timestamp) -> Result<(), ChatError> {
        self.ensure_group()?;
        if !self.is_member(&user_id) {
            return Err(ChatError::NotAMember(user_id));
        }
        if self.is_admin(&user_id) {
            return Err(ChatError::AlreadyAdmin(user_id));
        }
        self.admins.insert(user_id);
        self.updated_at = now;
        Ok(())
    }

    fn ensure_group(&self) -> Result<(), ChatError> {
        if self.is_group {
            Ok(())
        } else {
            Err(ChatError::NotAGroup)
        }
    }
}

/// メッセージ
///
/// 送信者は作成時点から `read_by` に含まれる。永続化後に変わるのは
/// `read_by` の追加のみ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    chat_id: ChatId,
    sender: UserId,
    kind: MessageKind,
    content: Option<MessageContent>,
    media: Option<MediaRef>,
    read_by: BTreeSet<UserId>,
    created_at: Timestamp,
}

impl Message {
    pub fn new(
        id: MessageId,
        chat_id: ChatId,
        sender: UserId,
        kind: MessageKind,
        content: Option<MessageContent>,
        media: Option<MediaRef>,
        created_at: Timestamp,
    ) -> Result<Self, ChatError> {
        match kind {
            MessageKind::Text if content.is_none() => {
                return Err(ChatError::IncompleteMessage {
                    kind: kind.as_str(),
                    missing: "content",
                });
            }
            MessageKind::Image | MessageKind::Video if media.is_none() => {
                return Err(ChatError::IncompleteMessage {
                    kind: kind.as_str(),
                    missing: "a media reference",
                });
            }
            _ => {}
        }

        let read_by = BTreeSet::from([sender.clone()]);
        Ok(Self {
            id,
            chat_id,
            sender,
            kind,
            content,
            media,
            read_by,
            created_at,
        })
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn sender(&self) -> &UserId {
        &self.sender
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn content(&self) -> Option<&MessageContent> {
        self.content.as_ref()
    }

    pub fn media(&self) -> Option<&MediaRef> {
        self.media.as_ref()
    }

    pub fn read_by(&self) -> &BTreeSet<UserId> {
        &self.read_by
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn is_read_by(&self, user_id: &UserId) -> bool {
        self.read_by.contains(user_id)
    }

    /// 既読者を追加。新たに追加された場合のみ `true`
    pub fn mark_read_by(&mut self, user_id: UserId) -> bool {
        self.read_by.insert(user_id)
    }
}

/// 生きている接続
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub user_id: UserId,
    pub rooms: HashSet<ChatId>,
    pub connected_at: Timestamp,
}

impl Connection {
    pub fn new(id: ConnectionId, user_id: UserId, connected_at: Timestamp) -> Self {
        Self {
            id,
            user_id,
            rooms: HashSet::new(),
            connected_at,
        }
    }
}
