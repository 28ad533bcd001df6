mod recency;

pub use recency::{ group_by_recency, ChatGroup, RecencyBounds, RecencyGroup };

use crate::error::{ ChatError, Result };
use crate::models::chat::{ title_from_message, ChatMessage, Conversation, Role, NEW_CHAT_TITLE };
use crate::storage::{ LocalStorage, CHAT_HISTORY_KEY };
use chrono::{ DateTime, TimeZone, Utc };
use log::{ debug, info, warn };
use std::sync::Arc;

pub type Clock = fn() -> DateTime<Utc>;

/// Conversations newest-first plus the active selection. Every mutation is written through to
/// `chatHistory` before the call returns.
pub struct SessionStore {
    storage: Arc<dyn LocalStorage>,
    chats: Vec<Conversation>,
    active_id: Option<i64>,
    clock: Clock,
}

impl SessionStore {
    pub fn load(storage: Arc<dyn LocalStorage>) -> Self {
        Self::load_with_clock(storage, Utc::now)
    }

    pub fn load_with_clock(storage: Arc<dyn LocalStorage>, clock: Clock) -> Self {
        let chats = match storage.get_item(CHAT_HISTORY_KEY) {
            Some(raw) =>
                match serde_json::from_str::<Vec<Conversation>>(&raw) {
                    Ok(chats) => chats,
                    Err(e) => {
                        warn!("Ignoring unreadable chat history: {}", e);
                        Vec::new()
                    }
                }
            None => Vec::new(),
        };
        info!("Loaded {} conversations from local storage", chats.len());

        Self {
            storage,
            chats,
            active_id: None,
            clock,
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.chats
    }

    pub fn get(&self, id: i64) -> Option<&Conversation> {
        self.chats.iter().find(|c| c.id == id)
    }

    pub fn active_id(&self) -> Option<i64> {
        self.active_id
    }

    pub fn active(&self) -> Option<&Conversation> {
        self.active_id.and_then(|id| self.get(id))
    }

    pub fn select(&mut self, id: i64) -> Result<()> {
        if self.get(id).is_none() {
            return Err(ChatError::NotFound(id));
        }
        self.active_id = Some(id);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.active_id = None;
    }

    /// Explicit "new chat": an empty conversation titled `New chat`, made active.
    pub fn add_conversation(&mut self) -> Result<i64> {
        let now = (self.clock)();
        let conversation = Conversation::new(self.next_id(&now), NEW_CHAT_TITLE, now);
        self.insert_active(conversation)
    }

    /// Conversation created by a send with nothing selected; titled from its first message.
    pub fn start_conversation(&mut self, first_message: &str) -> Result<i64> {
        let now = (self.clock)();
        let mut conversation = Conversation::new(
            self.next_id(&now),
            title_from_message(first_message),
            now
        );
        conversation.messages.push(ChatMessage::user(first_message));
        self.insert_active(conversation)
    }

    pub fn append_message(&mut self, conversation_id: i64, message: ChatMessage) -> Result<()> {
        let conversation = self.chats
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or(ChatError::NotFound(conversation_id))?;

        if conversation.messages.is_empty() && message.role == Role::User {
            conversation.title = title_from_message(&message.content);
        }
        conversation.messages.push(message);
        self.persist()
    }

    /// Returns whether a conversation was removed.
    pub fn delete_conversation(&mut self, id: i64) -> Result<bool> {
        let before = self.chats.len();
        self.chats.retain(|c| c.id != id);
        if self.active_id == Some(id) {
            self.active_id = None;
        }
        if self.chats.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    pub fn list_grouped_by_recency<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<ChatGroup<'_>> {
        group_by_recency(&self.chats, now)
    }

    fn insert_active(&mut self, conversation: Conversation) -> Result<i64> {
        let id = conversation.id;
        self.chats.insert(0, conversation);
        self.active_id = Some(id);
        debug!("Created conversation {}", id);
        self.persist()?;
        Ok(id)
    }

    fn next_id(&self, now: &DateTime<Utc>) -> i64 {
        let mut id = now.timestamp_millis();
        while self.get(id).is_some() {
            id += 1;
        }
        id
    }

    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string(&self.chats)?;
        self.storage.set_item(CHAT_HISTORY_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ FileStorage, MemoryStorage };
    use chrono::Local;
    use tempfile::TempDir;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn new_store() -> (SessionStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (SessionStore::load_with_clock(storage.clone(), fixed_clock), storage)
    }

    #[test]
    fn test_add_conversation_is_newest_first_and_active() {
        let (mut store, _) = new_store();
        let first = store.add_conversation().unwrap();
        let second = store.add_conversation().unwrap();

        assert_ne!(first, second);
        assert_eq!(store.conversations()[0].id, second);
        assert_eq!(store.active_id(), Some(second));
        assert_eq!(store.active().unwrap().title, NEW_CHAT_TITLE);
    }

    #[test]
    fn test_first_user_message_sets_title_once() {
        let (mut store, _) = new_store();
        let id = store.add_conversation().unwrap();
        store.append_message(id, ChatMessage::user("What is the capital of France and why is it Paris?")).unwrap();
        store.append_message(id, ChatMessage::assistant("Paris.")).unwrap();
        store.append_message(id, ChatMessage::user("Another question")).unwrap();

        let title = &store.get(id).unwrap().title;
        assert_eq!(title, "What is the capital of France and why is");
    }

    #[test]
    fn test_append_keeps_prior_order() {
        let (mut store, _) = new_store();
        let id = store.start_conversation("one").unwrap();
        store.append_message(id, ChatMessage::assistant("two")).unwrap();
        let before = store.get(id).unwrap().messages.clone();

        store.append_message(id, ChatMessage::user("three")).unwrap();
        let after = &store.get(id).unwrap().messages;
        assert_eq!(&after[..before.len()], &before[..]);
        assert_eq!(after.last().unwrap().content, "three");
    }

    #[test]
    fn test_append_to_unknown_conversation_fails() {
        let (mut store, _) = new_store();
        let err = store.append_message(42, ChatMessage::user("hi")).unwrap_err();
        assert!(matches!(err, ChatError::NotFound(42)));
    }

    #[test]
    fn test_delete_active_clears_selection() {
        let (mut store, _) = new_store();
        let keep = store.add_conversation().unwrap();
        let doomed = store.add_conversation().unwrap();

        assert!(store.delete_conversation(doomed).unwrap());
        assert_eq!(store.active_id(), None);
        assert_eq!(store.conversations().len(), 1);

        store.select(keep).unwrap();
        assert!(!store.delete_conversation(doomed).unwrap());
        assert_eq!(store.active_id(), Some(keep));
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let (mut store, storage) = new_store();
        let id = store.start_conversation("hello").unwrap();
        let saved: Vec<Conversation> = serde_json
            ::from_str(&storage.get_item(CHAT_HISTORY_KEY).unwrap())
            .unwrap();
        assert_eq!(saved[0].id, id);
        assert_eq!(saved[0].title, "hello");

        store.delete_conversation(id).unwrap();
        assert_eq!(storage.get_item(CHAT_HISTORY_KEY).as_deref(), Some("[]"));
    }

    #[test]
    fn test_history_survives_reload_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");
        {
            let storage = Arc::new(FileStorage::open(&path).unwrap());
            let mut store = SessionStore::load(storage);
            let id = store.start_conversation("persist me").unwrap();
            store.append_message(id, ChatMessage::assistant("ok")).unwrap();
        }

        let storage = Arc::new(FileStorage::open(&path).unwrap());
        let store = SessionStore::load(storage);
        assert_eq!(store.conversations().len(), 1);
        assert_eq!(store.conversations()[0].messages.len(), 2);
        assert_eq!(store.active_id(), None);

        let groups = store.list_grouped_by_recency(&Local::now());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group, RecencyGroup::Today);
    }

    #[test]
    fn test_corrupt_history_loads_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(CHAT_HISTORY_KEY, "not json").unwrap();
        let store = SessionStore::load(storage);
        assert!(store.conversations().is_empty());
    }

    #[test]
    fn test_select_unknown_conversation_fails() {
        let (mut store, _) = new_store();
        assert!(store.select(7).is_err());
        assert_eq!(store.active_id(), None);
    }
}
