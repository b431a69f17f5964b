//! In-memory session storage.
//!
//! The store owns every session and every turn.  Mutations never edit a session in place: each
//! one builds a new [`Session`] and swaps it into the list, so an `Arc<Session>` handed out
//! earlier keeps describing the state it was taken from.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::types::{RequestSnapshot, Turn};

/// Numeric session identifier, unique within a store.
pub type SessionId = u64;

/// A store shared between the caller and the reply pipeline.
pub type SharedStore = Arc<Mutex<SessionStore>>;

/// Locks a shared store.
///
/// Every mutation leaves the store consistent before it returns, so a guard poisoned by a
/// panicking holder is still safe to use.
pub fn lock_store(store: &Mutex<SessionStore>) -> MutexGuard<'_, SessionStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Greeting seeded into every new session.
pub const DEFAULT_GREETING: &str = "Hello! How can I help you today?";

/// Prefix of the name a session carries until its first user turn renames it.
pub const DEFAULT_NAME_PREFIX: &str = "Chat #";

/// Maximum number of characters kept when naming a session after its first user turn.
pub const NAME_LIMIT: usize = 28;

const ELLIPSIS: char = '…';

/// A chat session: a name and an ordered transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    name: String,
    transcript: Vec<Turn>,
}

impl Session {
    fn new(id: SessionId, greeting: &str) -> Self {
        Self {
            id,
            name: format!("{DEFAULT_NAME_PREFIX}{id}"),
            transcript: vec![Turn::assistant(greeting)],
        }
    }

    /// The session's id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The transcript, oldest turn first.
    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    /// The newest turn.
    pub fn last_turn(&self) -> Option<&Turn> {
        self.transcript.last()
    }

    /// Returns true if the newest turn is a reply still being filled in.
    pub fn has_pending_reply(&self) -> bool {
        self.last_turn().is_some_and(Turn::is_pending)
    }

    /// Number of turns still marked pending.  Never more than one.
    pub fn pending_count(&self) -> usize {
        self.transcript.iter().filter(|t| t.is_pending()).count()
    }

    /// Number of user turns in the transcript.
    pub fn user_turn_count(&self) -> usize {
        self.transcript.iter().filter(|t| t.is_user()).count()
    }

    fn has_default_name(&self) -> bool {
        self.name.starts_with(DEFAULT_NAME_PREFIX)
    }

    fn pending_reply_mut(&mut self) -> Option<&mut Turn> {
        self.transcript
            .last_mut()
            .filter(|turn| turn.is_assistant() && turn.is_pending())
    }
}

/// Shortens `text` to [`NAME_LIMIT`] characters, marking the cut with an ellipsis.
pub fn short_name(text: &str) -> String {
    if text.chars().count() > NAME_LIMIT {
        let mut name: String = text.chars().take(NAME_LIMIT).collect();
        name.push(ELLIPSIS);
        name
    } else {
        text.to_string()
    }
}

/// The ordered collection of sessions plus the active-session pointer.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Vec<Arc<Session>>,
    active: Option<SessionId>,
    greeting: String,
}

impl SessionStore {
    /// Creates an empty store whose sessions open with `greeting`.
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            sessions: Vec::new(),
            active: None,
            greeting: greeting.into(),
        }
    }

    /// Wraps the store for sharing with the reply pipeline.
    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Allocates the next id, appends a freshly greeted session, and makes it active.
    pub fn create_session(&mut self) -> SessionId {
        let id = self
            .sessions
            .iter()
            .map(|s| s.id)
            .max()
            .map_or(1, |max| max + 1);
        self.sessions.push(Arc::new(Session::new(id, &self.greeting)));
        self.active = Some(id);
        id
    }

    /// Makes `id` the active session.
    ///
    /// Returns false and leaves the active session alone if `id` is unknown.  Callers must
    /// cancel any in-flight request before switching.
    pub fn select_session(&mut self, id: SessionId) -> bool {
        if self.position(id).is_some() {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    /// The id of the active session.
    pub fn active_id(&self) -> Option<SessionId> {
        self.active
    }

    /// The active session.
    pub fn active(&self) -> Option<Arc<Session>> {
        self.active.and_then(|id| self.session(id))
    }

    /// The session with the given id.
    pub fn session(&self, id: SessionId) -> Option<Arc<Session>> {
        self.position(id).map(|idx| Arc::clone(&self.sessions[idx]))
    }

    /// All sessions in creation order.
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.clone()
    }

    /// Number of sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if the store holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Appends a user turn and an empty pending reply, and returns the request snapshot.
    ///
    /// The first user turn of a session still carrying its default name renames it to a
    /// shortened copy of `text`.  Returns `None` without touching anything when the session
    /// does not exist or already has a reply pending.
    pub fn append_user_turn(&mut self, id: SessionId, text: &str) -> Option<RequestSnapshot> {
        let mut snapshot = None;
        self.update(id, |session| {
            if session.has_pending_reply() {
                return false;
            }
            session.transcript.push(Turn::user(text));
            snapshot = Some(RequestSnapshot::new(id, session.transcript.clone()));
            session.transcript.push(Turn::pending_reply());
            if session.has_default_name() && session.user_turn_count() == 1 {
                session.name = short_name(text);
            }
            true
        });
        snapshot
    }

    /// Appends `chunk` to the pending reply that ends the session's transcript.
    ///
    /// A no-op when the last turn is not a pending assistant turn, which is how late chunks
    /// from an abandoned request are dropped.
    pub fn append_to_pending_reply(&mut self, id: SessionId, chunk: &str) -> bool {
        self.update(id, |session| match session.pending_reply_mut() {
            Some(turn) => {
                turn.text.push_str(chunk);
                true
            }
            None => false,
        })
    }

    /// Settles the pending reply, writing `message` only if nothing has been received yet.
    pub fn finalize_reply_with_error(&mut self, id: SessionId, message: &str) -> bool {
        self.update(id, |session| match session.pending_reply_mut() {
            Some(turn) => {
                if turn.text.is_empty() {
                    turn.text = message.to_string();
                }
                turn.settle();
                true
            }
            None => false,
        })
    }

    /// Replaces the pending reply's text with `text` and settles it.
    pub fn set_reply_full(&mut self, id: SessionId, text: &str) -> bool {
        self.update(id, |session| match session.pending_reply_mut() {
            Some(turn) => {
                turn.text = text.to_string();
                turn.settle();
                true
            }
            None => false,
        })
    }

    /// Removes the user turn `snapshot` was taken for, together with its still-empty reply.
    ///
    /// Used when a send is refused before anything was requested.  A session renamed by that
    /// turn gets its default name back.  A no-op unless the transcript is exactly the snapshot
    /// followed by an untouched pending reply.
    pub fn withdraw_user_turn(&mut self, id: SessionId, snapshot: &RequestSnapshot) -> bool {
        self.update(id, |session| {
            let turns = snapshot.turns();
            let untouched = session
                .last_turn()
                .is_some_and(|t| t.is_assistant() && t.is_pending() && t.text.is_empty());
            if !untouched
                || session.transcript.len() != turns.len() + 1
                || session.transcript[..turns.len()] != *turns
                || !turns.last().is_some_and(Turn::is_user)
            {
                return false;
            }
            session.transcript.truncate(turns.len() - 1);
            if session.user_turn_count() == 0 {
                session.name = format!("{DEFAULT_NAME_PREFIX}{}", session.id);
            }
            true
        })
    }

    /// Settles the pending reply, keeping whatever text it holds.
    pub fn finish_reply(&mut self, id: SessionId) -> bool {
        self.update(id, |session| match session.pending_reply_mut() {
            Some(turn) => {
                turn.settle();
                true
            }
            None => false,
        })
    }

    fn position(&self, id: SessionId) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == id)
    }

    // Copy-on-write: `f` edits a private copy that replaces the stored session only when it
    // reports a change.
    fn update<F>(&mut self, id: SessionId, f: F) -> bool
    where
        F: FnOnce(&mut Session) -> bool,
    {
        let Some(idx) = self.position(id) else {
            return false;
        };
        let mut next = Session::clone(&self.sessions[idx]);
        if f(&mut next) {
            self.sessions[idx] = Arc::new(next);
            true
        } else {
            false
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_GREETING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_allocates_max_plus_one() {
        let mut store = SessionStore::default();
        assert!(store.is_empty());
        assert_eq!(store.create_session(), 1);
        assert_eq!(store.create_session(), 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.active_id(), Some(2));
        let session = store.active().unwrap();
        assert_eq!(session.name(), "Chat #2");
        assert_eq!(session.transcript(), &[Turn::assistant(DEFAULT_GREETING)]);
    }

    #[test]
    fn sessions_get_independent_transcripts() {
        let mut store = SessionStore::default();
        let first = store.create_session();
        let second = store.create_session();
        store.append_user_turn(first, "hello").unwrap();
        assert_eq!(store.session(first).unwrap().transcript().len(), 3);
        assert_eq!(store.session(second).unwrap().transcript().len(), 1);
    }

    #[test]
    fn select_unknown_session_is_rejected() {
        let mut store = SessionStore::default();
        let id = store.create_session();
        assert!(!store.select_session(99));
        assert_eq!(store.active_id(), Some(id));
        store.create_session();
        assert!(store.select_session(id));
        assert_eq!(store.active_id(), Some(id));
    }

    #[test]
    fn append_user_turn_snapshot_excludes_placeholder() {
        let mut store = SessionStore::default();
        let id = store.create_session();
        let snapshot = store.append_user_turn(id, "what is rust?").unwrap();
        assert_eq!(
            snapshot.turns(),
            &[Turn::assistant(DEFAULT_GREETING), Turn::user("what is rust?")]
        );
        let session = store.session(id).unwrap();
        assert_eq!(session.transcript().len(), 3);
        assert!(session.has_pending_reply());
        assert_eq!(session.pending_count(), 1);
    }

    #[test]
    fn snapshot_is_frozen() {
        let mut store = SessionStore::default();
        let id = store.create_session();
        let snapshot = store.append_user_turn(id, "q").unwrap();
        store.append_to_pending_reply(id, "partial");
        store.finish_reply(id);
        store.append_user_turn(id, "again").unwrap();
        assert_eq!(snapshot.turns().len(), 2);
        assert_eq!(snapshot.question(), "q");
    }

    #[test]
    fn append_user_turn_on_missing_session_is_noop() {
        let mut store = SessionStore::default();
        assert!(store.append_user_turn(7, "hello").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn append_user_turn_while_pending_is_rejected() {
        let mut store = SessionStore::default();
        let id = store.create_session();
        store.append_user_turn(id, "one").unwrap();
        assert!(store.append_user_turn(id, "two").is_none());
        assert_eq!(store.session(id).unwrap().pending_count(), 1);
    }

    #[test]
    fn first_user_turn_renames_once() {
        let mut store = SessionStore::default();
        let id = store.create_session();
        let text = "a".repeat(40);
        store.append_user_turn(id, &text).unwrap();
        let expected = format!("{}…", "a".repeat(28));
        assert_eq!(store.session(id).unwrap().name(), expected);

        store.finish_reply(id);
        store.append_user_turn(id, "something else").unwrap();
        assert_eq!(store.session(id).unwrap().name(), expected);
    }

    #[test]
    fn short_names_are_not_ellipsized() {
        assert_eq!(short_name("hello"), "hello");
        assert_eq!(short_name(&"x".repeat(28)), "x".repeat(28));
        assert_eq!(short_name("สวัสดีครับ ยินดีที่ได้รู้จัก ขอถามเรื่องคอร์สหน่อย").chars().count(), 29);
    }

    #[test]
    fn chunks_only_reach_pending_reply() {
        let mut store = SessionStore::default();
        let id = store.create_session();
        assert!(!store.append_to_pending_reply(id, "stray"));
        assert_eq!(store.session(id).unwrap().transcript()[0].text, DEFAULT_GREETING);

        store.append_user_turn(id, "q").unwrap();
        assert!(store.append_to_pending_reply(id, "Hel"));
        assert!(store.append_to_pending_reply(id, "lo"));
        assert_eq!(store.session(id).unwrap().last_turn().unwrap().text, "Hello");

        store.finish_reply(id);
        assert!(!store.append_to_pending_reply(id, "late"));
        assert_eq!(store.session(id).unwrap().last_turn().unwrap().text, "Hello");
    }

    #[test]
    fn withdraw_restores_previous_state() {
        let mut store = SessionStore::default();
        let id = store.create_session();
        let before = store.session(id).unwrap();
        let snapshot = store.append_user_turn(id, "a question long enough to be shortened").unwrap();
        assert!(store.withdraw_user_turn(id, &snapshot));
        assert_eq!(store.session(id).unwrap(), before);
        assert_eq!(store.len(), 1);

        let snapshot = store.append_user_turn(id, "again").unwrap();
        store.append_to_pending_reply(id, "started");
        assert!(!store.withdraw_user_turn(id, &snapshot));
        assert_eq!(store.session(id).unwrap().transcript().len(), 3);
    }

    #[test]
    fn withdraw_keeps_name_from_earlier_turn() {
        let mut store = SessionStore::default();
        let id = store.create_session();
        store.append_user_turn(id, "first").unwrap();
        store.finish_reply(id);
        let snapshot = store.append_user_turn(id, "second").unwrap();
        assert!(store.withdraw_user_turn(id, &snapshot));
        let session = store.session(id).unwrap();
        assert_eq!(session.name(), "first");
        assert_eq!(session.user_turn_count(), 1);
        assert!(!session.has_pending_reply());
    }

    #[test]
    fn error_does_not_overwrite_partial_text() {
        let mut store = SessionStore::default();
        let id = store.create_session();
        store.append_user_turn(id, "q").unwrap();
        store.append_to_pending_reply(id, "partial");
        assert!(store.finalize_reply_with_error(id, "sorry"));
        let last = store.session(id).unwrap().last_turn().cloned().unwrap();
        assert_eq!(last.text, "partial");
        assert!(!last.is_pending());
    }

    #[test]
    fn error_fills_empty_reply() {
        let mut store = SessionStore::default();
        let id = store.create_session();
        store.append_user_turn(id, "q").unwrap();
        assert!(store.finalize_reply_with_error(id, "sorry"));
        assert_eq!(store.session(id).unwrap().last_turn().unwrap().text, "sorry");
        assert!(!store.finalize_reply_with_error(id, "again"));
    }

    #[test]
    fn set_reply_full_settles() {
        let mut store = SessionStore::default();
        let id = store.create_session();
        store.append_user_turn(id, "q").unwrap();
        assert!(store.set_reply_full(id, "the answer"));
        let session = store.session(id).unwrap();
        assert_eq!(session.last_turn().unwrap().text, "the answer");
        assert_eq!(session.pending_count(), 0);
    }

    #[test]
    fn observers_keep_their_view() {
        let mut store = SessionStore::default();
        let id = store.create_session();
        let before = store.session(id).unwrap();
        store.append_user_turn(id, "q").unwrap();
        assert_eq!(before.transcript().len(), 1);
        assert_eq!(store.session(id).unwrap().transcript().len(), 3);
    }
}
