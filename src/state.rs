use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use parking_lot::RwLock;

use crate::db::DatabaseProxy;
use crate::services::achievement::AchievementCatalog;
use crate::services::challenge::ChallengeCatalog;
use crate::services::dictionary::DictionaryProvider;
use crate::services::quiz::QuizSession;

/// In-process store for quizzes that have not completed yet. Only completion
/// writes anything durable; removing an entry is a clean abandon.
#[derive(Clone, Default)]
pub struct QuizSessionStore {
    sessions: Arc<RwLock<HashMap<String, QuizSession>>>,
}

impl QuizSessionStore {
    pub fn insert(&self, session: QuizSession) {
        self.sessions.write().insert(session.id.clone(), session);
    }

    pub fn get(&self, session_id: &str) -> Option<QuizSession> {
        self.sessions.read().get(session_id).cloned()
    }

    pub fn with_session<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut QuizSession) -> T,
    ) -> Option<T> {
        let mut sessions = self.sessions.write();
        sessions.get_mut(session_id).map(f)
    }

    pub fn remove(&self, session_id: &str) -> Option<QuizSession> {
        self.sessions.write().remove(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    db_proxy: Option<Arc<DatabaseProxy>>,
    quiz_sessions: QuizSessionStore,
    achievement_catalog: Arc<AchievementCatalog>,
    challenge_catalog: Arc<ChallengeCatalog>,
    dictionary: Arc<DictionaryProvider>,
}

impl AppState {
    pub fn new(db_proxy: Option<Arc<DatabaseProxy>>) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            db_proxy,
            quiz_sessions: QuizSessionStore::default(),
            achievement_catalog: Arc::new(AchievementCatalog::standard()),
            challenge_catalog: Arc::new(ChallengeCatalog::standard()),
            dictionary: Arc::new(DictionaryProvider::from_env()),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn db_proxy(&self) -> Option<Arc<DatabaseProxy>> {
        self.db_proxy.clone()
    }

    pub fn quiz_sessions(&self) -> &QuizSessionStore {
        &self.quiz_sessions
    }

    pub fn achievement_catalog(&self) -> Arc<AchievementCatalog> {
        Arc::clone(&self.achievement_catalog)
    }

    pub fn challenge_catalog(&self) -> Arc<ChallengeCatalog> {
        Arc::clone(&self.challenge_catalog)
    }

    pub fn dictionary(&self) -> Arc<DictionaryProvider> {
        Arc::clone(&self.dictionary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::quiz::{QuizSession, QuizType};
    use std::time::Instant;

    fn dummy_session(id: &str) -> QuizSession {
        QuizSession {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            quiz_type: QuizType::Random,
            questions: Vec::new(),
            current: 0,
            score: 0,
            started_at: Instant::now(),
            answers: Vec::new(),
        }
    }

    #[test]
    fn test_abandon_leaves_no_trace() {
        let store = QuizSessionStore::default();
        store.insert(dummy_session("s1"));
        assert!(store.get("s1").is_some());

        store.remove("s1");
        assert!(store.get("s1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_with_session_mutates_in_place() {
        let store = QuizSessionStore::default();
        store.insert(dummy_session("s1"));

        store.with_session("s1", |session| session.score = 3);
        assert_eq!(store.get("s1").unwrap().score, 3);

        assert!(store.with_session("missing", |_| ()).is_none());
    }
}
