//! Time-boxed response caching for the quiz catalog.
//!
//! `TtlCache` is a plain keyed store with expiry; `CachedQuizRepository` wraps any
//! backend and consults three caches before touching the network.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use quiz_core::Clock;
use quiz_core::model::{
    Category, CategoryId, OptionDraft, OptionId, OptionRecord, QuestionDraft, QuestionId,
    QuestionRecord, Quiz, QuizDraft, QuizId,
};
use tracing::debug;

use crate::repository::{QuizAdminRepository, QuizRepository, RepositoryError};

/// Expiry windows for cached responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Categories and quiz lists.
    pub slow_ttl: Duration,
    /// Question sets.
    pub question_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            slow_ttl: Duration::minutes(5),
            question_ttl: Duration::minutes(10),
        }
    }
}

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// Keyed store whose entries expire a fixed `ttl` after insertion.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a live entry, evicting it if it has expired.
    pub fn get(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let mut entries = self.entries();
        let expired = match entries.get(key) {
            Some(entry) if now < entry.expires_at => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    pub fn set(&self, key: K, value: V, now: DateTime<Utc>) {
        let expires_at = now + self.ttl;
        self.entries().insert(key, Entry { value, expires_at });
    }

    pub fn invalidate(&self, key: &K) {
        self.entries().remove(key);
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Caching decorator over a quiz backend.
///
/// Reads are served from cache while fresh. Any successful admin mutation clears
/// every cache, whichever entity it touched. A read that started before an
/// invalidation never stores its result.
pub struct CachedQuizRepository<R> {
    inner: Arc<R>,
    clock: Mutex<Clock>,
    generation: AtomicU64,
    categories: TtlCache<(), Vec<Category>>,
    quizzes: TtlCache<CategoryId, Vec<Quiz>>,
    questions: TtlCache<QuizId, Vec<QuestionRecord>>,
}

impl<R> CachedQuizRepository<R> {
    #[must_use]
    pub fn new(inner: Arc<R>, clock: Clock, config: CacheConfig) -> Self {
        Self {
            inner,
            clock: Mutex::new(clock),
            generation: AtomicU64::new(0),
            categories: TtlCache::new(config.slow_ttl),
            quizzes: TtlCache::new(config.slow_ttl),
            questions: TtlCache::new(config.question_ttl),
        }
    }

    #[must_use]
    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .now()
    }

    /// Moves a fixed clock forward. No effect on `Clock::System`.
    pub fn advance_clock(&self, delta: Duration) {
        self.clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .advance(delta);
    }

    /// Drop every cached response.
    pub fn invalidate_all(&self) {
        debug!("quiz cache invalidated");
        // Bump before clearing: a racing `store` either sees the new generation
        // or has its entry wiped by the clear.
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.categories.clear();
        self.quizzes.clear();
        self.questions.clear();
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Caches a fetched value unless an invalidation ran since `generation`.
    fn store<K, V>(
        &self,
        cache: &TtlCache<K, V>,
        key: K,
        value: V,
        now: DateTime<Utc>,
        generation: u64,
    ) where
        K: Eq + Hash + Clone,
        V: Clone,
    {
        if self.generation() != generation {
            debug!("discarding read that raced an invalidation");
            return;
        }
        cache.set(key.clone(), value, now);
        if self.generation() != generation {
            cache.invalidate(&key);
        }
    }

    fn after_mutation<T>(&self, result: Result<T, RepositoryError>) -> Result<T, RepositoryError> {
        if result.is_ok() {
            self.invalidate_all();
        }
        result
    }
}

#[async_trait]
impl<R: QuizRepository> QuizRepository for CachedQuizRepository<R> {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let now = self.now();
        if let Some(hit) = self.categories.get(&(), now) {
            debug!("cache hit: categories");
            return Ok(hit);
        }
        let generation = self.generation();
        let fresh = self.inner.list_categories().await?;
        self.store(&self.categories, (), fresh.clone(), now, generation);
        Ok(fresh)
    }

    async fn list_quizzes_for_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Quiz>, RepositoryError> {
        let now = self.now();
        if let Some(hit) = self.quizzes.get(&category_id, now) {
            debug!(%category_id, "cache hit: quizzes");
            return Ok(hit);
        }
        let generation = self.generation();
        let fresh = self.inner.list_quizzes_for_category(category_id).await?;
        self.store(&self.quizzes, category_id, fresh.clone(), now, generation);
        Ok(fresh)
    }

    async fn list_questions(&self, quiz_id: QuizId) -> Result<Vec<QuestionRecord>, RepositoryError> {
        let now = self.now();
        if let Some(hit) = self.questions.get(&quiz_id, now) {
            debug!(%quiz_id, "cache hit: questions");
            return Ok(hit);
        }
        let generation = self.generation();
        let fresh = self.inner.list_questions(quiz_id).await?;
        self.store(&self.questions, quiz_id, fresh.clone(), now, generation);
        Ok(fresh)
    }
}

#[async_trait]
impl<R: QuizAdminRepository> QuizAdminRepository for CachedQuizRepository<R> {
    async fn create_quiz(&self, draft: &QuizDraft) -> Result<Quiz, RepositoryError> {
        self.after_mutation(self.inner.create_quiz(draft).await)
    }

    async fn update_quiz(&self, id: QuizId, draft: &QuizDraft) -> Result<Quiz, RepositoryError> {
        self.after_mutation(self.inner.update_quiz(id, draft).await)
    }

    async fn delete_quiz(&self, id: QuizId) -> Result<(), RepositoryError> {
        self.after_mutation(self.inner.delete_quiz(id).await)
    }

    async fn create_question(
        &self,
        draft: &QuestionDraft,
    ) -> Result<QuestionRecord, RepositoryError> {
        self.after_mutation(self.inner.create_question(draft).await)
    }

    async fn update_question(
        &self,
        id: QuestionId,
        draft: &QuestionDraft,
    ) -> Result<QuestionRecord, RepositoryError> {
        self.after_mutation(self.inner.update_question(id, draft).await)
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), RepositoryError> {
        self.after_mutation(self.inner.delete_question(id).await)
    }

    async fn create_option(&self, draft: &OptionDraft) -> Result<OptionRecord, RepositoryError> {
        self.after_mutation(self.inner.create_option(draft).await)
    }

    async fn update_option(
        &self,
        id: OptionId,
        draft: &OptionDraft,
    ) -> Result<OptionRecord, RepositoryError> {
        self.after_mutation(self.inner.update_option(id, draft).await)
    }

    async fn delete_option(&self, id: OptionId) -> Result<(), RepositoryError> {
        self.after_mutation(self.inner.delete_option(id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{Endpoint, InMemoryRepository};
    use quiz_core::time::{fixed_clock, fixed_now};
    use tokio::sync::Notify;

    fn backend() -> Arc<InMemoryRepository> {
        let repo = InMemoryRepository::new();
        repo.insert_category(Category {
            id: CategoryId::new(1),
            name: "DISC".into(),
            description: None,
        });
        repo.insert_quiz(Quiz {
            id: QuizId::new(2),
            title: "Work style".into(),
            description: None,
            category_id: Some(CategoryId::new(1)),
            time_limit: None,
        });
        Arc::new(repo)
    }

    fn cached(inner: &Arc<InMemoryRepository>) -> CachedQuizRepository<InMemoryRepository> {
        CachedQuizRepository::new(Arc::clone(inner), fixed_clock(), CacheConfig::default())
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache: TtlCache<u8, &str> = TtlCache::new(Duration::minutes(5));
        let now = fixed_now();
        cache.set(1, "value", now);

        assert_eq!(cache.get(&1, now + Duration::minutes(4)), Some("value"));
        assert_eq!(cache.get(&1, now + Duration::minutes(5)), None);
        assert!(cache.is_empty(), "expired entry should be evicted on read");
    }

    #[test]
    fn invalidate_removes_single_key() {
        let cache: TtlCache<u8, u8> = TtlCache::new(Duration::minutes(1));
        let now = fixed_now();
        cache.set(1, 10, now);
        cache.set(2, 20, now);
        cache.invalidate(&1);
        assert_eq!(cache.get(&1, now), None);
        assert_eq!(cache.get(&2, now), Some(20));
    }

    #[test]
    fn default_windows_match_catalog_and_questions() {
        let config = CacheConfig::default();
        assert_eq!(config.slow_ttl, Duration::minutes(5));
        assert_eq!(config.question_ttl, Duration::minutes(10));
    }

    #[tokio::test]
    async fn cache_hit_skips_the_backend() {
        let inner = backend();
        let cached = cached(&inner);

        cached.list_categories().await.unwrap();
        cached.list_categories().await.unwrap();
        cached.list_quizzes_for_category(CategoryId::new(1)).await.unwrap();
        cached.list_quizzes_for_category(CategoryId::new(1)).await.unwrap();

        assert_eq!(inner.calls(Endpoint::Categories), 1);
        assert_eq!(inner.calls(Endpoint::Quizzes), 1);
    }

    #[tokio::test]
    async fn failed_reads_are_not_cached() {
        let inner = backend();
        let cached = cached(&inner);

        inner.fail(Endpoint::Questions, 500);
        assert!(cached.list_questions(QuizId::new(2)).await.is_err());
        inner.recover(Endpoint::Questions);
        assert!(cached.list_questions(QuizId::new(2)).await.is_ok());
        assert_eq!(inner.calls(Endpoint::Questions), 2);
    }

    #[tokio::test]
    async fn mutation_clears_every_cache() {
        let inner = backend();
        let cached = cached(&inner);

        cached.list_categories().await.unwrap();
        cached.list_quizzes_for_category(CategoryId::new(1)).await.unwrap();

        let draft = QuizDraft {
            title: "Second".into(),
            description: None,
            category_id: CategoryId::new(1),
            time_limit: Some(15),
        };
        cached.create_quiz(&draft).await.unwrap();

        let quizzes = cached.list_quizzes_for_category(CategoryId::new(1)).await.unwrap();
        assert_eq!(quizzes.len(), 2);
        cached.list_categories().await.unwrap();
        assert_eq!(inner.calls(Endpoint::Categories), 2);
        assert_eq!(inner.calls(Endpoint::Quizzes), 2);
    }

    #[tokio::test]
    async fn failed_mutation_keeps_the_cache() {
        let inner = backend();
        let cached = cached(&inner);

        cached.list_categories().await.unwrap();
        let err = cached.delete_quiz(QuizId::new(404)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));

        cached.list_categories().await.unwrap();
        assert_eq!(inner.calls(Endpoint::Categories), 1);
    }

    async fn read_all(cached: &CachedQuizRepository<InMemoryRepository>) {
        cached.list_categories().await.unwrap();
        cached.list_quizzes_for_category(CategoryId::new(1)).await.unwrap();
        cached.list_questions(QuizId::new(2)).await.unwrap();
    }

    #[tokio::test]
    async fn catalog_and_question_windows_expire_independently() {
        let inner = backend();
        let cached = cached(&inner);

        read_all(&cached).await;
        cached.advance_clock(Duration::minutes(6));
        read_all(&cached).await;
        assert_eq!(inner.calls(Endpoint::Categories), 2);
        assert_eq!(inner.calls(Endpoint::Quizzes), 2);
        assert_eq!(inner.calls(Endpoint::Questions), 1);

        cached.advance_clock(Duration::minutes(5));
        cached.list_questions(QuizId::new(2)).await.unwrap();
        assert_eq!(inner.calls(Endpoint::Questions), 2);
    }

    /// Snapshots quiz listings, then parks until released.
    struct ParkedReads {
        inner: Arc<InMemoryRepository>,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl QuizRepository for ParkedReads {
        async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
            self.inner.list_categories().await
        }

        async fn list_quizzes_for_category(
            &self,
            category_id: CategoryId,
        ) -> Result<Vec<Quiz>, RepositoryError> {
            let snapshot = self.inner.list_quizzes_for_category(category_id).await;
            self.entered.notify_one();
            self.release.notified().await;
            snapshot
        }

        async fn list_questions(
            &self,
            quiz_id: QuizId,
        ) -> Result<Vec<QuestionRecord>, RepositoryError> {
            self.inner.list_questions(quiz_id).await
        }
    }

    #[async_trait]
    impl QuizAdminRepository for ParkedReads {
        async fn create_quiz(&self, draft: &QuizDraft) -> Result<Quiz, RepositoryError> {
            self.inner.create_quiz(draft).await
        }

        async fn update_quiz(&self, id: QuizId, draft: &QuizDraft) -> Result<Quiz, RepositoryError> {
            self.inner.update_quiz(id, draft).await
        }

        async fn delete_quiz(&self, id: QuizId) -> Result<(), RepositoryError> {
            self.inner.delete_quiz(id).await
        }

        async fn create_question(
            &self,
            draft: &QuestionDraft,
        ) -> Result<QuestionRecord, RepositoryError> {
            self.inner.create_question(draft).await
        }

        async fn update_question(
            &self,
            id: QuestionId,
            draft: &QuestionDraft,
        ) -> Result<QuestionRecord, RepositoryError> {
            self.inner.update_question(id, draft).await
        }

        async fn delete_question(&self, id: QuestionId) -> Result<(), RepositoryError> {
            self.inner.delete_question(id).await
        }

        async fn create_option(&self, draft: &OptionDraft) -> Result<OptionRecord, RepositoryError> {
            self.inner.create_option(draft).await
        }

        async fn update_option(
            &self,
            id: OptionId,
            draft: &OptionDraft,
        ) -> Result<OptionRecord, RepositoryError> {
            self.inner.update_option(id, draft).await
        }

        async fn delete_option(&self, id: OptionId) -> Result<(), RepositoryError> {
            self.inner.delete_option(id).await
        }
    }

    #[tokio::test]
    async fn read_in_flight_during_mutation_is_not_cached() {
        let inner = backend();
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let cached = Arc::new(CachedQuizRepository::new(
            Arc::new(ParkedReads {
                inner: Arc::clone(&inner),
                entered: Arc::clone(&entered),
                release: Arc::clone(&release),
            }),
            fixed_clock(),
            CacheConfig::default(),
        ));

        let reader = Arc::clone(&cached);
        let pending = tokio::spawn(async move {
            reader.list_quizzes_for_category(CategoryId::new(1)).await
        });
        entered.notified().await;

        cached
            .create_quiz(&QuizDraft {
                title: "Second".into(),
                description: None,
                category_id: CategoryId::new(1),
                time_limit: None,
            })
            .await
            .unwrap();

        release.notify_one();
        let stale = pending.await.unwrap().unwrap();
        assert_eq!(stale.len(), 1);

        release.notify_one();
        let fresh = cached
            .list_quizzes_for_category(CategoryId::new(1))
            .await
            .unwrap();
        assert_eq!(fresh.len(), 2);
        assert_eq!(inner.calls(Endpoint::Quizzes), 2);
    }
}
