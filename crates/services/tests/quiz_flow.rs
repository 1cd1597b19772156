use std::sync::Arc;

use async_trait::async_trait;
use quiz_core::model::{
    Category, CategoryId, DiscSlot, DiscTrait, OptionId, OptionRecord, Question, QuestionId,
    QuestionRecord, Quiz, QuizId, QuizType, ScoreValue,
};
use quiz_core::time::fixed_now;
use services::{Clock, LoadError, QuizAttempt, QuizPhase, QuizSessionLoop, SessionError, ValidationError};
use storage::{Endpoint, InMemoryRepository, QuizRepository, RepositoryError, Storage};
use tokio::sync::Notify;

const MBTI_QUIZ: QuizId = QuizId::new(10);

fn option(id: u64, question: u64, text: &str, target: Option<DiscTrait>) -> OptionRecord {
    OptionRecord {
        id: OptionId::new(id),
        option_text: text.into(),
        target_trait: target,
        score_value: ScoreValue::try_from(1_i64).unwrap(),
        question_id: QuestionId::new(question),
    }
}

fn mbti_questions() -> Vec<QuestionRecord> {
    ["E", "N", "T", "J"]
        .iter()
        .zip(1_u64..)
        .map(|(dimension, id)| QuestionRecord {
            id: QuestionId::new(id),
            content: format!("MBTI question {id}"),
            order_number: i32::try_from(id).unwrap(),
            dimension: (*dimension).into(),
            quiz_id: QuizId::new(10),
            options: vec![
                option(id * 100 + 1, id, "Yes", None),
                option(id * 100 + 2, id, "No", None),
            ],
        })
        .collect()
}

fn disc_questions() -> Vec<QuestionRecord> {
    (1_u64..=2)
        .map(|n| {
            let id = 50 + n;
            QuestionRecord {
                id: QuestionId::new(id),
                content: format!("DISC set {n}"),
                order_number: i32::try_from(n).unwrap(),
                dimension: "DISC".into(),
                quiz_id: QuizId::new(20),
                options: DiscTrait::ALL
                    .iter()
                    .zip(1_u64..)
                    .map(|(t, k)| option(id * 100 + k, id, &format!("{t}"), Some(*t)))
                    .collect(),
            }
        })
        .collect()
}

fn seeded_backend() -> InMemoryRepository {
    let repo = InMemoryRepository::new();
    for (id, name) in [(1, "MBTI Personality"), (2, "DISC Behaviour")] {
        repo.insert_category(Category {
            id: CategoryId::new(id),
            name: name.into(),
            description: None,
        });
    }
    for (id, category) in [(10, 1), (20, 2)] {
        repo.insert_quiz(Quiz {
            id: QuizId::new(id),
            title: format!("Quiz {id}"),
            description: None,
            category_id: Some(CategoryId::new(category)),
            time_limit: None,
        });
    }
    repo.insert_questions(QuizId::new(10), mbti_questions());
    repo.insert_questions(QuizId::new(20), disc_questions());
    repo
}

fn runner_for(repo: &InMemoryRepository) -> QuizSessionLoop {
    QuizSessionLoop::from_storage(Clock::fixed(fixed_now()), &Storage::from_backend(repo.clone()))
}

#[tokio::test]
async fn mbti_attempt_submits_every_mapped_option_once() {
    let repo = seeded_backend();
    let runner = runner_for(&repo);

    let mut session = runner.start(QuizType::Mbti).await.unwrap();
    assert_eq!(session.quiz().id, MBTI_QUIZ);
    assert_eq!(session.questions().len(), 4);
    assert_eq!(session.current_index(), 0);

    let ids: Vec<_> = session.questions().iter().map(Question::id).collect();
    for id in &ids {
        session.record_choice(*id, "Yes").unwrap();
    }
    assert!(session.is_complete());

    let result = runner.submit(&mut session).await.unwrap();
    assert_eq!(result.quiz_type, QuizType::Mbti);
    assert_eq!(session.phase(), QuizPhase::Result);

    let submissions = repo.submissions();
    assert_eq!(repo.calls(Endpoint::Submit), 1);
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].quiz_id, MBTI_QUIZ);
    assert_eq!(submissions[0].answers.len(), 4);
    for id in ids {
        assert_eq!(
            submissions[0].answers[&id],
            OptionId::new(id.value() * 100 + 1)
        );
    }
}

#[tokio::test]
async fn disc_attempt_with_only_most_answers_never_reaches_the_backend() {
    let repo = seeded_backend();
    let runner = runner_for(&repo);

    let mut session = runner.start(QuizType::Disc).await.unwrap();
    assert_eq!(session.questions().len(), 2);
    for id in [QuestionId::new(51), QuestionId::new(52)] {
        session
            .record_disc(id, DiscTrait::Dominance, DiscSlot::Most)
            .unwrap();
    }
    assert!(!session.is_complete());

    let err = runner.submit(&mut session).await.unwrap_err();
    match err {
        SessionError::Validation(ValidationError::Incomplete { missing }) => {
            assert_eq!(missing, vec![QuestionId::new(51), QuestionId::new(52)]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(repo.calls(Endpoint::Submit), 0);
    assert_eq!(session.phase(), QuizPhase::Quiz);
}

#[tokio::test]
async fn failed_question_fetch_leaves_the_attempt_in_intro() {
    let repo = seeded_backend();
    repo.fail(Endpoint::Questions, 502);
    let runner = runner_for(&repo);
    let mut attempt = QuizAttempt::new();

    let err = attempt.start(&runner, QuizType::Mbti).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Network(RepositoryError::HttpStatus(502))
    ));
    assert!(err.is_terminal_load_failure());
    assert_eq!(attempt.phase(), QuizPhase::Intro);
    assert!(attempt.questions().is_empty());
    assert!(!runner.is_loading());
}

#[tokio::test]
async fn missing_category_is_a_load_error() {
    let repo = InMemoryRepository::new();
    repo.insert_category(Category {
        id: CategoryId::new(1),
        name: "Career interests".into(),
        description: None,
    });
    let runner = runner_for(&repo);

    let err = runner.start(QuizType::Disc).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Load(LoadError::NoCategory {
            quiz_type: QuizType::Disc
        })
    ));
    assert_eq!(repo.calls(Endpoint::Quizzes), 0);
}

#[tokio::test]
async fn category_without_quizzes_is_a_load_error() {
    let repo = InMemoryRepository::new();
    repo.insert_category(Category {
        id: CategoryId::new(7),
        name: "mbti".into(),
        description: None,
    });
    let runner = runner_for(&repo);

    let err = runner.start(QuizType::Mbti).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Load(LoadError::NoQuiz { category_id }) if category_id == CategoryId::new(7)
    ));
}

#[tokio::test]
async fn submission_failure_keeps_answers_for_retry() {
    let repo = seeded_backend();
    let runner = runner_for(&repo);
    let mut attempt = QuizAttempt::new();

    let session = attempt.start(&runner, QuizType::Disc).await.unwrap();
    for id in [QuestionId::new(51), QuestionId::new(52)] {
        session
            .record_disc(id, DiscTrait::Influence, DiscSlot::Most)
            .unwrap();
        session
            .record_disc(id, DiscTrait::Conscientiousness, DiscSlot::Least)
            .unwrap();
    }

    repo.fail(Endpoint::Submit, 500);
    let err = attempt.submit(&runner).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Submission(RepositoryError::HttpStatus(500))
    ));
    assert_eq!(attempt.phase(), QuizPhase::Quiz);
    assert!(attempt.session().unwrap().is_complete());

    repo.recover(Endpoint::Submit);
    let result = attempt.submit(&runner).await.unwrap();
    assert_eq!(attempt.phase(), QuizPhase::Result);
    assert_eq!(attempt.result(), Some(&result));
    assert_eq!(repo.calls(Endpoint::Submit), 2);

    let sent = &repo.submissions()[0];
    assert_eq!(sent.answers[&QuestionId::new(51)], OptionId::new(5102));

    let again = attempt.submit(&runner).await.unwrap_err();
    assert!(matches!(again, SessionError::Completed));
}

#[tokio::test]
async fn restarting_with_another_type_discards_answers() {
    let repo = seeded_backend();
    let runner = runner_for(&repo);
    let mut attempt = QuizAttempt::new();

    let session = attempt.start(&runner, QuizType::Mbti).await.unwrap();
    session.record_choice(QuestionId::new(1), "Yes").unwrap();

    let session = attempt.start(&runner, QuizType::Disc).await.unwrap();
    assert_eq!(session.quiz_type(), QuizType::Disc);
    assert!(session.answer(QuestionId::new(1)).is_none());
    assert_eq!(session.progress().answered, 0);
}

#[tokio::test]
async fn submit_before_start_is_refused() {
    let repo = seeded_backend();
    let runner = runner_for(&repo);
    let mut attempt = QuizAttempt::new();
    assert!(matches!(
        attempt.submit(&runner).await,
        Err(SessionError::NotStarted)
    ));
}

/// Backend whose category listing parks until released.
struct GatedRepository {
    inner: InMemoryRepository,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl QuizRepository for GatedRepository {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.list_categories().await
    }

    async fn list_quizzes_for_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Quiz>, RepositoryError> {
        self.inner.list_quizzes_for_category(category_id).await
    }

    async fn list_questions(&self, quiz_id: QuizId) -> Result<Vec<QuestionRecord>, RepositoryError> {
        self.inner.list_questions(quiz_id).await
    }
}

#[tokio::test]
async fn overlapping_start_is_rejected_while_loading() {
    let repo = seeded_backend();
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let gated = GatedRepository {
        inner: repo.clone(),
        entered: Arc::clone(&entered),
        release: Arc::clone(&release),
    };
    let runner = QuizSessionLoop::new(
        Clock::fixed(fixed_now()),
        Arc::new(gated),
        Arc::new(repo.clone()),
    );

    let background = runner.clone();
    let pending = tokio::spawn(async move { background.start(QuizType::Mbti).await });

    entered.notified().await;
    assert!(runner.is_loading());
    assert!(matches!(
        runner.start(QuizType::Disc).await,
        Err(SessionError::Busy)
    ));

    release.notify_one();
    let session = pending.await.unwrap().unwrap();
    assert_eq!(session.quiz_type(), QuizType::Mbti);
    assert!(!runner.is_loading());
}

#[tokio::test]
async fn busy_restart_keeps_the_current_answers() {
    let repo = seeded_backend();
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let gated = GatedRepository {
        inner: repo.clone(),
        entered: Arc::clone(&entered),
        release: Arc::clone(&release),
    };
    let runner = QuizSessionLoop::new(
        Clock::fixed(fixed_now()),
        Arc::new(gated),
        Arc::new(repo.clone()),
    );
    let mut attempt = QuizAttempt::new();

    release.notify_one();
    let session = attempt.start(&runner, QuizType::Mbti).await.unwrap();
    session.record_choice(QuestionId::new(1), "Yes").unwrap();
    entered.notified().await;

    let background = runner.clone();
    let pending = tokio::spawn(async move { background.start(QuizType::Disc).await });
    entered.notified().await;

    let err = attempt.start(&runner, QuizType::Disc).await.unwrap_err();
    assert!(matches!(err, SessionError::Busy));
    assert_eq!(attempt.phase(), QuizPhase::Quiz);
    let kept = attempt.session().unwrap();
    assert_eq!(kept.quiz_type(), QuizType::Mbti);
    assert!(kept.answer(QuestionId::new(1)).is_some());

    release.notify_one();
    pending.await.unwrap().unwrap();
}
