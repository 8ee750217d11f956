//! Test configuration lifecycle.
//!
//! Configuration is a series of immutable snapshots; the current one is the
//! newest. Only the scalars are stored. Every read hands out a freshly
//! generated question set.

use crate::db::traits::ConfigStore;
use crate::quiz::generator::{generate_pairs, is_valid_pair};
use crate::types::{
    AppError, Claims, ConfigSnapshot, ConfigView, NewConfigSnapshot, QuestionPair, Result,
    UpdateConfigRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Values used when no snapshot exists or a field is missing/invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDefaults {
    #[serde(default = "default_question_count")]
    pub question_count: i64,
    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: i64,
    #[serde(default = "default_max_incorrect_answers")]
    pub max_incorrect_answers: i64,
    #[serde(default = "default_min_questions_per_minute")]
    pub min_questions_per_minute: i64,
    /// Largest question count accepted from a request or a stored snapshot.
    #[serde(default = "default_max_question_count")]
    pub max_question_count: i64,
}

fn default_question_count() -> i64 {
    crate::quiz::generator::DEFAULT_QUESTION_COUNT
}

fn default_duration_seconds() -> i64 {
    15 * 60
}

fn default_max_incorrect_answers() -> i64 {
    7
}

fn default_min_questions_per_minute() -> i64 {
    35
}

fn default_max_question_count() -> i64 {
    10_000
}

impl Default for TestDefaults {
    fn default() -> Self {
        Self {
            question_count: default_question_count(),
            duration_seconds: default_duration_seconds(),
            max_incorrect_answers: default_max_incorrect_answers(),
            min_questions_per_minute: default_min_questions_per_minute(),
            max_question_count: default_max_question_count(),
        }
    }
}

impl TestDefaults {
    /// Whether `count` is a question count this server will serve.
    pub fn accepts_question_count(&self, count: i64) -> bool {
        (1..=self.max_question_count).contains(&count)
    }
}

/// Number or numeric string, floored. Anything else, including values
/// outside the `i64` range, is `None`.
fn coerce_integer(value: Option<&Value>) -> Option<i64> {
    let number = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    }
    .floor();
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if !number.is_finite() || number < i64::MIN as f64 || number >= i64::MAX as f64 {
        return None;
    }
    Some(number as i64)
}

/// Strictly positive integer, else `default`.
pub fn coerce_positive(value: Option<&Value>, default: i64) -> i64 {
    coerce_integer(value).filter(|n| *n > 0).unwrap_or(default)
}

/// Integer in `1..=max`, else `default`.
pub fn coerce_bounded(value: Option<&Value>, max: i64, default: i64) -> i64 {
    coerce_integer(value)
        .filter(|n| (1..=max).contains(n))
        .unwrap_or(default)
}

/// Non-negative integer, else `default`.
pub fn coerce_non_negative(value: Option<&Value>, default: i64) -> i64 {
    coerce_integer(value).filter(|n| *n >= 0).unwrap_or(default)
}

/// JSON truthiness for the `regenerate` flag.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Accepts a supplied pair set only if it has exactly `count` entries, each
/// with integer operands inside the generator's range.
pub fn accept_supplied_pairs(value: Option<&Value>, count: i64) -> Option<Vec<QuestionPair>> {
    let items = value?.as_array()?;
    if items.len() as i64 != count {
        return None;
    }

    items
        .iter()
        .map(|item| {
            let pair = QuestionPair {
                a: item.get("a")?.as_i64()?,
                b: item.get("b")?.as_i64()?,
            };
            is_valid_pair(&pair).then_some(pair)
        })
        .collect()
}

/// Resolves and records the test configuration.
pub struct TestConfigService {
    store: Arc<dyn ConfigStore>,
    defaults: TestDefaults,
}

impl TestConfigService {
    pub fn new(store: Arc<dyn ConfigStore>, defaults: TestDefaults) -> Self {
        Self { store, defaults }
    }

    pub fn defaults(&self) -> &TestDefaults {
        &self.defaults
    }

    fn view_from_snapshot(&self, snapshot: Option<&ConfigSnapshot>) -> ConfigView {
        let d = &self.defaults;
        let question_count = snapshot
            .map(|s| s.total_questions)
            .filter(|n| d.accepts_question_count(*n))
            .unwrap_or(d.question_count);
        let duration_seconds = snapshot
            .map(|s| s.duration_seconds)
            .filter(|n| *n > 0)
            .unwrap_or(d.duration_seconds);
        let max_incorrect_answers = snapshot
            .and_then(|s| s.max_incorrect_answers)
            .filter(|n| *n >= 0)
            .unwrap_or(d.max_incorrect_answers);
        let min_questions_per_minute = snapshot
            .and_then(|s| s.min_questions_per_minute)
            .filter(|n| *n >= 0)
            .unwrap_or(d.min_questions_per_minute);

        ConfigView {
            question_count,
            duration_seconds,
            max_incorrect_answers,
            min_questions_per_minute,
            pairs: generate_pairs(question_count),
        }
    }

    /// Current configuration: newest snapshot, or defaults when there is
    /// none. Nothing is written.
    pub async fn current(&self) -> Result<ConfigView> {
        let latest = self.store.find_latest_config_snapshot().await?;
        if latest.is_none() {
            debug!("no configuration snapshot yet, serving defaults");
        }
        Ok(self.view_from_snapshot(latest.as_ref()))
    }

    /// Records a new snapshot from an administrator request and returns the
    /// resolved configuration with the selected question set.
    pub async fn update(&self, request: &UpdateConfigRequest, requester: &Claims) -> Result<ConfigView> {
        if !requester.role.is_admin() {
            return Err(AppError::Forbidden);
        }

        let d = &self.defaults;
        let question_count = coerce_bounded(
            request.question_count.as_ref(),
            d.max_question_count,
            d.question_count,
        );
        let duration_seconds =
            coerce_positive(request.duration_seconds.as_ref(), d.duration_seconds);
        let max_incorrect_answers =
            coerce_non_negative(request.max_incorrect_answers.as_ref(), d.max_incorrect_answers);
        let min_questions_per_minute = coerce_non_negative(
            request.min_questions_per_minute.as_ref(),
            d.min_questions_per_minute,
        );

        if request.question_count.is_some()
            && coerce_integer(request.question_count.as_ref()) != Some(question_count)
        {
            debug!(value = ?request.question_count, "questionCount replaced by default");
        }
        if request.duration_seconds.is_some()
            && coerce_integer(request.duration_seconds.as_ref()) != Some(duration_seconds)
        {
            debug!(value = ?request.duration_seconds, "durationSeconds replaced by default");
        }

        let pairs = if is_truthy(request.regenerate.as_ref()) {
            generate_pairs(question_count)
        } else if let Some(supplied) = accept_supplied_pairs(request.pairs.as_ref(), question_count) {
            debug!("using administrator-supplied pairs");
            supplied
        } else {
            generate_pairs(question_count)
        };

        let snapshot = self
            .store
            .create_config_snapshot(NewConfigSnapshot {
                total_questions: question_count,
                duration_seconds,
                max_incorrect_answers,
                min_questions_per_minute,
            })
            .await?;

        info!(
            snapshot_id = %snapshot.id,
            by = %requester.email,
            question_count,
            duration_seconds,
            "test configuration updated"
        );

        Ok(ConfigView {
            question_count,
            duration_seconds,
            max_incorrect_answers,
            min_questions_per_minute,
            pairs,
        })
    }

    /// Snapshots newest first.
    pub async fn history(&self, limit: u32) -> Result<Vec<ConfigSnapshot>> {
        self.store.list_config_snapshots(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::traits::MockConfigStore;
    use crate::types::Role;
    use rstest::rstest;
    use serde_json::json;

    fn admin() -> Claims {
        Claims {
            email: "admin@kraepelin.test".into(),
            role: Role::Admin,
            iat: 0,
            exp: i64::MAX,
        }
    }

    fn echo_store() -> MockConfigStore {
        let mut store = MockConfigStore::new();
        store.expect_create_config_snapshot().returning(|fields| {
            Ok(ConfigSnapshot {
                id: "snap".into(),
                total_questions: fields.total_questions,
                duration_seconds: fields.duration_seconds,
                max_incorrect_answers: Some(fields.max_incorrect_answers),
                min_questions_per_minute: Some(fields.min_questions_per_minute),
                created_at: 1,
            })
        });
        store
    }

    fn supplied(count: usize) -> Value {
        Value::Array((0..count).map(|_| json!({"a": 3, "b": 3})).collect())
    }

    #[rstest]
    #[case(json!(10), 10)]
    #[case(json!("12"), 12)]
    #[case(json!(7.9), 7)]
    #[case(json!(0), 525)]
    #[case(json!(-3), 525)]
    #[case(json!("ten"), 525)]
    #[case(json!(null), 525)]
    #[case(json!([1]), 525)]
    fn test_coerce_positive(#[case] input: Value, #[case] expected: i64) {
        assert_eq!(coerce_positive(Some(&input), 525), expected);
    }

    #[rstest]
    #[case(json!(10_000), 10_000)]
    #[case(json!(10_001), 525)]
    #[case(json!(1e19), 525)]
    #[case(json!(-1e19), 525)]
    #[case(json!("9223372036854775807"), 525)]
    fn test_coerce_bounded(#[case] input: Value, #[case] expected: i64) {
        assert_eq!(coerce_bounded(Some(&input), 10_000, 525), expected);
    }

    #[rstest]
    #[case(json!(0), 0)]
    #[case(json!(4), 4)]
    #[case(json!("2"), 2)]
    #[case(json!(-1), 7)]
    #[case(json!(true), 7)]
    fn test_coerce_non_negative(#[case] input: Value, #[case] expected: i64) {
        assert_eq!(coerce_non_negative(Some(&input), 7), expected);
    }

    #[rstest]
    #[case(None, false)]
    #[case(Some(json!(false)), false)]
    #[case(Some(json!(true)), true)]
    #[case(Some(json!(1)), true)]
    #[case(Some(json!("")), false)]
    #[case(Some(json!("yes")), true)]
    fn test_is_truthy(#[case] input: Option<Value>, #[case] expected: bool) {
        assert_eq!(is_truthy(input.as_ref()), expected);
    }

    #[test]
    fn test_supplied_pairs_rules() {
        assert!(accept_supplied_pairs(Some(&supplied(4)), 4).is_some());
        assert!(accept_supplied_pairs(Some(&supplied(3)), 4).is_none());
        assert!(accept_supplied_pairs(Some(&json!([{"a": 2, "b": 5}])), 1).is_none());
        assert!(accept_supplied_pairs(Some(&json!([{"a": 10, "b": 5}])), 1).is_none());
        assert!(accept_supplied_pairs(Some(&json!([{"a": "4", "b": 5}])), 1).is_none());
        assert!(accept_supplied_pairs(Some(&json!({"a": 4})), 1).is_none());
    }

    #[tokio::test]
    async fn test_current_without_snapshot_uses_defaults_and_writes_nothing() {
        let mut store = MockConfigStore::new();
        store.expect_find_latest_config_snapshot().returning(|| Ok(None));
        store.expect_create_config_snapshot().never();

        let service = TestConfigService::new(Arc::new(store), TestDefaults::default());
        let view = service.current().await.unwrap();

        assert_eq!(view.question_count, 525);
        assert_eq!(view.duration_seconds, 900);
        assert_eq!(view.max_incorrect_answers, 7);
        assert_eq!(view.min_questions_per_minute, 35);
        assert_eq!(view.pairs.len(), 525);
    }

    #[tokio::test]
    async fn test_current_fills_missing_thresholds() {
        let mut store = MockConfigStore::new();
        store.expect_find_latest_config_snapshot().returning(|| {
            Ok(Some(ConfigSnapshot {
                id: "legacy".into(),
                total_questions: 40,
                duration_seconds: 120,
                max_incorrect_answers: None,
                min_questions_per_minute: Some(20),
                created_at: 1,
            }))
        });

        let service = TestConfigService::new(Arc::new(store), TestDefaults::default());
        let view = service.current().await.unwrap();

        assert_eq!(view.question_count, 40);
        assert_eq!(view.max_incorrect_answers, 7);
        assert_eq!(view.min_questions_per_minute, 20);
        assert_eq!(view.pairs.len(), 40);
    }

    #[tokio::test]
    async fn test_regenerate_ignores_supplied_pairs() {
        let service = TestConfigService::new(Arc::new(echo_store()), TestDefaults::default());
        let request = UpdateConfigRequest {
            question_count: Some(json!(64)),
            pairs: Some(supplied(64)),
            regenerate: Some(json!(true)),
            ..Default::default()
        };

        let view = service.update(&request, &admin()).await.unwrap();

        assert_eq!(view.pairs.len(), 64);
        assert_ne!(
            view.pairs,
            vec![QuestionPair { a: 3, b: 3 }; 64],
            "fresh pairs expected"
        );
    }

    #[tokio::test]
    async fn test_valid_supplied_pairs_are_kept() {
        let service = TestConfigService::new(Arc::new(echo_store()), TestDefaults::default());
        let request = UpdateConfigRequest {
            question_count: Some(json!(5)),
            pairs: Some(supplied(5)),
            ..Default::default()
        };

        let view = service.update(&request, &admin()).await.unwrap();

        assert_eq!(view.pairs, vec![QuestionPair { a: 3, b: 3 }; 5]);
    }

    #[tokio::test]
    async fn test_update_persists_resolved_scalars() {
        let mut store = MockConfigStore::new();
        store
            .expect_create_config_snapshot()
            .withf(|fields| {
                *fields
                    == NewConfigSnapshot {
                        total_questions: 525,
                        duration_seconds: 60,
                        max_incorrect_answers: 0,
                        min_questions_per_minute: 35,
                    }
            })
            .times(1)
            .returning(|fields| {
                Ok(ConfigSnapshot {
                    id: "s".into(),
                    total_questions: fields.total_questions,
                    duration_seconds: fields.duration_seconds,
                    max_incorrect_answers: Some(fields.max_incorrect_answers),
                    min_questions_per_minute: Some(fields.min_questions_per_minute),
                    created_at: 1,
                })
            });

        let service = TestConfigService::new(Arc::new(store), TestDefaults::default());
        let request = UpdateConfigRequest {
            question_count: Some(json!("abc")),
            duration_seconds: Some(json!(60)),
            max_incorrect_answers: Some(json!(0)),
            min_questions_per_minute: Some(json!(-5)),
            ..Default::default()
        };

        let view = service.update(&request, &admin()).await.unwrap();
        assert_eq!(view.question_count, 525);
        assert_eq!(view.max_incorrect_answers, 0);
    }

    #[tokio::test]
    async fn test_oversized_question_count_falls_back_to_default() {
        let mut store = MockConfigStore::new();
        store
            .expect_create_config_snapshot()
            .withf(|fields| fields.total_questions == 525)
            .times(2)
            .returning(|fields| {
                Ok(ConfigSnapshot {
                    id: "s".into(),
                    total_questions: fields.total_questions,
                    duration_seconds: fields.duration_seconds,
                    max_incorrect_answers: Some(fields.max_incorrect_answers),
                    min_questions_per_minute: Some(fields.min_questions_per_minute),
                    created_at: 1,
                })
            });

        let service = TestConfigService::new(Arc::new(store), TestDefaults::default());
        for huge in [json!(1e19), json!(50_000_000)] {
            let request = UpdateConfigRequest {
                question_count: Some(huge),
                ..Default::default()
            };
            let view = service.update(&request, &admin()).await.unwrap();

            assert_eq!(view.question_count, 525);
            assert_eq!(view.pairs.len(), 525);
        }
    }

    #[tokio::test]
    async fn test_current_ignores_oversized_stored_count() {
        let mut store = MockConfigStore::new();
        store.expect_find_latest_config_snapshot().returning(|| {
            Ok(Some(ConfigSnapshot {
                id: "huge".into(),
                total_questions: 50_000_000,
                duration_seconds: 120,
                max_incorrect_answers: Some(3),
                min_questions_per_minute: Some(20),
                created_at: 1,
            }))
        });

        let service = TestConfigService::new(Arc::new(store), TestDefaults::default());
        let view = service.current().await.unwrap();

        assert_eq!(view.question_count, 525);
        assert_eq!(view.pairs.len(), 525);
        assert_eq!(view.duration_seconds, 120);
    }

    #[tokio::test]
    async fn test_update_requires_admin() {
        let mut store = MockConfigStore::new();
        store.expect_create_config_snapshot().never();

        let service = TestConfigService::new(Arc::new(store), TestDefaults::default());
        let user = Claims {
            role: Role::User,
            ..admin()
        };

        let result = service.update(&UpdateConfigRequest::default(), &user).await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_store_failure_fails_update() {
        let mut store = MockConfigStore::new();
        store
            .expect_create_config_snapshot()
            .returning(|_| Err(AppError::Database("locked".into())));

        let service = TestConfigService::new(Arc::new(store), TestDefaults::default());
        let result = service.update(&UpdateConfigRequest::default(), &admin()).await;

        assert!(matches!(result, Err(AppError::Database(_))));
    }
}
