//! Retry policy and text helper behavior.

use std::sync::Mutex;
use std::time::Duration;

use research_agent::error::{ModelRequestError, ResearchError};
use research_agent::util::retry::RetryPolicy;
use research_agent::util::text::{collapse_whitespace, decode_entities, strip_tags, truncate_chars};

fn overloaded() -> ResearchError {
    ModelRequestError::Api {
        status: 503,
        message: "overloaded".into(),
    }
    .into()
}

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(200),
        max_backoff: Duration::from_secs(1),
        multiplier: 3.0,
    }
}

/// Replays `outcomes` in order and records how many were consumed.
struct Script {
    outcomes: Mutex<Vec<Result<&'static str, ResearchError>>>,
    calls: Mutex<u32>,
}

impl Script {
    fn new(mut outcomes: Vec<Result<&'static str, ResearchError>>) -> Self {
        outcomes.reverse();
        Self {
            outcomes: Mutex::new(outcomes),
            calls: Mutex::new(0),
        }
    }

    async fn next(&self) -> Result<&'static str, ResearchError> {
        *self.calls.lock().unwrap() += 1;
        self.outcomes
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(Ok("exhausted script"))
    }

    fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[tokio::test(start_paused = true)]
async fn server_errors_are_retried_until_success() {
    let script = Script::new(vec![Err(overloaded()), Err(overloaded()), Ok("answer")]);
    let started = tokio::time::Instant::now();

    let result = fast_policy(4).execute(|| script.next()).await;

    assert_eq!(result.unwrap(), "answer");
    assert_eq!(script.calls(), 3);
    // Two jittered waits: ~200ms then ~600ms.
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(600), "waited {waited:?}");
    assert!(waited <= Duration::from_millis(1000), "waited {waited:?}");
}

#[tokio::test(start_paused = true)]
async fn last_error_is_returned_once_budget_is_spent() {
    let script = Script::new(vec![Err(overloaded()), Err(overloaded()), Err(overloaded())]);

    let err = fast_policy(3).execute(|| script.next()).await.unwrap_err();

    assert!(matches!(
        err,
        ResearchError::ModelRequest(ModelRequestError::Api { status: 503, .. })
    ));
    assert_eq!(script.calls(), 3);
}

#[tokio::test]
async fn authentication_failure_is_not_retried() {
    let script = Script::new(vec![Err(ModelRequestError::Authentication("bad key".into()).into())]);

    let err = fast_policy(5).execute(|| script.next()).await.unwrap_err();

    assert_eq!(err.to_string(), "Model request failed: authentication failed: bad key");
    assert_eq!(script.calls(), 1);
}

#[tokio::test]
async fn default_policy_makes_a_single_attempt() {
    let script = Script::new(vec![Err(overloaded()), Ok("never reached")]);

    assert!(RetryPolicy::default().execute(|| script.next()).await.is_err());
    assert_eq!(script.calls(), 1);
}

#[tokio::test]
async fn execute_when_consults_the_predicate() {
    let calls = Mutex::new(0u32);

    let result: Result<(), String> = fast_policy(3)
        .execute_when(
            || {
                *calls.lock().unwrap() += 1;
                async { Err("permanent".to_string()) }
            },
            |e: &String| e != "permanent",
        )
        .await;

    assert_eq!(result, Err("permanent".to_string()));
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[test]
fn zero_attempts_is_clamped_to_one() {
    assert_eq!(RetryPolicy::default().with_max_attempts(0).max_attempts, 1);
}

#[test]
fn html_fragments_clean_to_plain_text() {
    let raw = "<b>Fast</b> &amp; <i>safe</i>\n   systems   programming";
    assert_eq!(
        collapse_whitespace(&decode_entities(&strip_tags(raw))),
        "Fast & safe systems programming"
    );
}

#[test]
fn truncate_chars_counts_characters_not_bytes() {
    let (kept, truncated) = truncate_chars("héllo wörld", 5);
    assert_eq!(kept, "héllo");
    assert!(truncated);
    assert_eq!(truncate_chars("short", 10), ("short", false));
}
