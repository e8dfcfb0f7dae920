//! Wait-then-apply loop for pushing app settings to a deployment target.
//!
//! Flow per attempt: wait_for_ready → apply_configuration → verify.
//! A wait timeout is logged and the update goes ahead anyway unless the
//! policy asks for strict waiting.

use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::control_plane::{ControlPlane, ControlPlaneError};
use crate::models::{ConfigurationSet, DeploymentTarget, ProvisioningState, RetryPolicy, WaitPolicy};

/// Characters of a setting value shown when displaying the applied configuration.
const VISIBLE_VALUE_PREFIX: usize = 4;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("{target} not ready after {queries} queries (last state: {last_state})")]
    WaitTimedOut {
        target: String,
        queries: u32,
        last_state: String,
    },

    #[error("configuration set is empty")]
    EmptyConfiguration,

    #[error("control plane error: {0}")]
    ControlPlane(#[from] ControlPlaneError),

    #[error("gave up after {attempts} attempts: {last_error}")]
    Exhausted {
        attempts: u32,
        last_error: Box<UpdateError>,
    },
}

/// What a successful run did.
#[derive(Debug)]
pub struct UpdateReport {
    /// 1-based attempt that succeeded.
    pub attempts: u32,
    /// Settings read back after the update; `None` when the read-back failed.
    pub current: Option<ConfigurationSet>,
    /// Applied names whose read-back value is missing or different.
    pub mismatched: Vec<String>,
}

/// Polls the target until it reports `Succeeded` or `policy.timeout` elapses.
///
/// Returns the number of queries issued. Query errors count as "not ready".
pub async fn wait_for_ready(
    plane: &dyn ControlPlane,
    target: &DeploymentTarget,
    policy: &WaitPolicy,
) -> Result<u32, UpdateError> {
    let started = Instant::now();
    let mut queries = 0;
    let mut last_state: Option<ProvisioningState> = None;

    loop {
        queries += 1;
        match plane.provisioning_state(target).await {
            Ok(state) if state.is_ready() => {
                info!("{target} is ready (state: {state}) after {queries} queries");
                return Ok(queries);
            }
            Ok(state) => {
                info!("{target} state is {state}, waiting...");
                last_state = Some(state);
            }
            Err(e) => warn!("Could not query state of {target}: {e}"),
        }

        if started.elapsed() >= policy.timeout {
            return Err(UpdateError::WaitTimedOut {
                target: target.to_string(),
                queries,
                last_state: last_state
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            });
        }

        sleep(policy.poll_interval).await;
    }
}

/// Issues a single update call carrying every pair in `settings`.
pub async fn apply_configuration(
    plane: &dyn ControlPlane,
    target: &DeploymentTarget,
    settings: &ConfigurationSet,
) -> Result<(), UpdateError> {
    if settings.is_empty() {
        return Err(UpdateError::EmptyConfiguration);
    }
    plane.apply_settings(target, settings).await?;
    Ok(())
}

/// Retries wait + apply up to `retry.max_attempts` times with a fixed delay.
pub async fn update_with_retry(
    plane: &dyn ControlPlane,
    target: &DeploymentTarget,
    settings: &ConfigurationSet,
    retry: &RetryPolicy,
    wait: &WaitPolicy,
) -> Result<UpdateReport, UpdateError> {
    if settings.is_empty() {
        return Err(UpdateError::EmptyConfiguration);
    }

    let max_attempts = retry.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        info!(
            "Attempt {attempt}/{max_attempts}: applying {} settings to {target}",
            settings.len()
        );

        let outcome = match wait_for_ready(plane, target, wait).await {
            Err(e) if retry.strict_wait => Err(e),
            Err(e) => {
                warn!("{e}; applying settings anyway");
                apply_configuration(plane, target, settings).await
            }
            Ok(_) => apply_configuration(plane, target, settings).await,
        };

        match outcome {
            Ok(()) => {
                info!("Settings applied to {target} on attempt {attempt}");
                let current = verify(plane, target).await;
                let mismatched = current
                    .as_ref()
                    .map(|current| mismatched_settings(settings, current))
                    .unwrap_or_default();
                if !mismatched.is_empty() {
                    warn!("Read-back differs for: {}", mismatched.join(", "));
                }
                return Ok(UpdateReport {
                    attempts: attempt,
                    current,
                    mismatched,
                });
            }
            Err(e) => {
                error!("Attempt {attempt}/{max_attempts} failed: {e}");
                last_error = Some(e);
            }
        }

        if attempt < max_attempts {
            warn!("Retrying in {}s...", retry.retry_delay.as_secs());
            sleep(retry.retry_delay).await;
        }
    }

    let last_error = last_error.unwrap_or(UpdateError::EmptyConfiguration);
    error!("Failed to update {target} after {max_attempts} attempts");
    Err(UpdateError::Exhausted {
        attempts: max_attempts,
        last_error: Box::new(last_error),
    })
}

/// Process exit status for a finished run: 0 on success, 1 otherwise.
pub fn exit_status<T>(result: &Result<T, UpdateError>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

async fn verify(plane: &dyn ControlPlane, target: &DeploymentTarget) -> Option<ConfigurationSet> {
    match plane.list_settings(target).await {
        Ok(current) => {
            info!("Current settings on {target}:");
            for (name, value) in current.iter() {
                info!("  {name} = {}", mask_value(value));
            }
            Some(current)
        }
        Err(e) => {
            warn!("Settings were applied but could not be read back: {e}");
            None
        }
    }
}

fn mismatched_settings(applied: &ConfigurationSet, current: &ConfigurationSet) -> Vec<String> {
    applied
        .iter()
        .filter(|(name, value)| current.get(name) != Some(*value))
        .map(|(name, _)| name.to_string())
        .collect()
}

fn mask_value(value: &str) -> String {
    let visible: String = value.chars().take(VISIBLE_VALUE_PREFIX).collect();
    if visible.len() == value.len() {
        "*".repeat(value.chars().count())
    } else {
        format!("{visible}****")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted control plane: states and update results are consumed in order.
    /// When a script runs out, the target is ready and updates succeed.
    #[derive(Default)]
    struct FakeControlPlane {
        states: Mutex<VecDeque<Result<ProvisioningState, u16>>>,
        apply_results: Mutex<VecDeque<Result<(), u16>>>,
        applied: Mutex<Vec<ConfigurationSet>>,
        state_queries: Mutex<u32>,
        list_fails: bool,
        read_back: Option<ConfigurationSet>,
    }

    impl FakeControlPlane {
        fn with_states(states: &[&str]) -> Self {
            let fake = Self::default();
            *fake.states.lock().unwrap() =
                states.iter().map(|s| Ok(ProvisioningState::from(*s))).collect();
            fake
        }

        fn failing_updates(self, failures: usize) -> Self {
            *self.apply_results.lock().unwrap() = (0..failures).map(|_| Err(409)).collect();
            self
        }

        fn always_failing_updates(self) -> Self {
            self.failing_updates(1_000)
        }

        fn queries(&self) -> u32 {
            *self.state_queries.lock().unwrap()
        }

        fn apply_calls(&self) -> usize {
            self.applied.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ControlPlane for FakeControlPlane {
        async fn provisioning_state(
            &self,
            _target: &DeploymentTarget,
        ) -> Result<ProvisioningState, ControlPlaneError> {
            *self.state_queries.lock().unwrap() += 1;
            match self.states.lock().unwrap().pop_front() {
                Some(Ok(state)) => Ok(state),
                Some(Err(status)) => Err(ControlPlaneError::Api {
                    status,
                    message: "state query failed".to_string(),
                }),
                None => Ok(ProvisioningState::Succeeded),
            }
        }

        async fn apply_settings(
            &self,
            _target: &DeploymentTarget,
            settings: &ConfigurationSet,
        ) -> Result<(), ControlPlaneError> {
            self.applied.lock().unwrap().push(settings.clone());
            match self.apply_results.lock().unwrap().pop_front() {
                Some(Err(status)) => Err(ControlPlaneError::Api {
                    status,
                    message: "site is busy".to_string(),
                }),
                _ => Ok(()),
            }
        }

        async fn list_settings(
            &self,
            _target: &DeploymentTarget,
        ) -> Result<ConfigurationSet, ControlPlaneError> {
            if self.list_fails {
                return Err(ControlPlaneError::UnexpectedResponse("boom".to_string()));
            }
            if let Some(read_back) = &self.read_back {
                return Ok(read_back.clone());
            }
            Ok(self
                .applied
                .lock()
                .unwrap()
                .last()
                .cloned()
                .unwrap_or_default())
        }
    }

    fn target() -> DeploymentTarget {
        DeploymentTarget {
            subscription_id: "sub".to_string(),
            resource_group: "rg".to_string(),
            name: "app".to_string(),
        }
    }

    fn settings() -> ConfigurationSet {
        [
            ("GEMINI_API_KEY", "secret-key"),
            ("RESUME_CONTAINER_NAME", "resume"),
        ]
        .into_iter()
        .collect()
    }

    fn unit_wait() -> WaitPolicy {
        WaitPolicy {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_ready_succeeds_on_third_query() {
        let plane = FakeControlPlane::with_states(&["Updating", "Updating", "Succeeded"]);
        let queries = wait_for_ready(&plane, &target(), &unit_wait()).await.unwrap();
        assert_eq!(queries, 3);
        assert_eq!(plane.queries(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_ready_returns_immediately_when_ready() {
        let plane = FakeControlPlane::with_states(&["Succeeded"]);
        let started = Instant::now();
        let queries = wait_for_ready(&plane, &target(), &unit_wait()).await.unwrap();
        assert_eq!(queries, 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_ready_times_out() {
        let plane = FakeControlPlane::with_states(&["Updating"; 100]);
        let policy = WaitPolicy {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(10),
        };
        let started = Instant::now();
        let err = wait_for_ready(&plane, &target(), &policy).await.unwrap_err();

        match err {
            UpdateError::WaitTimedOut {
                queries, last_state, ..
            } => {
                assert_eq!(queries, 4);
                assert_eq!(last_state, "Updating");
            }
            other => panic!("expected WaitTimedOut, got {other:?}"),
        }
        assert!(started.elapsed() >= policy.timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_ready_treats_query_errors_as_not_ready() {
        let plane = FakeControlPlane::default();
        *plane.states.lock().unwrap() = VecDeque::from(vec![
            Err(503),
            Ok(ProvisioningState::Updating),
            Ok(ProvisioningState::Succeeded),
        ]);
        let queries = wait_for_ready(&plane, &target(), &unit_wait()).await.unwrap();
        assert_eq!(queries, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_ready_never_reports_failed_as_ready() {
        let plane = FakeControlPlane::with_states(&["Failed"; 50]);
        let result = wait_for_ready(&plane, &target(), &unit_wait()).await;
        assert!(matches!(result, Err(UpdateError::WaitTimedOut { .. })));
    }

    #[tokio::test]
    async fn test_apply_configuration_rejects_empty_set() {
        let plane = FakeControlPlane::default();
        let result = apply_configuration(&plane, &target(), &ConfigurationSet::new()).await;
        assert!(matches!(result, Err(UpdateError::EmptyConfiguration)));
        assert_eq!(plane.apply_calls(), 0);
    }

    #[tokio::test]
    async fn test_apply_configuration_sends_whole_set_once() {
        let plane = FakeControlPlane::default();
        apply_configuration(&plane, &target(), &settings()).await.unwrap();
        let applied = plane.applied.lock().unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0], settings());
    }

    #[tokio::test]
    async fn test_apply_configuration_surfaces_remote_failure() {
        let plane = FakeControlPlane::default().failing_updates(1);
        let result = apply_configuration(&plane, &target(), &settings()).await;
        assert!(matches!(
            result,
            Err(UpdateError::ControlPlane(ControlPlaneError::Api { status: 409, .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_succeeds_first_attempt() {
        let plane = FakeControlPlane::with_states(&["Succeeded"]);
        let result = update_with_retry(
            &plane,
            &target(),
            &settings(),
            &RetryPolicy::default(),
            &unit_wait(),
        )
        .await;

        assert_eq!(exit_status(&result), 0);
        let report = result.unwrap();
        assert_eq!(report.attempts, 1);
        assert_eq!(report.current, Some(settings()));
        assert!(report.mismatched.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_back_mismatch_is_reported_not_failed() {
        let plane = FakeControlPlane {
            read_back: Some([("GEMINI_API_KEY", "old-key")].into_iter().collect()),
            ..Default::default()
        };
        let report = update_with_retry(
            &plane,
            &target(),
            &settings(),
            &RetryPolicy::default(),
            &unit_wait(),
        )
        .await
        .unwrap();
        assert_eq!(report.attempts, 1);
        assert_eq!(
            report.mismatched,
            vec!["GEMINI_API_KEY".to_string(), "RESUME_CONTAINER_NAME".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_succeeds_on_fifth_attempt() {
        let plane = FakeControlPlane::default().failing_updates(4);
        let started = Instant::now();
        let result = update_with_retry(
            &plane,
            &target(),
            &settings(),
            &RetryPolicy::default(),
            &unit_wait(),
        )
        .await;

        assert_eq!(exit_status(&result), 0);
        assert_eq!(result.unwrap().attempts, 5);
        assert_eq!(plane.apply_calls(), 5);
        assert!(started.elapsed() >= Duration::from_secs(4 * 30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_fails_after_all_attempts() {
        let plane = FakeControlPlane::default().always_failing_updates();
        let result = update_with_retry(
            &plane,
            &target(),
            &settings(),
            &RetryPolicy::default(),
            &unit_wait(),
        )
        .await;

        assert_eq!(exit_status(&result), 1);
        assert_eq!(plane.apply_calls(), 5);
        match result.unwrap_err() {
            UpdateError::Exhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 5);
                assert!(matches!(*last_error, UpdateError::ControlPlane(_)));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_delay_is_respected_between_attempts() {
        let plane = FakeControlPlane::default().failing_updates(1);
        let retry = RetryPolicy {
            max_attempts: 3,
            retry_delay: Duration::from_secs(30),
            strict_wait: false,
        };
        let started = Instant::now();
        update_with_retry(&plane, &target(), &settings(), &retry, &unit_wait())
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_delay_after_final_attempt() {
        let plane = FakeControlPlane::default().always_failing_updates();
        let retry = RetryPolicy {
            max_attempts: 2,
            retry_delay: Duration::from_secs(30),
            strict_wait: false,
        };
        let started = Instant::now();
        let _ = update_with_retry(&plane, &target(), &settings(), &retry, &unit_wait()).await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(30));
        assert!(elapsed < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout_still_attempts_update() {
        let plane = FakeControlPlane::with_states(&["Updating"; 100]);
        let result = update_with_retry(
            &plane,
            &target(),
            &settings(),
            &RetryPolicy::default(),
            &unit_wait(),
        )
        .await;

        assert_eq!(result.unwrap().attempts, 1);
        assert_eq!(plane.apply_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_strict_wait_skips_update_on_timeout() {
        let plane = FakeControlPlane::with_states(&["Updating"; 1_000]);
        let retry = RetryPolicy {
            max_attempts: 2,
            retry_delay: Duration::from_secs(30),
            strict_wait: true,
        };
        let result = update_with_retry(&plane, &target(), &settings(), &retry, &unit_wait()).await;

        assert_eq!(plane.apply_calls(), 0);
        match result.unwrap_err() {
            UpdateError::Exhausted { last_error, .. } => {
                assert!(matches!(*last_error, UpdateError::WaitTimedOut { .. }))
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_back_failure_does_not_fail_update() {
        let plane = FakeControlPlane {
            list_fails: true,
            ..Default::default()
        };
        let report = update_with_retry(
            &plane,
            &target(),
            &settings(),
            &RetryPolicy::default(),
            &unit_wait(),
        )
        .await
        .unwrap();
        assert!(report.current.is_none());
        assert!(report.mismatched.is_empty());
    }

    #[tokio::test]
    async fn test_update_with_empty_set_makes_no_calls() {
        let plane = FakeControlPlane::default();
        let result = update_with_retry(
            &plane,
            &target(),
            &ConfigurationSet::new(),
            &RetryPolicy::default(),
            &unit_wait(),
        )
        .await;
        assert!(matches!(result, Err(UpdateError::EmptyConfiguration)));
        assert_eq!(plane.queries(), 0);
        assert_eq!(exit_status(&result), 1);
    }

    #[test]
    fn test_mask_value_keeps_short_prefix() {
        assert_eq!(mask_value("AccountKey=abc"), "Acco****");
        assert_eq!(mask_value("8000"), "****");
        assert_eq!(mask_value(""), "");
    }
}
