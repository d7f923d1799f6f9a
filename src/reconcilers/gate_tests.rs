// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `gate.rs`

#[cfg(test)]
mod tests {
    use crate::errors::GateError;
    use crate::reconcilers::gate::wait_until_ready;
    use crate::reconcilers::workload::Readiness;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    fn readiness(ready: i32) -> Readiness {
        Readiness {
            desired: 2,
            ready,
            updated: 2,
            generation_observed: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_ready_times_out() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let started = Instant::now();

        let result = wait_until_ready(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(readiness(0)) }
            },
            Duration::from_secs(9),
            Duration::from_secs(6),
            Duration::from_secs(3),
        )
        .await;

        assert_eq!(
            result,
            Err(GateError::Timeout {
                timeout: Duration::from_secs(9)
            })
        );
        let attempts = calls.load(Ordering::SeqCst);
        assert!((1..=2).contains(&attempts), "attempts = {attempts}");
        assert_eq!(started.elapsed(), Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_some_polls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let started = Instant::now();

        let result = wait_until_ready(
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok(readiness(if n >= 2 { 2 } else { 1 })) }
            },
            Duration::from_secs(300),
            Duration::from_secs(6),
            Duration::from_secs(3),
        )
        .await;

        assert_eq!(result, Ok(readiness(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // settle + two intervals
        assert_eq!(started.elapsed(), Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_probe_during_settle() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = wait_until_ready(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(readiness(2)) }
            },
            Duration::from_secs(5),
            Duration::from_secs(6),
            Duration::from_secs(3),
        )
        .await;

        assert!(matches!(result, Err(GateError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_error_stops_waiting() {
        let result = wait_until_ready(
            || async { Err(anyhow::anyhow!("deployments.apps \"coredns\" not found")) },
            Duration::from_secs(60),
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
        .await;

        match result {
            Err(GateError::Probe(message)) => assert!(message.contains("not found")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_the_wait_cancels_it() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let wait = wait_until_ready(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(readiness(0)) }
            },
            Duration::from_secs(300),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        let cancelled = tokio::time::timeout(Duration::from_millis(2500), wait).await;
        assert!(cancelled.is_err());

        let seen = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), seen);
    }
}
