// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `lifecycle.rs`

#[cfg(test)]
mod tests {
    use crate::reconcilers::lifecycle::*;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use kube::api::ObjectMeta;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    /// In-memory teardown: a step is done once it ran successfully.
    struct FakeTeardown {
        steps: &'static [TeardownPhase],
        done: Mutex<BTreeSet<usize>>,
        failing: Mutex<Option<TeardownPhase>>,
        runs: Mutex<Vec<TeardownPhase>>,
    }

    impl FakeTeardown {
        fn new(steps: &'static [TeardownPhase]) -> Self {
            Self {
                steps,
                done: Mutex::new(BTreeSet::new()),
                failing: Mutex::new(None),
                runs: Mutex::new(Vec::new()),
            }
        }

        fn index(&self, step: TeardownPhase) -> usize {
            self.steps.iter().position(|s| *s == step).unwrap()
        }
    }

    #[async_trait]
    impl Teardown for FakeTeardown {
        fn describe(&self) -> String {
            "Fake default/test".to_string()
        }

        fn steps(&self) -> &'static [TeardownPhase] {
            self.steps
        }

        async fn is_done(&self, step: TeardownPhase) -> Result<bool> {
            Ok(self.done.lock().unwrap().contains(&self.index(step)))
        }

        async fn run(&self, step: TeardownPhase) -> Result<()> {
            self.runs.lock().unwrap().push(step);
            if *self.failing.lock().unwrap() == Some(step) {
                bail!("{step} failed");
            }
            self.done.lock().unwrap().insert(self.index(step));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_zone_steps_run_in_order() {
        let teardown = FakeTeardown::new(ZONE_STEPS);
        assert_eq!(run_teardown(&teardown).await.unwrap(), TeardownPhase::Removed);
        assert_eq!(*teardown.runs.lock().unwrap(), ZONE_STEPS.to_vec());

        // Every step is done now, so a repeat runs nothing
        teardown.runs.lock().unwrap().clear();
        run_teardown(&teardown).await.unwrap();
        assert!(teardown.runs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_keeps_finalizer_and_resumes() {
        let teardown = FakeTeardown::new(CONNECTOR_STEPS);
        *teardown.failing.lock().unwrap() = Some(TeardownPhase::DetachArtifacts);

        assert!(run_teardown(&teardown).await.is_err());
        assert!(teardown.is_done(TeardownPhase::RestoreConfig).await.unwrap());
        assert!(!teardown.is_done(TeardownPhase::DetachArtifacts).await.unwrap());
        assert!(!teardown
            .runs
            .lock()
            .unwrap()
            .contains(&TeardownPhase::RemoveFinalizer));

        *teardown.failing.lock().unwrap() = None;
        teardown.runs.lock().unwrap().clear();
        run_teardown(&teardown).await.unwrap();
        assert_eq!(
            *teardown.runs.lock().unwrap(),
            vec![TeardownPhase::DetachArtifacts, TeardownPhase::RemoveFinalizer]
        );
    }

    #[test]
    fn test_remove_finalizer_is_always_last() {
        for steps in [RECORD_STEPS, ZONE_STEPS, CONNECTOR_STEPS] {
            assert_eq!(steps.last(), Some(&TeardownPhase::RemoveFinalizer));
        }
    }

    #[test]
    fn test_phase_of_metadata() {
        let finalizer = "corezone.firestoned.io/dnszone-finalizer";
        let mut cm = ConfigMap {
            metadata: ObjectMeta {
                name: Some("zone".to_string()),
                finalizers: Some(vec![finalizer.to_string()]),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(TeardownPhase::of(&cm, finalizer), TeardownPhase::Active);

        cm.metadata.deletion_timestamp = Some(Time(k8s_openapi::jiff::Timestamp::now()));
        assert_eq!(TeardownPhase::of(&cm, finalizer), TeardownPhase::Deleting);

        cm.metadata.finalizers = None;
        assert_eq!(TeardownPhase::of(&cm, finalizer), TeardownPhase::Removed);
    }
}
