#[cfg(test)]
mod integration_tests {
    use crate::{
        read_emails, write_results, Config, EmailVerifier, MockEmailVerifier, VerificationPipeline,
        VerificationReport, VerifierError,
    };
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashSet;
    use std::time::Duration;

    /// Scripted verifier: addresses without an `@` fail syntax, addresses on
    /// `disposable-domain.test` are disposable, and `down@` addresses error.
    struct StubVerifier;

    #[async_trait]
    impl EmailVerifier for StubVerifier {
        async fn verify(&mut self, email: &str) -> Result<VerificationReport, VerifierError> {
            tokio::task::yield_now().await;

            if email.starts_with("down@") {
                return Err(VerifierError::Verification(format!(
                    "dial tcp {email}: network is unreachable"
                )));
            }

            Ok(VerificationReport {
                syntax_valid: email.contains('@'),
                disposable: email.ends_with("@disposable-domain.test"),
                ..VerificationReport::deliverable()
            })
        }
    }

    fn config(workers: usize) -> Config {
        Config {
            workers,
            batch_size: 100,
            rate_limit: Duration::ZERO,
            enable_smtp: false,
            ..Default::default()
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_three_address_scenario_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("data.json");
        let output = dir.path().join("invalid_emails.json");
        std::fs::write(
            &input,
            r#"{"emails":["good@example.com","bad-syntax","user@disposable-domain.test"]}"#,
        )
        .unwrap();

        let emails = read_emails(&input).unwrap();
        let pipeline = VerificationPipeline::new(config(1), |_: usize| StubVerifier);
        let report = pipeline.run(emails).await.unwrap();
        write_results(&output, &report.invalid_emails, &report.stats).unwrap();

        let doc: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(doc["total_checked"], 3);
        assert_eq!(doc["total_valid"], 1);
        assert_eq!(doc["total_invalid"], 2);
        assert_eq!(
            doc["invalid_emails"],
            serde_json::json!([
                {"email": "bad-syntax", "reason": "invalid email syntax"},
                {"email": "user@disposable-domain.test", "reason": "disposable email address"}
            ])
        );
        assert!(doc["checked_at"].as_str().is_some());
        assert!(doc["processing_time_seconds"].as_f64().is_some());
    }

    #[tokio::test]
    async fn test_network_error_does_not_abort_the_run() {
        let emails = strings(&[
            "a@example.com",
            "b@example.com",
            "down@example.com",
            "c@example.com",
            "d@example.com",
        ]);

        let pipeline = VerificationPipeline::new(config(3), |_: usize| StubVerifier);
        let report = pipeline.run(emails).await.unwrap();

        assert_eq!(report.stats.total_checked, 5);
        assert_eq!(report.stats.total_valid, 4);
        assert_eq!(report.invalid_emails.len(), 1);
        assert_eq!(report.invalid_emails[0].email, "down@example.com");
        assert!(report.invalid_emails[0].reason.contains("network is unreachable"));
        assert!(report.invalid_emails[0]
            .reason
            .starts_with("verification error:"));
    }

    #[tokio::test]
    async fn test_mocked_verifier_errors_become_invalid_entries() {
        let factory = |_: usize| {
            let mut mock = MockEmailVerifier::new();
            mock.expect_verify().returning(|email| {
                if email.ends_with("@timeout.test") {
                    Err(VerifierError::Verification("SMTP timeout".to_string()))
                } else {
                    Ok(VerificationReport::deliverable())
                }
            });
            mock
        };

        let pipeline = VerificationPipeline::new(config(2), factory);
        let report = pipeline
            .run(strings(&["x@timeout.test", "y@fine.test", "z@timeout.test"]))
            .await
            .unwrap();

        assert_eq!(report.stats.total_invalid, 2);
        assert!(report
            .invalid_emails
            .iter()
            .all(|e| e.reason == "verification error: SMTP timeout"));
        assert_eq!(
            report.worker_stats.iter().map(|w| w.error_count).sum::<usize>(),
            2
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_invalid_list_matches_invalid_inputs_exactly() {
        let emails: Vec<String> = (0..2000)
            .map(|i| match i % 4 {
                0 => format!("broken{i}"),
                1 => format!("user{i}@disposable-domain.test"),
                _ => format!("user{i}@example.com"),
            })
            .collect();
        let expected: HashSet<String> = emails
            .iter()
            .filter(|e| !e.contains('@') || e.ends_with("@disposable-domain.test"))
            .cloned()
            .collect();

        let pipeline = VerificationPipeline::new(config(16), |_: usize| StubVerifier);
        let report = pipeline.run(emails).await.unwrap();

        let stats = report.stats;
        assert_eq!(stats.total_checked, 2000);
        assert_eq!(stats.total_checked, stats.total_valid + stats.total_invalid);
        assert_eq!(stats.total_invalid as usize, report.invalid_emails.len());

        let reported: HashSet<String> = report
            .invalid_emails
            .iter()
            .map(|e| e.email.clone())
            .collect();
        assert_eq!(reported.len(), report.invalid_emails.len(), "duplicate entries");
        assert_eq!(reported, expected);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("invalid_emails.json");

        let pipeline = VerificationPipeline::new(config(4), |_: usize| StubVerifier);
        let report = pipeline.run(Vec::new()).await.unwrap();
        assert_eq!(report.stats.total_checked, 0);
        assert!(report.stats.rate().is_finite());

        write_results(&output, &report.invalid_emails, &report.stats).unwrap();
        let doc: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(doc["invalid_emails"], serde_json::json!([]));
        assert_eq!(doc["total_checked"], 0);
        assert_eq!(doc["total_invalid"], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_bounds_throughput() {
        let workers = 2;
        let rate_limit = Duration::from_millis(100);
        let emails: Vec<String> = (0..6).map(|i| format!("u{i}@example.com")).collect();

        let pipeline = VerificationPipeline::new(
            Config {
                rate_limit,
                ..config(workers)
            },
            |_: usize| StubVerifier,
        );

        let started = tokio::time::Instant::now();
        let report = pipeline.run(emails).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(report.stats.total_checked, 6);
        // 6 jobs x 100ms shared by 2 workers
        assert!(elapsed >= Duration::from_millis(300), "finished in {elapsed:?}");
    }
}
