//! Mock API tests for the DeepL client and the job controller
//!
//! A local wiremock server stands in for the translation endpoint.

mod common;

use common::{srt_text, RecordingObserver};
use std::sync::Arc;
use std::time::Duration;
use subtrans::engine::{JobOutcome, JobState};
use subtrans::language::{Language, LanguagePair};
use subtrans::subtitle::SubtitleDocument;
use subtrans::translate::{DeepLClient, TranslationError, TranslationRequest, Translator};
use subtrans::{Config, JobController, SubtransError};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pair() -> LanguagePair {
    LanguagePair::new(Language::English, Language::German)
}

fn endpoint(server: &MockServer) -> String {
    format!("{}/v2/translate", server.uri())
}

fn translation(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "translations": [{ "detected_source_language": "EN", "text": text }]
    }))
}

// ============================================================================
// DeepL client
// ============================================================================

mod client_tests {
    use super::*;

    #[tokio::test]
    async fn test_sends_form_fields_and_reads_first_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .and(body_string_contains("auth_key=test-key"))
            .and(body_string_contains("text=Hello"))
            .and(body_string_contains("source_lang=EN"))
            .and(body_string_contains("target_lang=DE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": [{ "text": "Hallo" }, { "text": "Servus" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = DeepLClient::new("test-key".to_string()).with_endpoint(endpoint(&server));
        let result = client.translate(&TranslationRequest::new("Hello", pair())).await;

        assert_eq!(result, Ok("Hallo".to_string()));
    }

    #[tokio::test]
    async fn test_non_success_status_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(456).set_body_string("Quota exceeded"))
            .mount(&server)
            .await;

        let client = DeepLClient::new("k".to_string()).with_endpoint(endpoint(&server));
        let result = client.translate(&TranslationRequest::new("Hello", pair())).await;

        assert_eq!(
            result,
            Err(TranslationError::Remote {
                status: 456,
                message: "Quota exceeded".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_unexpected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = DeepLClient::new("k".to_string()).with_endpoint(endpoint(&server));
        let result = client.translate(&TranslationRequest::new("Hello", pair())).await;

        assert!(matches!(result, Err(TranslationError::Unexpected(_))));
    }

    #[tokio::test]
    async fn test_empty_candidate_list_is_unexpected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "translations": [] })),
            )
            .mount(&server)
            .await;

        let client = DeepLClient::new("k".to_string()).with_endpoint(endpoint(&server));
        let result = client.translate(&TranslationRequest::new("Hello", pair())).await;

        assert!(matches!(result, Err(TranslationError::Unexpected(_))));
    }

    #[tokio::test]
    async fn test_connection_failure_is_transient() {
        // Reserve a port, then release it so nothing is listening there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/v2/translate", listener.local_addr().unwrap());
        drop(listener);

        let client = DeepLClient::new("k".to_string()).with_endpoint(url);
        let result = client.translate(&TranslationRequest::new("Hello", pair())).await;

        assert!(matches!(result, Err(TranslationError::Transient(_))));
    }
}

// ============================================================================
// Job controller
// ============================================================================

mod controller_tests {
    use super::*;

    fn controller(server: &MockServer) -> JobController {
        JobController::new(Config {
            api_key: Some("test-key".to_string()),
            api_url: endpoint(server),
            threads: 2,
            pacing_ms: 0,
            ..Config::default()
        })
        .unwrap()
    }

    #[test]
    fn test_remote_error_on_one_entry_still_completes() {
        let server = tokio_test::block_on(async {
            let server = MockServer::start().await;
            Mock::given(body_string_contains("text=Hello"))
                .respond_with(translation("Hallo"))
                .mount(&server)
                .await;
            Mock::given(body_string_contains("text=Broken"))
                .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
                .mount(&server)
                .await;
            Mock::given(body_string_contains("text=Goodbye"))
                .respond_with(translation("Auf Wiedersehen"))
                .mount(&server)
                .await;
            server
        });

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.srt");
        let output = dir.path().join("movie.de.srt");
        std::fs::write(&input, srt_text(&["Hello", "Broken", "Goodbye"])).unwrap();

        let controller = controller(&server);
        let observer = Arc::new(RecordingObserver::default());
        controller
            .start(&input, &output, pair(), observer.clone())
            .unwrap();

        let outcome = controller.wait().unwrap();
        assert!(matches!(outcome, JobOutcome::Completed(_)));
        assert_eq!(outcome.summary().entries_processed, 3);
        assert_eq!(outcome.summary().entries_failed, 1);
        assert_eq!(controller.state(), JobState::Completed);

        let saved = SubtitleDocument::open(&output).unwrap();
        let texts: Vec<_> = saved.entries.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["Hallo", "Broken", "Auf Wiedersehen"]);

        let original = SubtitleDocument::open(&input).unwrap();
        for (before, after) in original.entries.iter().zip(&saved.entries) {
            assert_eq!(before.start, after.start);
            assert_eq!(before.end, after.end);
        }

        let used = ("Hallo".len() + "Auf Wiedersehen".len()) as u64;
        assert_eq!(controller.quota_snapshot(), (500_000, used));
        assert_eq!(observer.progress().len(), 3);
        assert_eq!(
            observer.statuses(),
            vec![JobState::Running, JobState::Completed]
        );
        assert!(observer.errors().is_empty());
    }

    #[test]
    fn test_empty_document_completes_without_requests() {
        let server = tokio_test::block_on(MockServer::start());
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.srt");
        let output = dir.path().join("empty.de.srt");
        std::fs::write(&input, "").unwrap();

        let controller = controller(&server);
        let observer = Arc::new(RecordingObserver::default());
        controller
            .start(&input, &output, pair(), observer.clone())
            .unwrap();

        let outcome = controller.wait().unwrap();
        assert!(matches!(outcome, JobOutcome::Completed(_)));
        assert_eq!(observer.progress(), vec![1.0]);
        assert_eq!(observer.statuses().last(), Some(&JobState::Completed));
        assert!(output.exists());

        let requests = tokio_test::block_on(server.received_requests()).unwrap();
        assert!(requests.is_empty());
    }

    #[test]
    fn test_missing_credential_reports_error_and_stays_idle() {
        let server = tokio_test::block_on(MockServer::start());
        let controller = controller(&server);
        assert!(controller.delete_api_key());

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.srt");
        std::fs::write(&input, srt_text(&["Hello"])).unwrap();

        let observer = Arc::new(RecordingObserver::default());
        let result = controller.start(&input, &dir.path().join("out.srt"), pair(), observer.clone());

        assert!(matches!(result, Err(SubtransError::MissingCredential)));
        assert_eq!(observer.errors().len(), 1);
        assert!(observer.statuses().is_empty());
        assert_eq!(controller.state(), JobState::Idle);
        assert!(controller.wait().is_none());
    }

    #[test]
    fn test_malformed_file_is_rejected_before_start() {
        let server = tokio_test::block_on(MockServer::start());
        let controller = controller(&server);

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.srt");
        std::fs::write(&input, "not a subtitle\n").unwrap();

        let observer = Arc::new(RecordingObserver::default());
        let result = controller.start(&input, &dir.path().join("out.srt"), pair(), observer.clone());

        assert!(matches!(result, Err(SubtransError::Format(_))));
        assert_eq!(observer.errors().len(), 1);
        assert_eq!(controller.state(), JobState::Idle);
    }

    #[test]
    fn test_second_start_rejected_and_stop_preserves_remaining_text() {
        let server = tokio_test::block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(translation("Übersetzt").set_delay(Duration::from_millis(300)))
                .mount(&server)
                .await;
            server
        });

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.srt");
        let output = dir.path().join("movie.de.srt");
        std::fs::write(&input, srt_text(&["one", "two", "three", "four"])).unwrap();

        let controller = controller(&server);
        let observer = Arc::new(RecordingObserver::default());
        controller
            .start(&input, &output, pair(), observer.clone())
            .unwrap();
        assert!(controller.state().is_active());

        let second = controller.start(&input, &output, pair(), Arc::new(RecordingObserver::default()));
        assert!(matches!(second, Err(SubtransError::JobActive)));
        assert!(matches!(controller.set_thread_count(1), Err(SubtransError::JobActive)));

        controller.stop();
        let outcome = controller.wait().unwrap();

        assert!(matches!(outcome, JobOutcome::Cancelled(_)));
        assert_eq!(controller.state(), JobState::Idle);
        assert!(observer.statuses().contains(&JobState::Cancelling));
        assert_eq!(observer.statuses().last(), Some(&JobState::Idle));

        let processed = outcome.summary().entries_processed;
        assert!(processed <= 1);

        let saved = SubtitleDocument::open(&output).unwrap();
        let originals = ["one", "two", "three", "four"];
        for (entry, original) in saved.entries.iter().zip(originals).skip(processed) {
            assert_eq!(entry.text, original);
        }

        // The pool can be resized again once idle.
        controller.set_thread_count(1).unwrap();
    }

    #[test]
    fn test_new_job_after_completion() {
        let server = tokio_test::block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(translation("Ja"))
                .expect(2)
                .mount(&server)
                .await;
            server
        });

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.srt");
        std::fs::write(&input, srt_text(&["Yes"])).unwrap();

        let controller = controller(&server);
        for run in 1..=2u64 {
            let output = dir.path().join(format!("run{}.srt", run));
            controller
                .start(&input, &output, pair(), Arc::new(RecordingObserver::default()))
                .unwrap();
            assert!(matches!(controller.wait(), Some(JobOutcome::Completed(_))));
            assert_eq!(controller.quota_snapshot().1, 2 * run);
        }
        assert_eq!(controller.progress().unwrap().entries_processed, 1);
    }

    #[test]
    fn test_resize_after_job_keeps_outcome_for_wait() {
        let server = tokio_test::block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(translation("Ja"))
                .mount(&server)
                .await;
            server
        });

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.srt");
        let output = dir.path().join("movie.de.srt");
        std::fs::write(&input, srt_text(&["Yes", "Yes"])).unwrap();

        let controller = controller(&server);
        controller
            .start(&input, &output, pair(), Arc::new(RecordingObserver::default()))
            .unwrap();
        while controller.state().is_active() {
            std::thread::sleep(Duration::from_millis(5));
        }

        controller.set_thread_count(1).unwrap();
        let outcome = controller.wait().unwrap();
        assert!(matches!(outcome, JobOutcome::Completed(_)));
        assert_eq!(outcome.summary().entries_processed, 2);
        assert!(controller.wait().is_none());
        assert_eq!(controller.config().threads, 1);
    }
}
