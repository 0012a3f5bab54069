use code_explainer::explainers::{
    Explainer, ExplanationResult, FollowUpExplainer, GapAnalysis, Requirements, SimpleSummary,
};
use code_explainer::llm::LlmClient;
use code_explainer::orchestrator::{ExplainError, ExplainRequest, Stage};
use code_explainer::prompts;
use code_explainer::providers::{Provider, ProviderError};
use parking_lot::Mutex;
use std::sync::Arc;

use test_utils::{
    Behavior, StubClient, StubExplainer, gemini_config, orchestrator, orchestrator_with,
    source_tree,
};

const FOO_PY: &str = "def f():\n    return 1\n";

fn summary_only() -> Vec<Arc<dyn Explainer>> {
    vec![Arc::new(SimpleSummary) as Arc<dyn Explainer>]
}

#[tokio::test]
async fn test_simple_summary_end_to_end() {
    let dir = source_tree(&[("foo.py", FOO_PY)]);
    let client = Arc::new(StubClient::replying("This function returns 1."));
    let orchestrator = orchestrator(client.clone(), summary_only());

    let explanation = orchestrator
        .explain(&ExplainRequest::new(dir.path().join("foo.py"), "simple_summary"))
        .await
        .expect("request should succeed");

    assert_eq!(
        explanation.result,
        ExplanationResult::text("This function returns 1.")
    );
    assert_eq!(explanation.base_explanation, "This function returns 1.");
    assert_eq!(explanation.provider, Provider::Ollama);
    assert_eq!(explanation.model, "llama3");
    assert_eq!(explanation.files, vec![std::path::PathBuf::from("foo.py")]);

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prompt, prompts::create_base_prompt(FOO_PY));
    assert_eq!(requests[0].temperature, None);
}

#[tokio::test]
async fn test_stages_are_reported_in_order() {
    let dir = source_tree(&[("foo.py", FOO_PY)]);
    let client = Arc::new(StubClient::replying("Adds things."));
    let orchestrator = orchestrator(client, summary_only());

    let stages = Mutex::new(Vec::new());
    orchestrator
        .explain_with_progress(
            &ExplainRequest::new(dir.path(), "simple_summary"),
            |stage| stages.lock().push(stage),
        )
        .await
        .expect("request should succeed");

    assert_eq!(
        stages.into_inner(),
        vec![
            Stage::Idle,
            Stage::SourceLoaded,
            Stage::BaseExplained,
            Stage::Formatted,
            Stage::Done
        ]
    );
}

#[tokio::test]
async fn test_missing_credential_stops_before_any_explainer() {
    let dir = source_tree(&[("src/a.py", "a = 1"), ("src/b.py", "b = 2")]);
    let client = Arc::new(StubClient::requiring_credential("unused"));
    let explainer = StubExplainer::new("call_graph_image", Behavior::Echo);
    let orchestrator = orchestrator_with(
        gemini_config(),
        client.clone(),
        vec![explainer.clone() as Arc<dyn Explainer>],
    );

    let stages = Mutex::new(Vec::new());
    let err = orchestrator
        .explain_with_progress(
            &ExplainRequest::new(dir.path(), "call_graph_image"),
            |stage| stages.lock().push(stage),
        )
        .await
        .expect_err("a missing key must fail the request");

    assert!(matches!(
        err,
        ExplainError::Provider(ProviderError::MissingCredential {
            provider: Provider::Gemini,
            env_var: "GEMINI_API_KEY"
        })
    ));
    assert_eq!(err.failed_transition(), Stage::BaseExplained);
    assert_eq!(explainer.calls(), 0);
    assert_eq!(
        stages.into_inner(),
        vec![Stage::Idle, Stage::SourceLoaded, Stage::Failed]
    );
}

#[tokio::test]
async fn test_unavailable_provider_invokes_no_explainer() {
    let dir = source_tree(&[("foo.py", FOO_PY)]);
    let client = Arc::new(StubClient::failing(ProviderError::unavailable(
        Provider::Ollama,
        "connection refused",
    )));
    let explainer = StubExplainer::new("simple_summary", Behavior::Echo);
    let orchestrator = orchestrator(client, vec![explainer.clone() as Arc<dyn Explainer>]);

    let err = orchestrator
        .explain(&ExplainRequest::new(dir.path(), "simple_summary"))
        .await
        .expect_err("unavailable provider must fail the request");

    assert!(err.to_string().contains("connection refused"));
    assert_eq!(err.failed_transition(), Stage::BaseExplained);
    assert_eq!(explainer.calls(), 0);
}

#[tokio::test]
async fn test_source_errors_make_no_llm_call() {
    let client = Arc::new(StubClient::replying("never used"));
    let orchestrator = orchestrator(client.clone(), summary_only());

    let err = orchestrator
        .explain(&ExplainRequest::new("/no/such/path/anywhere", "simple_summary"))
        .await
        .expect_err("missing path must fail");

    assert_eq!(err.failed_transition(), Stage::SourceLoaded);
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_failing_and_panicking_explainers_become_error_results() {
    let dir = source_tree(&[("foo.py", FOO_PY)]);
    let client = Arc::new(StubClient::replying("Base."));
    let failing = StubExplainer::new("broken", Behavior::Fail);
    let panicking = StubExplainer::new("explosive", Behavior::Panic);
    let orchestrator = orchestrator(
        client,
        vec![
            failing.clone() as Arc<dyn Explainer>,
            panicking.clone() as Arc<dyn Explainer>,
        ],
    );

    let failed = orchestrator
        .explain(&ExplainRequest::new(dir.path(), "broken"))
        .await
        .expect("explainer failures are results, not errors");
    assert_eq!(
        failed.result,
        ExplanationResult::error("could not shape the explanation")
    );
    assert_eq!(failed.base_explanation, "Base.");

    let crashed = orchestrator
        .explain(&ExplainRequest::new(dir.path(), "explosive"))
        .await
        .expect("explainer panics are results, not errors");
    let ExplanationResult::Error { detail } = &crashed.result else {
        panic!("expected an error result, got {:?}", crashed.result);
    };
    assert!(detail.contains("explosive"));
    assert!(detail.contains("explainer blew up"));
    assert_eq!(panicking.calls(), 1);
}

#[tokio::test]
async fn test_unknown_explainer_after_base_call() {
    let dir = source_tree(&[("foo.py", FOO_PY)]);
    let client = Arc::new(StubClient::replying("Base."));
    let orchestrator = orchestrator(client.clone(), summary_only());

    let err = orchestrator
        .explain(&ExplainRequest::new(dir.path(), "interpretive_dance"))
        .await
        .expect_err("unknown key must fail");

    assert!(matches!(&err, ExplainError::UnknownExplainer(key) if key == "interpretive_dance"));
    assert_eq!(err.failed_transition(), Stage::Formatted);
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_follow_up_reuses_provider_model_and_credential() {
    let dir = source_tree(&[("foo.py", FOO_PY)]);
    let client = Arc::new(StubClient::requiring_credential("Shaped."));
    let orchestrator = orchestrator(
        client.clone(),
        vec![StubExplainer::new("shaper", Behavior::FollowUp) as Arc<dyn Explainer>],
    );

    let request = ExplainRequest {
        provider: Some(Provider::Gemini),
        model: Some("gemini-1.5-pro".to_string()),
        credential: Some("secret".to_string()),
        ..ExplainRequest::new(dir.path(), "shaper")
    };
    let explanation = orchestrator.explain(&request).await.expect("request");

    assert_eq!(explanation.result, ExplanationResult::text("Shaped."));
    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    for sent in &requests {
        assert_eq!(sent.provider, Provider::Gemini);
        assert_eq!(sent.model, "gemini-1.5-pro");
        assert_eq!(sent.credential.as_deref(), Some("secret"));
    }
    assert_eq!(requests[1].temperature, Some(0.3));
}

#[tokio::test]
async fn test_gap_analysis_needs_requirements() {
    let dir = source_tree(&[("calc.py", "def add(a, b):\n    return a + b\n")]);
    let client = Arc::new(StubClient::new(|request| {
        if request.prompt.contains("Functional Requirements") {
            Ok("Gap Analysis Report:\n- Subtraction is missing.".to_string())
        } else {
            Ok("Adds two numbers.".to_string())
        }
    }));
    let orchestrator = orchestrator(
        client.clone(),
        vec![Arc::new(GapAnalysis) as Arc<dyn Explainer>],
    );

    let without = orchestrator
        .explain(&ExplainRequest::new(dir.path(), "functional_gap_analysis"))
        .await
        .expect("request");
    assert!(without.result.is_error());
    assert_eq!(client.call_count(), 1);

    let request = ExplainRequest {
        requirements: Some(Requirements {
            label: "reqs.md".to_string(),
            text: "The calculator must add and subtract.".to_string(),
        }),
        ..ExplainRequest::new(dir.path(), "functional_gap_analysis")
    };
    let with = orchestrator.explain(&request).await.expect("request");
    let ExplanationResult::Text { content } = &with.result else {
        panic!("expected text, got {:?}", with.result);
    };
    assert!(content.starts_with(
        "Functional Gap Analysis Report (Code vs. Requirements from 'reqs.md'):"
    ));
    assert!(content.ends_with("- Subtraction is missing."));
    assert!(!content.contains("Gap Analysis Report:\n"));
}

#[tokio::test]
async fn test_code_rap_heading_and_cleanup() {
    let dir = source_tree(&[("foo.py", FOO_PY)]);
    let calls = Arc::new(Mutex::new(0usize));
    let counter = calls.clone();
    let client = Arc::new(StubClient::new(move |_| {
        let mut calls = counter.lock();
        *calls += 1;
        Ok(if *calls == 1 {
            "Returns one.".to_string()
        } else {
            "```\nRap Lyrics:\nYo, f returns one\n```".to_string()
        })
    }));
    let rap = FollowUpExplainer {
        key: "code_rap",
        build_prompt: prompts::code_rap_prompt,
        temperature: Some(0.7),
        heading: Some("Code Explainer Rap:"),
        preambles: &["Rap Lyrics:"],
    };
    let orchestrator = orchestrator(
        client.clone() as Arc<dyn LlmClient>,
        vec![Arc::new(rap) as Arc<dyn Explainer>],
    );

    let explanation = orchestrator
        .explain(&ExplainRequest::new(dir.path(), "code_rap"))
        .await
        .expect("request");
    assert_eq!(
        explanation.result,
        ExplanationResult::text("Code Explainer Rap:\n\nYo, f returns one")
    );
    assert_eq!(client.requests()[1].temperature, Some(0.7));
}
