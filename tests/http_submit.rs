use formwork::{
    FieldInput, HttpSubmitTarget, Registration, RegistrationForm, SubmitError, SubmitOutcome,
    SubmitState,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fill_registration(form: &RegistrationForm) {
    let inputs = [
        ("name", FieldInput::Text("Ann Harper".into())),
        ("email", FieldInput::Text("ann@example.com".into())),
        ("password", FieldInput::Text("longenough".into())),
        ("terms", FieldInput::Toggle(true)),
        ("role", FieldInput::Text("student".into())),
        ("country", FieldInput::Text("Finland".into())),
        ("birthday", FieldInput::Text("1993-04-12".into())),
        ("news", FieldInput::Toggle(true)),
    ];
    for (field, input) in inputs {
        form.apply_input(field, input).expect("apply input");
    }
}

#[tokio::test]
async fn submit_posts_model_and_records_receipt() {
    let server = MockServer::start().await;
    let created = json!({"id": "901", "createdAt": "2026-08-23T10:12:51.000Z"});
    Mock::given(method("POST"))
        .and(path("/api/users"))
        .and(body_json(json!({
            "name": "Ann Harper",
            "email": "ann@example.com",
            "password": "longenough",
            "terms": true,
            "role": "student",
            "country": "Finland",
            "birthday": "1993-04-12",
            "news": true,
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(created.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let form = RegistrationForm::with_target(HttpSubmitTarget::new(format!(
        "{}/api/users",
        server.uri()
    )));
    fill_registration(&form);
    assert!(!form.snapshot().expect("snapshot").submit_disabled);

    let outcome = form.submit().await.expect("submit returns Ok");
    let receipt = match outcome {
        SubmitOutcome::Submitted(receipt) => receipt,
        other => panic!("expected Submitted, got {other:?}"),
    };
    assert_eq!(receipt.status, 201);
    assert_eq!(receipt.body, created);

    let snapshot = form.snapshot().expect("snapshot");
    assert_eq!(snapshot.model, Registration::default());
    assert_eq!(snapshot.submit_state, SubmitState::Succeeded);
    assert_eq!(snapshot.submissions, vec![receipt]);
    assert!(snapshot.submit_disabled);
}

#[tokio::test]
async fn rejected_delivery_keeps_the_form_editable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let form = RegistrationForm::with_target(HttpSubmitTarget::new(format!(
        "{}/api/users",
        server.uri()
    )));
    fill_registration(&form);

    let outcome = form.submit().await.expect("submit returns Ok");
    match outcome {
        SubmitOutcome::DeliveryFailed(SubmitError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected DeliveryFailed, got {other:?}"),
    }

    let snapshot = form.snapshot().expect("snapshot");
    assert_eq!(snapshot.model.name, "Ann Harper");
    assert_eq!(snapshot.submit_state, SubmitState::Failed);
    assert!(snapshot.submissions.is_empty());
    assert!(!snapshot.submit_disabled);
}

#[tokio::test]
async fn unreachable_endpoint_reports_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind throwaway listener");
    let port = listener.local_addr().expect("listener addr").port();
    drop(listener);

    let form = RegistrationForm::with_target(HttpSubmitTarget::new(format!(
        "http://127.0.0.1:{port}/api/users"
    )));
    fill_registration(&form);

    let outcome = form.submit().await.expect("submit returns Ok");
    assert!(matches!(
        outcome,
        SubmitOutcome::DeliveryFailed(SubmitError::Transport(_))
    ));
    assert_eq!(
        form.snapshot().expect("snapshot").submit_state,
        SubmitState::Failed
    );
}
