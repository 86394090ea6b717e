//! End-to-end flows through the edge services.
//!
//! Every test drives a service through `EdgeService::handle` with plain
//! `InboundRequest` values, the same path the axum binding takes.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use form_intake::sheet::VecSink;
use form_intake::web::{EdgeService, InboundRequest, HEALTH_PATH};
use form_intake::{
    Downstream, FormKind, GoogleConfig, IntakeConfig, IntakeHandler, Secret, SheetConfig,
    SheetLogger, TransitBroker, TransitConfig,
};
use serde_json::{json, Value};

const ORIGIN: &str = "https://www.example.com";

fn intake_config() -> IntakeConfig {
    IntakeConfig::from_lookup(|key| match key {
        "ALLOWED_ORIGINS" => Some(format!("{ORIGIN},https://staging.example.com")),
        "ASSET_ID" => Some("site-01".to_string()),
        _ => None,
    })
    .expect("valid configuration")
}

fn submit(form: &str, body: &Value) -> InboundRequest {
    InboundRequest::new(Method::POST, format!("/ingress/{form}"))
        .with_origin(ORIGIN)
        .with_request_id("it-req-1")
        .with_body(body.to_string())
}

#[tokio::test]
async fn scenario_a_minimal_join_submission() {
    let handler = IntakeHandler::from_config(
        FormKind::Join,
        IntakeConfig {
            downstream: Downstream::InProcess,
            ..intake_config()
        },
    )
    .expect("handler builds");

    let reply = handler
        .handle(submit(
            "join",
            &json!({
                "Name": "Jo",
                "Email": "a@b.co",
                "What are you interested in?": "IT Support",
            }),
        ))
        .await;

    assert_eq!(reply.status(), StatusCode::ACCEPTED);
    let body = reply.body().expect("json body");
    assert_eq!(body["ok"], true);
    assert_eq!(body["status"], "accepted_by_transit");
    assert_eq!(body["form"], "join");

    let fields = body["fields"].as_object().expect("fields object");
    assert_eq!(fields["Name"], "Jo");
    assert_eq!(fields["Email"], "a@b.co");
    assert_eq!(fields["What are you interested in?"], "IT Support");
    assert_eq!(fields["Phone"], "");
    assert_eq!(fields["Preferred Date"], "");
    assert_eq!(fields["Preferred Time"], "");
    assert_eq!(fields["Services"], json!([]));
    assert_eq!(fields["Comments"], "");
    assert_eq!(fields.len(), 8);
}

#[tokio::test]
async fn scenario_b_script_is_stripped() {
    let handler = IntakeHandler::new(FormKind::Contact, intake_config());

    let reply = handler
        .handle(submit(
            "contact",
            &json!({
                "Name": "Jo",
                "Email": "a@b.co",
                "Comments": "<script>alert(1)</script>",
            }),
        ))
        .await;

    assert_eq!(reply.status(), StatusCode::OK);
    let comments = reply.body().unwrap()["fields"]["Comments"]
        .as_str()
        .expect("string comments");
    assert!(!comments.contains("<script>"));
    assert!(!comments.contains('<'));
    assert!(!comments.contains('>'));
}

#[tokio::test]
async fn scenario_c_foreign_origin_is_refused() {
    let handler = IntakeHandler::new(FormKind::Contact, intake_config());
    let request = InboundRequest::new(Method::POST, "/ingress/contact")
        .with_origin("https://attacker.example")
        .with_body(r#"{"Name":"Jo","Email":"a@b.co","Comments":"hi"}"#);

    let reply = handler.handle(request).await;

    assert_eq!(reply.status(), StatusCode::FORBIDDEN);
    assert_eq!(reply.body().unwrap()["error"], "forbidden_origin");
    assert!(reply.header("access-control-allow-origin").is_none());
    assert!(reply.header("x-request-id").is_some());
}

#[tokio::test]
async fn scenario_d_oversized_body_is_refused_before_parsing() {
    let handler = IntakeHandler::new(
        FormKind::Contact,
        IntakeConfig {
            max_body_bytes: 1024,
            ..intake_config()
        },
    );
    // Not JSON at all: a parse attempt would answer invalid_json instead.
    let request = InboundRequest::new(Method::POST, "/ingress/contact")
        .with_origin(ORIGIN)
        .with_body("x".repeat(2048));

    let reply = handler.handle(request).await;

    assert_eq!(reply.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(reply.body().unwrap()["error"], "payload_too_large");
}

#[tokio::test]
async fn scenario_e_transit_shape_gate() {
    let broker = TransitBroker::new(TransitConfig::default());

    let unknown = broker
        .handle(InboundRequest::new(Method::POST, "/core").with_body(r#"{"form":"unknown"}"#))
        .await;
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
    assert_eq!(unknown.body().unwrap()["error"], "unknown_form");

    let contact = broker
        .handle(InboundRequest::new(Method::POST, "/core").with_body(r#"{"form":"contact"}"#))
        .await;
    assert_eq!(contact.status(), StatusCode::ACCEPTED);
    assert_eq!(contact.body().unwrap()["status"], "ack");
    assert_eq!(contact.body().unwrap()["form"], "contact");
}

#[tokio::test]
async fn request_id_is_echoed() {
    let handler = IntakeHandler::new(FormKind::Contact, intake_config());

    let reply = handler
        .handle(submit("contact", &json!({"Name": "Jo"})))
        .await;

    assert_eq!(reply.header("x-request-id"), Some("it-req-1"));
}

#[tokio::test]
async fn every_reply_carries_security_headers() {
    let handler = IntakeHandler::new(FormKind::Join, intake_config());
    let requests = [
        InboundRequest::new(Method::OPTIONS, "/ingress/join").with_origin(ORIGIN),
        InboundRequest::new(Method::GET, HEALTH_PATH),
        InboundRequest::new(Method::GET, "/nope"),
        submit("join", &json!({"Password": "x"})),
    ];

    for request in requests {
        let reply = handler.handle(request).await;
        assert_eq!(reply.header("cache-control"), Some("no-store"));
        assert_eq!(reply.header("x-content-type-options"), Some("nosniff"));
        assert_eq!(reply.header("x-frame-options"), Some("DENY"));
        assert_eq!(reply.header("referrer-policy"), Some("no-referrer"));
        assert!(reply.header("permissions-policy").is_some());
        assert!(reply.header("x-request-id").is_some());
    }
}

#[tokio::test]
async fn cors_never_uses_wildcard() {
    let handler = IntakeHandler::new(FormKind::Join, intake_config());

    let allowed = handler
        .handle(InboundRequest::new(Method::OPTIONS, "/ingress/join").with_origin(ORIGIN))
        .await;
    let refused = handler
        .handle(
            InboundRequest::new(Method::OPTIONS, "/ingress/join")
                .with_origin("https://attacker.example"),
        )
        .await;

    assert_eq!(allowed.header("access-control-allow-origin"), Some(ORIGIN));
    assert_eq!(allowed.header("vary"), Some("Origin"));
    assert!(refused.header("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn validation_errors_name_the_field_not_the_value() {
    let handler = IntakeHandler::new(FormKind::Join, intake_config());

    let reply = handler
        .handle(submit(
            "join",
            &json!({
                "Name": "Jo",
                "Email": "not-an-email-secret",
                "What are you interested in?": "IT Support",
            }),
        ))
        .await;

    assert_eq!(reply.status(), StatusCode::BAD_REQUEST);
    assert_eq!(reply.body().unwrap()["message"], "invalid email: Email");
    assert!(!reply.body().unwrap().to_string().contains("secret"));
}

#[tokio::test]
async fn invalid_enum_option_is_rejected() {
    let handler = IntakeHandler::new(FormKind::Join, intake_config());

    let reply = handler
        .handle(submit(
            "join",
            &json!({
                "Name": "Jo",
                "Email": "a@b.co",
                "What are you interested in?": "it support",
            }),
        ))
        .await;

    assert_eq!(
        reply.body().unwrap()["message"],
        "invalid option: What are you interested in?"
    );
}

#[tokio::test]
async fn services_array_caps_are_enforced_end_to_end() {
    let handler = IntakeHandler::new(FormKind::Join, intake_config());
    let services: Vec<String> = (0..51).map(|i| format!("svc-{i}")).collect();

    let reply = handler
        .handle(submit(
            "join",
            &json!({
                "Name": "Jo",
                "Email": "a@b.co",
                "What are you interested in?": "Other",
                "Services": services,
            }),
        ))
        .await;

    assert_eq!(reply.status(), StatusCode::BAD_REQUEST);
    assert_eq!(reply.body().unwrap()["message"], "too many items: Services");
}

#[tokio::test]
async fn sheet_logger_round_trip() {
    let sink = Arc::new(VecSink::new());
    let config = SheetConfig {
        allowed_origins: Default::default(),
        max_body_bytes: 4096,
        bearer_token: Secret::new("tok".to_string()),
        google: GoogleConfig {
            client_email: "svc@example.iam.gserviceaccount.com".to_string(),
            private_key: Secret::new(String::new()),
            sheet_id: "sheet".to_string(),
            range: "Sheet1!A:B".to_string(),
            token_uri: "https://oauth2.example/token".to_string(),
            api_base: "https://sheets.example/v4".to_string(),
            timeout: Duration::from_secs(10),
        },
    };
    let logger = SheetLogger::new(config, sink.clone());

    let reply = logger
        .handle(
            InboundRequest::new(Method::POST, "/log")
                .with_bearer("tok")
                .with_body(r#"{"form":"contact","fields":{"Name":"Jo"}}"#),
        )
        .await;

    assert_eq!(reply.status(), StatusCode::OK);
    assert_eq!(sink.len(), 1);
    let logged: Value = serde_json::from_str(sink.rows()[0].payload()).unwrap();
    assert_eq!(logged["fields"]["Name"], "Jo");
}
