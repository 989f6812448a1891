//! Notifier tests against a mock key-value store.

use chrono::{TimeZone, Utc};
use serde_json::json;
use transcripts_core::{build_alerts_at, Averages, StudentOutcome, Thresholds};
use transcripts_notify::{AlertNotifier, NotifyError};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn low_outcomes() -> Vec<StudentOutcome> {
    vec![StudentOutcome::Written {
        intake: "BM01".to_string(),
        student_no: "001".to_string(),
        averages: Averages {
            attendance: Some(50.0),
            grade: Some(30.0),
        },
        field_issues: Vec::new(),
    }]
}

#[tokio::test]
async fn test_fetch_thresholds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/settings.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"min_grade": 50, "min_attendance": 75})),
        )
        .mount(&server)
        .await;

    let notifier = AlertNotifier::new(&server.uri()).unwrap();
    let thresholds = notifier.fetch_thresholds().await;
    assert_eq!(thresholds.min_grade, 50.0);
    assert_eq!(thresholds.min_attendance, 75.0);
}

#[tokio::test]
async fn test_fetch_thresholds_falls_back_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/settings.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let notifier = AlertNotifier::new(&server.uri()).unwrap();
    assert!(matches!(
        notifier.try_fetch_thresholds().await,
        Err(NotifyError::Status { status: 500, .. })
    ));
    assert_eq!(notifier.fetch_thresholds().await, Thresholds::default());
}

#[tokio::test]
async fn test_fetch_thresholds_falls_back_on_bad_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/settings.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let notifier = AlertNotifier::new(&server.uri()).unwrap();
    assert!(matches!(
        notifier.try_fetch_thresholds().await,
        Err(NotifyError::Json(_))
    ));
    assert_eq!(notifier.fetch_thresholds().await, Thresholds::default());
}

#[tokio::test]
async fn test_fetch_thresholds_falls_back_to_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/settings.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let configured = Thresholds {
        min_grade: 50.0,
        min_attendance: 70.0,
    };
    let notifier = AlertNotifier::new(&server.uri())
        .unwrap()
        .with_fallback(configured);
    assert_eq!(notifier.fetch_thresholds().await, configured);
}

#[tokio::test]
async fn test_fetch_thresholds_unreachable() {
    // Nothing listens on the discard port
    let notifier = AlertNotifier::with_timeout("http://127.0.0.1:9", 2).unwrap();
    assert_eq!(notifier.fetch_thresholds().await, Thresholds::default());
}

#[tokio::test]
async fn test_push_alerts() {
    let server = MockServer::start().await;
    let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
    let alerts = build_alerts_at(&low_outcomes(), &Thresholds::default(), at);
    assert_eq!(alerts.len(), 2);

    let expected = json!({
        "alert_1": {
            "issuedBy": "system",
            "title": "Low attendance",
            "message": alerts[0].message,
            "timestamp": "2025-03-01T09:00:00+00:00",
            "studentId": "001",
            "read": false
        },
        "alert_2": {
            "issuedBy": "system",
            "title": "Low grade",
            "message": alerts[1].message,
            "timestamp": "2025-03-01T09:00:00+00:00",
            "studentId": "001",
            "read": false
        }
    });

    Mock::given(method("PUT"))
        .and(path("/alerts/BM01_Transcripts_xlsx.json"))
        .and(body_json(&expected))
        .respond_with(ResponseTemplate::new(200).set_body_json(&expected))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = AlertNotifier::new(&server.uri()).unwrap();
    notifier
        .push_alerts("BM01_Transcripts.xlsx", &alerts)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_push_alerts_custom_collection_and_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/Alerts_test/students_xlsx.json"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Permission denied"))
        .mount(&server)
        .await;

    let notifier = AlertNotifier::new(&server.uri())
        .unwrap()
        .with_collection("Alerts_test");
    let alerts = build_alerts_at(
        &low_outcomes(),
        &Thresholds::default(),
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
    );

    let err = notifier
        .push_alerts("students.xlsx", &alerts)
        .await
        .unwrap_err();
    match err {
        NotifyError::Status { status, body, .. } => {
            assert_eq!(status, 401);
            assert_eq!(body, "Permission denied");
        }
        other => panic!("unexpected error: {other}"),
    }
}
