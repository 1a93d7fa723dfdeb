// tests/lifecycle.rs
//! Issue, revoke and verify against a live reference server.

use certificate_registry::client::{ApiClient, CertificateRepository};
use certificate_registry::config::ServerSettings;
use certificate_registry::error::ClientError;
use certificate_registry::models::certificate::NewCertificate;
use certificate_registry::models::verification::{VerificationOutcome, VerificationStatus};
use certificate_registry::services::api_server::ApiServer;
use certificate_registry::services::dashboard::DashboardSummary;
use certificate_registry::services::verifier::Verifier;
use certificate_registry::session::{MemoryTokenStore, Session, SessionState, TokenStore};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_test::{assert_err, assert_ok};

async fn spawn_server() -> ApiClient {
    let server = ApiServer::new(&ServerSettings::default()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { server.serve(listener).await });
    ApiClient::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap()
}

async fn signed_in(api: &ApiClient) -> Session {
    let mut session = Session::new(MemoryTokenStore::new());
    session.restore(api).await;
    assert_ok!(session.login(api, "admin", "admin123").await);
    session
}

fn amina() -> NewCertificate {
    NewCertificate {
        first_name: "Amina".into(),
        last_name: "Ali".into(),
        student_id: "S1001".into(),
        email: None,
        degree: "Bachelor of Science".into(),
        program: "Computer Science".into(),
        issue_date: "2024-06-01".into(),
    }
}

#[tokio::test]
async fn issue_revoke_and_verify() {
    let api = spawn_server().await;
    let session = signed_in(&api).await;
    let repository = CertificateRepository::new(api.clone());

    let certificate = assert_ok!(repository.create(&session, &amina()).await);
    assert!(!certificate.revoked);
    assert_eq!(certificate.student.name, "Amina Ali");

    match assert_ok!(repository.verify(&certificate.uuid).await) {
        VerificationOutcome::Valid { certificate: projection } => {
            assert_eq!(projection.student_name, "Amina Ali");
            assert_eq!(projection.degree, "Bachelor of Science");
            assert_eq!(projection.issue_date, "2024-06-01");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let revoked = assert_ok!(
        repository
            .revoke(&session, &certificate.uuid, "Academic misconduct")
            .await
    )
    .expect("revoked record is read back");
    assert!(revoked.revoked);
    assert_eq!(revoked.revoked_reason.as_deref(), Some("Academic misconduct"));

    assert_eq!(
        assert_ok!(repository.verify(&certificate.uuid).await),
        VerificationOutcome::Revoked {
            reason: "Academic misconduct".into(),
            certificate: None
        }
    );

    let err = assert_err!(repository.revoke(&session, &certificate.uuid, "duplicate").await);
    assert!(matches!(err, ClientError::Conflict(_)));
    let record = assert_ok!(repository.get_by_uuid(&session, &certificate.uuid).await);
    assert_eq!(record.revoked_reason.as_deref(), Some("Academic misconduct"));
}

#[tokio::test]
async fn unknown_identifier_is_not_found() {
    let api = spawn_server().await;
    let verifier = Verifier::new(CertificateRepository::new(api));

    let outcome = verifier
        .verify_certificate("00000000-0000-0000-0000-000000000000")
        .await;
    assert_eq!(outcome, Some(VerificationOutcome::NotFound));
    assert_eq!(verifier.verify_certificate("").await, None);
}

#[tokio::test]
async fn invalid_input_is_rejected_before_sending() {
    let api = spawn_server().await;
    let session = signed_in(&api).await;
    let repository = CertificateRepository::new(api);

    let input = NewCertificate { program: String::new(), ..amina() };
    let err = assert_err!(repository.create(&session, &input).await);
    assert_eq!(err.to_string(), "Program is required");
    assert!(assert_ok!(repository.list(&session).await).is_empty());
}

#[tokio::test]
async fn dashboard_counts_follow_server_state() {
    let api = spawn_server().await;
    let session = signed_in(&api).await;
    let repository = CertificateRepository::new(api);

    let mut issued = Vec::new();
    for (i, degree) in ["Bachelor of Science", "Master of Arts", "Doctor of Philosophy"]
        .into_iter()
        .enumerate()
    {
        let input = NewCertificate {
            student_id: format!("S10{i}"),
            degree: degree.into(),
            ..amina()
        };
        issued.push(assert_ok!(repository.create(&session, &input).await));
    }
    assert_ok!(repository.revoke(&session, &issued[1].uuid, "Issued in error").await);

    let list = assert_ok!(repository.list(&session).await);
    let dashboard = DashboardSummary::from_certificates(&list, 2);
    assert_eq!((dashboard.total, dashboard.valid, dashboard.revoked), (3, 2, 1));
    let recent: Vec<_> = dashboard.recent.iter().map(|c| c.uuid.as_str()).collect();
    assert_eq!(recent, vec![issued[0].uuid.as_str(), issued[1].uuid.as_str()]);
}

#[tokio::test]
async fn rejected_token_signs_out_on_restore() {
    let api = spawn_server().await;
    let store = MemoryTokenStore::with_token("not-a-real-token");
    let mut session = Session::new(store.clone());

    assert_eq!(session.restore(&api).await, &SessionState::Unauthenticated);
    assert_eq!(assert_ok!(store.load()), None);

    let repository = CertificateRepository::new(api);
    let err = assert_err!(repository.list(&session).await);
    assert!(err.is_authentication());
    assert_eq!(
        repository
            .verify("00000000-0000-0000-0000-000000000000")
            .await
            .map(|o| o.status())
            .ok(),
        Some(VerificationStatus::NotFound)
    );
}

#[tokio::test]
async fn document_download_is_a_pdf() {
    let api = spawn_server().await;
    let session = signed_in(&api).await;
    let repository = CertificateRepository::new(api);

    let certificate = assert_ok!(repository.create(&session, &amina()).await);
    let bytes = assert_ok!(repository.download(&session, &certificate.uuid).await);
    assert!(bytes.starts_with(b"%PDF-1.4"));

    let path = std::env::temp_dir().join(format!("certificate_{}.pdf", certificate.uuid));
    let written = assert_ok!(repository.save_document(&session, &certificate.uuid, &path).await);
    assert_eq!(written as usize, bytes.len());
    std::fs::remove_file(path).unwrap();
}
