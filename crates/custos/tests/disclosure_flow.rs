//! End-to-end disclosure scenarios against both store backends.

use std::sync::Arc;

use bytes::Bytes;
use custos::core::{ManualClock, RequesterProfile, ResourceId, SystemClock, CODE_TTL_MS};
use custos::gate::Claims;
use custos::ledger::NoopNotifier;
use custos::store::{MemoryStore, SqliteStore};
use custos::{BrokerConfig, BrokerError, DisclosureBroker, FileUpload};

fn requester(name: &str) -> RequesterProfile {
    RequesterProfile {
        name: name.to_string(),
        email: format!("{name}@example.org"),
        organization: "Example SA".to_string(),
        phone: Some("+33600000000".to_string()),
    }
}

fn owner_claims() -> Claims {
    Claims {
        sub: "owner1".to_string(),
        roles: vec!["OWNER".to_string()],
        iat: 0,
        exp: 0,
    }
}

fn broker_with_clock(clock: ManualClock) -> DisclosureBroker<MemoryStore> {
    DisclosureBroker::new(
        Arc::new(MemoryStore::new()),
        BrokerConfig::for_tests(),
        Arc::new(NoopNotifier),
        Arc::new(clock),
    )
}

fn upload(name: &str, bytes: &[u8]) -> FileUpload {
    FileUpload {
        file_name: name.to_string(),
        content_type: "application/pdf".to_string(),
        bytes: Bytes::copy_from_slice(bytes),
        category: Some("report".to_string()),
    }
}

#[tokio::test]
async fn full_disclosure_flow() {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();

    let clock = ManualClock::at(1_000_000);
    let broker = broker_with_clock(clock.clone());
    let owner = owner_claims();

    let payload = vec![0x25u8; 10 * 1024];
    broker
        .upload(&owner, ResourceId(1), upload("expertise.pdf", &payload))
        .await
        .unwrap();

    // alice asks for resource R-1
    let grant = broker
        .submit_request(
            "203.0.113.9",
            ResourceId(1),
            "alice",
            requester("alice"),
            "due diligence",
        )
        .await
        .unwrap();
    assert!(grant.is_pending());

    // Resubmission while pending is a no-op.
    let again = broker
        .submit_request(
            "203.0.113.9",
            ResourceId(1),
            "alice",
            requester("alice"),
            "asking twice",
        )
        .await
        .unwrap();
    assert_eq!(again.id, grant.id);

    // owner1 approves: code minted, 24h window opens.
    let approved = broker.approve_request(&owner, grant.id).await.unwrap();
    let code = approved.validation_code.clone().unwrap();
    assert_eq!(code.as_str().len(), 8);
    assert_eq!(approved.expires_at, Some(1_000_000 + CODE_TTL_MS));
    assert_eq!(approved.processed_by.as_deref(), Some("owner1"));

    // Redeeming the code yields the stored bytes unchanged.
    let download = broker
        .download("198.51.100.7", ResourceId(1), code.as_str())
        .await
        .unwrap();
    assert_eq!(download.bytes.as_ref(), payload.as_slice());
    assert_eq!(download.file_name, "expertise.pdf");
    assert_eq!(download.content_type, "application/pdf");

    let state = broker.ledger().grant(grant.id).await.unwrap().unwrap();
    assert!(state.is_downloaded());
    assert_eq!(state.downloaded_at, Some(1_000_000));

    // Repeat redemption inside the window: still works, state unchanged.
    clock.advance(60_000);
    let resumed = broker
        .download("198.51.100.7", ResourceId(1), code.as_str())
        .await
        .unwrap();
    assert_eq!(resumed.bytes.as_ref(), payload.as_slice());

    // The same code against another resource is refused.
    let wrong = broker
        .download("198.51.100.7", ResourceId(2), code.as_str())
        .await
        .unwrap_err();
    assert!(matches!(wrong, BrokerError::Ledger(_)));
    assert_eq!(wrong.http_status(), 403);
}

#[tokio::test]
async fn expired_code_never_redeems() {
    let clock = ManualClock::at(0);
    let broker = broker_with_clock(clock.clone());
    let owner = owner_claims();

    broker
        .upload(&owner, ResourceId(1), upload("report.pdf", b"bytes"))
        .await
        .unwrap();
    let grant = broker
        .submit_request("10.0.0.1", ResourceId(1), "alice", requester("alice"), "r")
        .await
        .unwrap();
    let approved = broker.approve_request(&owner, grant.id).await.unwrap();
    let code = approved.validation_code.clone().unwrap();

    // Never downloaded; the window closes anyway.
    clock.advance(CODE_TTL_MS);
    let expired = broker
        .download("10.0.0.1", ResourceId(1), code.as_str())
        .await
        .unwrap_err();
    assert_eq!(expired.http_status(), 410);
}

#[tokio::test]
async fn rejection_is_terminal() {
    let broker = broker_with_clock(ManualClock::at(0));
    let owner = owner_claims();

    let grant = broker
        .submit_request("10.0.0.1", ResourceId(1), "alice", requester("alice"), "r")
        .await
        .unwrap();

    let rejected = broker.reject_request(&owner, grant.id).await.unwrap();
    assert!(rejected.is_rejected());
    assert!(rejected.validation_code.is_none());

    let late_approval = broker.approve_request(&owner, grant.id).await.unwrap_err();
    assert_eq!(late_approval.http_status(), 409);
}

#[tokio::test]
async fn upload_policy_maps_to_http_statuses() {
    let broker = broker_with_clock(ManualClock::at(0));
    let owner = owner_claims();

    let huge = broker
        .upload(
            &owner,
            ResourceId(1),
            FileUpload {
                file_name: "dump.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                bytes: Bytes::from(vec![0u8; 60 * 1024 * 1024]),
                category: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(huge.http_status(), 413);

    let exe = broker
        .upload(&owner, ResourceId(1), upload("setup.exe", b"MZ"))
        .await
        .unwrap_err();
    assert_eq!(exe.http_status(), 415);

    // A 10 KiB pdf goes through and comes back byte-identical.
    let payload = vec![7u8; 10 * 1024];
    let blob = broker
        .upload(&owner, ResourceId(1), upload("fine.pdf", &payload))
        .await
        .unwrap();
    let fetched = broker.fetch_file(&owner, blob.id).await.unwrap();
    assert_eq!(fetched.bytes.as_ref(), payload.as_slice());
}

#[tokio::test]
async fn auth_endpoints_throttle_per_address() {
    let clock = ManualClock::at(0);
    let broker = broker_with_clock(clock.clone());

    // 10 login-token requests per minute per address.
    for _ in 0..10 {
        broker
            .issue_token("203.0.113.9", "alice", &["OWNER".to_string()])
            .unwrap();
    }
    let eleventh = broker
        .issue_token("203.0.113.9", "alice", &["OWNER".to_string()])
        .unwrap_err();
    assert_eq!(eleventh.http_status(), 429);

    // Another address is unaffected.
    broker
        .issue_token("203.0.113.10", "bob", &[])
        .unwrap();

    // After the window rolls over, attempts resume succeeding.
    clock.advance(60_000);
    broker
        .issue_token("203.0.113.9", "alice", &["OWNER".to_string()])
        .unwrap();
}

#[tokio::test]
async fn download_endpoint_throttles_at_sixty() {
    let broker = broker_with_clock(ManualClock::at(0));

    for i in 0..60 {
        // Invalid codes still consume budget; only the denial is a 429.
        let err = broker
            .download("10.9.8.7", ResourceId(1), "AAAABBBB")
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 404, "call {i}");
    }
    let throttled = broker
        .download("10.9.8.7", ResourceId(1), "AAAABBBB")
        .await
        .unwrap_err();
    assert_eq!(throttled.http_status(), 429);
}

#[tokio::test]
async fn bearer_tokens_gate_the_admin_surface() {
    let broker = DisclosureBroker::new(
        Arc::new(MemoryStore::new()),
        BrokerConfig::for_tests(),
        Arc::new(NoopNotifier),
        Arc::new(SystemClock),
    );

    let token = broker
        .issue_token("203.0.113.9", "owner1", &["OWNER".to_string()])
        .unwrap();

    let claims = broker
        .tokens()
        .authenticate(Some(&format!("Bearer {token}")))
        .expect("freshly issued token must verify");
    assert_eq!(claims.sub, "owner1");
    assert!(claims.has_role("OWNER"));

    // A mangled token does not raise; the caller is simply anonymous.
    let mangled = format!("Bearer {token}x");
    assert!(broker.tokens().authenticate(Some(&mangled)).is_none());
    assert!(broker.tokens().authenticate(None).is_none());
}

#[tokio::test]
async fn full_flow_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(dir.path().join("custos.db")).unwrap());
    let clock = ManualClock::at(500_000);
    let broker = DisclosureBroker::new(
        store,
        BrokerConfig::for_tests(),
        Arc::new(NoopNotifier),
        Arc::new(clock.clone()),
    );
    let owner = owner_claims();

    let payload = b"sqlite-backed expertise report";
    broker
        .upload(&owner, ResourceId(3), upload("expertise.pdf", payload))
        .await
        .unwrap();

    let grant = broker
        .submit_request("10.0.0.1", ResourceId(3), "alice", requester("alice"), "r")
        .await
        .unwrap();
    let approved = broker.approve_request(&owner, grant.id).await.unwrap();
    let code = approved.validation_code.clone().unwrap();

    let download = broker
        .download("10.0.0.1", ResourceId(3), code.as_str())
        .await
        .unwrap();
    assert_eq!(download.bytes.as_ref(), payload);

    let pending = broker.pending_requests().await.unwrap();
    assert!(pending.is_empty());
    let recent = broker.recent_requests().await.unwrap();
    assert_eq!(recent.len(), 1);
    assert!(recent[0].is_downloaded());
}
