use anyhow::Result;
use httpmock::prelude::*;
use lookalike_builder::domain::model::{ConflictPolicy, Outcome};
use lookalike_builder::domain::ports::Connector;
use lookalike_builder::{BatchRequest, GraphApiConnector, Session};
use std::time::Duration;

const AUDIENCES_PATH: &str = "/v19.0/act_924798/customaudiences";

async fn mock_listing<'a>(server: &'a MockServer) -> httpmock::Mock<'a> {
    server
        .mock_async(|when, then| {
            when.method(GET).path(AUDIENCES_PATH);
            then.status(200).json_body(serde_json::json!({
                "data": [
                    {"id": "6001", "name": "VIP List", "approximate_count": 12000},
                    {"id": "7001", "name": "TW-1%-VIP List", "approximate_count": 240000}
                ]
            }));
        })
        .await
}

async fn mock_create<'a>(server: &'a MockServer, encoded_name: &str, id: &str) -> httpmock::Mock<'a> {
    let name_field = format!("name={}&", encoded_name);
    let id = id.to_string();
    server
        .mock_async(move |when, then| {
            when.method(POST)
                .path(AUDIENCES_PATH)
                .body_contains(name_field.as_str());
            then.status(200).json_body(serde_json::json!({ "id": id }));
        })
        .await
}

async fn open_session(server: &MockServer) -> Result<Session<lookalike_builder::GraphApiClient>> {
    let connector =
        GraphApiConnector::new(&server.base_url(), "v19.0", 100, Duration::from_secs(5))?;
    let client = connector.connect("tok")?;
    Ok(Session::open(client, "act_924798".parse()?).await?)
}

fn request(policy: ConflictPolicy) -> BatchRequest {
    BatchRequest {
        seed_ids: vec!["6001".to_string()],
        ratios: "0.01,0.02".to_string(),
        countries: "tw,us".to_string(),
        policy,
    }
}

/// 附加序號：既有名稱會被加上 -2
#[tokio::test]
async fn test_append_policy_end_to_end() -> Result<()> {
    let server = MockServer::start_async().await;
    let listing = mock_listing(&server).await;
    let creates = vec![
        mock_create(&server, "TW-1%25-VIP+List-2", "1").await,
        mock_create(&server, "US-1%25-VIP+List", "2").await,
        mock_create(&server, "TW-2%25-VIP+List", "3").await,
        mock_create(&server, "US-2%25-VIP+List", "4").await,
    ];

    let mut session = open_session(&server).await?;
    let mut progress = Vec::new();
    let report = session
        .run_batch(&request(ConflictPolicy::Append), Duration::ZERO, |p| {
            progress.push(p.done)
        })
        .await?;

    let created: Vec<(&str, &str)> = report.successes().collect();
    assert_eq!(
        created,
        vec![
            ("TW-1%-VIP List-2", "1"),
            ("US-1%-VIP List", "2"),
            ("TW-2%-VIP List", "3"),
            ("US-2%-VIP List", "4"),
        ]
    );
    assert_eq!(progress, vec![1, 2, 3, 4]);

    // open + refresh before the batch
    listing.assert_hits_async(2).await;
    for mock in &creates {
        mock.assert_async().await;
    }
    assert!(session.existing_names().contains("US-2%-VIP List"));
    Ok(())
}

#[tokio::test]
async fn test_skip_policy_leaves_existing_name_alone() -> Result<()> {
    let server = MockServer::start_async().await;
    let _listing = mock_listing(&server).await;
    let suffixed = mock_create(&server, "TW-1%25-VIP+List-2", "99").await;
    let _others = vec![
        mock_create(&server, "US-1%25-VIP+List", "2").await,
        mock_create(&server, "TW-2%25-VIP+List", "3").await,
        mock_create(&server, "US-2%25-VIP+List", "4").await,
    ];

    let mut session = open_session(&server).await?;
    let report = session
        .run_batch(&request(ConflictPolicy::Skip), Duration::ZERO, |_| {})
        .await?;

    assert_eq!(report.total(), 4);
    assert_eq!(report.successes().count(), 3);
    assert_eq!(report.skipped().collect::<Vec<_>>(), vec!["TW-1%-VIP List"]);
    assert_eq!(report.failures().count(), 0);
    suffixed.assert_hits_async(0).await;
    Ok(())
}

/// 失敗策略只讓撞名的組合失敗，平台拒絕也不會中斷批次
#[tokio::test]
async fn test_fail_policy_and_remote_rejection_do_not_stop_batch() -> Result<()> {
    let server = MockServer::start_async().await;
    let _listing = mock_listing(&server).await;
    let _ok = vec![
        mock_create(&server, "US-1%25-VIP+List", "2").await,
        mock_create(&server, "TW-2%25-VIP+List", "3").await,
    ];
    let rejected = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(AUDIENCES_PATH)
                .body_contains("name=US-2%25-VIP+List&");
            then.status(400).json_body(serde_json::json!({
                "error": {"message": "(#2654) Source audience is too small", "code": 2654}
            }));
        })
        .await;

    let mut session = open_session(&server).await?;
    let report = session
        .run_batch(&request(ConflictPolicy::Fail), Duration::ZERO, |_| {})
        .await?;

    assert_eq!(report.total(), 4);
    assert_eq!(report.successes().count(), 2);
    let failures: Vec<(&str, &str)> = report.failures().collect();
    assert_eq!(
        failures,
        vec![
            ("TW-1%-VIP List", "Name already exists: TW-1%-VIP List"),
            ("US-2%-VIP List", "(#2654) Source audience is too small"),
        ]
    );
    assert!(matches!(report.records[0].outcome, Outcome::Failure { .. }));
    rejected.assert_async().await;

    assert!(!session.existing_names().contains("US-2%-VIP List"));
    Ok(())
}
