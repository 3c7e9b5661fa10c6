//! Adapter tests against in-process mock pool APIs.
//!
//! Each test spins up a small axum server that answers like the real
//! pool API, then points an adapter at it through the endpoint override.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use serde_json::{Value, json};

use minemon_pool::hiveon::Hiveon;
use minemon_pool::suprnova::Suprnova;
use minemon_pool::{ApiClient, HttpSettings, PoolAdapter, PoolError, RatioKind, ResponseCache};

async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn make_client() -> ApiClient {
    ApiClient::new(Arc::new(ResponseCache::default()), &HttpSettings::default()).unwrap()
}

fn hiveon_router() -> Router {
    Router::new()
        .route(
            "/api/v1/stats/miner/:wallet/:coin",
            get(|| async {
                axum::Json(json!({
                    "hashrate": 100.0,
                    "sharesStatusStats": {
                        "validCount": 10,
                        "staleCount": 1,
                        "lastShareDt": "2021-01-01T00:00:00Z"
                    }
                }))
            }),
        )
        .route(
            "/api/v1/stats/miner/:wallet/:coin/billing-acc",
            get(|| async {
                axum::Json(json!({
                    "totalUnpaid": 5.5,
                    "earningStats": [
                        {"reward": 0.35, "timestamp": "2021-01-01T00:00:00Z"}
                    ],
                    "succeedPayouts": [
                        {"amount": 1.25, "createdAt": "2021-01-02T03:04:05.600Z"}
                    ]
                }))
            }),
        )
        .route(
            "/api/v1/stats/miner/:wallet/:coin/workers",
            get(|| async {
                axum::Json(json!({
                    "workers": {
                        "rig1": {
                            "hashrate": 60.0,
                            "sharesStatusStats": {
                                "validCount": 6,
                                "staleCount": 1,
                                "lastShareDt": "2021-01-01T00:00:00Z"
                            }
                        },
                        "rig2": {
                            "sharesStatusStats": {
                                "validCount": 4,
                                "staleCount": 0,
                                "lastShareDt": "2021-01-01T00:00:00Z"
                            }
                        }
                    }
                }))
            }),
        )
}

async fn hiveon_adapter() -> Hiveon {
    let addr = spawn_server(hiveon_router()).await;
    Hiveon::new(
        "0xAbC123",
        "eth",
        Some(&format!("http://{}", addr)),
        make_client(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_hiveon_identity_and_account_stats() {
    let adapter = hiveon_adapter().await;

    assert_eq!(adapter.pool_name(), "hiveon.net");
    assert_eq!(adapter.coin(), "ETH");
    assert_eq!(adapter.wallet().await.unwrap(), "abc123");

    let hashrate = adapter.hashrate().await.unwrap();
    assert_eq!(hashrate.value, 100.0);
    assert!(hashrate.timestamp.is_none());

    let balance = adapter.balance().await.unwrap();
    assert_eq!(balance.value, 5.5);
    assert!(balance.timestamp.is_none());
}

#[tokio::test]
async fn test_hiveon_ratios_carry_last_share_timestamp() {
    let adapter = hiveon_adapter().await;

    let ratios = adapter.ratios().await.unwrap();

    assert_eq!(ratios.len(), 2);
    assert_eq!(ratios[0].0, RatioKind::Accepted);
    assert_eq!(ratios[0].1.value, 10.0);
    assert_eq!(ratios[0].1.timestamp, Some(1_609_459_200.0));
    assert_eq!(ratios[1].0, RatioKind::Rejected);
    assert_eq!(ratios[1].1.value, 1.0);
    assert_eq!(ratios[1].1.timestamp, Some(1_609_459_200.0));
}

#[tokio::test]
async fn test_hiveon_worker_hashrate_defaults_to_zero() {
    let adapter = hiveon_adapter().await;

    let mut workers = adapter.worker_hashrates().await.unwrap();
    workers.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(workers.len(), 2);
    assert_eq!(workers[0].0, "rig1");
    assert_eq!(workers[0].1.value, 60.0);
    assert_eq!(workers[1].0, "rig2");
    assert_eq!(workers[1].1.value, 0.0);
}

#[tokio::test]
async fn test_hiveon_worker_ratios() {
    let adapter = hiveon_adapter().await;

    let mut ratios = adapter.worker_ratios().await.unwrap();
    ratios.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.as_str().cmp(b.1.as_str())));

    assert_eq!(ratios.len(), 4);
    assert_eq!(
        (ratios[0].0.as_str(), ratios[0].1, ratios[0].2.value),
        ("rig1", RatioKind::Accepted, 6.0)
    );
    assert_eq!(
        (ratios[1].0.as_str(), ratios[1].1, ratios[1].2.value),
        ("rig1", RatioKind::Rejected, 1.0)
    );
    assert_eq!(
        (ratios[2].0.as_str(), ratios[2].1, ratios[2].2.value),
        ("rig2", RatioKind::Accepted, 4.0)
    );
    assert_eq!(
        (ratios[3].0.as_str(), ratios[3].1, ratios[3].2.value),
        ("rig2", RatioKind::Rejected, 0.0)
    );
}

#[tokio::test]
async fn test_hiveon_money_flows() {
    let adapter = hiveon_adapter().await;

    let rewards = adapter.rewards().await.unwrap();
    assert_eq!(rewards.len(), 1);
    assert_eq!(rewards[0].value, 0.35);
    assert_eq!(rewards[0].timestamp, Some(1_609_459_200.0));

    let payouts = adapter.payouts().await.unwrap();
    assert_eq!(payouts.len(), 1);
    assert_eq!(payouts[0].value, 1.25);
    assert_eq!(payouts[0].timestamp, Some(1_609_556_645.6));
}

#[tokio::test]
async fn test_hiveon_null_payout_history_gives_no_samples() {
    let router = Router::new().route(
        "/api/v1/stats/miner/:wallet/:coin/billing-acc",
        get(|| async {
            axum::Json(json!({
                "totalUnpaid": 0.0,
                "earningStats": [],
                "succeedPayouts": null
            }))
        }),
    );
    let addr = spawn_server(router).await;
    let adapter =
        Hiveon::new("abc", "ETH", Some(&format!("http://{}", addr)), make_client()).unwrap();

    assert!(adapter.payouts().await.unwrap().is_empty());
    assert!(adapter.rewards().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_hiveon_missing_field_is_response_format_error() {
    let router = Router::new().route(
        "/api/v1/stats/miner/:wallet/:coin",
        get(|| async { axum::Json(json!({"unexpected": true})) }),
    );
    let addr = spawn_server(router).await;
    let adapter =
        Hiveon::new("abc", "ETH", Some(&format!("http://{}", addr)), make_client()).unwrap();

    let err = adapter.hashrate().await.unwrap_err();

    assert!(matches!(err, PoolError::ResponseFormat { .. }));
}

fn suprnova_router(status_hits: Arc<AtomicUsize>) -> Router {
    Router::new().route(
        "/index.php",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let status_hits = status_hits.clone();
            async move {
                let action = params.get("action").cloned().unwrap_or_default();
                if action == "getuserstatus" {
                    status_hits.fetch_add(1, Ordering::SeqCst);
                }

                let data = match action.as_str() {
                    "getuserstatus" => json!({
                        "username": "account1",
                        "hashrate": 2.5,
                        "shares": {"valid": 10.0, "invalid": 1.0}
                    }),
                    "getuserbalance" => json!({"confirmed": 1.5, "unconfirmed": 0.5}),
                    "getuserworkers" => json!([
                        {"username": "account1.rig.07", "hashrate": 1.5, "shares": 7.0},
                        {"username": "account1.main", "hashrate": 1.0, "shares": 3.0}
                    ]),
                    "getusertransactions" => json!({"transactions": [
                        {"type": "Credit", "amount": 0.2, "timestamp": "2021-01-01 00:00:00"},
                        {"type": "Debit_AP", "amount": 0.1, "timestamp": "2021-01-02 00:00:00"},
                        {"type": "Fee", "amount": 0.01, "timestamp": "2021-01-03 00:00:00"}
                    ]}),
                    _ => Value::Null,
                };

                let mut envelope = serde_json::Map::new();
                envelope.insert(action, json!({"data": data}));
                axum::Json(Value::Object(envelope))
            }
        }),
    )
}

async fn suprnova_adapter(status_hits: Arc<AtomicUsize>) -> Suprnova {
    let addr = spawn_server(suprnova_router(status_hits)).await;
    Suprnova::new(
        "secret",
        "btg",
        Some(&format!("http://{}", addr)),
        make_client(),
    )
}

#[tokio::test]
async fn test_suprnova_wallet_is_fetched_once() {
    let hits = Arc::new(AtomicUsize::new(0));
    let adapter = suprnova_adapter(hits.clone()).await;

    assert_eq!(adapter.wallet().await.unwrap(), "account1");
    assert_eq!(adapter.wallet().await.unwrap(), "account1");
    // Served from the response cache, not another upstream request
    adapter.hashrate().await.unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_suprnova_hashrate_is_scaled_to_hs() {
    let adapter = suprnova_adapter(Arc::new(AtomicUsize::new(0))).await;

    let hashrate = adapter.hashrate().await.unwrap();

    assert_eq!(hashrate.value, 2500.0);
    assert!(hashrate.timestamp.is_none());
}

#[tokio::test]
async fn test_suprnova_balance_sums_confirmed_and_unconfirmed() {
    let adapter = suprnova_adapter(Arc::new(AtomicUsize::new(0))).await;

    let balance = adapter.balance().await.unwrap();

    assert_eq!(balance.value, 2.0);
}

#[tokio::test]
async fn test_suprnova_ratios_have_no_timestamps() {
    let adapter = suprnova_adapter(Arc::new(AtomicUsize::new(0))).await;

    let ratios = adapter.ratios().await.unwrap();

    assert_eq!(ratios.len(), 2);
    assert_eq!(ratios[0].0, RatioKind::Accepted);
    assert_eq!(ratios[0].1.value, 10.0);
    assert!(ratios[0].1.timestamp.is_none());
    assert_eq!(ratios[1].0, RatioKind::Rejected);
    assert_eq!(ratios[1].1.value, 1.0);
}

#[tokio::test]
async fn test_suprnova_worker_names_lose_account_prefix() {
    let adapter = suprnova_adapter(Arc::new(AtomicUsize::new(0))).await;

    let mut workers = adapter.worker_hashrates().await.unwrap();
    workers.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(workers.len(), 2);
    assert_eq!(workers[0].0, "main");
    assert_eq!(workers[0].1.value, 1000.0);
    assert_eq!(workers[1].0, "rig.07");
    assert_eq!(workers[1].1.value, 1500.0);
}

#[tokio::test]
async fn test_suprnova_worker_ratios_report_accepted_only() {
    let adapter = suprnova_adapter(Arc::new(AtomicUsize::new(0))).await;

    let ratios = adapter.worker_ratios().await.unwrap();

    assert_eq!(ratios.len(), 2);
    assert!(ratios.iter().all(|(_, kind, _)| *kind == RatioKind::Accepted));
}

#[tokio::test]
async fn test_suprnova_transactions_split_by_type() {
    let adapter = suprnova_adapter(Arc::new(AtomicUsize::new(0))).await;

    let rewards = adapter.rewards().await.unwrap();
    assert_eq!(rewards.len(), 1);
    assert_eq!(rewards[0].value, 0.2);
    assert_eq!(rewards[0].timestamp, Some(1_609_459_200.0));

    let payouts = adapter.payouts().await.unwrap();
    assert_eq!(payouts.len(), 1);
    assert_eq!(payouts[0].value, 0.1);
    assert_eq!(payouts[0].timestamp, Some(1_609_545_600.0));
}

#[tokio::test]
async fn test_suprnova_unauthorized_is_distinguished() {
    let router = Router::new().route(
        "/index.php",
        get(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
    );
    let addr = spawn_server(router).await;
    let adapter = Suprnova::new(
        "wrong",
        "BTG",
        Some(&format!("http://{}", addr)),
        make_client(),
    );

    let err = adapter.hashrate().await.unwrap_err();

    assert!(matches!(err, PoolError::Unauthorized { .. }));
}

#[tokio::test]
async fn test_suprnova_missing_envelope_is_response_format_error() {
    let router = Router::new().route(
        "/index.php",
        get(|| async { axum::Json(json!({"wrong": {"shape": 1}})) }),
    );
    let addr = spawn_server(router).await;
    let adapter = Suprnova::new(
        "secret",
        "BTG",
        Some(&format!("http://{}", addr)),
        make_client(),
    );

    let err = adapter.balance().await.unwrap_err();

    assert!(matches!(err, PoolError::ResponseFormat { .. }));
}
