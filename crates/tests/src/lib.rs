//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置文件 -> 引擎的 e2e 测试 (模拟传输，无网络)
//! - 本地 HTTP 桩上的真实传输测试
//! - 转发服务的策略拒绝

#[cfg(test)]
mod contract_tests {
    use contracts::{AggregateCounters, DispatchEvent, StopReason, TerminalMarker};

    #[test]
    fn test_terminal_marker_wire_shape() {
        let event = DispatchEvent::Stopped(TerminalMarker {
            reason: StopReason::CallLimitReached { limit: 4 },
            counters: AggregateCounters {
                total_sent: 4,
                success: 3,
                failed: 1,
                ..Default::default()
            },
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "stopped");
        assert_eq!(json["reason"]["reason"], "call_limit_reached");
        assert_eq!(json["reason"]["limit"], 4);
        assert_eq!(json["counters"]["total_sent"], 4);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use catalog::TargetCatalog;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{DispatchEvent, DispatchResult, EngineBlueprint, Outcome, SchedulerState, StopReason};
    use dispatcher::{DispatchEngine, RunParams};
    use observability::DispatchMetricsAggregator;
    use transport::EmulatedTransport;

    const CONFIG: &str = r#"
[engine]
mode = "serial"
tick_interval_ms = 100
call_limit = 12
jitter_seed = 3

[engine.circuit_breaker]
enabled = false

[transport]
kind = "emulated"

[transport.emulation]
seed = 42
min_latency_ms = 20
max_latency_ms = 60
failure_rate = 0.3
rate_limit_rate = 0.2

[params]
campaign = "spring"

[[targets]]
id = "alpha"
name = "Alpha"
endpoint = "https://alpha.example.com/hook"
body = { kind = "json", value = { campaign = "{{campaign}}" } }

[[targets]]
id = "beta"
name = "Beta"
endpoint = "https://beta.example.com/hook"
method = "PUT"
body = { kind = "form", fields = { c = "{{campaign}}" } }

[[targets]]
id = "gamma"
name = "Gamma"
endpoint = "https://gamma.example.com/hook"
response_mode = "opaque"
"#;

    fn blueprint() -> EngineBlueprint {
        ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap()
    }

    fn engine(bp: &EngineBlueprint) -> DispatchEngine<EmulatedTransport> {
        let catalog = TargetCatalog::new(bp.targets.clone()).unwrap();
        let transport = EmulatedTransport::new("emulated", bp.transport.emulation.clone());
        DispatchEngine::builder(catalog, transport)
            .with_config(&bp.engine)
            .build()
    }

    /// Run to the call limit and collect every recorded result in order
    async fn run_to_completion(bp: &EngineBlueprint) -> (Vec<DispatchResult>, DispatchEngine<EmulatedTransport>) {
        let engine = engine(bp);
        let mut events = engine.subscribe();
        engine
            .start(RunParams::from_config(&bp.engine, bp.params.clone()))
            .unwrap();

        let mut results = Vec::new();
        loop {
            match events.recv().await.unwrap() {
                DispatchEvent::Recorded { result, counters } => {
                    assert!(counters.is_consistent());
                    results.push(result);
                }
                DispatchEvent::Stopped(_) => break,
                DispatchEvent::Started { .. } => {}
            }
        }
        (results, engine)
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_to_engine_serial_run() {
        let bp = blueprint();
        let (results, engine) = run_to_completion(&bp).await;

        assert_eq!(results.len(), 12);
        let order: Vec<_> = results.iter().map(|r| r.target_id.to_string()).collect();
        for (i, id) in order.iter().enumerate() {
            assert_eq!(id, ["alpha", "beta", "gamma"][i % 3]);
        }
        // opaque targets never report a status-based outcome
        for r in results.iter().filter(|r| r.target_id == "gamma") {
            assert!(matches!(r.outcome, Outcome::SentUnconfirmed | Outcome::Failed));
        }

        assert_eq!(engine.state(), SchedulerState::Stopped);
        let marker = engine.wait().await.unwrap();
        assert_eq!(marker.reason, StopReason::CallLimitReached { limit: 12 });
        assert_eq!(marker.counters, engine.counters());
        assert_eq!(marker.counters.total_sent, 12);

        let mut metrics = DispatchMetricsAggregator::new();
        results.iter().for_each(|r| metrics.update(r));
        assert_eq!(metrics.summary().counters, marker.counters);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_seed_replays_same_outcomes() {
        let bp = blueprint();
        let (first, _) = run_to_completion(&bp).await;
        let (second, _) = run_to_completion(&bp).await;

        let shape = |results: &[DispatchResult]| {
            results
                .iter()
                .map(|r| (r.target_id.to_string(), r.outcome, r.http_status, r.latency_ms))
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&first), shape(&second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_run_respects_limit() {
        let mut bp = blueprint();
        bp.engine.mode = contracts::DispatchMode::Concurrent;
        bp.engine.call_limit = Some(7);

        let (results, engine) = run_to_completion(&bp).await;
        assert_eq!(results.len(), 7);
        let marker = engine.wait().await.unwrap();
        assert_eq!(marker.counters.total_sent, 7);

        // in-flight requests finishing after the stop are not counted
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(engine.counters().total_sent, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_parameter_blocks_start() {
        let bp = blueprint();
        let engine = engine(&bp);
        let err = engine.start(RunParams::from_config(&bp.engine, Default::default())).unwrap_err();
        assert!(err.to_string().contains("campaign"));
        assert_eq!(engine.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_then_restart() {
        let mut bp = blueprint();
        bp.engine.call_limit = None;
        let engine = engine(&bp);

        engine
            .start(RunParams::from_config(&bp.engine, bp.params.clone()))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(engine.stop());
        assert!(!engine.stop());
        let first = engine.wait().await.unwrap();
        assert_eq!(first.reason, StopReason::Requested);
        assert!(first.counters.total_sent >= 3);

        let generation = engine
            .start(RunParams::from_config(&bp.engine, bp.params.clone()))
            .unwrap();
        assert_eq!(generation, 2);
        assert_eq!(engine.counters().total_sent, 0);
        engine.stop();
    }
}

#[cfg(test)]
mod http_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use catalog::TargetCatalog;
    use contracts::{FailureKind, Outcome, StopReason, TargetDescriptor};
    use dispatcher::{DispatchEngine, RunParams};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use transport::{CircuitBreaker, HttpTransport};

    /// `/ok` answers 200, `/busy` 429, anything else 503
    async fn stub_server() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let head = String::from_utf8_lossy(&buf[..n]);
                    let status = if head.starts_with("POST /ok ") {
                        "200 OK"
                    } else if head.starts_with("POST /busy ") {
                        "429 Too Many Requests"
                    } else {
                        "503 Service Unavailable"
                    };
                    let response = format!(
                        "HTTP/1.1 {status}\r\ncontent-length: 2\r\nconnection: close\r\n\r\nhi"
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        (format!("http://{addr}"), hits)
    }

    fn transport() -> HttpTransport {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpTransport::with_client("http", client)
    }

    #[tokio::test]
    async fn test_http_run_classifies_statuses() {
        let (base, _) = stub_server().await;
        let catalog = TargetCatalog::new(vec![
            TargetDescriptor::new("ok", "Ok", format!("{base}/ok")),
            TargetDescriptor::new("busy", "Busy", format!("{base}/busy")),
            TargetDescriptor::new("down", "Down", format!("{base}/down")),
        ])
        .unwrap();
        let engine = DispatchEngine::builder(catalog, transport())
            .circuit_breaker(CircuitBreaker::disabled())
            .build();

        engine
            .start(RunParams {
                tick_interval: Duration::from_millis(20),
                call_limit: Some(3),
                ..Default::default()
            })
            .unwrap();
        let marker = engine.wait().await.unwrap();
        assert_eq!(marker.reason, StopReason::CallLimitReached { limit: 3 });
        assert_eq!(marker.counters.success, 1);
        assert_eq!(marker.counters.rate_limited, 1);
        assert_eq!(marker.counters.failed, 1);

        let activity = engine.activity();
        assert_eq!(activity[0].outcome, Outcome::Success);
        assert_eq!(activity[1].http_status, Some(429));
        assert_eq!(activity[2].http_status, Some(503));
        assert_eq!(activity[2].failure, Some(FailureKind::Upstream));
    }

    #[tokio::test]
    async fn test_breaker_stops_hammering_failing_target() {
        let (base, hits) = stub_server().await;
        let catalog = TargetCatalog::new(vec![TargetDescriptor::new("down", "Down", format!("{base}/down"))]).unwrap();
        let engine = DispatchEngine::builder(catalog, transport())
            .circuit_breaker(CircuitBreaker::new(3, Duration::from_secs(60)))
            .build();

        engine
            .start(RunParams {
                tick_interval: Duration::from_millis(10),
                call_limit: Some(6),
                ..Default::default()
            })
            .unwrap();
        let marker = engine.wait().await.unwrap();
        assert_eq!(marker.counters.failed, 6);
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        let short_circuited = engine
            .activity()
            .iter()
            .filter(|r| r.failure == Some(FailureKind::CircuitOpen))
            .count();
        assert_eq!(short_circuited, 3);
    }
}

#[cfg(test)]
mod forwarder_tests {
    use contracts::{ForwarderConfig, HostAllowlist};
    use forwarder::{ForwardError, ForwardRequest, Forwarder};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    fn config() -> ForwarderConfig {
        ForwarderConfig {
            bind: "127.0.0.1:0".into(),
            allowed_hosts: HostAllowlist::new(["*.example.com"]),
            upstream_timeout_ms: 1_000,
            allow_plain_http: false,
            cors_origins: vec!["*".into()],
        }
    }

    #[tokio::test]
    async fn test_forward_policy_rejections() {
        let forwarder = Forwarder::new(&config()).unwrap();

        let cases = [
            ("https://example.com/", "bare suffix is not covered by a wildcard"),
            ("https://evil.example.net/", "other domain"),
            ("http://api.example.com/", "plain http"),
            ("ftp://api.example.com/", "other scheme"),
        ];
        for (url, why) in cases {
            let err = forwarder
                .forward(ForwardRequest {
                    url: url.into(),
                    method: "POST".into(),
                    ..Default::default()
                })
                .await
                .unwrap_err();
            assert!(err.is_policy(), "{why}: {err}");
        }

        let err = forwarder
            .forward(ForwardRequest {
                url: "https://api.example.com/".into(),
                method: "TRACE".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ForwardError::InvalidMethod(_)));
    }

    #[tokio::test]
    async fn test_router_maps_errors_to_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let forwarder = Forwarder::new(&config()).unwrap();
        tokio::spawn(forwarder::serve_on(forwarder, listener, std::future::pending()));

        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let forbidden = client
            .post(format!("http://{addr}/forward"))
            .json(&json!({ "serviceUrl": "https://evil.example.net/x" }))
            .send()
            .await
            .unwrap();
        assert_eq!(forbidden.status(), 403);

        let bad = client
            .post(format!("http://{addr}/forward"))
            .json(&json!({ "url": "::not a url::" }))
            .send()
            .await
            .unwrap();
        assert_eq!(bad.status(), 400);
        let body: Value = bad.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("invalid url"));
    }
}
