//! Load testing for the gateway pipeline.

use std::time::Instant;

use reqwest::header;
use serde_json::{json, Value};

use campus_gateway::GatewayConfig;

mod common;

use common::{build, http_client, spawn_server, test_config, EXEC_PASSWORD, ORIGIN};

fn load_config() -> GatewayConfig {
    let mut config = test_config();
    config.rate_limit.enabled = false;
    config
}

#[tokio::test]
async fn test_load_performance() {
    let (addr, shutdown) = spawn_server(build(load_config()).server).await;
    let client = http_client();

    let login = client
        .post(format!("http://{}/execs/login", addr))
        .header(header::ORIGIN, ORIGIN)
        .json(&json!({ "username": "jdoe", "password": EXEC_PASSWORD }))
        .send()
        .await
        .expect("gateway unreachable");
    let token = login.json::<Value>().await.unwrap()["token"]
        .as_str()
        .unwrap()
        .to_string();
    let cookie = format!("Bearer={}", token);

    let concurrency = 20;
    let requests_per_task = 50;
    let total_requests = concurrency * requests_per_task;
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = format!("http://{}/execs/me", addr);
        let cookie = cookie.clone();
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for _ in 0..requests_per_task {
                let req_start = Instant::now();
                let res = client
                    .get(&url)
                    .header(header::ORIGIN, ORIGIN)
                    .header(header::COOKIE, &cookie)
                    .send()
                    .await;
                if matches!(res, Ok(ref r) if r.status().is_success()) {
                    latencies.push(req_start.elapsed());
                }
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for task in tasks {
        all_latencies.extend(task.await.unwrap());
    }

    let duration = start.elapsed();
    let rps = total_requests as f64 / duration.as_secs_f64();

    assert_eq!(all_latencies.len(), total_requests, "some requests failed");

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p95 = all_latencies[(all_latencies.len() as f64 * 0.95) as usize];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", rps);
    println!("P50 Latency:    {:?}", p50);
    println!("P95 Latency:    {:?}", p95);
    println!("P99 Latency:    {:?}", p99);
    println!("-------------------------\n");

    shutdown.trigger();
}
