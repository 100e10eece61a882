use signal_sim::{
    config::{OptimizerConfig, SimulatorConfig},
    engine::Engine,
    optimizer::{parse_response, OptimizerClient},
    scheduler::DriverHandle,
    simulation::{Densities, PhaseState, TimingPlan, MAX_PHASE_SECONDS},
    Command, OptimizerError,
};
use anyhow::{anyhow, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Answers a single HTTP request with `status` and `body`, returning the raw request text.
async fn serve_once(status: &'static str, body: &'static str) -> Result<(String, JoinHandle<Result<String>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}", listener.local_addr()?);

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await?;
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];

        loop {
            let n = socket.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&request);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if name.eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await?;
        socket.shutdown().await?;
        Ok(String::from_utf8_lossy(&request).into_owned())
    });

    Ok((url, handle))
}

fn client(base_url: &str) -> Result<OptimizerClient> {
    Ok(OptimizerClient::new(&OptimizerConfig {
        base_url: base_url.to_string(),
        timeout_seconds: 5,
    })?)
}

#[test]
fn test_parse_full_plan() -> Result<()> {
    let plan = parse_response(r#"{"phase_plan":{"ns_green":42,"ns_yellow":4,"ew_green":"30","ew_yellow":null}}"#)?;
    assert_eq!(
        plan,
        Some(TimingPlan {
            ns_green: Some(42),
            ns_yellow: Some(4),
            ew_green: Some(30),
            ew_yellow: None,
        })
    );
    Ok(())
}

#[test]
fn test_parse_missing_plan() -> Result<()> {
    assert_eq!(parse_response("{}")?, None);
    assert_eq!(parse_response(r#"{"phase_plan":null,"note":"idle"}"#)?, None);
    Ok(())
}

#[test]
fn test_parse_unusable_fields() -> Result<()> {
    let plan = parse_response(r#"{"phase_plan":{"ns_green":0,"ns_yellow":"soon","ew_green":-5,"ew_yellow":4.9}}"#)?
        .ok_or_else(|| anyhow!("plan missing"))?;

    assert_eq!(plan.ns_green, None, "Zero counts as absent");
    assert_eq!(plan.ns_yellow, None, "Non-numeric strings count as absent");
    assert_eq!(plan.ew_green, Some(0), "Negatives floor at zero");
    assert_eq!(plan.ew_yellow, Some(4));
    Ok(())
}

#[test]
fn test_parse_malformed_body() -> Result<()> {
    assert!(matches!(parse_response("not json"), Err(OptimizerError::Malformed(_))));
    Ok(())
}

#[test]
fn test_unusable_plan_values_clamp_to_minimums() -> Result<()> {
    let mut engine = Engine::new(SimulatorConfig::default(), Some(1))?;
    let plan = parse_response(r#"{"phase_plan":{"ns_green":-5,"ns_yellow":1,"ew_green":2,"ew_yellow":0}}"#)?;

    let (_, epoch) = engine.optimization_request();
    engine.apply_optimization(plan, epoch)?;

    let timing = engine.state().signal.timing();
    assert_eq!(timing.green, 10);
    assert_eq!(timing.yellow, 3);
    assert_eq!(timing.ew_green_override, Some(10));
    assert_eq!(timing.ew_yellow_override, None);
    assert_eq!(engine.state().signal.seconds_remaining(), 10);
    Ok(())
}

#[test]
fn test_stale_plan_is_discarded() -> Result<()> {
    let mut engine = Engine::new(SimulatorConfig::default(), Some(2))?;
    let (_, epoch) = engine.optimization_request();

    // The user moves a slider while the request is in flight
    engine.apply(Command::SetGreen(20), std::time::Duration::ZERO)?;

    let plan = TimingPlan { ns_green: Some(50), ..TimingPlan::default() };
    let result = engine.apply_optimization(Some(plan), epoch);
    assert!(matches!(result, Err(OptimizerError::Stale { .. })), "{:?}", result);
    assert_eq!(engine.state().signal.timing().green, 20);
    Ok(())
}

#[test]
fn test_missing_plan_keeps_timing() -> Result<()> {
    let mut engine = Engine::new(SimulatorConfig::default(), Some(3))?;
    let before = engine.state().signal.timing();
    let (_, epoch) = engine.optimization_request();

    engine.apply_optimization(None, epoch)?;
    assert_eq!(engine.state().signal.timing(), before);
    assert_eq!(engine.state().signal.seconds_remaining(), 25);
    Ok(())
}

#[tokio::test]
async fn test_request_round_trip() -> Result<()> {
    let (url, server) = serve_once("200 OK", r#"{"phase_plan":{"ns_green":40,"ew_green":25}}"#).await?;
    let client = client(&url)?;
    assert_eq!(client.endpoint(), format!("{}/optimize", url));

    let densities = Densities { north: 0.5, south: 0.25, east: 0.25, west: 0.0 };
    let plan = client.request_plan(&densities).await?;
    assert_eq!(
        plan,
        Some(TimingPlan {
            ns_green: Some(40),
            ew_green: Some(25),
            ..TimingPlan::default()
        })
    );

    let request = server.await??;
    assert!(request.starts_with("POST /optimize "), "{}", request);
    assert!(request.contains(r#""densities":{"north":0.5,"south":0.25,"east":0.25,"west":0.0}"#), "{}", request);
    println!("✓ Optimizer round trip returned {:?}", plan);
    Ok(())
}

#[tokio::test]
async fn test_error_status_is_reported() -> Result<()> {
    let (url, server) = serve_once("500 Internal Server Error", r#"{"detail":"solver crashed"}"#).await?;
    let result = client(&url)?.request_plan(&Densities::default()).await;

    match result {
        Err(OptimizerError::Status { status, body }) => {
            assert_eq!(status.as_u16(), 500);
            assert!(body.contains("solver crashed"));
        }
        other => return Err(anyhow!("expected status error, got {:?}", other)),
    }
    server.await??;
    Ok(())
}

#[tokio::test]
async fn test_unreachable_optimizer_is_a_transport_error() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let result = client(&format!("http://{}", addr))?.request_plan(&Densities::default()).await;
    assert!(matches!(result, Err(OptimizerError::Transport(_))), "{:?}", result);
    Ok(())
}

#[tokio::test]
async fn test_driver_applies_optimizer_plan() -> Result<()> {
    let (url, server) = serve_once("200 OK", r#"{"phase_plan":{"ns_green":"18","ns_yellow":4}}"#).await?;
    let driver = DriverHandle::spawn(Engine::new(SimulatorConfig::default(), Some(4))?);

    driver.optimize(&client(&url)?).await?;
    server.await??;

    let snapshot = driver.snapshot().await;
    assert_eq!(snapshot.timing.green, 18);
    assert_eq!(snapshot.timing.yellow, 4);
    assert_eq!(snapshot.phase, PhaseState::NsGreen);
    assert!(snapshot.seconds_remaining <= 18);

    driver.shutdown().await;
    Ok(())
}

#[test]
fn test_oversized_plan_values_are_capped() -> Result<()> {
    let mut engine = Engine::new(SimulatorConfig::default(), Some(5))?;
    let plan = parse_response(r#"{"phase_plan":{"ns_green":4000000000,"ew_yellow":"1e12"}}"#)?;
    assert_eq!(plan.and_then(|p| p.ns_green), Some(MAX_PHASE_SECONDS));

    let (_, epoch) = engine.optimization_request();
    engine.apply_optimization(plan, epoch)?;

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.timing.green, MAX_PHASE_SECONDS);
    assert_eq!(snapshot.timing.ew_yellow_override, Some(MAX_PHASE_SECONDS));
    assert_eq!(snapshot.signal_cycle_time_seconds, 2 * (MAX_PHASE_SECONDS + 5 + 30));

    // The engine keeps ticking with the capped timing
    assert!(engine.simulation_tick());
    assert_eq!(engine.snapshot().seconds_remaining, MAX_PHASE_SECONDS - 1);
    println!("✓ Oversized plan capped at {}s", MAX_PHASE_SECONDS);
    Ok(())
}
