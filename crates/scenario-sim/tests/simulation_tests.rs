use pretty_assertions::assert_eq;
use proptest::prelude::*;
use scenario_core::transcript::event_lines;
use scenario_core::{HandshakeMode, Phase, ScenarioConfig};
use scenario_sim::report::expected_registers;
use scenario_sim::{run_simulation, NetworkConfig, Outcome, Violation};
use std::io::Write;

#[tokio::test]
async fn test_shuffled_network_passes() {
    let network = NetworkConfig::new().with_motes(8).with_seed(7);
    let report = run_simulation(network, ScenarioConfig::new()).await;

    assert_eq!(report.outcome, Outcome::Passed);
    assert!(report.violations.is_empty(), "{:?}", report.violations);
    assert!(report.passed());
    assert!(report.simulated_ms >= 600_000);

    for mote in &report.motes {
        assert_eq!(mote.stored, Some(mote.expected), "mote {}", mote.id);
        assert!(mote.messages > 0, "mote {} logged nothing", mote.id);
    }
}

#[tokio::test]
async fn test_console_carries_positions_then_events() {
    let network = NetworkConfig::new().with_motes(3).with_shuffle_boot(false);
    let report = run_simulation(network, ScenarioConfig::new()).await;

    let mut expected_head = Vec::new();
    for mote in &report.motes {
        expected_head.push(format!("i={}", mote.index));
        expected_head.push(format!("x={}", scenario_core::format_coordinate(mote.position.x)));
        expected_head.push(format!("y={}", scenario_core::format_coordinate(mote.position.y)));
    }
    assert_eq!(&report.console[..9], expected_head.as_slice());

    let events = event_lines(report.console.iter().map(String::as_str));
    assert_eq!(events.len(), report.events_logged);
    assert_eq!(events.len(), report.console.len() - 9);

    let last = events.last().unwrap();
    assert!(last.time.as_millis() >= 600_000);

    // Earlier echoes arrive while the handshake is still waiting; the last
    // mote's echo lands in the running phase.
    let last_mote = report.motes.last().unwrap();
    let (x, y) = expected_registers(last_mote.position);
    let echo = format!("pos ({x}, {y})");
    assert!(
        events.iter().any(|e| e.mote == last_mote.id && e.message == echo),
        "missing echo {echo:?} from mote {}",
        last_mote.id
    );
}

#[tokio::test]
async fn test_short_horizon_closes_host_before_success() {
    let network = NetworkConfig::new().with_motes(3).with_horizon_ms(60_000);
    let report = run_simulation(network, ScenarioConfig::new()).await;

    assert_eq!(
        report.outcome,
        Outcome::HostClosed {
            phase: Phase::Running
        }
    );
    assert!(!report.passed());
    assert!(report.violations.is_empty());
}

#[tokio::test]
async fn test_handshake_timeout_shorter_than_boot_spread() {
    // Boots are spread over 2 s; a 500 ms handshake cannot see them all.
    let network = NetworkConfig::new().with_motes(4).with_shuffle_boot(false);
    let scenario = ScenarioConfig::new().with_handshake_timeout_ms(500);
    let report = run_simulation(network, scenario).await;

    match &report.outcome {
        Outcome::HandshakeTimeout { pending, .. } => assert!(!pending.is_empty()),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(report
        .violations
        .iter()
        .any(|v| matches!(v, Violation::NotPositioned { .. })));
}

#[tokio::test]
async fn test_sequential_mode_swallows_ready_lines() {
    // Several motes booting at the same instant: the yield after each
    // positioning consumes a ready line that is never answered.
    let mut network = NetworkConfig::new().with_motes(4).with_horizon_ms(700_000);
    network.boot_spread_ms = 0;
    let scenario = ScenarioConfig::new().with_handshake(HandshakeMode::Sequential);
    let report = run_simulation(network, scenario).await;

    assert!(!report.passed());
    assert!(report
        .violations
        .iter()
        .any(|v| matches!(v, Violation::NotPositioned { .. })));
}

#[tokio::test]
async fn test_keyed_mode_handles_simultaneous_boots() {
    let mut network = NetworkConfig::new().with_motes(4);
    network.boot_spread_ms = 0;
    let report = run_simulation(network, ScenarioConfig::new()).await;

    assert!(report.passed(), "{}", report.generate_text());
}

#[tokio::test]
async fn test_config_file_drives_run() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "success_after_ms = 30000").unwrap();
    writeln!(file, "handshake = \"keyed\"").unwrap();

    let scenario = ScenarioConfig::load(file.path()).unwrap();
    let report = run_simulation(NetworkConfig::new().with_motes(2), scenario).await;

    assert!(report.passed());
    assert!(report.simulated_ms >= 30_000 && report.simulated_ms < 600_000);
}

#[tokio::test]
async fn test_report_renders_text_and_json() {
    let report = run_simulation(NetworkConfig::new().with_motes(2), ScenarioConfig::new()).await;

    let text = report.generate_text();
    assert!(text.contains("=== Mote Scenario Report ==="));
    assert!(text.contains("=== Result: PASS ==="));

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["outcome"]["kind"], "passed");
    assert_eq!(json["motes"].as_array().map(Vec::len), Some(2));
    assert!(json.get("console").is_none());
}

#[tokio::test]
async fn test_zero_motes_runs_dry() {
    let report = run_simulation(NetworkConfig::new().with_motes(0), ScenarioConfig::new()).await;
    // Nothing ever prints, so the host runs dry during the running phase.
    assert_eq!(
        report.outcome,
        Outcome::HostClosed {
            phase: Phase::Running
        }
    );
    assert!(report.motes.is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn any_seed_passes_in_keyed_mode(seed in any::<u64>(), motes in 1usize..6) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let network = NetworkConfig::new().with_motes(motes).with_seed(seed);
        let report = runtime.block_on(run_simulation(network, ScenarioConfig::new()));

        prop_assert!(report.passed(), "{}", report.generate_text());
    }
}
