use crate::engine::{FrameRule, Simulator};
use crate::trace::SimulationReport;
use anyhow::{Context, anyhow, ensure};
use std::fs;
use std::path::Path;
use swp_abstract::{ProtocolConfig, SimConfig, TestAction, TestAssertion, TestScenario};
use tracing::info;

/// Scenarios that do not state a `max_duration` must finish within this much virtual time.
pub const DEFAULT_MAX_DURATION_MS: u64 = 10_000;

pub fn load_scenario(path: impl AsRef<Path>) -> anyhow::Result<TestScenario> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse scenario {}", path.display()))
}

/// Build a simulator for `scenario` with its actions and faults registered.
pub fn configure(scenario: &TestScenario) -> Simulator {
    let mut config = SimConfig::default();
    scenario.config.apply_to(&mut config);
    let mut protocol = ProtocolConfig::default();
    scenario.config.apply_to_protocol(&mut protocol);

    let mut sim = Simulator::new(config, protocol);
    for action in &scenario.actions {
        match action {
            TestAction::AppSend {
                time,
                station,
                data,
            } => {
                sim.schedule_app_send(*time, *station, data.as_bytes().to_vec());
            }
            TestAction::DropNext { from, kind, seq } => {
                sim.add_drop_next(FrameRule {
                    from: *from,
                    kind: *kind,
                    seq: *seq,
                });
            }
            TestAction::CorruptNext { from, kind, seq } => {
                sim.add_corrupt_next(FrameRule {
                    from: *from,
                    kind: *kind,
                    seq: *seq,
                });
            }
        }
    }
    sim
}

pub fn run_scenario(path: impl AsRef<Path>) -> anyhow::Result<SimulationReport> {
    let scenario = load_scenario(path)?;
    run_loaded(&scenario)
}

/// Run a parsed scenario to completion and check its assertions.
pub fn run_loaded(scenario: &TestScenario) -> anyhow::Result<SimulationReport> {
    info!("Running Scenario: {}", scenario.name);
    if !scenario.description.is_empty() {
        info!("Description: {}", scenario.description);
    }

    let mut sim = configure(scenario);

    let max_duration = scenario
        .assertions
        .iter()
        .find_map(|a| match a {
            TestAssertion::MaxDuration { ms } => Some(*ms),
            _ => None,
        })
        .unwrap_or(DEFAULT_MAX_DURATION_MS);

    if !sim.run_until(max_duration) {
        return Err(anyhow!("Test timed out after {} ms", max_duration));
    }

    for assertion in &scenario.assertions {
        check(&sim, assertion)?;
    }

    info!("Test Scenario Passed!");
    Ok(sim.export_report())
}

fn check(sim: &Simulator, assertion: &TestAssertion) -> anyhow::Result<()> {
    match assertion {
        TestAssertion::DeliveredInOrder { station, data } => {
            let delivered: Vec<String> = sim
                .delivered(*station)
                .iter()
                .map(|p| p.to_string())
                .collect();
            ensure!(
                delivered == *data,
                "Assertion Failed: station {} delivered {:?}, expected {:?}",
                station,
                delivered,
                data
            );
        }
        TestAssertion::DataDelivered { station, data } => {
            let found = sim
                .delivered(*station)
                .iter()
                .any(|p| p.as_bytes() == data.as_bytes());
            ensure!(
                found,
                "Assertion Failed: Data {:?} was not delivered at station {}",
                data,
                station
            );
        }
        TestAssertion::FrameCount {
            from,
            kind,
            min,
            max,
        } => {
            let count = sim.frames_sent(*from).get(*kind);
            ensure!(
                count >= *min,
                "Assertion Failed: {} sent {} {} frames, expected min {}",
                from,
                count,
                kind,
                min
            );
            if let Some(max) = max {
                ensure!(
                    count <= *max,
                    "Assertion Failed: {} sent {} {} frames, expected max {}",
                    from,
                    count,
                    kind,
                    max
                );
            }
        }
        TestAssertion::MaxDuration { .. } => {} // Already checked
    }
    Ok(())
}
