use anyhow::{Context, Result, anyhow};
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use swp_abstract::{Packet, ProtocolConfig, SimConfig, StationId};
use swp_core::{EngineStats, StationHandle, station_pair};
use swp_simulator::{SimulationReport, Simulator, scenario_runner};

#[derive(Parser, Debug)]
#[command(author, version, about = "Selective-repeat sliding window simulator")]
struct Args {
    /// Load a scenario from disk.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Run the two stations on real threads with tokio timers instead of virtual time.
    #[arg(long, default_value_t = false)]
    realtime: bool,

    /// Number of demo payloads sent by station A (B sends half as many).
    #[arg(long, default_value_t = 8)]
    messages: usize,

    #[arg(long, default_value_t = 0.1)]
    loss_rate: f64,
    #[arg(long, default_value_t = 0.0)]
    corrupt_rate: f64,

    /// Link latency bounds in milliseconds.
    #[arg(long, default_value_t = 10)]
    min_latency: u64,
    #[arg(long, default_value_t = 100)]
    max_latency: u64,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Write a JSON trace of the finished run.
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

/// Summary of a real-time run; there is no virtual timeline to report.
#[derive(Debug, Serialize)]
struct RealtimeReport {
    config: SimConfig,
    protocol: ProtocolConfig,
    stations: Vec<RealtimeStation>,
}

#[derive(Debug, Serialize)]
struct RealtimeStation {
    station: StationId,
    delivered: Vec<Packet>,
    engine: EngineStats,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt::init();
    info!("swp-sim-cli starting…");

    if args.scenario.is_some() && args.realtime {
        anyhow::bail!("--scenario and --realtime cannot be used together");
    }

    if args.realtime {
        let report = run_realtime(&args)?;
        if let Some(trace_path) = &args.trace_out {
            write_json(trace_path, &report)?;
        }
        return Ok(());
    }

    let report = match &args.scenario {
        Some(path) => scenario_runner::run_scenario(path)?,
        None => run_default_sim(&args),
    };
    print_summary(&report);

    if let Some(trace_path) = &args.trace_out {
        write_json(trace_path, &report)?;
    }

    Ok(())
}

impl Args {
    fn sim_config(&self) -> SimConfig {
        SimConfig {
            loss_rate: self.loss_rate,
            corrupt_rate: self.corrupt_rate,
            min_latency: self.min_latency,
            max_latency: self.max_latency,
            seed: self.seed,
        }
    }
}

fn demo_traffic(prefix: &str, count: usize) -> Vec<Packet> {
    (0..count)
        .map(|i| Packet::from(format!("{prefix} packet {}", i + 1).into_bytes()))
        .collect()
}

fn run_default_sim(args: &Args) -> SimulationReport {
    let mut sim = Simulator::new(args.sim_config(), ProtocolConfig::default());
    for (i, packet) in demo_traffic("A->B", args.messages).into_iter().enumerate() {
        sim.schedule_app_send(i as u64 * 20, StationId::A, packet);
    }
    for (i, packet) in demo_traffic("B->A", args.messages / 2).into_iter().enumerate() {
        sim.schedule_app_send(10 + i as u64 * 40, StationId::B, packet);
    }

    info!("Starting default headless simulation…");
    sim.run_until_complete();
    info!("Simulation complete.");
    sim.export_report()
}

fn print_summary(report: &SimulationReport) {
    for record in &report.trace {
        println!("{record}");
    }
    println!("finished at {} ms", report.duration_ms);
    for station in &report.stations {
        println!(
            "station {}: delivered {}, sent {} DATA / {} ACK / {} NAK, {} retransmissions",
            station.station,
            station.delivered.len(),
            station.frames_sent.data,
            station.frames_sent.ack,
            station.frames_sent.nak,
            station.engine.retransmissions
        );
    }
}

fn run_realtime(args: &Args) -> Result<RealtimeReport> {
    let config = args.sim_config();
    let protocol = ProtocolConfig::default();
    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;

    let ((mut a, mut a_handle), (mut b, mut b_handle)) = station_pair(&config, runtime.handle());
    let from_a = demo_traffic("A->B", args.messages);
    let from_b = demo_traffic("B->A", args.messages / 2);
    a.submit(from_a.clone());
    b.submit(from_b.clone());

    let pa = protocol.clone();
    let pb = protocol.clone();
    let ta = thread::spawn(move || a.run(&pa));
    let tb = thread::spawn(move || b.run(&pb));

    info!("Real-time stations running…");
    let patience = Duration::from_millis(protocol.frame_timeout_ms * 20);
    let at_b = collect(&runtime, &mut b_handle, from_a.len(), patience);
    let at_a = collect(&runtime, &mut a_handle, from_b.len(), patience);

    a_handle.events.halt();
    b_handle.events.halt();
    let (stats_a, _) = ta.join().map_err(|_| anyhow!("station A panicked"))?;
    let (stats_b, _) = tb.join().map_err(|_| anyhow!("station B panicked"))?;

    for (station, got, want) in [(StationId::B, &at_b, &from_a), (StationId::A, &at_a, &from_b)] {
        if got == want {
            info!("station {} received all {} payloads in order", station, got.len());
        } else {
            warn!(
                "station {} received {} of {} payloads",
                station,
                got.len(),
                want.len()
            );
        }
    }

    Ok(RealtimeReport {
        config,
        protocol,
        stations: vec![
            RealtimeStation {
                station: StationId::A,
                delivered: at_a,
                engine: stats_a,
            },
            RealtimeStation {
                station: StationId::B,
                delivered: at_b,
                engine: stats_b,
            },
        ],
    })
}

fn collect(
    runtime: &tokio::runtime::Runtime,
    handle: &mut StationHandle,
    count: usize,
    patience: Duration,
) -> Vec<Packet> {
    runtime.block_on(async {
        let mut out = Vec::with_capacity(count);
        while out.len() < count {
            match tokio::time::timeout(patience, handle.deliveries.recv()).await {
                Ok(Some(packet)) => out.push(packet),
                _ => break,
            }
        }
        out
    })
}

fn write_json<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    let data = serde_json::to_vec_pretty(report).context("Failed to serialize simulation trace")?;
    fs::write(path, &data)
        .with_context(|| format!("Failed to write trace file {}", path.display()))?;
    Ok(())
}
