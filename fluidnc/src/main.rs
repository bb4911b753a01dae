//! Binary entry point: loads a machine config, wires the planner,
//! interpreter, and realtime state machine together, and drives a single
//! stdio channel in simulation mode (no real step engine or spindle
//! hardware — see [`step_sim`]).

mod step_sim;

use std::io::{self, BufRead, Write as _};
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

use fluidnc_channel::{format_status, LineEditor, LineEvent, ReportScheduler, StatusSnapshot};
use fluidnc_common::config::load_from_file;
use fluidnc_common::realtime::Alarm;
use fluidnc_gcode::{process_line, JobStack, MachineState};
use fluidnc_hal::MemorySettingsStore;
use fluidnc_planner::Planner;
use fluidnc_rt::{MachineEvent, RealtimeStateMachine, Runtime, Session, SimulatedSpindle, SpindleCoolant};

use step_sim::SimulatedStepEngine;

#[derive(Parser)]
#[command(name = "fluidnc", about = "CNC motion controller pipeline, simulation mode")]
struct Cli {
    /// Path to a machine config TOML file. Falls back to a built-in
    /// three-axis cartesian demo machine when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

const DEMO_MACHINE_TOML: &str = r#"
name = "demo-mill"
kinematics = "cartesian"
junction_deviation_mm = 0.01
arc_tolerance_mm = 0.002
report_interval_ms = 200
planner_buffer_capacity = 32

[[axes]]
id = 0
steps_per_mm = [80.0, 0.0]
motor_count = 1
max_rate_mm_per_min = 5000.0
acceleration_mm_per_min2 = 500.0
max_travel_mm = 300.0
[axes.homing]
seek_rate = 500.0
feed_rate = 50.0
pulloff_mm = 2.0
mpos = 0.0
positive_direction = false
cycle = 1

[[axes]]
id = 1
steps_per_mm = [80.0, 0.0]
motor_count = 1
max_rate_mm_per_min = 5000.0
acceleration_mm_per_min2 = 500.0
max_travel_mm = 300.0
[axes.homing]
seek_rate = 500.0
feed_rate = 50.0
pulloff_mm = 2.0
mpos = 0.0
positive_direction = false
cycle = 1

[[axes]]
id = 2
steps_per_mm = [400.0, 0.0]
motor_count = 1
max_rate_mm_per_min = 1000.0
acceleration_mm_per_min2 = 100.0
max_travel_mm = 100.0
[axes.homing]
seek_rate = 200.0
feed_rate = 25.0
pulloff_mm = 2.0
mpos = 0.0
positive_direction = true
cycle = 0
"#;

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => load_from_file(path).unwrap_or_else(|e| {
            eprintln!("fatal: {e}");
            std::process::exit(1);
        }),
        None => {
            warn!("no --config given, running the built-in demo machine");
            fluidnc_common::config::load_from_str(DEMO_MACHINE_TOML, "<built-in demo>")
                .expect("built-in demo config is valid")
        }
    };
    info!(machine = %loaded, "starting fluidnc");
    let machine = loaded.machine;
    let axis_count = machine.axis_count();

    let kinematics = fluidnc_kinematics::build(&machine);
    let mut planner = Planner::new(&machine, vec![0.0; axis_count]);
    let mut job = JobStack::new();
    let mut interp_state = MachineState::new(axis_count);

    let mut session = Session::new(fluidnc_rt::ParameterStore::new(MemorySettingsStore::new()));
    session.load(axis_count);
    let mut coords = session.coords();

    let steps_per_mm: Vec<f64> = machine.axes.iter().map(|a| a.steps_per_mm[0]).collect();
    let step_engine = SimulatedStepEngine::new(steps_per_mm);
    let spindle = SpindleCoolant::new(Box::new(SimulatedSpindle::new(24000.0)));
    let mut runtime = Runtime::new(spindle, step_engine, axis_count);

    let mut rt_state = RealtimeStateMachine::new();
    let mut editor = LineEditor::new(true);
    let mut report_scheduler = ReportScheduler::new(machine.report_interval_ms);

    println!("fluidnc simulation ready. Type G-code, '?' for status, Ctrl-D to quit.");
    let clock = std::time::Instant::now();
    let stdin = io::stdin();
    let mut line_buf = String::new();
    loop {
        line_buf.clear();
        if stdin.lock().read_line(&mut line_buf).unwrap_or(0) == 0 {
            break;
        }

        for &byte in line_buf.as_bytes() {
            match editor.push(byte) {
                LineEvent::Line(text) => {
                    let result = process_line(
                        &text,
                        &mut interp_state,
                        &machine,
                        kinematics.as_ref(),
                        &mut planner,
                        &mut session,
                        &mut coords,
                        &mut runtime,
                        &mut job,
                    );
                    match result {
                        Ok(()) => println!("ok"),
                        // §7: a line that triggers both an alarm and an error reports
                        // the error first and enters alarm afterward.
                        Err(err) => {
                            println!("error:{}", err.code());
                            raise_alarm_if_any(err, &mut rt_state);
                        }
                    }
                    session.set_tool(runtime.current_tool());
                    report_scheduler.mark_dirty();
                }
                LineEvent::Overflow => println!("error:{}", LineEditor::overflow_error().code()),
                LineEvent::Realtime(event) => handle_realtime(event, &mut rt_state),
                LineEvent::Pending => {}
            }
        }

        if runtime.step_engine.poll_queue_overflow() {
            planner.ring_mut().clear();
            raise_alarm_if_any(fluidnc_common::error::Error::RealtimeQueueOverflow, &mut rt_state);
        }

        let now_ms = clock.elapsed().as_millis() as u64;
        if report_scheduler.should_emit(now_ms, planner.ring().len() > 0) {
            let state_name = format!("{:?}", rt_state.state());
            let snapshot = StatusSnapshot {
                state_name: &state_name,
                mpos: &interp_state.current_mpos,
                wco: None,
                feed: interp_state.current_feed,
                spindle_speed: interp_state.current_spindle_speed,
                pins: "",
                feed_override: 100,
                rapid_override: 100,
                spindle_override: 100,
                planner_blocks: planner.ring().len(),
            };
            println!("{}", format_status(&snapshot));
        }
        io::stdout().flush().ok();
    }
}

/// Post `err` to the realtime state machine and print the separate
/// `ALARM:<n>` line if it's alarm-worthy (§7, §4.11); a no-op otherwise.
fn raise_alarm_if_any(err: fluidnc_common::error::Error, rt_state: &mut RealtimeStateMachine) {
    if let Some(alarm) = Alarm::from_error(err) {
        let _ = rt_state.handle_event(MachineEvent::AlarmRaised(err));
        println!("ALARM:{}", alarm.code());
    }
}

fn handle_realtime(event: fluidnc_channel::RealtimeEvent, rt_state: &mut RealtimeStateMachine) {
    use fluidnc_channel::RealtimeEvent as R;
    let mapped = match event {
        R::Reset => Some(MachineEvent::Reset { motion_in_progress: false }),
        R::StatusReport => Some(MachineEvent::StatusReport),
        R::CycleStart => Some(MachineEvent::CycleStart { queued_blocks: true }),
        R::FeedHold => Some(MachineEvent::FeedHold),
        R::SafetyDoor => Some(MachineEvent::SafetyDoorOpened),
        R::JogCancel => Some(MachineEvent::JogCancel),
        _ => None,
    };
    if let Some(event) = mapped {
        let _ = rt_state.handle_event(event);
    }
}
