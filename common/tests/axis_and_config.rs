use fluidnc_common::axis::{AxisConfig, AxisId, KinematicsKind, MachineConfig};
use fluidnc_common::config::load_from_str;

fn axis(id: AxisId, steps_per_mm: f64) -> AxisConfig {
    AxisConfig {
        id,
        steps_per_mm: [steps_per_mm, 0.0],
        motor_count: 1,
        max_rate_mm_per_min: 5000.0,
        acceleration_mm_per_min2: 200.0,
        max_travel_mm: 300.0,
        homing: None,
        backlash: None,
    }
}

fn machine() -> MachineConfig {
    MachineConfig {
        name: "test".into(),
        axes: vec![axis(AxisId::X, 80.0), axis(AxisId::Y, 80.0)],
        kinematics: KinematicsKind::Cartesian,
        junction_deviation_mm: 0.01,
        arc_tolerance_mm: 0.002,
        report_interval_ms: 200,
        planner_buffer_capacity: 32,
    }
}

#[test]
fn axis_id_letters_round_trip() {
    assert_eq!(AxisId::X.letter(), 'X');
    assert_eq!(AxisId::Z.letter(), 'Z');
    assert_eq!(AxisId::new(8).unwrap().letter(), 'W');
    assert!(AxisId::new(9).is_none());
}

#[test]
fn steps_and_mm_round_trip() {
    let a = axis(AxisId::X, 80.0);
    let steps = a.mm_to_steps(0, 10.0);
    assert_eq!(steps, 800);
    assert!((a.steps_to_mm(0, steps) - 10.0).abs() < 1e-9);
}

#[test]
fn machine_config_looks_up_axis_by_id() {
    let cfg = machine();
    assert_eq!(cfg.axis_count(), 2);
    assert!(cfg.axis(AxisId::X).is_some());
    assert!(cfg.axis(AxisId::Z).is_none());
}

#[test]
fn toml_config_with_bad_planner_buffer_is_rejected() {
    let text = r#"
        name = "tiny"
        kinematics = "cartesian"
        junction_deviation_mm = 0.01
        arc_tolerance_mm = 0.002
        report_interval_ms = 200
        planner_buffer_capacity = 2

        [[axes]]
        id = 0
        steps_per_mm = [80.0, 0.0]
        motor_count = 1
        max_rate_mm_per_min = 5000.0
        acceleration_mm_per_min2 = 200.0
        max_travel_mm = 300.0
    "#;
    assert!(load_from_str(text, "<test>").is_err());
}

#[test]
fn toml_config_with_valid_axes_loads() {
    let text = r#"
        name = "tiny"
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
        acceleration_mm_per_min2 = 200.0
        max_travel_mm = 300.0
    "#;
    let loaded = load_from_str(text, "<test>").expect("valid config");
    assert_eq!(loaded.machine.axis_count(), 1);
}
