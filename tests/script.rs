use std::fs::{self, File};
use std::io::BufReader;
use std::process::Command;

use serde_json::Value;
use waymark::controller::ControllerConfig;
use waymark::terminal::{FixedLocation, Session, run_script};
use waymark::types::{Coords, WorkoutDetails};

const TWO_WORKOUTS: &str = "\
# morning run
click 51.5 -0.12
set distance 5
set duration 30
set cadence 180
submit

# evening ride
click 51.52 -0.1
type cycling
set distance 10
set duration 40
set elevation 150
submit
select 1
";

#[test]
fn script_file_logs_workouts_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.txt");
    fs::write(&path, TWO_WORKOUTS).unwrap();

    let mut session = Session::new(ControllerConfig::default());
    session.start(&mut FixedLocation::new(Some(Coords::new(51.5, -0.12))));

    let mut out = Vec::new();
    let file = File::open(&path).unwrap();
    run_script(&mut session, BufReader::new(file), &mut out).unwrap();

    let workouts = session.workouts();
    assert_eq!(workouts.len(), 2);
    assert!(workouts[0].id() < workouts[1].id());
    assert_eq!(workouts[0].metric(), 6.0);
    assert!(matches!(
        workouts[1].details(),
        WorkoutDetails::Cycling { speed, .. } if *speed == 15.0
    ));

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("marker #3 at 51.52000,-0.10000"));
    assert!(text.contains("view moved to 51.50000,-0.12000 zoom 13"));
}

#[test]
fn invalid_lines_leave_list_untouched() {
    let mut session = Session::new(ControllerConfig::default());
    session.start(&mut FixedLocation::new(Some(Coords::new(0.5, 0.5))));

    let script = "click 1 1\nset distance 0\nset duration 30\nset cadence 170\nsubmit\n";
    let mut out = Vec::new();
    run_script(&mut session, script.as_bytes(), &mut out).unwrap();

    assert!(session.workouts().is_empty());
    assert!(String::from_utf8(out).unwrap().contains("! Inputs have to be positive numbers!"));
}

#[test]
fn binary_prints_json_summary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.txt");
    fs::write(&path, TWO_WORKOUTS).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_waymark"))
        .args(["--lat", "51.5", "--lng", "-0.12", "--json", "-q"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let json_start = stdout.find("\n[").unwrap() + 1;
    let records: Value = serde_json::from_str(&stdout[json_start..]).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["kind"], "running");
    assert_eq!(records[0]["pace"], 6.0);
    assert_eq!(records[1]["kind"], "cycling");
    assert_eq!(records[1]["elevation_gain"], 150.0);
}

#[test]
fn binary_without_location_runs_but_logs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.txt");
    fs::write(&path, TWO_WORKOUTS).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_waymark"))
        .args(["-qq", "--json"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("! map is not available"));
    assert!(stdout.trim_end().ends_with("[]"));
}
