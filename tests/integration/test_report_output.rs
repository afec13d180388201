//! End-to-end tests for report rendering.
//!
//! Drives a session to a settled state, then renders the published
//! report through both generators and checks the output a consumer
//! would see.

use statelab_engine::{Case, EngineConfig, Lesson, LessonPhase, LessonReport, LessonSession};
use statelab_report::json::JsonGenerator;
use statelab_report::TextGenerator;

const TOGGLE_SOURCE: &str = r#"{
    "initial": "off",
    "states": {
        "off": { "on": { "FLIP": "on" } },
        "on":  { "on": { "FLIP": "off" } }
    }
}"#;

fn toggle_lesson() -> Lesson {
    Lesson::new("Toggle switch", TOGGLE_SOURCE).with_case(
        Case::new("Flips on and off")
            .assert("starts off", |s| s.state == "off")
            .send("FLIP")
            .assert("flipped on", |s| s.state == "on")
            .send("FLIP")
            .assert("flipped back off", |s| s.state == "off"),
    )
}

async fn settled_report(source: &str) -> LessonReport {
    let handle = LessonSession::spawn(toggle_lesson(), EngineConfig::default())
        .expect("failed to spawn session");
    handle.edit(source).await.expect("edit failed");
    let report = handle.settled_after(0).await.expect("session closed");
    handle.close().await;
    report
}

#[tokio::test]
async fn test_json_report_for_passing_run() {
    let report = settled_report(TOGGLE_SOURCE).await;
    assert_eq!(report.phase, LessonPhase::Passed);

    let json = JsonGenerator::new(&report).generate().unwrap();
    assert!(json.contains(r#""title":"Toggle switch""#));
    assert!(json.contains(r#""phase":"passed""#));
    assert!(json.contains(r#""all_passed":true"#));
    assert!(json.contains(r#""status":"complete""#));

    let parsed: LessonReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, report);
}

#[tokio::test]
async fn test_json_report_for_compile_failure() {
    let report = settled_report("{ nope").await;
    assert_eq!(report.phase, LessonPhase::Errored);

    let json = JsonGenerator::new(&report).generate_pretty().unwrap();
    assert!(json.contains("\"compile_error\""));
    assert!(json.contains(r#""phase": "errored""#));
    // No run happened, so no step ever errored.
    assert!(!json.contains(r#""status": "errored""#));
}

#[tokio::test]
async fn test_text_checklist_for_passing_run() {
    let report = settled_report(TOGGLE_SOURCE).await;

    let text = TextGenerator::new(&report).generate();
    assert!(text.contains("Toggle switch"));
    assert!(text.contains("Phase: passed"));
    assert!(text.contains("[x] starts off"));
    assert!(text.contains("[x] Send a FLIP event"));
    assert!(text.contains("All cases passed."));
}

#[tokio::test]
async fn test_text_checklist_marks_failure() {
    // A machine that never flips back: the final assertion fails.
    let stuck = r#"{
        "initial": "off",
        "states": {
            "off": { "on": { "FLIP": "on" } },
            "on":  {}
        }
    }"#;
    let report = settled_report(stuck).await;
    assert_eq!(report.phase, LessonPhase::Errored);

    let text = TextGenerator::new(&report).generate();
    assert!(text.contains("[x] starts off"));
    assert!(text.contains("[!] flipped back off"));
    assert!(text.contains("First failure: flipped back off"));
}

#[tokio::test]
async fn test_json_written_to_file() {
    let report = settled_report(TOGGLE_SOURCE).await;

    let path = std::env::temp_dir().join("statelab-toggle-report.json");
    JsonGenerator::new(&report)
        .write_to_file(&path, false)
        .unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let parsed: LessonReport = serde_json::from_str(&contents).unwrap();
    assert_eq!(parsed, report);

    std::fs::remove_file(&path).unwrap();
}
