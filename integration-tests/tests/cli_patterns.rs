use anyhow::Result;
use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;

fn promptdeck_cmd() -> Command {
    let mut cmd = Command::new("cargo");
    cmd.arg("run")
        .arg("--quiet")
        .arg("-p")
        .arg("promptdeck")
        .arg("--bin")
        .arg("promptdeck")
        .arg("--");
    cmd
}

#[test]
fn patterns_json_lists_the_full_library() -> Result<()> {
    let assert = promptdeck_cmd()
        .arg("patterns")
        .arg("--json")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    let export: Value = serde_json::from_str(&stdout)?;
    let patterns = export["patterns"]
        .as_array()
        .expect("patterns array present");
    assert_eq!(patterns.len(), 20, "full pattern library listed");

    let keys: Vec<&str> = patterns
        .iter()
        .map(|p| p["key"].as_str().unwrap())
        .collect();
    assert!(keys.contains(&"cot"));
    assert!(keys.contains(&"dataGuidedRefactoring"));

    let cot = patterns.iter().find(|p| p["key"] == "cot").unwrap();
    assert_eq!(
        cot["template"].as_str().unwrap(),
        "Think step by step to solve this problem:\n\n"
    );

    Ok(())
}

#[test]
fn patterns_listing_groups_by_category() {
    promptdeck_cmd()
        .arg("patterns")
        .assert()
        .success()
        .stdout(contains("Chain of Thought"))
        .stdout(contains("Requirements Elicitation:"))
        .stdout(contains("Refactoring:"));
}
