use std::{
	fs,
	path::{Path, PathBuf},
	process::{Command, Output},
	time::{SystemTime, UNIX_EPOCH},
};

const MISALIGNED: &str = r#"pub fn total(values: &[u32]) -> u32 {
    let mut sum = 0;
  for value in values {
        sum += value;
    }
    sum
}
"#;
const ALIGNED: &str = r#"pub fn total(values: &[u32]) -> u32 {
    let mut sum = 0;
    for value in values {
          sum += value;
      }
    sum
}
"#;

fn create_temp_crate_root(name: &str) -> PathBuf {
	let stamp = SystemTime::now().duration_since(UNIX_EPOCH).expect("Clock.").as_nanos();
	let root = std::env::temp_dir().join(format!("vindent-{name}-{stamp}"));
	let _ = fs::remove_dir_all(&root);

	fs::create_dir_all(root.join("src")).expect("Create src.");
	fs::write(
		root.join("Cargo.toml"),
		r#"
[package]
name = "vindent-fixture"
version = "0.1.0"
edition = "2021"
"#,
	)
	.expect("Write cargo manifest.");
	fs::write(root.join(".gitignore"), "/target\n").expect("Write gitignore.");

	root
}

fn run_vindent(root: &Path, args: &[&str]) -> Output {
	Command::new(env!("CARGO_BIN_EXE_vindent"))
		.current_dir(root)
		.args(args)
		.output()
		.expect("run vindent")
}

#[test]
fn check_reports_the_misaligned_statement() {
	let root = create_temp_crate_root("check");

	fs::write(root.join("src/lib.rs"), MISALIGNED).expect("write source");

	let output = run_vindent(&root, &["check", "src/lib.rs"]);
	let stdout = String::from_utf8_lossy(&output.stdout);

	assert!(!output.status.success());
	assert!(
		stdout.contains(
			"src/lib.rs:3:3: [RUST-STYLE-INDENT-001] Indent this statement to column 5 to match its siblings. (fixable)"
		),
		"unexpected stdout: {stdout}"
	);
	assert_eq!(fs::read_to_string(root.join("src/lib.rs")).expect("read source"), MISALIGNED);
}

#[test]
fn fix_moves_the_statement_as_a_block() {
	let root = create_temp_crate_root("fix");

	fs::write(root.join("src/lib.rs"), MISALIGNED).expect("write source");

	let output = run_vindent(&root, &["fix", "src/lib.rs"]);

	assert!(
		output.status.success(),
		"expected vindent fix to succeed, stderr: {}",
		String::from_utf8_lossy(&output.stderr)
	);
	assert_eq!(fs::read_to_string(root.join("src/lib.rs")).expect("read source"), ALIGNED);

	let recheck = run_vindent(&root, &["check", "src/lib.rs"]);

	assert!(recheck.status.success());
}

#[test]
fn json_output_carries_rule_and_severity() {
	let root = create_temp_crate_root("json");
	let source = "fn f() {\n  let a = 1;\n  let b = 2;\n}\n";

	fs::write(root.join("src/lib.rs"), source).expect("write source");

	let output =
		run_vindent(&root, &["check", "--absolute-depth", "--format", "json", "src/lib.rs"]);
	let summary: serde_json::Value =
		serde_json::from_slice(&output.stdout).expect("stdout is json");
	let violation = &summary["violations"][0];

	assert!(!output.status.success());
	assert_eq!(summary["violation_count"], 1);
	assert_eq!(violation["rule"], "RUST-STYLE-INDENT-002");
	assert_eq!(violation["severity"], "warning");
	assert_eq!(violation["line"], 2);
	assert_eq!(violation["expected_column"], 5);
	assert_eq!(violation["fixable"], true);
}

#[test]
fn round_cap_is_reported_when_fixing_stops_early() {
	let root = create_temp_crate_root("cap");
	let source = r#"fn f(x: u8) {
    match x {
        0 => {
            a();
        },
      1 => {
            b();
              c();
          },
    }
}
"#;

	fs::write(root.join("src/lib.rs"), source).expect("write source");

	let output = run_vindent(&root, &["fix", "--max-rounds", "1", "src/lib.rs"]);
	let stdout = String::from_utf8_lossy(&output.stdout);

	assert!(!output.status.success());
	assert!(
		stdout.contains("src/lib.rs: stopped after 1 round(s) (iteration-limit-reached)."),
		"unexpected stdout: {stdout}"
	);
}

#[test]
fn workspace_selection_uses_git_tracked_files() {
	let root = create_temp_crate_root("workspace");

	fs::write(root.join("src/lib.rs"), MISALIGNED).expect("write source");
	fs::write(root.join("untracked.rs"), MISALIGNED).expect("write untracked");

	let output = Command::new("git").current_dir(&root).args(["init"]).output().expect("git init");

	assert!(output.status.success());

	let status = Command::new("git")
		.current_dir(&root)
		.args(["add", "Cargo.toml", "src/lib.rs"])
		.output()
		.expect("git add");

	assert!(status.status.success());

	let output = run_vindent(&root, &["check", "--workspace"]);
	let stdout = String::from_utf8_lossy(&output.stdout);

	assert!(!output.status.success());
	assert!(stdout.contains("src/lib.rs:3:3:"), "unexpected stdout: {stdout}");
	assert!(!stdout.contains("untracked.rs"));
	assert!(stdout.contains("Checked 1 file(s)."));
}

#[test]
fn coverage_lists_both_rules() {
	let root = create_temp_crate_root("coverage");
	let output = run_vindent(&root, &["coverage"]);
	let stdout = String::from_utf8_lossy(&output.stdout);

	assert!(output.status.success());
	assert!(stdout.contains("RUST-STYLE-INDENT-001\timplemented"));
	assert!(stdout.contains("RUST-STYLE-INDENT-002\timplemented"));
}
