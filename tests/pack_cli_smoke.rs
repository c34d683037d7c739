use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "src/app.js", "let x = 1; // comment\n");
    write_file(tmp.path(), "src/util.py", "x = 1\n");
    write_file(tmp.path(), "node_modules/dep/index.js", "module.exports = {};\n");
    write_file(tmp.path(), ".gitignore", "node_modules/\n");
    tmp
}

#[test]
fn pack_cli_smoke() {
    let bin = env!("CARGO_BIN_EXE_promptpack");
    let tmp = project();

    let output = Command::new(bin)
        .arg("--root")
        .arg(tmp.path())
        .args(["--files", "src/app.js", "src/util.py", "--stdout"])
        .output()
        .expect("spawn promptpack");

    assert!(output.status.success(), "promptpack should exit cleanly");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.starts_with("The following are the various JavaScript, Python code files"),
        "first batch must open with the preamble, got: {}",
        &stdout[..stdout.len().min(120)]
    );
    assert!(stdout.contains("```JavaScript\n"));
    assert!(stdout.contains("```Python\n"));
    assert!(stdout.contains("app.js"));
    // Line comment stripped before rendering.
    assert!(!stdout.contains("// comment"));

    // Batch documents plus the meta sidecar land in the output dir.
    let out_dir = tmp.path().join(".promptpack");
    assert!(out_dir.join("batch_001.md").exists());
    let meta: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out_dir.join("batches.meta.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(meta["filesPacked"], 2);
    assert_eq!(meta["emittedBatches"], 1);
    assert_eq!(meta["overBudgetBatches"], 0);
}

#[test]
fn list_cli_excludes_ignored_files() {
    let bin = env!("CARGO_BIN_EXE_promptpack");
    let tmp = project();

    let output = Command::new(bin)
        .arg("--root")
        .arg(tmp.path())
        .arg("--list")
        .output()
        .expect("spawn promptpack --list");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("app.js"));
    assert!(stdout.contains("util.py"));
    assert!(stdout.contains("tokens)"));
    assert!(
        !stdout.contains("node_modules"),
        "ignored tree must not be cached: {stdout}"
    );
}
