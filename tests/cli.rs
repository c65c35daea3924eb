use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

fn write_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn codecat(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_codecat"))
        .current_dir(dir)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn cli_json_respects_codecatignore_hidden_and_minified() {
    let dir = tempdir().unwrap();

    write_file(&dir.path().join("a.py"), "def a():\n    return 1\n");
    write_file(&dir.path().join("ignored.py"), "def ignored():\n    pass\n");
    write_file(&dir.path().join(".hidden.py"), "def hidden():\n    pass\n");
    write_file(
        &dir.path().join("bundle.min.js"),
        "export function minified() { return 1 }\n",
    );
    write_file(&dir.path().join(".codecatignore"), "ignored.py\n");

    let output = codecat(dir.path(), &["--json", "--stdout"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let files = v.get("files").and_then(|f| f.as_array()).unwrap();

    let paths: Vec<&str> = files
        .iter()
        .map(|f| f.get("path").unwrap().as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["a.py"]);

    let outline = files[0].get("outline").and_then(|o| o.as_array()).unwrap();
    assert_eq!(outline[0].get("name").unwrap(), "a");
    assert_eq!(v["summary"]["functions"], 1);
}

#[test]
fn cli_full_content_to_stdout() {
    let dir = tempdir().unwrap();
    write_file(
        &dir.path().join("src/app.py"),
        "class C:\n    def run(self):\n        pass\n",
    );

    let output = codecat(dir.path(), &["--stdout"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("# src/app.py\n\n## Functions\n- C.run\n\n## Content\n"));
    assert!(stdout.contains("```python\nclass C:\n"));
}

#[test]
fn cli_tree_to_stdout() {
    let dir = tempdir().unwrap();
    write_file(
        &dir.path().join("web/app.js"),
        "export function start() {}\nfunction helper() {}\n",
    );
    write_file(&dir.path().join("README.md"), "# Readme\n");

    let output = codecat(dir.path(), &["--tree", "--stdout", "--nodocs"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("└── web/\n"));
    assert!(stdout.contains("app.js"));
    assert!(stdout.contains("export start()"));
    assert!(!stdout.contains("README.md"));
}

#[test]
fn cli_writes_output_file() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("main.rs"), "fn main() {}\n");

    let output = codecat(dir.path(), &["-f", "-n"]);
    assert!(output.status.success());

    let written = fs::read_to_string(dir.path().join("output-codecat.md")).unwrap();
    assert!(written.starts_with("# main.rs\n"));
    assert!(written.contains("- main\n"));
    assert!(output.stdout.is_empty());
}

#[test]
fn cli_bydir_writes_one_tree_per_directory() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("api/handlers.py"), "def get():\n    pass\n");
    write_file(&dir.path().join("lib/util.py"), "def util():\n    pass\n");
    write_file(&dir.path().join("lib.tree.md"), "keep\n");

    let output = codecat(dir.path(), &["--bydir"]);
    assert!(output.status.success());

    let api = fs::read_to_string(dir.path().join("api.tree.md")).unwrap();
    assert!(api.contains("handlers.py"));
    assert!(api.contains("get()"));
    assert_eq!(
        fs::read_to_string(dir.path().join("lib.tree.md")).unwrap(),
        "keep\n"
    );

    let output = codecat(dir.path(), &["--bydir", "lib", "--overwrite"]);
    assert!(output.status.success());
    let lib = fs::read_to_string(dir.path().join("lib.tree.md")).unwrap();
    assert!(lib.contains("util()"));
}

#[test]
fn cli_missing_path_exits_with_not_found() {
    let dir = tempdir().unwrap();

    let output = codecat(dir.path(), &["does-not-exist", "--stdout"]);
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("error:"));
}

#[test]
fn cli_empty_selection_exits_with_no_files() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("image.png"), "not really");

    let output = codecat(dir.path(), &["--stdout"]);
    assert_eq!(output.status.code(), Some(5));
}
