/// Integration test suite for the `module-graph` binary.
///
/// Every test writes a small Python package into a temporary directory and invokes the
/// compiled binary via subprocess. `CARGO_BIN_EXE_module-graph` is set by Cargo during
/// `cargo test` and points to the binary for the current profile.
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_module-graph"))
}

const SHAPES: &str = r#""""Geometry helpers."""
__version__ = "2.1"

import math
from typing import Optional

UNIT = 1.0


class ShapeError(ValueError):
    pass


class Shape:
    """Base of all shapes."""

    def area(self) -> float:
        raise ShapeError("abstract")


class Circle(Shape):
    def __init__(self, radius: float):
        self.radius = radius

    def area(self) -> float:
        return math.pi * self.radius ** 2

    def scaled(self, factor: float) -> "Circle":
        return Circle(self.radius * factor)


def _cache():
    pass


def largest(shapes: list) -> Optional[Shape]:
    _cache()
    return max(shapes, key=lambda s: s.area(), default=None)
"#;

/// A temp dir holding `shapes.py` and `pkg/{__init__,core}.py`.
fn fixture() -> TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    std::fs::write(dir.path().join("shapes.py"), SHAPES).unwrap();
    std::fs::create_dir(dir.path().join("pkg")).unwrap();
    std::fs::write(dir.path().join("pkg/__init__.py"), "").unwrap();
    std::fs::write(
        dir.path().join("pkg/core.py"),
        "def ping():\n    pong()\n\ndef pong():\n    ping()\n",
    )
    .unwrap();
    dir
}

fn command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(binary());
    cmd.current_dir(dir).env_remove("RUST_LOG").args(args);
    cmd
}

/// Run a module-graph command in `dir` and assert it exits successfully.
/// Returns stdout as a String.
fn run_success(dir: &Path, args: &[&str]) -> String {
    let out = command(dir, args)
        .output()
        .expect("failed to invoke module-graph binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        out.status.success(),
        "command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
        args,
        out.status,
        stdout,
        stderr
    );
    stdout
}

/// Run a module-graph command in `dir` and assert it exits with a non-zero status.
/// Returns (stdout, stderr) as Strings.
fn run_failure(dir: &Path, args: &[&str]) -> (String, String) {
    let out = command(dir, args)
        .output()
        .expect("failed to invoke module-graph binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        !out.status.success(),
        "command {:?} expected to fail but exited successfully\nstdout: {}\nstderr: {}",
        args,
        stdout,
        stderr
    );
    (stdout, stderr)
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

#[test]
fn test_summary_compact() {
    let dir = fixture();
    let out = run_success(dir.path(), &["summary", "shapes"]);
    assert!(out.starts_with("module shapes\n"), "got: {out}");
    assert!(out.contains("version 2.1\n"));
    assert!(out.contains("classes 3 exceptions 1 functions 2 methods 4 constants 1\n"));
}

#[test]
fn test_summary_json() {
    let dir = fixture();
    let out = run_success(dir.path(), &["--format", "json", "summary", "shapes"]);
    let value: serde_json::Value = serde_json::from_str(&out).expect("summary JSON");
    assert_eq!(value["summary"]["classes"], 3);
    assert_eq!(value["summary"]["source_available"], true);
    assert_eq!(value["info"]["version"], "2.1");
}

#[test]
fn test_symbols_filters() {
    let dir = fixture();
    let classes = run_success(dir.path(), &["symbols", "shapes", "--kind", "class"]);
    assert_eq!(
        classes,
        "class Circle(Shape)\nclass Shape\nclass ShapeError(ValueError)\n3 symbols\n"
    );

    let public = run_success(dir.path(), &["symbols", "shapes", "--kind", "function"]);
    assert!(!public.contains("_cache"));
    assert!(public.contains("function largest(shapes: list) -> Optional[Shape]\n"));
    assert!(public.contains("method Circle.scaled(self, factor: float) -> \"Circle\"\n"));

    let private = run_success(dir.path(), &["symbols", "shapes", "--kind", "function", "--private"]);
    assert!(private.contains("function _cache()\n"));
}

#[test]
fn test_symbols_unknown_kind_fails() {
    let dir = fixture();
    let (_, stderr) = run_failure(dir.path(), &["symbols", "shapes", "--kind", "module"]);
    assert!(stderr.contains("unknown symbol kind 'module'"), "got: {stderr}");
}

#[test]
fn test_connections_of_symbol() {
    let dir = fixture();
    let out = run_success(dir.path(), &["connections", "shapes", "Circle"]);
    assert!(
        out.starts_with("Circle (class)\n  uses:\n    Inherits From: Shape\n  used by:\n"),
        "got: {out}"
    );
    // `Circle(...)` and `-> "Circle"` inside Circle refer to itself and are not edges.
    assert!(!out.contains("Instantiates"));

    let shape = run_success(dir.path(), &["connections", "shapes", "Shape"]);
    assert!(shape.contains("    Instantiates: ShapeError\n"));
    assert!(shape.contains("    Inherited By: Circle\n"));
    assert!(shape.contains("    Type-Hinted By: largest\n"));
}

#[test]
fn test_connections_private_filter() {
    let dir = fixture();
    let out = run_success(dir.path(), &["connections", "shapes", "largest"]);
    assert!(!out.contains("_cache"));
    let out = run_success(dir.path(), &["connections", "shapes", "largest", "--private"]);
    assert!(out.contains("    Calls: _cache\n"));
}

#[test]
fn test_connections_unknown_symbol_suggests() {
    let dir = fixture();
    let (_, stderr) = run_failure(dir.path(), &["connections", "shapes", "Circel"]);
    assert!(stderr.contains("symbol 'Circel' not found"), "got: {stderr}");
}

#[test]
fn test_connections_all_json() {
    let dir = fixture();
    let out = run_success(dir.path(), &["--format", "json", "connections", "shapes"]);
    let value: serde_json::Value = serde_json::from_str(&out).expect("connections JSON");
    let symbols: Vec<&str> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["symbol"].as_str().unwrap())
        .collect();
    assert!(symbols.contains(&"Circle"));
    assert!(symbols.contains(&"Shape"));
    assert!(symbols.contains(&"ShapeError"));
}

#[test]
fn test_tree_and_exceptions() {
    let dir = fixture();
    let out = run_success(dir.path(), &["tree", "shapes"]);
    assert!(out.contains("Circle\n└── Shape\n"), "got: {out}");
    assert!(out.contains("ShapeError\n└── ValueError (external)\n"));

    let exceptions = run_success(dir.path(), &["tree", "shapes", "--exceptions"]);
    assert_eq!(exceptions, "ShapeError\n└── ValueError (external)\n");

    let (_, stderr) = run_failure(dir.path(), &["tree", "shapes", "--root", "largest"]);
    assert!(stderr.contains("not a class"), "got: {stderr}");
}

#[test]
fn test_cycles() {
    let dir = fixture();
    let out = run_success(dir.path(), &["cycles", "pkg.core"]);
    assert_eq!(out, "cycle ping -> pong -> ping\n1 cycles\n");
}

#[test]
fn test_imports() {
    let dir = fixture();
    let out = run_success(dir.path(), &["imports", "shapes"]);
    assert!(out.contains("4: import math\n"), "got: {out}");
    assert!(out.contains("5: from typing import Optional\n"));
    assert!(out.ends_with("2 imports\n"));
}

#[test]
fn test_export_to_default_file() {
    let dir = fixture();
    let out = run_success(dir.path(), &["export", "shapes"]);
    assert!(out.starts_with("Exported "), "got: {out}");
    let report = std::fs::read_to_string(dir.path().join("shapes_analysis.txt")).unwrap();
    assert!(report.starts_with("MODULE shapes\n"));
    assert!(report.contains("Circle -[inherits_from]-> Shape"));
}

#[test]
fn test_export_json_to_stdout_is_deterministic() {
    let dir = fixture();
    let args = ["export", "shapes", "--export-format", "json", "--output", "-"];
    let first = run_success(dir.path(), &args);
    let second = run_success(dir.path(), &args);
    assert_eq!(first, second);
    let value: serde_json::Value = serde_json::from_str(&first).expect("export JSON");
    assert_eq!(value["module"]["identity"], "shapes");
    assert!(!value["edges"].as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn test_search_path_flag() {
    let dir = fixture();
    let elsewhere = tempfile::tempdir().unwrap();
    let root = dir.path().to_str().unwrap();
    let out = run_success(elsewhere.path(), &["--path", root, "summary", "pkg.core"]);
    assert!(out.starts_with("module pkg.core\n"));
}

#[test]
fn test_missing_module_fails() {
    let dir = fixture();
    let (_, stderr) = run_failure(dir.path(), &["summary", "nosuch"]);
    assert!(stderr.contains("failed to load module 'nosuch'"), "got: {stderr}");
}

#[test]
fn test_syntax_error_fails_load() {
    let dir = fixture();
    std::fs::write(dir.path().join("broken.py"), "def oops(:\n    pass\n").unwrap();
    let (_, stderr) = run_failure(dir.path(), &["summary", "broken"]);
    assert!(stderr.contains("syntax error"), "got: {stderr}");
}

#[test]
fn test_manifest_without_source_degrades() {
    let dir = fixture();
    std::fs::write(
        dir.path().join("ext.json"),
        r#"{"module": "ext", "namespace": {
            "Base": {"type": "class"},
            "Child": {"type": "class", "bases": ["Base"]}
        }}"#,
    )
    .unwrap();
    let out = run_success(dir.path(), &["connections", "ext.json", "Child"]);
    assert!(out.contains("warning source unavailable"), "got: {out}");
    let tree = run_success(dir.path(), &["tree", "ext.json"]);
    assert_eq!(tree, "Child\n└── Base\n");
}

#[test]
fn test_config_file_applies_and_flags_override() {
    let dir = fixture();
    std::fs::write(
        dir.path().join("module-graph.toml"),
        "show_private = true\nexport_format = \"json\"\n",
    )
    .unwrap();
    let out = run_success(dir.path(), &["symbols", "shapes", "--kind", "function"]);
    assert!(out.contains("_cache"));

    run_success(dir.path(), &["export", "shapes"]);
    assert!(dir.path().join("shapes_analysis.json").exists());

    run_success(dir.path(), &["export", "shapes", "--export-format", "text"]);
    assert!(dir.path().join("shapes_analysis.txt").exists());
}

#[test]
fn test_verbose_logs_to_stderr() {
    let dir = fixture();
    let out = command(dir.path(), &["-v", "summary", "shapes"])
        .output()
        .expect("failed to invoke module-graph binary");
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("DEBUG") || stderr.contains("INFO"), "got: {stderr}");
}

// ---------------------------------------------------------------------------
// Packages
// ---------------------------------------------------------------------------

#[test]
fn test_submodules_of_package() {
    let dir = fixture();
    let out = run_success(dir.path(), &["submodules", "pkg"]);
    assert_eq!(out, "module pkg.core classes 0 functions 2 constants 0\n1 submodules\n");

    let json = run_success(dir.path(), &["--format", "json", "submodules", "pkg"]);
    let value: serde_json::Value = serde_json::from_str(&json).expect("submodules JSON");
    assert_eq!(value[0]["identity"], "pkg.core");
    assert_eq!(value[0]["functions"], 2);
}

#[test]
fn test_submodules_of_plain_module_fails() {
    let dir = fixture();
    let (_, stderr) = run_failure(dir.path(), &["submodules", "shapes"]);
    assert!(stderr.contains("'shapes' is a module, not a package"), "got: {stderr}");
}

#[test]
fn test_modules_on_search_path() {
    let dir = fixture();
    let out = run_success(dir.path(), &["modules"]);
    assert_eq!(out, "package pkg\nmodule shapes\n2 modules\n");
}

// ---------------------------------------------------------------------------
// Shell
// ---------------------------------------------------------------------------

#[test]
fn test_shell_session() {
    let dir = fixture();
    let mut child = command(dir.path(), &["shell", "shapes"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn module-graph shell");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"show Shape\nload pkg.core\ncycles\nquit\n")
        .unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("loaded shapes ("), "got: {stdout}");
    assert!(stdout.contains("    Inherited By: Circle\n"));
    assert!(stdout.contains("loaded pkg.core (2 symbols, 2 edges)\n"));
    assert!(stdout.contains("cycle ping -> pong -> ping\n"));
}
