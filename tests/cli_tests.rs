/// Tests for the `file-sorter` binary
///
/// These run the compiled executable and check what a user sees: the exit
/// status and the text on stdout.
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        TestFixture { temp_dir }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn create_text_file(&self, name: &str, content: &str) {
        fs::write(self.path().join(name), content).expect("Failed to create file");
    }
}

/// Runs the binary with `args`, colors off and a fixed worker count.
fn file_sorter(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_file-sorter"))
        .args(args)
        .env("NO_COLOR", "1")
        .env("FILE_SORTER_JOBS", "2")
        .env_remove("FILE_SORTER_LOG")
        .output()
        .expect("Failed to run file-sorter")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

// ============================================================================
// Test Suite 1: Argument Errors
// ============================================================================

#[test]
fn test_no_arguments_prints_usage_and_fails() {
    let output = file_sorter(&[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("Usage: file-sorter <path_to_folder>"));
}

#[test]
fn test_two_folders_prints_usage_and_fails() {
    let fixture = TestFixture::new();
    let dir = path_arg(fixture.path());

    let output = file_sorter(&[dir, dir]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("Usage: file-sorter <path_to_folder>"));
}

#[test]
fn test_missing_folder_fails() {
    let fixture = TestFixture::new();
    let missing = fixture.path().join("not-here");

    let output = file_sorter(&[path_arg(&missing)]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("The provided path is not a valid directory."));
}

#[test]
fn test_file_instead_of_folder_fails() {
    let fixture = TestFixture::new();
    fixture.create_text_file("plain.txt", "x");

    let output = file_sorter(&[path_arg(&fixture.path().join("plain.txt"))]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("The provided path is not a valid directory."));
    assert!(fixture.path().join("plain.txt").is_file());
}

#[test]
fn test_help_succeeds() {
    let output = file_sorter(&["--help"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("--dry-run"));
}

// ============================================================================
// Test Suite 2: Successful Runs
// ============================================================================

#[test]
fn test_sorting_prints_report_and_succeeds() {
    let fixture = TestFixture::new();
    fixture.create_text_file("Фото.jpg", "jpeg");
    fixture.create_text_file("readme.xyz", "?");

    let output = file_sorter(&[path_arg(fixture.path())]);
    let text = stdout(&output);

    assert_eq!(output.status.code(), Some(0));
    assert!(text.contains("Images:\n - Foto.jpg\n"));
    assert!(text.contains("Unknown:\n - readme.xyz\n"));
    assert!(text.contains("Known extensions: {'jpg'}"));
    assert!(text.contains("Unknown extensions: {'xyz'}"));
    assert!(fixture.path().join("images/Foto.jpg").is_file());
}

#[test]
fn test_corrupt_archive_warns_on_stdout() {
    let fixture = TestFixture::new();
    fixture.create_text_file("broken.zip", "this is not a zip file");

    let output = file_sorter(&[path_arg(fixture.path())]);
    let text = stdout(&output);

    assert_eq!(output.status.code(), Some(0));
    let expected = format!(
        "Warning: Unable to unpack archive {}",
        fixture.path().join("archives").join("broken.zip").display()
    );
    assert!(text.contains(&expected), "missing warning in:\n{text}");
    assert!(text.contains("Archives:\n - broken.zip\n"));
    assert!(fixture.path().join("archives/broken.zip").is_file());
}

#[test]
fn test_json_output_is_the_only_stdout() {
    let fixture = TestFixture::new();
    fixture.create_text_file("song.mp3", "la");
    fixture.create_text_file("broken.zip", "not a zip");

    let output = file_sorter(&["--json", path_arg(fixture.path())]);

    assert_eq!(output.status.code(), Some(0));
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(json["categories"][0]["category"], "music");
    assert_eq!(json["failures"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_dry_run_leaves_folder_untouched() {
    let fixture = TestFixture::new();
    fixture.create_text_file("notes.txt", "notes");

    let output = file_sorter(&["--dry-run", path_arg(fixture.path())]);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("[DRY RUN]"));
    assert!(fixture.path().join("notes.txt").is_file());
    assert!(!fixture.path().join("documents").exists());
}
