//! Shared workspace fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use ripple::Ripple;
use tempfile::TempDir;

/// Create a temporary workspace with the given files.
/// Returns the temp directory (must be kept alive) and the Ripple instance.
pub fn workspace_with_files(files: &[(&str, &str)]) -> (TempDir, Ripple) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    write_files(dir.path(), files);
    let ripple = Ripple::new(dir.path()).expect("failed to create Ripple");
    (dir, ripple)
}

/// Write (or overwrite) files under `root`.
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full_path = root.join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("failed to write file");
    }
}

/// Call chain with known call lines:
/// main→handler (line 2), handler→worker (line 5), worker→helper (line 8).
pub const CHAIN: &str = "def main():
    handler()

def handler():
    worker()

def worker():
    helper()

def helper():
    pass
";

/// models.py of a small two-module project.
pub const MODELS: &str = r#"class Base:
    kind = "base"

    def __init__(self, name):
        self.name = name

    def describe(self):
        return self.name


class User(Base):
    def greet(self):
        return format_name(self.name)


def format_name(name):
    return name.title()
"#;

/// service.py of a small two-module project. `LIMIT` is defined on line 4
/// and read by `handle` on line 15.
pub const SERVICE: &str = r#"import os
from models import User, format_name

LIMIT = 10


class Admin(User):
    @staticmethod
    def create():
        return Admin("root")


@cache
def handle(name):
    if len(name) > LIMIT:
        raise ValueError(name)
    try:
        user = User(name)
        return user.greet()
    except KeyError:
        return format_name(name)


def main():
    handle("x")
"#;

/// The two-module project.
pub fn project() -> (TempDir, Ripple) {
    workspace_with_files(&[("models.py", MODELS), ("service.py", SERVICE)])
}
