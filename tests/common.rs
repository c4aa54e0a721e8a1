use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

// Some helpers are only exercised by the feature-gated e2e tests; they stay
// in the module for discoverability.
#[allow(dead_code)]
pub struct TestContext {
    pub project_dir: TempDir,
    pub bin_path: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    /// Temp project directory containing a minimal `package.json` marker.
    pub fn new() -> Self {
        let ctx = Self::bare();
        fs::write(
            ctx.project_dir.path().join("package.json"),
            "{\n  \"name\": \"fixture\",\n  \"private\": true\n}\n",
        )
        .expect("Failed to write package.json");
        ctx
    }

    /// Temp directory with no marker file at all.
    pub fn bare() -> Self {
        Self {
            project_dir: TempDir::new().expect("Failed to create temp dir"),
            bin_path: PathBuf::from(env!("CARGO_BIN_EXE_pinyarn")),
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(&self.bin_path);
        cmd.current_dir(self.project_dir.path());
        // keep host credentials out of the pool so runs are reproducible
        cmd.env_remove("GITHUB_TOKEN");
        cmd
    }

    pub fn write(&self, name: &str, content: &str) {
        fs::write(self.project_dir.path().join(name), content)
            .unwrap_or_else(|e| panic!("Failed to write {}: {}", name, e));
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.project_dir.path().join(name))
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", name, e))
    }
}

#[allow(dead_code)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status,
        }
    }
}

#[allow(dead_code)]
impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        if !self.status.success() {
            panic!(
                "Command failed with status {:?}\nstdout: {}\nstderr: {}",
                self.status.code(),
                self.stdout,
                self.stderr
            );
        }
        self
    }

    pub fn assert_exit_code(&self, code: i32) -> &Self {
        assert_eq!(
            self.status.code(),
            Some(code),
            "Unexpected exit code\nstdout: {}\nstderr: {}",
            self.stdout,
            self.stderr
        );
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Stdout did not contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Stderr did not contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }
}
