//! Hugo static-site regeneration

use apiscout_ports::{SiteError, SiteGenerator};
use async_trait::async_trait;
use log::{info, warn};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::process::Command;
use tokio::sync::Mutex;

const DEFAULT_COMMAND: &str = "hugo";

/// Runs `sh -c hugo` in the site root after clearing `public/`
///
/// Runs are serialized; a retry finishing while the event loop regenerates
/// waits for the running build.
pub struct HugoSiteGenerator {
    dir: PathBuf,
    command: String,
    running: Mutex<()>,
}

impl HugoSiteGenerator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            command: DEFAULT_COMMAND.to_string(),
            running: Mutex::new(()),
        }
    }

    /// Replace the shell command run in the site root
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    async fn clear_public(&self) {
        let public = self.dir.join("public");
        match tokio::fs::remove_dir_all(&public).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Could not clear {}: {}", public.display(), e),
        }
    }
}

#[async_trait]
impl SiteGenerator for HugoSiteGenerator {
    async fn regenerate(&self) -> Result<String, SiteError> {
        let _running = self.running.lock().await;
        info!("Regenerating Hugo content in {}", self.dir.display());
        self.clear_public().await;

        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .current_dir(&self.dir)
            .output()
            .await
            .map_err(|e| SiteError::Spawn(e.to_string()))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(SiteError::Failed {
                status: output.status.to_string(),
                output: combined,
            });
        }
        Ok(combined)
    }

    fn name(&self) -> &str {
        "Hugo"
    }
}
