use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{ConversionEngine, ConversionError};
use crate::common::upload::{WordFormat, is_pdf};

const SOURCE_STEM: &str = "source";
const STDERR_LIMIT: usize = 2048;

#[derive(Clone, Debug)]
pub struct SofficeEngine {
    binary: String,
    scratch_root: PathBuf,
}

impl SofficeEngine {
    pub fn new(binary: impl Into<String>, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            scratch_root: scratch_root.into(),
        }
    }
}

#[async_trait]
impl ConversionEngine for SofficeEngine {
    async fn convert(&self, source: &[u8], format: WordFormat) -> Result<Bytes, ConversionError> {
        tokio::fs::create_dir_all(&self.scratch_root).await?;
        let workdir = tempfile::Builder::new()
            .prefix("convert-")
            .tempdir_in(&self.scratch_root)?;

        let input = workdir.path().join(format!("{}.{}", SOURCE_STEM, format.extension()));
        let output = workdir.path().join(format!("{}.pdf", SOURCE_STEM));
        let profile = workdir.path().join("profile");
        tokio::fs::write(&input, source).await?;

        debug!(binary = %self.binary, input = %input.display(), "Invoking conversion engine");

        // kill_on_drop: a timed-out conversion must not leave the process behind.
        let result = Command::new(&self.binary)
            .arg("--headless")
            .arg("--norestore")
            .arg(format!("-env:UserInstallation=file://{}", profile.display()))
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(workdir.path())
            .arg(&input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ConversionError::Unavailable(format!("{}: {}", self.binary, e)))?;

        if !result.status.success() {
            let head = &result.stderr[..result.stderr.len().min(STDERR_LIMIT)];
            let stderr = String::from_utf8_lossy(head).into_owned();
            warn!(status = %result.status, "Conversion engine failed");
            return Err(ConversionError::Engine {
                status: result.status.to_string(),
                stderr,
            });
        }

        let pdf = match tokio::fs::read(&output).await {
            Ok(pdf) => pdf,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConversionError::MissingOutput);
            }
            Err(e) => return Err(e.into()),
        };

        if !is_pdf(&pdf) {
            return Err(ConversionError::InvalidOutput);
        }

        info!(size_bytes = pdf.len(), "Conversion engine produced PDF");
        Ok(Bytes::from(pdf))
    }
}
