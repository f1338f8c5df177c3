use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use storybook_contracts::runs::summary::{write_summary, AudioSummary};

use crate::pipeline::StoryReport;

pub const SUMMARY_FILE_NAME: &str = "summary.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutputs {
    pub dir: PathBuf,
    pub summary: PathBuf,
    pub english_audio: Option<PathBuf>,
    pub translated_audio: Option<PathBuf>,
}

/// Writes `<out_dir>/<request_id>/` with the request's audio files and
/// `summary.json`. Failed requests still get a summary.
pub fn write_request_outputs(report: &StoryReport, out_dir: &Path) -> Result<RequestOutputs> {
    let dir = out_dir.join(&report.request_id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed creating {}", dir.display()))?;

    let mut audio = Vec::new();
    let mut english_audio = None;
    let mut translated_audio = None;
    if let Some(artifact) = report.english_audio.as_ref() {
        let path = dir.join(artifact.file_name(true));
        artifact.write_to(&path)?;
        audio.push(audio_summary(&artifact.language_code, &path, artifact.bytes.len()));
        english_audio = Some(path);
    }
    if let Some(artifact) = report.translated_audio.as_ref() {
        let path = dir.join(artifact.file_name(false));
        artifact.write_to(&path)?;
        audio.push(audio_summary(&artifact.language_code, &path, artifact.bytes.len()));
        translated_audio = Some(path);
    }

    let summary_path = dir.join(SUMMARY_FILE_NAME);
    let mut extra = Map::new();
    extra.insert(
        "states".to_string(),
        json!(report
            .states
            .iter()
            .map(|state| state.as_str())
            .collect::<Vec<_>>()),
    );
    extra.insert(
        "stage_errors".to_string(),
        Value::Array(
            report
                .errors
                .iter()
                .map(|err| json!({"stage": err.stage().as_str(), "detail": err.detail()}))
                .collect(),
        ),
    );
    write_summary(&summary_path, &report.summary(audio), Some(&extra))
        .with_context(|| format!("failed writing {}", summary_path.display()))?;
    tracing::debug!(dir = %dir.display(), "request outputs written");

    Ok(RequestOutputs {
        dir,
        summary: summary_path,
        english_audio,
        translated_audio,
    })
}

fn audio_summary(language_code: &str, path: &Path, bytes: usize) -> AudioSummary {
    AudioSummary {
        language_code: language_code.to_string(),
        path: path.display().to_string(),
        bytes: bytes as u64,
    }
}
