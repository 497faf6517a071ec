//! Trace artifacts on disk.
//!
//! An artifact is a `#`-prefixed header block, a blank line, then the raw
//! capture text exactly as the dataplane printed it:
//!
//! ```text
//! # ========================================
//! #  VPP TRACE DATA
//! # ========================================
//! #      Time: 2024-03-01T10:00:00Z
//! #      Host: probe-host
//! # ----------------------------------------
//! #  Instance: pod/vpp-1: default
//! #   Version: 23.10
//! #   Packets: 2
//! # ----------------------------------------
//!
//! <raw capture text>
//! ```

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::error::PersistError;
use crate::providers::InstanceInfo;
use crate::trace::TraceResult;

const RULE: &str = "# ========================================";
const SEPARATOR: &str = "# ----------------------------------------";

pub struct TraceArtifact<'a> {
    pub instance: &'a InstanceInfo,
    pub captured_at: SystemTime,
    pub result: &'a TraceResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceFileHeader {
    pub time: String,
    pub host: String,
    pub instance: String,
    pub version: String,
    pub packets: usize,
}

#[derive(Debug, Clone)]
pub struct SavedTrace {
    pub header: TraceFileHeader,
    pub result: TraceResult,
}

/// Instance id made safe for filenames: whitespace to `-`, `:` to `_`,
/// `/` to `~`.
pub fn sanitize_instance_id(id: &str) -> String {
    id.chars()
        .map(|ch| match ch {
            ch if ch.is_whitespace() => '-',
            ':' => '_',
            '/' | '\\' => '~',
            ch => ch,
        })
        .collect()
}

/// `vpptrace_<sanitized-id>_<YYYYMMDDThhmmss>.txt`, lowercased.
pub fn result_filename(instance_id: &str, captured_at: SystemTime) -> String {
    let filename = format!(
        "vpptrace_{}_{}.txt",
        sanitize_instance_id(instance_id),
        compact_timestamp(captured_at)
    );
    filename.to_lowercase()
}

fn compact_timestamp(time: SystemTime) -> String {
    humantime::format_rfc3339_seconds(time)
        .to_string()
        .chars()
        .filter(|ch| !matches!(ch, '-' | ':' | 'Z'))
        .collect()
}

pub fn format_header(artifact: &TraceArtifact<'_>, host: &str) -> String {
    let lines = [
        RULE.to_string(),
        "#  VPP TRACE DATA".to_string(),
        RULE.to_string(),
        format!(
            "#      Time: {}",
            humantime::format_rfc3339_seconds(artifact.captured_at)
        ),
        format!("#      Host: {host}"),
        SEPARATOR.to_string(),
        format!("#  Instance: {}", artifact.instance.id),
        format!("#   Version: {}", artifact.instance.version),
        format!("#   Packets: {}", artifact.result.packets().len()),
        SEPARATOR.to_string(),
        String::new(),
    ];
    let mut header = lines.join("\n");
    header.push('\n');
    header
}

/// Writes the artifact under `dir` (created if missing) and returns its path.
pub async fn save_trace_data(
    dir: &Path,
    artifact: &TraceArtifact<'_>,
) -> Result<PathBuf, PersistError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| PersistError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

    let path = dir.join(result_filename(&artifact.instance.id, artifact.captured_at));
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .await
        .map_err(|source| PersistError::Open {
            path: path.clone(),
            source,
        })?;

    let host = system_utils::host::hostname();
    let mut contents = format_header(artifact, &host);
    contents.push_str(artifact.result.raw());
    // tokio buffers writes; errors surface only on flush.
    let written = match file.write_all(contents.as_bytes()).await {
        Ok(()) => file.flush().await,
        Err(err) => Err(err),
    };

    // The handle is released on every path; sync problems are only logged.
    if let Err(err) = file.sync_all().await {
        warn!(path = %path.display(), error = %err, "closing file failed");
    }
    drop(file);

    written.map_err(|source| PersistError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Reads an artifact back, re-parsing its raw section.
pub async fn read_trace_file(path: &Path) -> Result<SavedTrace, PersistError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PersistError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_trace_file(&contents).map_err(|reason| PersistError::Format {
        path: path.to_path_buf(),
        reason,
    })
}

fn parse_trace_file(contents: &str) -> Result<SavedTrace, String> {
    let mut header = TraceFileHeader::default();
    let mut offset = 0;
    let mut terminated = false;
    for line in contents.split_inclusive('\n') {
        offset += line.len();
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.is_empty() {
            terminated = true;
            break;
        }
        let Some(field) = trimmed.strip_prefix('#') else {
            return Err(format!("unexpected header line {trimmed:?}"));
        };
        let Some((key, value)) = field.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "Time" => header.time = value,
            "Host" => header.host = value,
            "Instance" => header.instance = value,
            "Version" => header.version = value,
            "Packets" => {
                header.packets = value
                    .parse()
                    .map_err(|_| format!("invalid packet count {value:?}"))?;
            }
            _ => {}
        }
    }
    if !terminated {
        return Err("missing blank line after header".to_string());
    }
    Ok(SavedTrace {
        header,
        result: TraceResult::parse(&contents[offset..]),
    })
}
