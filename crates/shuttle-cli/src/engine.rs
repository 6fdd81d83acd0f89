//! CommandEngine - manifest の 1 行を 1 item として shell で実行する engine
//!
//! # manifest の書式
//! - 空行と `#` で始まる行は無視
//! - `@group ` で始まる行はその load group に属する
//! - それ以外は `sh -c` に渡すコマンド
//!
//! node id は `<manifest のファイル名>::<行番号>`。

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;

use shuttle_core::config::WorkerConfig;
use shuttle_core::domain::{
    Collection, EngineError, EngineReport, ItemIndex, Location, ReportOutcome, WorkItem,
    exit_status,
};
use shuttle_core::ports::{EngineObserver, NextItemHint, TestEngine};

/// One manifest line.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub line: u32,
    pub command: String,
    pub group: Option<String>,
}

pub fn parse_manifest(text: &str) -> Vec<ManifestEntry> {
    text.lines()
        .enumerate()
        .filter_map(|(i, raw)| {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }
            let line = i as u32 + 1;
            if let Some(rest) = trimmed.strip_prefix('@') {
                let (group, command) = rest.split_once(char::is_whitespace)?;
                return Some(ManifestEntry {
                    line,
                    command: command.trim().to_string(),
                    group: Some(group.to_string()),
                });
            }
            Some(ManifestEntry {
                line,
                command: trimmed.to_string(),
                group: None,
            })
        })
        .collect()
}

pub struct CommandEngine {
    manifest: PathBuf,
    commands: Mutex<Vec<String>>,
    env: Mutex<Vec<(&'static str, String)>>,
    failed: AtomicUsize,
}

impl CommandEngine {
    pub fn new(manifest: impl Into<PathBuf>) -> Self {
        Self {
            manifest: manifest.into(),
            commands: Mutex::new(Vec::new()),
            env: Mutex::new(Vec::new()),
            failed: AtomicUsize::new(0),
        }
    }

    fn manifest_name(&self) -> String {
        self.manifest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.manifest.display().to_string())
    }

    fn command(&self, index: ItemIndex) -> Result<String, EngineError> {
        let commands = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        commands
            .get(index.get())
            .cloned()
            .ok_or(EngineError::UnknownItem {
                index,
                count: commands.len(),
            })
    }
}

fn to_item(manifest: &str, entry: &ManifestEntry) -> WorkItem {
    let nodeid = format!("{manifest}::{}", entry.line);
    let item = WorkItem::new(
        nodeid.clone(),
        Location::new(manifest, Some(entry.line), entry.command.clone()),
        vec!["session".to_string(), manifest.to_string(), nodeid],
    );
    match &entry.group {
        Some(group) => item.with_group(group.clone()),
        None => item,
    }
}

#[async_trait]
impl TestEngine for CommandEngine {
    async fn start_session(&self, config: &WorkerConfig) -> Result<(), EngineError> {
        *self.env.lock().unwrap_or_else(PoisonError::into_inner) = config.env_vars();
        Ok(())
    }

    async fn collect(&self, observer: &dyn EngineObserver) -> Result<Collection, EngineError> {
        let text = tokio::fs::read_to_string(&self.manifest).await?;
        let entries = parse_manifest(&text);
        let name = self.manifest_name();

        let items: Vec<WorkItem> = entries.iter().map(|e| to_item(&name, e)).collect();
        for item in &items {
            let report = EngineReport::new(item.nodeid.clone(), ReportOutcome::Passed);
            observer.collect_report(&report)?;
        }
        *self.commands.lock().unwrap_or_else(PoisonError::into_inner) =
            entries.into_iter().map(|e| e.command).collect();

        let topdir = self
            .manifest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        tracing::info!(manifest = %self.manifest.display(), items = items.len(), "collected");
        Ok(Collection {
            topdir: topdir.display().to_string(),
            items,
        })
    }

    async fn run_item(
        &self,
        index: ItemIndex,
        item: &WorkItem,
        next: &dyn NextItemHint,
        observer: &dyn EngineObserver,
    ) -> Result<(), EngineError> {
        let command = self.command(index)?;
        let env = self.env.lock().unwrap_or_else(PoisonError::into_inner).clone();
        observer.log_start(&item.nodeid, &item.location)?;

        tracing::debug!(item_index = %index, command, "spawning");
        let start = Instant::now();
        let output = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        let duration = start.elapsed().as_secs_f64();

        let outcome = if output.status.success() {
            ReportOutcome::Passed
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
            ReportOutcome::Failed
        };
        let report = EngineReport::new(item.nodeid.clone(), outcome)
            .with_field("when", json!("call"))
            .with_field("duration", json!(duration))
            .with_field("exit_code", json!(output.status.code()))
            .with_field("stdout", json!(String::from_utf8_lossy(&output.stdout)))
            .with_field("stderr", json!(String::from_utf8_lossy(&output.stderr)));
        observer.test_report(&report)?;

        // nothing is kept between commands, the hint is only logged
        let next_chain = next.chain().await;
        tracing::debug!(item_index = %index, last = next_chain.is_empty(), "teardown");

        observer.log_finish(&item.nodeid, &item.location)?;
        Ok(())
    }

    async fn finish_session(&self) -> Result<i32, EngineError> {
        Ok(match self.failed.load(Ordering::Relaxed) {
            0 => exit_status::OK,
            _ => exit_status::TESTS_FAILED,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn manifest_skips_blank_and_comment_lines() {
        let text = "# smoke\ntrue\n\n  false  \n@db psql -c 'select 1'\n";
        let entries = parse_manifest(text);
        assert_eq!(
            entries,
            vec![
                ManifestEntry {
                    line: 2,
                    command: "true".into(),
                    group: None,
                },
                ManifestEntry {
                    line: 4,
                    command: "false".into(),
                    group: None,
                },
                ManifestEntry {
                    line: 5,
                    command: "psql -c 'select 1'".into(),
                    group: Some("db".into()),
                },
            ]
        );
    }

    #[rstest]
    #[case("@lonely")]
    #[case("#@db true")]
    fn malformed_group_lines_are_dropped(#[case] line: &str) {
        assert!(parse_manifest(line).is_empty());
    }

    #[test]
    fn items_carry_manifest_location_and_group() {
        let entry = ManifestEntry {
            line: 7,
            command: "make check".into(),
            group: Some("slow".into()),
        };
        let item = to_item("suite.txt", &entry);
        assert_eq!(item.nodeid, "suite.txt::7");
        assert_eq!(item.location.line, Some(7));
        assert_eq!(item.group.as_deref(), Some("slow"));
        assert_eq!(item.chain, vec!["session", "suite.txt", "suite.txt::7"]);
    }

    #[test]
    fn unknown_index_before_collection() {
        let engine = CommandEngine::new("missing.txt");
        let err = engine.command(ItemIndex::new(0)).unwrap_err();
        assert!(matches!(err, EngineError::UnknownItem { count: 0, .. }));
    }
}
