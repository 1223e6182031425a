use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use catalog::ParticipantRules;
use registration::{encoder::DEFAULT_MAX_ATTACHMENT_BYTES, AttachmentPolicy};
use serde::Deserialize;

pub const SETTINGS_FILE: &str = "registrar.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub submit_url: Option<String>,
    pub events_path: PathBuf,
    pub workshops_path: PathBuf,
    pub max_attachment_bytes: usize,
    pub allowed_mime_types: Vec<String>,
    pub team_minimums: ParticipantRules,
}

impl Default for Settings {
    fn default() -> Self {
        let policy = AttachmentPolicy::default();
        Self {
            submit_url: None,
            events_path: "data/events.json".into(),
            workshops_path: "data/workshops.json".into(),
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
            allowed_mime_types: policy.allowed_mime_types,
            team_minimums: ParticipantRules::default(),
        }
    }
}

impl Settings {
    pub fn attachment_policy(&self) -> AttachmentPolicy {
        AttachmentPolicy {
            max_bytes: self.max_attachment_bytes,
            allowed_mime_types: self.allowed_mime_types.clone(),
        }
    }

    pub fn participant_rules(&self) -> ParticipantRules {
        self.team_minimums.clone()
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    submit_url: Option<String>,
    events_path: Option<PathBuf>,
    workshops_path: Option<PathBuf>,
    max_attachment_bytes: Option<usize>,
    allowed_mime_types: Option<Vec<String>>,
    team_minimums: Option<ParticipantRules>,
}

pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid settings file '{}'", path.display()))?;
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.submit_url {
        settings.submit_url = Some(v);
    }
    if let Some(v) = file_cfg.events_path {
        settings.events_path = v;
    }
    if let Some(v) = file_cfg.workshops_path {
        settings.workshops_path = v;
    }
    if let Some(v) = file_cfg.max_attachment_bytes {
        settings.max_attachment_bytes = v;
    }
    if let Some(v) = file_cfg.allowed_mime_types {
        settings.allowed_mime_types = v;
    }
    if let Some(v) = file_cfg.team_minimums {
        settings.team_minimums = v;
    }
    Ok(())
}

/// Later keys win, so `APP__*` overrides the bare name.
fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let value = |keys: &[&str]| keys.iter().filter_map(|key| lookup(*key)).last();

    if let Some(v) = value(&["SUBMIT_URL", "APP__SUBMIT_URL"]) {
        settings.submit_url = Some(v);
    }
    if let Some(v) = value(&["EVENTS_PATH", "APP__EVENTS_PATH"]) {
        settings.events_path = v.into();
    }
    if let Some(v) = value(&["WORKSHOPS_PATH", "APP__WORKSHOPS_PATH"]) {
        settings.workshops_path = v.into();
    }
    if let Some(v) = value(&["APP__MAX_ATTACHMENT_BYTES"]) {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.max_attachment_bytes = parsed;
        }
    }

    if settings
        .submit_url
        .as_deref()
        .is_some_and(|url| url.trim().is_empty())
    {
        settings.submit_url = None;
    }
}
