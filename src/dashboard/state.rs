//! Dashboard view state management

use std::path::PathBuf;
use strsim::normalized_levenshtein;

use crate::app::PipelineOutput;
use crate::config::{AppConfig, CredentialOverrides};
use crate::document::DocumentImage;
use crate::vision::OcrToken;

/// Current view in the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashboardView {
    #[default]
    Document,
    Results,
    Settings,
}

impl DashboardView {
    pub const ALL: [DashboardView; 3] = [
        DashboardView::Document,
        DashboardView::Results,
        DashboardView::Settings,
    ];

    /// Get the display name for this view
    pub fn name(&self) -> &'static str {
        match self {
            DashboardView::Document => "Document",
            DashboardView::Results => "Results",
            DashboardView::Settings => "Settings",
        }
    }

    /// Get the icon character for this view
    pub fn icon(&self) -> &'static str {
        match self {
            DashboardView::Document => "D",
            DashboardView::Results => "R",
            DashboardView::Settings => "S",
        }
    }
}

/// Overall dashboard state
#[derive(Debug, Default)]
pub struct DashboardState {
    /// Current active view
    pub current_view: DashboardView,
    pub document: DocumentViewState,
    pub results: ResultsViewState,
    pub settings: SettingsViewState,
}

/// Document view state
#[derive(Default)]
pub struct DocumentViewState {
    /// Path typed into the open box
    pub path_input: String,
    /// Texture of the displayed image
    pub texture: Option<egui::TextureHandle>,
    /// Image revision the texture was built from
    pub texture_revision: Option<u64>,
    /// Paint field names next to the outlines
    pub show_labels: bool,
}

impl std::fmt::Debug for DocumentViewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentViewState")
            .field("path_input", &self.path_input)
            .field("texture_revision", &self.texture_revision)
            .field("show_labels", &self.show_labels)
            .finish()
    }
}

/// Results view state
#[derive(Debug, Default)]
pub struct ResultsViewState {
    /// Search query for the OCR token list
    pub token_query: String,
    /// Show the OCR token list
    pub show_tokens: bool,
}

/// Settings view state
#[derive(Debug, Default)]
pub struct SettingsViewState {
    /// Model API key for this session
    pub api_key: String,
    /// OCR credentials file for this session
    pub credentials_path: String,
    /// Vision API key for this session
    pub vision_api_key: String,
    /// Reveal key fields
    pub show_secrets: bool,
    /// Settings edited since the last save
    pub has_unsaved_changes: bool,
}

impl SettingsViewState {
    /// Prefill the session fields from startup overrides
    pub fn from_overrides(overrides: &CredentialOverrides) -> Self {
        Self {
            api_key: overrides.api_key.clone().unwrap_or_default(),
            credentials_path: overrides
                .credentials_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            vision_api_key: overrides.vision_api_key.clone().unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Session credentials; blank fields leave the file value alone
    pub fn overrides(&self) -> CredentialOverrides {
        let non_blank = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        CredentialOverrides {
            api_key: non_blank(&self.api_key),
            credentials_path: non_blank(&self.credentials_path).map(PathBuf::from),
            vision_api_key: non_blank(&self.vision_api_key),
        }
    }
}

/// Work running on the background thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Load,
    Extract,
}

impl JobKind {
    pub fn label(&self) -> &'static str {
        match self {
            JobKind::Load => "Loading document...",
            JobKind::Extract => "Extracting...",
        }
    }
}

/// Result sent back from the background thread
#[derive(Debug)]
pub enum JobResult {
    Loaded {
        path: PathBuf,
        result: Result<DocumentImage, String>,
    },
    Extracted(Result<PipelineOutput, String>),
}

/// Requests raised by views, handled by the app after rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Open(PathBuf),
    RotateClockwise,
    RotateCounterClockwise,
    Extract,
    SaveImage(PathBuf),
    SaveConfig,
    ResetConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

/// Data shared by every view
#[derive(Debug)]
pub struct Session {
    /// Configuration as saved on disk
    pub config: AppConfig,
    pub config_path: PathBuf,
    pub source_path: Option<PathBuf>,
    pub document: Option<DocumentImage>,
    pub output: Option<PipelineOutput>,
    /// Work in flight; actions are disabled while set
    pub busy: Option<JobKind>,
    pub status: Option<StatusMessage>,
    /// Bumped whenever the displayed image changes
    pub image_revision: u64,
    pub pending_action: Option<UserAction>,
}

impl Session {
    pub fn new(config: AppConfig, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
            source_path: None,
            document: None,
            output: None,
            busy: None,
            status: None,
            image_revision: 0,
            pending_action: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_some()
    }

    pub fn request(&mut self, action: UserAction) {
        if !self.is_busy() {
            self.pending_action = Some(action);
        }
    }

    pub fn set_status(&mut self, level: StatusLevel, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            level,
            text: text.into(),
        });
    }

    /// Rotate the loaded page; previous results no longer line up and are dropped
    pub fn rotate(&mut self, quarter_turns: i32) {
        if let Some(document) = &self.document {
            self.document = Some(document.rotated(quarter_turns));
            self.output = None;
            self.image_revision += 1;
        }
    }

    /// Apply a finished job. Failures keep the previous document and results.
    pub fn finish_job(&mut self, result: JobResult) {
        self.busy = None;
        match result {
            JobResult::Loaded {
                path,
                result: Ok(document),
            } => {
                let (width, height) = document.dimensions();
                self.set_status(
                    StatusLevel::Info,
                    format!(
                        "Loaded {} ({}, {}x{})",
                        path.display(),
                        document.source_format().name(),
                        width,
                        height
                    ),
                );
                self.source_path = Some(path);
                self.document = Some(document);
                self.output = None;
                self.image_revision += 1;
            }
            JobResult::Loaded {
                path,
                result: Err(e),
            } => {
                self.set_status(StatusLevel::Error, format!("Could not open {}: {}", path.display(), e));
            }
            JobResult::Extracted(Ok(output)) => {
                self.set_status(
                    StatusLevel::Info,
                    format!(
                        "{}: grounded {} of {} fields",
                        output.classification.document_type.display_name(),
                        output.annotations.len(),
                        output.data.fields().len()
                    ),
                );
                self.output = Some(output);
                self.image_revision += 1;
            }
            JobResult::Extracted(Err(e)) => {
                self.set_status(StatusLevel::Error, e);
            }
        }
    }
}

/// Tokens matching a search query, by substring or close spelling
pub fn filter_tokens<'a>(tokens: &'a [OcrToken], query: &str) -> Vec<&'a OcrToken> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return tokens.iter().collect();
    }
    tokens
        .iter()
        .filter(|token| {
            let text = token.text.to_lowercase();
            text.contains(&query) || normalized_levenshtein(&text, &query) >= 0.75
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SourceFormat;
    use crate::vision::Polygon;
    use image::{DynamicImage, RgbaImage};

    fn document(width: u32, height: u32) -> DocumentImage {
        DocumentImage::new(DynamicImage::ImageRgba8(RgbaImage::new(width, height)), SourceFormat::Png)
    }

    fn session() -> Session {
        Session::new(AppConfig::default(), PathBuf::from("/tmp/config.toml"))
    }

    #[test]
    fn test_settings_overrides_skip_blank_fields() {
        let state = SettingsViewState {
            api_key: "  key ".to_string(),
            credentials_path: " ".to_string(),
            ..Default::default()
        };

        let overrides = state.overrides();

        assert_eq!(overrides.api_key.as_deref(), Some("key"));
        assert!(overrides.credentials_path.is_none());
        assert!(overrides.vision_api_key.is_none());
    }

    #[test]
    fn test_settings_prefill_from_overrides() {
        let overrides = CredentialOverrides {
            api_key: Some("abc".to_string()),
            credentials_path: Some(PathBuf::from("/sa.json")),
            vision_api_key: None,
        };
        let state = SettingsViewState::from_overrides(&overrides);
        assert_eq!(state.overrides(), overrides);
    }

    #[test]
    fn test_failed_load_keeps_previous_document() {
        let mut session = session();
        session.finish_job(JobResult::Loaded {
            path: PathBuf::from("a.png"),
            result: Ok(document(4, 2)),
        });
        session.busy = Some(JobKind::Load);

        session.finish_job(JobResult::Loaded {
            path: PathBuf::from("b.pdf"),
            result: Err("First PDF page has no raster image".to_string()),
        });

        assert!(!session.is_busy());
        assert_eq!(session.source_path, Some(PathBuf::from("a.png")));
        assert_eq!(session.document.as_ref().unwrap().dimensions(), (4, 2));
        assert_eq!(session.status.as_ref().unwrap().level, StatusLevel::Error);
    }

    #[test]
    fn test_load_status_names_format_and_size() {
        let mut session = session();
        session.finish_job(JobResult::Loaded {
            path: PathBuf::from("a.png"),
            result: Ok(document(4, 2)),
        });

        let status = session.status.unwrap();
        assert_eq!(status.level, StatusLevel::Info);
        assert_eq!(status.text, "Loaded a.png (PNG, 4x2)");
    }

    #[test]
    fn test_rotation_drops_results_and_bumps_revision() {
        let mut session = session();
        session.document = Some(document(4, 2));
        let revision = session.image_revision;

        session.rotate(1);

        assert_eq!(session.document.as_ref().unwrap().dimensions(), (2, 4));
        assert!(session.output.is_none());
        assert_eq!(session.image_revision, revision + 1);
    }

    #[test]
    fn test_actions_ignored_while_busy() {
        let mut session = session();
        session.busy = Some(JobKind::Extract);
        session.request(UserAction::Extract);
        assert!(session.pending_action.is_none());
    }

    #[test]
    fn test_filter_tokens() {
        let tokens = vec![
            OcrToken::new("STARBUCKS", Polygon::default()),
            OcrToken::new("TOTAL", Polygon::default()),
            OcrToken::new("42.50", Polygon::default()),
        ];

        assert_eq!(filter_tokens(&tokens, "").len(), 3);
        assert_eq!(filter_tokens(&tokens, "star")[0].text, "STARBUCKS");
        assert_eq!(filter_tokens(&tokens, "totl")[0].text, "TOTAL");
        assert!(filter_tokens(&tokens, "invoice").is_empty());
    }
}
