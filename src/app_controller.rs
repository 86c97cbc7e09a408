use anyhow::{Context, Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::extraction::{Extraction, Extractor};
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::pipeline::{CancellationToken, DocumentPipeline, PipelineResult};
use crate::session::{self, SessionId};
use crate::transform::{LanguagePolicy, StyleStage, TranslationStage, TranslationStageConfig};
use crate::translation::{
    CachedTranslator, MockTranslator, ProviderTranslator, TranslationCache, Translator,
};

// @module: Application controller for document translation

/// Outcome of processing a directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Documents written with at least one degraded element
    pub degraded: usize,
}

/// Main application controller for document translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Use the stub translator instead of a provider
    offline: bool,
    cancellation: CancellationToken,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            config,
            offline: false,
            cancellation: CancellationToken::new(),
        })
    }

    /// Translate with the `[XX] text` stub instead of calling a provider
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token shared by every pipeline this controller builds
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Build the translation collaborator for the active configuration
    pub fn build_translator(&self) -> Result<Arc<dyn Translator>> {
        let translator: Arc<dyn Translator> = if self.offline {
            info!("Offline mode: using stub translations");
            Arc::new(MockTranslator::working())
        } else {
            let translator = ProviderTranslator::from_config(&self.config.translation)
                .context("Failed to create translation provider")?;
            info!(
                "Using {} with model {}",
                self.config.translation.provider.display_name(),
                self.config.translation.get_model()
            );
            Arc::new(translator)
        };

        if self.config.translation.common.enable_cache {
            Ok(Arc::new(CachedTranslator::new(translator, TranslationCache::new(true))))
        } else {
            Ok(translator)
        }
    }

    /// Assemble the pipeline: extractor, translation and style stages, store
    pub fn build_pipeline(&self) -> Result<DocumentPipeline> {
        let common = &self.config.translation.common;
        let target = language_utils::resolve_language(&self.config.target_language)
            .context("Invalid target language")?;

        let translation = TranslationStage::new(
            self.build_translator()?,
            TranslationStageConfig::new(&self.config.source_language, &self.config.target_language)
                .with_max_concurrent_requests(common.max_concurrent_requests)
                .with_table_cells(common.translate_table_cells),
        );

        let profile = self.config.style.build_profile()?;
        let style = StyleStage::new(profile, LanguagePolicy::for_language(&target.key()));

        let store = session::open_store(&self.config.storage)?;
        info!("Artifacts stored with the {} backend", store.name());

        Ok(DocumentPipeline::new(
            Extractor::new(self.config.roles.build_table()),
            Arc::new(translation),
            Arc::new(style),
            store,
        )
        .with_languages(&self.config.source_language, &self.config.target_language)
        .with_cancellation(self.cancellation.clone()))
    }

    /// Extract one document without translating it
    pub fn extract(&self, input_file: &Path) -> Result<Extraction> {
        Extractor::new(self.config.roles.build_table())
            .extract_path(input_file)
            .with_context(|| format!("Failed to extract {}", input_file.display()))
    }

    /// Translate one document into `output_dir`.
    ///
    /// Returns `None` when the output already exists and `force_overwrite`
    /// is not set.
    pub async fn run(
        &self,
        input_file: PathBuf,
        output_dir: PathBuf,
        force_overwrite: bool,
    ) -> Result<Option<PipelineResult>> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(&input_file, &output_dir, &multi_progress, force_overwrite)
            .await
    }

    async fn run_with_progress(
        &self,
        input_file: &Path,
        output_dir: &Path,
        multi_progress: &MultiProgress,
        force_overwrite: bool,
    ) -> Result<Option<PipelineResult>> {
        if !FileManager::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }
        FileManager::ensure_dir(output_dir)?;

        let output_path = FileManager::generate_output_path(
            input_file,
            output_dir,
            &self.config.target_language,
        );
        if output_path.exists() && !force_overwrite {
            warn!(
                "Skipping {}, translation already exists (use -f to force overwrite)",
                input_file.display()
            );
            return Ok(None);
        }

        let progress_bar = multi_progress.add(ProgressBar::new(100));
        progress_bar.set_style(Self::bar_style("{pos}%"));

        let pb = progress_bar.clone();
        let pipeline = self.build_pipeline()?.with_progress(Box::new(move |progress| {
            pb.set_position((progress.overall_progress * 100.0).round() as u64);
            pb.set_message(progress.status.clone());
        }));

        let result = pipeline.run(input_file, &output_path).await;
        progress_bar.finish_and_clear();

        let result = result?;
        if result.is_degraded() {
            warn!(
                "{} element(s) kept their source text in {}",
                result.degraded_elements(),
                output_path.display()
            );
        }
        info!(
            "Success: {} ({})",
            result.output_path.display(),
            Self::format_duration(result.duration)
        );

        Ok(Some(result))
    }

    /// Continue a stored session and write its output
    pub async fn resume(&self, session_id: &str, output_path: &Path) -> Result<PipelineResult> {
        let session: SessionId = session_id.parse()?;
        let pipeline = self.build_pipeline()?;
        let result = pipeline.resume(&session, output_path).await?;

        info!("Success: {}", result.output_path.display());
        Ok(result)
    }

    /// Translate every supported document under `input_dir`.
    ///
    /// Outputs go next to each input unless `output_dir` is given. A failing
    /// document is logged and counted; the others still run.
    pub async fn run_folder(
        &self,
        input_dir: PathBuf,
        output_dir: Option<PathBuf>,
        force_overwrite: bool,
    ) -> Result<FolderSummary> {
        let start_time = Instant::now();

        if !FileManager::dir_exists(&input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let documents = FileManager::find_documents(&input_dir, &self.config.target_language)?;
        if documents.is_empty() {
            return Err(anyhow!("No supported documents found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(documents.len() as u64));
        folder_pb.set_style(Self::bar_style("{pos}/{len} files"));
        folder_pb.set_message("Processing files");

        let mut summary = FolderSummary::default();

        for document in &documents {
            if self.cancellation.is_cancelled() {
                warn!("Cancelled, {} document(s) left unprocessed", documents.len() - summary.total());
                break;
            }

            let file_name = document
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            let target_dir = match (&output_dir, document.parent()) {
                (Some(dir), _) => dir.clone(),
                (None, Some(parent)) => parent.to_path_buf(),
                (None, None) => input_dir.clone(),
            };

            match self
                .run_with_progress(document, &target_dir, &multi_progress, force_overwrite)
                .await
            {
                Ok(Some(result)) => {
                    summary.processed += 1;
                    if result.is_degraded() {
                        summary.degraded += 1;
                    }
                }
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    summary.failed += 1;
                }
            }

            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");

        info!(
            "Folder processing completed in {}: {} processed, {} skipped, {} errors",
            Self::format_duration(start_time.elapsed()),
            summary.processed,
            summary.skipped,
            summary.failed
        );

        Ok(summary)
    }

    fn bar_style(counter: &str) -> ProgressStyle {
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {} {{msg}}",
            counter
        );
        ProgressStyle::default_bar()
            .template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░")
    }

    // Format duration in a human-readable format
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

impl FolderSummary {
    pub fn total(&self) -> usize {
        self.processed + self.skipped + self.failed
    }
}
