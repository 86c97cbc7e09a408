/*!
 * Translation stage.
 *
 * Sends every translatable element through a `Translator`, choosing the
 * register from the element kind. A failed element keeps its source text
 * and is reported as a degradation; it never fails the stage.
 *
 * Translated text is carried by a single run formatted like the element's
 * primary run. Per-run fidelity is not attempted.
 */

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};

use crate::document::{
    Block, DocumentModel, Element, ElementKind, KindGroups, ModelStage, Run, TranslationState,
    TranslationStatus, primary_run,
};
use crate::errors::{PipelineError, TranslationError};
use crate::translation::{Register, Translator};

use super::{Degradation, StageOutput, StageReport, TransformStage, ensure_structure_preserved};

#[derive(Debug, Clone, PartialEq)]
pub struct TranslationStageConfig {
    pub source_language: String,
    pub target_language: String,
    /// Requests in flight at once; 1 keeps the stage strictly sequential
    pub max_concurrent_requests: usize,
    pub translate_table_cells: bool,
}

impl TranslationStageConfig {
    pub fn new(source_language: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            source_language: source_language.into(),
            target_language: target_language.into(),
            max_concurrent_requests: 1,
            translate_table_cells: false,
        }
    }

    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max.max(1);
        self
    }

    pub fn with_table_cells(mut self, enabled: bool) -> Self {
        self.translate_table_cells = enabled;
        self
    }
}

/// Where a job's result is written back
#[derive(Debug, Clone, Copy, PartialEq)]
enum JobTarget {
    Element,
    Cell { row: usize, cell: usize, paragraph: usize },
}

#[derive(Debug, Clone)]
struct Job {
    block_index: usize,
    target: JobTarget,
    kind: ElementKind,
    position: Option<usize>,
    text: String,
    register: Register,
}

pub struct TranslationStage {
    translator: Arc<dyn Translator>,
    config: TranslationStageConfig,
}

impl TranslationStage {
    pub fn new(translator: Arc<dyn Translator>, config: TranslationStageConfig) -> Self {
        Self { translator, config }
    }

    pub fn config(&self) -> &TranslationStageConfig {
        &self.config
    }

    /// Collect jobs in canonical kind order
    fn plan(&self, model: &DocumentModel, groups: &KindGroups) -> (Vec<Job>, usize) {
        let mut jobs = Vec::new();
        let mut skipped = 0;

        for (kind, indices) in groups.iter() {
            for &block_index in indices {
                match &model.blocks[block_index] {
                    Block::Element(element) => {
                        if !element.translatable || element.text.trim().is_empty() {
                            skipped += 1;
                            continue;
                        }
                        jobs.push(Job {
                            block_index,
                            target: JobTarget::Element,
                            kind,
                            position: element.position,
                            text: element.text.clone(),
                            register: Register::for_kind(kind),
                        });
                    }
                    Block::Table(table) => {
                        if !self.config.translate_table_cells {
                            skipped += 1;
                            continue;
                        }
                        for (r, row) in table.rows.iter().enumerate() {
                            for (c, cell) in row.cells.iter().enumerate() {
                                for (p, paragraph) in cell.paragraphs.iter().enumerate() {
                                    if paragraph.text.trim().is_empty() {
                                        continue;
                                    }
                                    jobs.push(Job {
                                        block_index,
                                        target: JobTarget::Cell { row: r, cell: c, paragraph: p },
                                        kind,
                                        position: table.position,
                                        text: paragraph.text.clone(),
                                        register: Register::NaturalFlow,
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }

        (jobs, skipped)
    }

    async fn run_job(&self, job: &Job) -> Result<String, TranslationError> {
        let translated = self
            .translator
            .translate(
                &job.text,
                &self.config.source_language,
                &self.config.target_language,
                job.register,
            )
            .await?;

        if translated.trim().is_empty() {
            return Err(TranslationError::EmptyResponse(job.text.chars().count()));
        }
        Ok(translated)
    }

    /// Run all jobs; results come back in job order regardless of completion order
    async fn execute(&self, jobs: &[Job]) -> Vec<Result<String, TranslationError>> {
        if self.config.max_concurrent_requests <= 1 {
            let mut results = Vec::with_capacity(jobs.len());
            for job in jobs {
                results.push(self.run_job(job).await);
            }
            return results;
        }

        let mut indexed: Vec<(usize, Result<String, TranslationError>)> = stream::iter(0..jobs.len())
            .map(|index| {
                let job = &jobs[index];
                async move { (index, self.run_job(job).await) }
            })
            .buffer_unordered(self.config.max_concurrent_requests)
            .collect()
            .await;

        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, result)| result).collect()
    }
}

/// Replace text with a single run carrying the primary run's formatting
fn single_run(runs: &[Run], text: &str) -> Vec<Run> {
    primary_run(runs).map(|run| vec![run.with_text(text)]).unwrap_or_default()
}

fn translated_element(element: &Element, text: String, register: Register) -> Element {
    Element {
        runs: single_run(&element.runs, &text),
        translation: TranslationState {
            original_text: Some(element.text.clone()),
            status: TranslationStatus::Translated,
            register: Some(register.as_str().to_string()),
            note: None,
        },
        text,
        ..element.clone()
    }
}

fn untranslated_element(element: &Element, register: Register, reason: &str) -> Element {
    Element {
        translation: TranslationState {
            original_text: Some(element.text.clone()),
            status: TranslationStatus::Untranslated,
            register: Some(register.as_str().to_string()),
            note: Some(reason.to_string()),
        },
        ..element.clone()
    }
}

fn skipped_element(element: &Element) -> Element {
    Element {
        translation: TranslationState {
            status: TranslationStatus::Skipped,
            ..element.translation.clone()
        },
        ..element.clone()
    }
}

#[async_trait]
impl TransformStage for TranslationStage {
    fn stage(&self) -> ModelStage {
        ModelStage::Translated
    }

    async fn transform(&self, model: &DocumentModel) -> Result<StageOutput, PipelineError> {
        let started = Instant::now();
        let groups = KindGroups::from_model(model);
        let (jobs, skipped) = self.plan(model, &groups);

        info!(
            "Translating {} blocks of {} ({} -> {}) with {}",
            jobs.len(),
            model.metadata.source_file,
            self.config.source_language,
            self.config.target_language,
            self.translator.name()
        );

        let results = self.execute(&jobs).await;

        let mut blocks: Vec<Block> = model
            .blocks
            .iter()
            .map(|block| match block {
                Block::Element(element) if !element.translatable => Block::Element(skipped_element(element)),
                other => other.clone(),
            })
            .collect();

        let mut report = StageReport::new(ModelStage::Translated);
        report.skipped = skipped;

        for (job, result) in jobs.iter().zip(results) {
            match (&mut blocks[job.block_index], job.target) {
                (Block::Element(element), JobTarget::Element) => match result {
                    Ok(text) => {
                        debug!("Translated {} at {:?}", job.kind, job.position);
                        *element = translated_element(element, text, job.register);
                        report.processed += 1;
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        warn!(
                            "Keeping source text for {} at position {:?}: {}",
                            job.kind, job.position, reason
                        );
                        *element = untranslated_element(element, job.register, &reason);
                        report.degradations.push(Degradation {
                            position: job.position,
                            kind: job.kind,
                            reason,
                        });
                    }
                },
                (Block::Table(table), JobTarget::Cell { row, cell, paragraph }) => {
                    let Some(target) = table
                        .rows
                        .get_mut(row)
                        .and_then(|r| r.cells.get_mut(cell))
                        .and_then(|c| c.paragraphs.get_mut(paragraph))
                    else {
                        continue;
                    };
                    match result {
                        Ok(text) => {
                            target.runs = single_run(&target.runs, &text);
                            target.text = text;
                            report.processed += 1;
                        }
                        Err(e) => {
                            let reason = format!("cell ({}, {}): {}", row, cell, e);
                            warn!("Keeping source text for table at position {:?}, {}", job.position, reason);
                            report.degradations.push(Degradation {
                                position: job.position,
                                kind: ElementKind::Table,
                                reason,
                            });
                        }
                    }
                }
                _ => {}
            }
        }

        let mut metadata = model.metadata_for(ModelStage::Translated);
        metadata.source_language = Some(self.config.source_language.clone());
        metadata.target_language = Some(self.config.target_language.clone());

        let output = DocumentModel::new(metadata, blocks);
        ensure_structure_preserved(model, &output)?;

        let report = report.with_duration(started.elapsed());
        info!("{}", report.summary());

        Ok(StageOutput { model: output, report })
    }
}
