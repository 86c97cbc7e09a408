/*!
 * Document pipeline.
 *
 * Wires extraction, the transform stages, persistence and reconstruction
 * together for one document at a time.
 */

pub mod orchestrator;

pub use orchestrator::{
    CancellationToken, DocumentPipeline, PipelineFailure, PipelinePhase, PipelineProgress,
    PipelineResult, ProgressCallback,
};
