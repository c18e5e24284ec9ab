//! Application layer: record normalization, QA reporting and the pipeline
//! that ties the crawling and infrastructure layers together.

pub mod normalizer;
pub mod pipeline;
pub mod report;

pub use normalizer::RecordNormalizer;
pub use pipeline::{ExtractionPipeline, PipelineError, PipelineSettings, RunSummary};
pub use report::{Annotation, CellRef, Highlight, QaFlag, Report, ReportError, ReportSink};
