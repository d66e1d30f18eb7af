#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/vantage/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod aggregation;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod graph;
pub mod result;

pub use aggregation::{
    AggregationExecutor, AggregationIssue, AggregationKind, AggregationOutcome, AggregationParams,
};
pub use catalog::{
    CompiledCatalog, CompiledMetric, MetricCatalog, MetricDefinition, MetricSource,
    RejectedTransform, TransformDefinition,
};
pub use config::{EngineConfig, TtmDefaults};
pub use engine::MetricEngine;
pub use error::{MetricError, Result};
pub use evaluator::{ExpressionEvaluator, MetricScope};
pub use graph::{DependencyDrift, DependencyGraph};
pub use result::{
    CalculationType, CalculationWarning, DomainMetadata, DomainResult, EvaluationResult,
    MetricStatus, WarningKind,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
