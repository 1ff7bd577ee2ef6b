// src/core/mod.rs

/// Data structures shared by every stage: findings, risk tiers, the remote
/// payload and the final `AnalysisReport`.
pub mod models;

/// Error taxonomy of the pipeline stages.
pub mod errors;

/// Static rule tables and the catalogue of findings with their
/// human-readable text, severities and weights.
pub mod knowledge_base;

/// Turns raw user input into a scheme-qualified URL and host.
pub mod normalizer;

/// Heuristic rules, the threat-intel client, the score aggregator and the
/// orchestrator tying them together.
pub mod scanner;
