//! Convenience re-exports of the most commonly used types.

pub use crate::analyzer::Analyzer;
pub use crate::config::{AnalysisConfig, ConfigError, SurvivalConfig};
pub use crate::error::{AnalysisError, CloneError, CloneErrorKind};
pub use crate::result::{AnalysisRequest, AnalysisResult, RepositoryIdentity, Section, SectionStatus};
pub use crate::tree::FileNode;
