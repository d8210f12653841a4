//! Error taxonomy for the analysis core.
//!
//! Individual cell values that fail numeric/date coercion are not errors;
//! they are skipped locally inside the statistics helpers.

use thiserror::Error;

/// Failures surfaced by the analysis pipeline.
///
/// Messages are user-facing (Korean, matching the report language) so the
/// presentation layer can show them directly.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The mandatory review role is unmapped or its column is absent.
    #[error("리뷰 내용에 해당하는 열이 없습니다. 열 매핑을 확인하세요.")]
    MissingReviewColumn,

    /// The table has no rows or no columns.
    #[error("데이터가 비어 있습니다.")]
    EmptyTable,

    /// No usable API credential was configured.
    #[error("API 키가 없습니다. .env 파일에 OPENAI_API_KEY를 설정하세요.")]
    MissingApiKey,

    /// The generation endpoint failed (auth, quota, network, malformed
    /// response). Carries the endpoint's own description; never retried.
    #[error("보고서 생성 오류: {0}")]
    Generation(String),
}
