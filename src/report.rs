//! Report generation: prompt assembly plus the single chat-completion call.

use crate::config::ReportConfig;
use crate::error::AnalysisError;
use crate::mapping::{project, RoleMapping};
use crate::openai::{Message, OpenAiClient};
use crate::summary::build_summary;
use crate::table::Table;
use tracing::info;

/// System instruction: the report must be pure markdown with a fixed
/// document structure, ready to save as an .md file.
const SYSTEM_PROMPT: &str = "당신은 고객 리뷰 데이터를 분석하는 전문가입니다. \
주어진 통계와 리뷰 샘플을 바탕으로 **반드시 마크다운(Markdown) 문법만 사용**한 한국어 분석 보고서를 작성합니다. \
출력 전체가 .md 파일로 저장될 수 있도록, 아래 문법을 정확히 사용하세요.\n\n\
【마크다운 문법 필수】\n\
- 제목: 첫 줄에 # 제목 (H1)\n\
- 섹션 제목: ## 섹션명, ### 소섹션명\n\
- 표: 반드시 헤더 행 + 구분선 + 데이터 행. 예시:\n\
  | 항목 | 값 |\n\
  |---|---|\n\
  | 총 리뷰 수 | 100건 |\n\
- 목록: 하이픈 - 또는 별표 * 또는 숫자 1. 2.\n\
- 강조: **굵게**\n\n\
【필수 구성】\n\
1. # 제목 (H1 한 개)\n\
2. ## 요약 + 2~4문단\n\
3. ## 기본 통계 + 마크다운 표\n\
4. ## 평균 평점 및 평점별 분포 + 표\n\
5. ## 긍정/부정/중립 리뷰 분포 + 표\n\
6. ## 연령대 분포 + 표 (데이터 있을 때만)\n\
7. ## 성별 분포 + 표 (데이터 있을 때만)\n\
8. ## 구매일자 분포 + 표 (데이터 있을 때만)\n\
9. ## 제품별 현황 + 표 또는 목록\n\
10. ## 상세 분석 + - 목록\n\
11. ## 개선점 및 제안 + - 목록\n\n\
일반 텍스트만 나열하지 말고, 모든 섹션에 ## 제목과 표(|) 또는 목록(-)을 반드시 사용하세요.";

/// Build the two-message prompt embedding the summary text verbatim.
pub fn build_messages(data_text: &str) -> Vec<Message> {
    let user = format!(
        "다음은 노트북 구매 고객 리뷰 데이터의 통계와 샘플입니다.\n\n\
{}\n\n\
위 데이터를 바탕으로 **마크다운 문법만 사용**한 분석 보고서를 작성해 주세요. \
제목은 #, 섹션은 ##, 표는 | 열 | 열 | 와 다음 줄 |---|---| 형식, 목록은 - 로 작성하세요. \
저장 시 .md 파일에서 표와 제목이 제대로 렌더링되도록 반드시 마크다운 문법을 사용하세요.",
        data_text
    );

    vec![Message::system(SYSTEM_PROMPT), Message::user(user)]
}

/// Generate an analysis report for the table under the given role mapping.
///
/// Credential, input, and mapping problems fail before any network traffic.
/// Endpoint failures come back as [`AnalysisError::Generation`] with the
/// endpoint's own description; the call is never retried.
pub async fn generate_report(
    table: &Table,
    mapping: &RoleMapping,
    config: &ReportConfig,
) -> Result<String, AnalysisError> {
    let api_key = match config.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => key.trim().to_string(),
        _ => return Err(AnalysisError::MissingApiKey),
    };

    if table.is_empty() {
        return Err(AnalysisError::EmptyTable);
    }

    // Reduce to the mapped columns up front; this also rejects mappings
    // without a usable review column before any network traffic.
    let projected = project(table, mapping)?;
    let data_text = build_summary(&projected, mapping)?;
    let messages = build_messages(&data_text);

    info!(
        "Requesting analysis report: model={}, {} rows",
        config.model,
        table.row_count()
    );

    let client = OpenAiClient::new(api_key, config.model.clone());
    match client.chat(messages).await {
        Ok(text) => Ok(text.trim().to_string()),
        Err(e) => Err(AnalysisError::Generation(e.to_string())),
    }
}
