//! Review-analysis configuration: column roles, header candidate lists,
//! sentiment thresholds, and report-generation settings.

use serde::{Deserialize, Serialize};
use std::env;

/// Rating at or above which a review counts as positive.
pub const RATING_POSITIVE_THRESHOLD: f64 = 4.0;
/// Rating below which a review counts as negative; `[negative, positive)` is neutral.
pub const RATING_NEGATIVE_THRESHOLD: f64 = 2.5;

/// Default model used for report generation.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Semantic role a spreadsheet column may play. `Review` is the only
/// mandatory role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Review,
    Rating,
    Product,
    CustomerId,
    Name,
    Age,
    PurchaseDate,
    Gender,
}

impl Role {
    /// Human-facing label shown by mapping UIs.
    pub fn label(self) -> &'static str {
        match self {
            Role::Review => "리뷰 내용",
            Role::Rating => "평점",
            Role::Product => "제품/모델",
            Role::CustomerId => "고객 ID",
            Role::Name => "이름",
            Role::Age => "연령/연령대",
            Role::PurchaseDate => "구매일자",
            Role::Gender => "성별",
        }
    }

    pub fn is_required(self) -> bool {
        matches!(self, Role::Review)
    }
}

/// Ordered role → header-synonym configuration. Candidate order is priority
/// order (first match wins), and the role order fixes mapping iteration
/// order, so resolution is deterministic.
#[derive(Debug, Clone)]
pub struct CandidateTable {
    entries: Vec<(Role, Vec<String>)>,
}

impl CandidateTable {
    pub fn new(entries: Vec<(Role, Vec<String>)>) -> Self {
        Self { entries }
    }

    /// The built-in candidate lists (Korean and English header synonyms).
    pub fn standard() -> Self {
        fn owned(cands: &[&str]) -> Vec<String> {
            cands.iter().map(|c| c.to_string()).collect()
        }

        Self::new(vec![
            (
                Role::Review,
                owned(&[
                    "리뷰내용",
                    "리뷰 내용",
                    "Review",
                    "review_content",
                    "리뷰",
                    "review content",
                    "내용",
                    "코멘트",
                    "comment",
                ]),
            ),
            (
                Role::Rating,
                owned(&["평점", "점수", "rating", "Rating", "별점", "점", "score", "Score"]),
            ),
            (
                Role::Product,
                owned(&[
                    "구매한 노트북 모델",
                    "노트북 모델",
                    "모델",
                    "product",
                    "제품명",
                    "제품",
                    "상품",
                    "노트북",
                    "model",
                    "Model",
                ]),
            ),
            (
                Role::CustomerId,
                owned(&["고객ID", "고객 id", "customer_id", "ID", "id", "고객코드", "코드"]),
            ),
            (
                Role::Name,
                owned(&["이름", "name", "Name", "고객명", "구매자", "작성자"]),
            ),
            (
                Role::Age,
                owned(&["연령", "연령대", "age", "Age", "나이", "연령구간"]),
            ),
            (
                Role::PurchaseDate,
                owned(&[
                    "구매일자",
                    "구매일",
                    "구매 날짜",
                    "purchase_date",
                    "date",
                    "Date",
                    "날짜",
                    "작성일",
                    "리뷰일",
                    "order_date",
                    "created_at",
                ]),
            ),
            (
                Role::Gender,
                owned(&["성별", "gender", "Gender", "남녀", "sex", "Sex"]),
            ),
        ])
    }

    pub fn entries(&self) -> &[(Role, Vec<String>)] {
        &self.entries
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.entries.iter().map(|(role, _)| *role)
    }
}

impl Default for CandidateTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Report-generation settings, passed explicitly into the report requester.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Bearer credential for the generation endpoint; `None` when unset or blank.
    pub api_key: Option<String>,
    pub model: String,
}

impl ReportConfig {
    /// Read settings from the process environment (`OPENAI_API_KEY`,
    /// optional `OPENAI_MODEL`).
    pub fn from_env() -> Self {
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        let model = env::var("OPENAI_MODEL")
            .ok()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());

        Self { api_key, model }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_covers_all_roles_once() {
        let table = CandidateTable::standard();
        let roles: Vec<Role> = table.roles().collect();
        assert_eq!(roles.len(), 8);
        assert_eq!(roles[0], Role::Review);
        for (i, a) in roles.iter().enumerate() {
            for b in &roles[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_role_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&Role::PurchaseDate).unwrap(),
            "\"purchase_date\""
        );
        let role: Role = serde_json::from_str("\"customer_id\"").unwrap();
        assert_eq!(role, Role::CustomerId);
    }

    #[test]
    fn test_only_review_required() {
        let table = CandidateTable::standard();
        let required: Vec<Role> = table.roles().filter(|r| r.is_required()).collect();
        assert_eq!(required, vec![Role::Review]);
    }
}
