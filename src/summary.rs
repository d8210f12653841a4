//! Statistical summary and review-sample builder.
//!
//! Turns a table plus role mapping into a single bounded text block: counts,
//! rating statistics, sentiment buckets, demographic and purchase-date
//! distributions, top products, and a capped sample of review texts. The
//! output is embedded verbatim in the generation prompt, so every section is
//! plain text with fixed Korean labels.

use crate::config::{Role, RATING_NEGATIVE_THRESHOLD, RATING_POSITIVE_THRESHOLD};
use crate::error::AnalysisError;
use crate::mapping::RoleMapping;
use crate::table::{fmt_num, value_counts, Column, Table};
use std::collections::{BTreeMap, HashMap};

/// Cap on sampled reviews embedded in the prompt.
pub const MAX_SAMPLE_REVIEWS: usize = 40;
/// Character cap per sampled review text.
pub const MAX_CHARS_PER_REVIEW: usize = 400;

/// Build the full summary text. Deterministic; cells that fail numeric or
/// date coercion are skipped per statistic. Sections whose role is unmapped
/// or whose column holds no usable values are omitted; the review sample is
/// always present.
pub fn build_summary(table: &Table, mapping: &RoleMapping) -> Result<String, AnalysisError> {
    let review_col = mapping
        .column_for(Role::Review)
        .and_then(|c| table.column(c))
        .ok_or(AnalysisError::MissingReviewColumn)?;

    let mut lines: Vec<String> = Vec::new();

    let total = table.row_count();
    lines.push("=== 기본 통계 ===".to_string());
    lines.push(format!("총 리뷰 수: {}", total));

    let product_col = mapping
        .column_for(Role::Product)
        .and_then(|c| table.column(c));
    if let Some(col) = product_col {
        let mut distinct: Vec<String> = Vec::new();
        for (_, value) in col.texts() {
            if !distinct.contains(&value) {
                distinct.push(value);
            }
        }
        lines.push(format!("리뷰된 제품(모델) 수: {}", distinct.len()));
    }

    let ratings: Vec<(usize, f64)> = mapping
        .column_for(Role::Rating)
        .and_then(|c| table.column(c))
        .map(Column::numeric_values)
        .unwrap_or_default();

    if !ratings.is_empty() {
        push_rating_sections(&mut lines, &ratings);
    }

    if let Some(col) = mapping.column_for(Role::Age).and_then(|c| table.column(c)) {
        push_value_distribution(&mut lines, "=== 연령대 분포 ===", col);
    }

    if let Some(col) = mapping
        .column_for(Role::Gender)
        .and_then(|c| table.column(c))
    {
        push_value_distribution(&mut lines, "=== 성별 분포 ===", col);
    }

    if let Some(col) = mapping
        .column_for(Role::PurchaseDate)
        .and_then(|c| table.column(c))
    {
        push_date_distribution(&mut lines, col);
    }

    if let Some(col) = product_col {
        let counts = value_counts(col.texts().into_iter().map(|(_, v)| v));
        if !counts.is_empty() {
            lines.push("=== 제품(모델)별 리뷰 수 (상위 10) ===".to_string());
            for (product, count) in counts.iter().take(10) {
                lines.push(format!("  {}: {}건", product, count));
            }
            lines.push(String::new());
        }
    }

    push_review_sample(&mut lines, review_col, &ratings);

    Ok(lines.join("\n"))
}

fn pct(count: usize, total: usize) -> f64 {
    100.0 * count as f64 / total as f64
}

/// Rating statistics, per-value histogram, and sentiment buckets, all over
/// the numeric-rating subset.
fn push_rating_sections(lines: &mut Vec<String>, ratings: &[(usize, f64)]) {
    let mut values: Vec<f64> = ratings.iter().map(|(_, v)| *v).collect();
    values.sort_by(f64::total_cmp);
    let n = values.len();

    let mean = values.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    };

    lines.push(String::new());
    lines.push("=== 평점 통계 ===".to_string());
    lines.push(format!("평균 평점: {:.2}", mean));
    lines.push(format!(
        "최소: {}, 최대: {}, 중앙값: {:.2}",
        fmt_num(values[0]),
        fmt_num(values[n - 1]),
        median
    ));
    lines.push(String::new());

    lines.push("평점별 건수 (표 형태):".to_string());
    let mut i = 0;
    while i < n {
        let score = values[i];
        let mut count = 1;
        while i + count < n && values[i + count] == score {
            count += 1;
        }
        lines.push(format!(
            "  평점 {}: {}건 ({:.1}%)",
            fmt_num(score),
            count,
            pct(count, n)
        ));
        i += count;
    }
    lines.push(String::new());

    let neg = values
        .iter()
        .filter(|v| **v < RATING_NEGATIVE_THRESHOLD)
        .count();
    let mid = values
        .iter()
        .filter(|v| **v >= RATING_NEGATIVE_THRESHOLD && **v < RATING_POSITIVE_THRESHOLD)
        .count();
    let pos = values
        .iter()
        .filter(|v| **v >= RATING_POSITIVE_THRESHOLD)
        .count();

    lines.push("=== 긍정/부정/중립 리뷰 분포 (평점 기준) ===".to_string());
    lines.push(format!(
        "  부정 (평점 < {:.1}): {}건 ({:.1}%)",
        RATING_NEGATIVE_THRESHOLD,
        neg,
        pct(neg, n)
    ));
    lines.push(format!(
        "  중립 (평점 {:.1}~{:.1} 미만): {}건 ({:.1}%)",
        RATING_NEGATIVE_THRESHOLD,
        RATING_POSITIVE_THRESHOLD,
        mid,
        pct(mid, n)
    ));
    lines.push(format!(
        "  긍정 (평점 >= {:.1}): {}건 ({:.1}%)",
        RATING_POSITIVE_THRESHOLD,
        pos,
        pct(pos, n)
    ));
    lines.push(String::new());
}

/// Value-count histogram over the column's non-empty strings, descending by
/// frequency (ties keep first-encountered order). Omitted when empty.
fn push_value_distribution(lines: &mut Vec<String>, title: &str, col: &Column) {
    let values: Vec<String> = col.texts().into_iter().map(|(_, v)| v).collect();
    if values.is_empty() {
        return;
    }
    let subtotal = values.len();
    lines.push(title.to_string());
    for (value, count) in value_counts(values) {
        lines.push(format!("  {}: {}건 ({:.1}%)", value, count, pct(count, subtotal)));
    }
    lines.push(String::new());
}

/// Date range plus per-calendar-month histogram, chronologically ascending,
/// over the parseable subset. Omitted when nothing parses.
fn push_date_distribution(lines: &mut Vec<String>, col: &Column) {
    let dates = col.date_values();
    if dates.is_empty() {
        return;
    }
    let subtotal = dates.len();
    let min = dates.iter().min().expect("non-empty");
    let max = dates.iter().max().expect("non-empty");

    lines.push("=== 구매일자 분포 ===".to_string());
    lines.push(format!(
        "  기간: {} ~ {}",
        min.format("%Y-%m-%d"),
        max.format("%Y-%m-%d")
    ));

    // BTreeMap keys sort lexicographically, which is chronological for
    // zero-padded year-month strings.
    let mut by_month: BTreeMap<String, usize> = BTreeMap::new();
    for date in &dates {
        *by_month.entry(date.format("%Y-%m").to_string()).or_insert(0) += 1;
    }
    for (month, count) in by_month {
        lines.push(format!("  {}: {}건 ({:.1}%)", month, count, pct(count, subtotal)));
    }
    lines.push(String::new());
}

/// Review sample selection: when numeric ratings exist on rows that have a
/// review, the highest- and lowest-rated halves (stable on ties, deduped,
/// capped); otherwise the first reviews in table order.
fn push_review_sample(lines: &mut Vec<String>, review_col: &Column, ratings: &[(usize, f64)]) {
    let review_texts = review_col.texts();
    if review_texts.is_empty() {
        lines.push("=== 리뷰 샘플 ===".to_string());
        lines.push("(없음)".to_string());
        return;
    }

    let text_by_row: HashMap<usize, &str> = review_texts
        .iter()
        .map(|(row, text)| (*row, text.as_str()))
        .collect();

    let rated: Vec<(usize, f64)> = ratings
        .iter()
        .filter(|(row, _)| text_by_row.contains_key(row))
        .copied()
        .collect();

    let selected: Vec<usize> = if rated.is_empty() {
        review_texts
            .iter()
            .take(MAX_SAMPLE_REVIEWS)
            .map(|(row, _)| *row)
            .collect()
    } else {
        let half = MAX_SAMPLE_REVIEWS / 2;
        let mut top = rated.clone();
        top.sort_by(|a, b| b.1.total_cmp(&a.1));
        let mut bottom = rated;
        bottom.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut picked: Vec<usize> = Vec::new();
        for (row, _) in top.iter().take(half).chain(bottom.iter().take(half)) {
            if !picked.contains(row) {
                picked.push(*row);
            }
        }
        picked.truncate(MAX_SAMPLE_REVIEWS);
        picked
    };

    lines.push("=== 리뷰 텍스트 샘플 (상·하위 평점 위주) ===".to_string());
    for (i, row) in selected.iter().enumerate() {
        let text = text_by_row[row];
        lines.push(format!("[{}] {}", i + 1, truncate_chars(text, MAX_CHARS_PER_REVIEW)));
    }
}

/// Cut at a character boundary (not bytes) and mark the cut.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CandidateTable;
    use crate::mapping::resolve_columns;
    use crate::table::Cell;

    fn text_table(headers: &[&str], rows: &[Vec<&str>]) -> Table {
        Table::from_rows(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| {
                    r.iter()
                        .map(|v| {
                            if v.is_empty() {
                                Cell::Empty
                            } else {
                                Cell::Text(v.to_string())
                            }
                        })
                        .collect()
                })
                .collect(),
        )
    }

    fn auto_summary(table: &Table) -> String {
        let mapping = resolve_columns(table, &CandidateTable::standard());
        build_summary(table, &mapping).unwrap()
    }

    #[test]
    fn test_missing_review_mapping_is_an_error() {
        let table = text_table(&["평점"], &[vec!["5"]]);
        let mapping = resolve_columns(&table, &CandidateTable::standard());
        assert!(matches!(
            build_summary(&table, &mapping),
            Err(AnalysisError::MissingReviewColumn)
        ));
    }

    #[test]
    fn test_two_row_korean_example() {
        let table = text_table(
            &["리뷰내용", "평점"],
            &[vec!["좋아요", "5"], vec!["별로예요", "1"]],
        );
        let summary = auto_summary(&table);

        assert!(summary.contains("총 리뷰 수: 2"));
        assert!(summary.contains("부정 (평점 < 2.5): 1건 (50.0%)"));
        assert!(summary.contains("중립 (평점 2.5~4.0 미만): 0건 (0.0%)"));
        assert!(summary.contains("긍정 (평점 >= 4.0): 1건 (50.0%)"));
        assert!(summary.contains("[1] "));
    }

    #[test]
    fn test_sentiment_buckets_partition_with_boundary_values() {
        // 2.5 is neutral, 4.0 is positive (half-open bands).
        let table = text_table(
            &["리뷰내용", "평점"],
            &[
                vec!["a", "2.5"],
                vec!["b", "4.0"],
                vec!["c", "1"],
                vec!["d", "3.9"],
                vec!["e", "5"],
            ],
        );
        let summary = auto_summary(&table);
        assert!(summary.contains("부정 (평점 < 2.5): 1건 (20.0%)"));
        assert!(summary.contains("중립 (평점 2.5~4.0 미만): 2건 (40.0%)"));
        assert!(summary.contains("긍정 (평점 >= 4.0): 2건 (40.0%)"));
    }

    #[test]
    fn test_rating_stats_use_numeric_subset_only() {
        // "좋음" fails coercion and must not change the denominator.
        let table = text_table(
            &["리뷰내용", "평점"],
            &[
                vec!["a", "5"],
                vec!["b", "좋음"],
                vec!["c", "5"],
                vec!["d", "1"],
                vec!["e", ""],
            ],
        );
        let summary = auto_summary(&table);
        assert!(summary.contains("평균 평점: 3.67"));
        assert!(summary.contains("최소: 1, 최대: 5, 중앙값: 5.00"));
        // Histogram ascending by value, percentages over 3 numeric ratings.
        let h1 = summary.find("평점 1: 1건 (33.3%)").unwrap();
        let h5 = summary.find("평점 5: 2건 (66.7%)").unwrap();
        assert!(h1 < h5);
    }

    #[test]
    fn test_rating_section_omitted_when_nothing_parses() {
        let table = text_table(
            &["리뷰내용", "평점"],
            &[vec!["a", "좋음"], vec!["b", "최고"]],
        );
        let summary = auto_summary(&table);
        assert!(!summary.contains("평점 통계"));
        assert!(!summary.contains("긍정/부정/중립"));
        // Sample falls back to table order.
        assert!(summary.contains("[1] a"));
        assert!(summary.contains("[2] b"));
    }

    #[test]
    fn test_age_distribution_descending_over_nonempty_subset() {
        let table = text_table(
            &["리뷰내용", "연령대"],
            &[
                vec!["a", "20대"],
                vec!["b", "30대"],
                vec!["c", "20대"],
                vec!["d", ""],
            ],
        );
        let summary = auto_summary(&table);
        // Denominator is the 3 non-empty values, not the 4 rows.
        let first = summary.find("20대: 2건 (66.7%)").unwrap();
        let second = summary.find("30대: 1건 (33.3%)").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_gender_section_omitted_when_column_blank() {
        let table = text_table(
            &["리뷰내용", "성별"],
            &[vec!["a", ""], vec!["b", ""]],
        );
        let summary = auto_summary(&table);
        assert!(!summary.contains("성별 분포"));
    }

    #[test]
    fn test_purchase_date_range_and_monthly_buckets() {
        let table = text_table(
            &["리뷰내용", "구매일자"],
            &[
                vec!["a", "2024-01-15"],
                vec!["b", "2024-01-20"],
                vec!["c", "2024-03-02"],
                vec!["d", "어제"],
            ],
        );
        let summary = auto_summary(&table);
        assert!(summary.contains("기간: 2024-01-15 ~ 2024-03-02"));
        let jan = summary.find("2024-01: 2건 (66.7%)").unwrap();
        let mar = summary.find("2024-03: 1건 (33.3%)").unwrap();
        assert!(jan < mar);
    }

    #[test]
    fn test_top_products_counts_without_percentages() {
        let mut rows: Vec<Vec<&str>> = Vec::new();
        for _ in 0..3 {
            rows.push(vec!["r", "A모델"]);
        }
        for _ in 0..2 {
            rows.push(vec!["r", "B모델"]);
        }
        rows.push(vec!["r", "C모델"]);
        let table = text_table(&["리뷰내용", "모델"], &rows);
        let summary = auto_summary(&table);

        assert!(summary.contains("리뷰된 제품(모델) 수: 3"));
        assert!(summary.contains("  A모델: 3건"));
        assert!(summary.contains("  B모델: 2건"));
        assert!(!summary.contains("A모델: 3건 ("));
    }

    #[test]
    fn test_sample_takes_top_and_bottom_twenty_of_distinct_ratings() {
        let ratings: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        let reviews: Vec<String> = (0..100).map(|i| format!("review{}", i)).collect();
        let rows: Vec<Vec<&str>> = (0..100)
            .map(|i| vec![reviews[i].as_str(), ratings[i].as_str()])
            .collect();
        let table = text_table(&["리뷰내용", "평점"], &rows);
        let summary = auto_summary(&table);

        // Highest-first block, then lowest-first block, no duplicates.
        assert!(summary.contains("[1] review99"));
        assert!(summary.contains("[20] review80"));
        assert!(summary.contains("[21] review0"));
        assert!(summary.contains("[40] review19"));
        assert!(!summary.contains("[41]"));
        assert!(!summary.contains("review50\n"));
    }

    #[test]
    fn test_sample_without_rating_column_is_first_forty_in_order() {
        let reviews: Vec<String> = (0..60).map(|i| format!("review{}", i)).collect();
        let rows: Vec<Vec<&str>> = reviews.iter().map(|r| vec![r.as_str()]).collect();
        let table = text_table(&["리뷰내용"], &rows);
        let summary = auto_summary(&table);

        assert!(summary.contains("[1] review0"));
        assert!(summary.contains("[40] review39"));
        assert!(!summary.contains("[41]"));
        assert!(!summary.contains("review40\n"));
    }

    #[test]
    fn test_sample_dedup_below_cap() {
        // 10 rated reviews: top-20 and bottom-20 both cover all of them;
        // dedup keeps each once.
        let reviews: Vec<String> = (0..10).map(|i| format!("review{}", i)).collect();
        let ratings: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        let rows: Vec<Vec<&str>> = (0..10)
            .map(|i| vec![reviews[i].as_str(), ratings[i].as_str()])
            .collect();
        let table = text_table(&["리뷰내용", "평점"], &rows);
        let summary = auto_summary(&table);

        assert!(summary.contains("[10]"));
        assert!(!summary.contains("[11]"));
    }

    #[test]
    fn test_sample_skips_rows_with_rating_but_no_review() {
        let table = text_table(
            &["리뷰내용", "평점"],
            &[vec!["good", "5"], vec!["", "1"], vec!["bad", "2"]],
        );
        let summary = auto_summary(&table);
        assert!(summary.contains("[1] good"));
        assert!(summary.contains("[2] bad"));
        assert!(!summary.contains("[3]"));
    }

    #[test]
    fn test_long_review_truncated_at_char_boundary() {
        let long: String = "가".repeat(500);
        let rows = vec![vec![long.as_str()]];
        let table = text_table(&["리뷰내용"], &rows);
        let summary = auto_summary(&table);

        let line = summary
            .lines()
            .find(|l| l.starts_with("[1] "))
            .unwrap();
        assert!(line.ends_with("..."));
        let text = &line[4..];
        assert_eq!(text.chars().count(), MAX_CHARS_PER_REVIEW + 3);
    }

    #[test]
    fn test_empty_review_column_emits_no_data_marker() {
        let table = text_table(&["리뷰내용", "평점"], &[vec!["", "5"], vec!["", "3"]]);
        let summary = auto_summary(&table);
        assert!(summary.contains("=== 리뷰 샘플 ==="));
        assert!(summary.contains("(없음)"));
    }

    #[test]
    fn test_summary_is_deterministic() {
        let table = text_table(
            &["리뷰내용", "평점", "성별", "연령대", "모델", "구매일자"],
            &[
                vec!["좋아요", "5", "남", "20대", "A", "2024-01-01"],
                vec!["그저 그래요", "3", "여", "30대", "B", "2024-02-01"],
                vec!["별로", "1", "여", "20대", "A", "2024-02-15"],
            ],
        );
        let first = auto_summary(&table);
        for _ in 0..5 {
            assert_eq!(auto_summary(&table), first);
        }
    }
}
