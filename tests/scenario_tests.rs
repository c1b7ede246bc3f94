//! End-to-end chunking scenarios over HTML and Markdown input.
//!
//! Token costs are controlled by an estimator that counts `#` characters, so
//! each scenario states its budget arithmetic exactly.

use std::sync::Arc;

use tabslabs::{
    ChunkConfig, ChunkOptions, DocumentChunker, HtmlChunker, MarkdownChunker, OverflowReason,
    TokenEstimator, TokenStrategy, DEFAULT_SEPARATOR, MAX_COLSPAN,
};

fn hashes() -> Arc<dyn TokenEstimator> {
    Arc::new(|text: &str| text.chars().filter(|&c| c == '#').count())
}

/// An HTML table whose header costs `fixed` and whose row `i` costs `costs[i]`.
fn html_table(fixed: usize, costs: &[usize]) -> String {
    let mut html = format!(
        "<table><thead><tr><th>id</th><th>{}</th></tr></thead><tbody>",
        "#".repeat(fixed)
    );
    for (i, &cost) in costs.iter().enumerate() {
        html.push_str(&format!("<tr><td>r{i}</td><td>{}</td></tr>", "#".repeat(cost)));
    }
    html.push_str("</tbody></table>");
    html
}

fn rows_in(chunk: &str) -> usize {
    chunk.matches("<tr>").count() - 1
}

// =============================================================================
// Token Budgets
// =============================================================================

#[test]
fn splits_when_next_row_would_exceed_max() {
    // 100 fixed + 6 * 50 = 400 fits exactly; a seventh row would not.
    let chunker =
        HtmlChunker::html(ChunkConfig::by_tokens(400).unwrap()).with_estimator(hashes());
    let result = chunker.chunk(&html_table(100, &[50; 10]));

    assert_eq!(result.len(), 2);
    assert_eq!(rows_in(&result.chunks[0]), 6);
    assert_eq!(rows_in(&result.chunks[1]), 4);
    assert_eq!(result.stats.token_counts, [400, 300]);
    assert_eq!(result.stats.base_fixed_overhead, 100);
    assert_eq!(result.stats.token_limit, Some(400));
    assert!(result.warnings.is_empty());
}

#[test]
fn oversized_row_is_isolated_and_reported() {
    let chunker =
        HtmlChunker::html(ChunkConfig::by_tokens(300).unwrap()).with_estimator(hashes());
    let result = chunker.chunk(&html_table(0, &[20, 500, 20]));

    assert_eq!(result.len(), 3);
    assert_eq!(result.stats.token_counts, [20, 500, 20]);
    assert_eq!(result.stats.oversized_chunks, 1);

    let warning = &result.warnings[0];
    assert_eq!(warning.chunk_index, 1);
    assert_eq!(warning.actual_tokens, 500);
    assert_eq!(warning.limit, 300);
    assert_eq!(warning.overflow, 200);
    assert_eq!(warning.row_count, 1);
    assert_eq!(warning.reason, OverflowReason::SingleRow);
    assert!(result.chunks[1].contains(">r1<"));
}

#[test]
fn prefer_min_seals_at_floor() {
    // 50 fixed + 3 * 60 = 230 >= 200, so every chunk closes after 3 rows.
    let config = ChunkConfig::by_tokens(400)
        .unwrap()
        .with_min_tokens(200)
        .unwrap()
        .with_strategy(TokenStrategy::PreferMin);
    let chunker = HtmlChunker::html(config).with_estimator(hashes());
    let result = chunker.chunk(&html_table(50, &[60; 10]));

    let sizes: Vec<usize> = result.chunks.iter().map(|c| rows_in(c)).collect();
    assert_eq!(sizes, [3, 3, 3, 1]);
    assert_eq!(result.stats.token_strategy, Some(TokenStrategy::PreferMin));
    assert_eq!(result.stats.min_token_limit, Some(200));
}

#[test]
fn prefer_max_fills_to_ceiling() {
    let config = ChunkConfig::by_tokens(400).unwrap().with_min_tokens(200).unwrap();
    let chunker = HtmlChunker::html(config).with_estimator(hashes());
    let result = chunker.chunk(&html_table(50, &[60; 10]));

    let sizes: Vec<usize> = result.chunks.iter().map(|c| rows_in(c)).collect();
    assert_eq!(sizes, [5, 5]);
}

// =============================================================================
// Row Budgets
// =============================================================================

#[test]
fn row_mode_ignores_token_costs() {
    let chunker = HtmlChunker::html(ChunkConfig::by_rows(4).unwrap()).with_estimator(hashes());
    let result = chunker.chunk(&html_table(10, &[1000; 10]));

    let sizes: Vec<usize> = result.chunks.iter().map(|c| rows_in(c)).collect();
    assert_eq!(sizes, [4, 4, 2]);
    assert!(result.warnings.is_empty());
    assert_eq!(result.stats.token_limit, None);
    assert_eq!(result.stats.token_strategy, None);
}

// =============================================================================
// Footnotes
// =============================================================================

const PRICED: &str = r#"
<div class="rag-context">【文档上下文】来源：tariff.xlsx</div>
<script type="application/json" class="table-notes-meta">
{"header_notes": {"注1": "注1：单位为元"}, "conditional_notes": {"注2": "注2：暂定税率", "*": "*：配额内"}}
</script>
<table data-sheet="Sheet1">
  <thead><tr><th>编码</th><th>价格[注1]</th></tr></thead>
  <tbody>
    <tr><td>1001</td><td>1%</td></tr>
    <tr><td>1002</td><td>2%</td></tr>
    <tr><td>1003</td><td>3%[注2]</td></tr>
    <tr><td>1004</td><td>4%</td></tr>
    <tr class="table-note-row"><td colspan="2">注1：单位为元</td></tr>
  </tbody>
</table>"#;

#[test]
fn header_note_in_every_chunk_conditional_note_scoped() {
    let result = HtmlChunker::html(ChunkConfig::by_rows(1).unwrap()).chunk(PRICED);

    assert_eq!(result.len(), 4);
    for (i, chunk) in result.chunks.iter().enumerate() {
        assert!(chunk.contains("【表格注释】注1：单位为元"), "chunk {i}");
        assert_eq!(chunk.contains("注2：暂定税率"), i == 2, "chunk {i}");
        assert!(!chunk.contains("配额内"), "chunk {i}");
    }
}

#[test]
fn conditional_note_counts_against_token_budget() {
    // 10 fixed + 30 per row fits 40 exactly; the row citing `*` also pulls in
    // a 5-token note and overflows on its own.
    let html = r######"
<script type="application/json" class="table-notes-meta">{"conditional_notes": {"*": "#####"}}</script>
<table>
  <thead><tr><th>##########</th></tr></thead>
  <tbody>
    <tr><td>a ##############################</td></tr>
    <tr><td>b* ##############################</td></tr>
    <tr><td>c ##############################</td></tr>
  </tbody>
</table>"######;
    let chunker = HtmlChunker::html(ChunkConfig::by_tokens(40).unwrap()).with_estimator(hashes());
    let result = chunker.chunk(html);

    assert_eq!(result.stats.token_counts, [40, 45, 40]);
    assert_eq!(result.warnings.len(), 1);
    let warning = &result.warnings[0];
    assert_eq!(warning.chunk_index, 1);
    assert_eq!(warning.actual_tokens, 45);
    assert_eq!(warning.limit, 40);
    assert_eq!(warning.overflow, 5);
    assert_eq!(warning.reason, OverflowReason::SingleRow);

    for (i, chunk) in result.chunks.iter().enumerate() {
        assert_eq!(chunk.contains("【表格注释】#####"), i == 1, "chunk {i}");
    }
}

#[test]
fn oversized_colspan_keeps_output_bounded() {
    let html = r#"<table><thead><tr><th>h</th></tr></thead><tbody>
      <tr><td colspan="3000000">x</td></tr>
      <tr><td>a</td></tr><tr><td>b</td></tr><tr><td>c</td></tr>
    </tbody></table>"#;
    let result = HtmlChunker::html(ChunkConfig::by_rows(2).unwrap()).chunk(html);

    assert_eq!(result.len(), 2);
    for chunk in &result.chunks {
        assert!(chunk.matches("<td").count() + chunk.matches("<th").count() <= 3 * MAX_COLSPAN);
    }
    assert!(result.join("").len() < 100_000);
}

#[test]
fn row_attributes_survive_chunking() {
    let html = r#"<table><thead><tr><th>h</th></tr></thead><tbody>
      <tr class="odd"><td>a</td></tr><tr class="even"><td>b</td></tr>
    </tbody></table>"#;
    let result = HtmlChunker::html(ChunkConfig::by_rows(1).unwrap()).chunk(html);
    assert!(result.chunks[0].contains(r#"<tr class="odd"><td>a</td></tr>"#));
    assert!(result.chunks[1].contains(r#"<tr class="even"><td>b</td></tr>"#));
}

#[test]
fn footnote_rows_are_not_data() {
    let result = HtmlChunker::html(ChunkConfig::by_rows(10).unwrap()).chunk(PRICED);
    assert_eq!(result.len(), 1);
    assert!(!result.chunks[0].contains("table-note-row"));
    assert!(result.chunks[0].contains(r#"data-sheet="Sheet1""#));
}

// =============================================================================
// Merged Cells
// =============================================================================

#[test]
fn rowspan_crossing_boundary_is_copied() {
    let html = r#"<table>
      <thead><tr><th>group</th><th>item</th></tr></thead>
      <tbody>
        <tr><td>A</td><td>a1</td></tr>
        <tr><td rowspan="3">B</td><td>b1</td></tr>
        <tr><td>b2</td></tr>
        <tr><td>b3</td></tr>
      </tbody></table>"#;
    let result = HtmlChunker::html(ChunkConfig::by_rows(2).unwrap()).chunk(html);

    assert_eq!(result.len(), 2);
    assert!(result.chunks[0].contains("<td>B</td><td>b1</td>"));
    assert!(result.chunks[1].contains(r#"<td class="span-fill">B</td><td>b2</td>"#));
    assert!(result.chunks[1].contains(r#"<td class="span-fill">B</td><td>b3</td>"#));
    assert!(!result.chunks[1].contains("rowspan"));
}

// =============================================================================
// Degenerate Input
// =============================================================================

#[test]
fn html_without_data_rows_yields_no_chunks() {
    let html = "<table><thead><tr><th>h</th></tr></thead><tbody></tbody></table>";
    let result = HtmlChunker::html(ChunkConfig::default()).chunk(html);
    assert!(result.is_empty());
    assert_eq!(result.stats.total_chunks, 0);
}

#[test]
fn html_without_table_passes_through() {
    let text = "<p>not a table</p>";
    let result = HtmlChunker::html(ChunkConfig::default()).chunk(text);
    assert_eq!(result.chunks, [text]);
    assert_eq!(result.stats.total_chunks, 1);
    assert!(result.stats.token_counts.is_empty());
}

#[test]
fn markdown_without_data_passes_through() {
    let text = "<!-- RAG Context: empty.xlsx -->\n\n| a | b |\n| --- | --- |\n";
    let result = MarkdownChunker::markdown(ChunkConfig::default()).chunk(text);
    assert_eq!(result.chunks, [text]);
}

// =============================================================================
// Markdown
// =============================================================================

#[test]
fn markdown_end_to_end() {
    let text = "<!-- RAG Context: tariff.xlsx | Sheet: Sheet1 -->
<!-- table-notes-meta {\"conditional_notes\": {\"注1\": \"注1：暂定税率\"}} -->

| 编码 | 税率 |
| :--- | ---: |
| 1001 | 1% |
| 1002 | 2%[注1] |
| 1003 | 3% |
";
    let result = MarkdownChunker::markdown(ChunkConfig::by_rows(2).unwrap()).chunk(text);

    assert_eq!(result.len(), 2);
    assert_eq!(
        result.chunks[0],
        "<!-- RAG Context: tariff.xlsx | Sheet: Sheet1 -->\n\
         <!-- 【表格注释】注1：暂定税率 -->\n\
         \n\
         | 编码 | 税率 |\n\
         | --- | --- |\n\
         | 1001 | 1% |\n\
         | 1002 | 2%[注1] |"
    );
    assert_eq!(
        result.chunks[1],
        "<!-- RAG Context: tariff.xlsx | Sheet: Sheet1 -->\n\
         \n\
         | 编码 | 税率 |\n\
         | --- | --- |\n\
         | 1003 | 3% |"
    );
}

// =============================================================================
// Options and Output
// =============================================================================

#[test]
fn options_json_drives_chunker() {
    let options = ChunkOptions::from_json(
        r#"{"split_mode": "by_tokens", "max_tokens": 400, "min_tokens": 200, "token_strategy": "prefer_min"}"#,
    )
    .unwrap();
    let config = ChunkConfig::try_from(options).unwrap();
    assert_eq!(config.separator(), DEFAULT_SEPARATOR);

    let chunker = HtmlChunker::html(config).with_estimator(hashes());
    let result = chunker.chunk(&html_table(50, &[60; 6]));
    assert_eq!(result.len(), 2);
}

#[test]
fn invalid_options_are_rejected() {
    assert!(ChunkOptions::from_json(r#"{"split_mode": "by_pages"}"#).is_err());

    let options = ChunkOptions::from_json(r#"{"split_mode": "by_rows"}"#).unwrap();
    assert!(ChunkConfig::try_from(options).is_err());

    let options =
        ChunkOptions::from_json(r#"{"max_tokens": 100, "min_tokens": 100}"#).unwrap();
    assert!(ChunkConfig::try_from(options).is_err());
}

#[test]
fn result_serializes_with_stable_field_names() {
    let chunker =
        HtmlChunker::html(ChunkConfig::by_tokens(300).unwrap()).with_estimator(hashes());
    let result = chunker.chunk(&html_table(0, &[500]));
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["stats"]["total_chunks"], 1);
    assert_eq!(json["stats"]["oversized_chunks"], 1);
    assert_eq!(json["stats"]["token_strategy"], "prefer_max");
    assert_eq!(json["warnings"][0]["overflow"], 200);
    assert_eq!(
        json["warnings"][0]["reason"],
        "single row + overhead exceeds limit"
    );
}

#[test]
fn joined_output_splits_back_into_chunks() {
    let config = ChunkConfig::by_rows(3).unwrap();
    let result = HtmlChunker::html(config.clone()).chunk(&html_table(1, &[1; 7]));
    let joined = result.join(config.separator());
    let parts: Vec<&str> = joined.split(config.separator()).collect();
    assert_eq!(parts, result.chunks);
}
