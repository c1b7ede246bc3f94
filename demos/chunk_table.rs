//! Chunking an Enriched Table
//!
//! Chunks an HTML table (or a file given on the command line) and prints each
//! chunk with the run's warnings and statistics.
//!
//! ```bash
//! cargo run --example chunk_table
//! RUST_LOG=debug cargo run --example chunk_table -- sheet.md 200
//! ```

use tabslabs::{ChunkConfig, ChunkResult, DocumentChunker, HtmlChunker, MarkdownChunker};
use tracing_subscriber::EnvFilter;

const SAMPLE: &str = r#"
<div class="rag-context">【文档上下文】来源：tariff.xlsx | 数据类型：表格数据</div>
<script type="application/json" class="table-notes-meta">
{"header_notes": {"注1": "注1：税率单位为%"}, "conditional_notes": {"注2": "注2：暂定税率", "*": "*：配额内税率"}}
</script>
<table data-source="tariff.xlsx" data-sheet="进口税则">
  <caption>关键检索词：小麦, 玉米, 进口关税</caption>
  <thead><tr><th>税则号列</th><th>货品名称</th><th>最惠国税率[注1]</th></tr></thead>
  <tbody>
    <tr><td>10011100</td><td rowspan="2">硬粒小麦</td><td>65</td></tr>
    <tr><td>10011900</td><td>65</td></tr>
    <tr><td>10019100</td><td>其他小麦种用</td><td>1*</td></tr>
    <tr><td>10059000</td><td>玉米</td><td>1[注2]</td></tr>
    <tr><td>10061021</td><td>籼米稻谷</td><td>65</td></tr>
    <tr class="table-note-row"><td colspan="3">注1：税率单位为%</td></tr>
  </tbody>
</table>"#;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let path = args.next();
    let max_tokens = match args.next() {
        Some(arg) => arg.parse()?,
        None => 80,
    };
    let config = ChunkConfig::by_tokens(max_tokens)?;

    let result = match &path {
        Some(path) if path.ends_with(".md") => {
            MarkdownChunker::markdown(config).chunk(&std::fs::read_to_string(path)?)
        }
        Some(path) => HtmlChunker::html(config).chunk(&std::fs::read_to_string(path)?),
        None => HtmlChunker::html(config).chunk(SAMPLE),
    };

    report(&result);
    Ok(())
}

fn report(result: &ChunkResult) {
    println!("Chunks: {}\n", result.len());
    for (i, chunk) in result.chunks.iter().enumerate() {
        let tokens = result.stats.token_counts.get(i).copied().unwrap_or_default();
        println!("[{i}] ~{tokens} tokens");
        println!("{chunk}\n");
    }

    for warning in &result.warnings {
        println!("warning: {warning}");
    }

    match serde_json::to_string_pretty(&result.stats) {
        Ok(stats) => println!("\nStats:\n{stats}"),
        Err(e) => eprintln!("failed to serialize stats: {e}"),
    }
}
