use std::path::PathBuf;

use adherence_core::{describe_analysis, AnalyzerConfig};
use adherence_records::{analyze_records_str, parse_as_of};
use anyhow::Context;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "adherence-cli",
    about = "Phân tích mẫu hình dùng thuốc từ lịch sử cấp phát JSON."
)]
struct Args {
    /// Đường dẫn tới file JSON lịch sử cấp phát.
    #[arg(short, long)]
    input: PathBuf,

    /// Ngày tham chiếu (YYYY-MM-DD), mặc định là hôm nay.
    #[arg(long)]
    as_of: Option<String>,

    /// File JSON cấu hình `AnalyzerConfig`.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let data = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Không đọc được file {:?}", args.input))?;

    let config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Không đọc được file cấu hình {path:?}"))?;
            serde_json::from_str::<AnalyzerConfig>(&raw)
                .with_context(|| format!("Cấu hình không hợp lệ trong {path:?}"))?
        }
        None => AnalyzerConfig::default(),
    };

    let as_of = match args.as_of.as_deref() {
        Some(value) => parse_as_of(value)?,
        None => Utc::now().date_naive(),
    };

    let analysis = analyze_records_str(&data, &config, as_of)?;
    tracing::info!(
        patterns = analysis.patterns.len(),
        dispensings = analysis.summary.total_dispensings,
        "analysis complete"
    );

    match args.format {
        OutputFormat::Text => print!("{}", describe_analysis(&analysis)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&analysis)?),
    }

    Ok(())
}
