use crate::cli::OutputFormat;
use crate::error::{AppError, Result};
use crate::models::{AppConfig, CombinedMatrix, MonthFilter, TickerSymbol};
use crate::server::api::MatrixResponse;
use crate::services::{create_combined_matrix, CombineOptions, YahooClient};

const YEAR_HEADER: &str = "Año";

pub async fn run(tickers: &str, months: &[String], format: OutputFormat) {
    match build_and_render(tickers, months, format).await {
        Ok(output) => print!("{}", output),
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn build_and_render(tickers: &str, months: &[String], format: OutputFormat) -> Result<String> {
    let tickers = TickerSymbol::parse_list(tickers)?;
    let months = MonthFilter::parse(months)?;

    let config = AppConfig::from_env()?;
    let client = YahooClient::new(&config)?;
    let options = CombineOptions {
        range: config.history,
        row_window: config.row_window,
        months,
    };

    let matrix = create_combined_matrix(&client, &tickers, &options).await?;
    for skipped in matrix.skipped() {
        eprintln!("⚠️  Skipped {}: {}", skipped.ticker, skipped.reason);
    }

    render(&matrix, format)
}

pub fn render(matrix: &CombinedMatrix, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(matrix)),
        OutputFormat::Csv => render_csv(matrix),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&MatrixResponse::from(matrix))?;
            json.push('\n');
            Ok(json)
        }
    }
}

/// Right-aligned text table; absent cells are blank
fn render_table(matrix: &CombinedMatrix) -> String {
    if matrix.is_empty() {
        return "No data for the selected tickers and months\n".to_string();
    }

    let labels = matrix.column_labels();
    let mut widths: Vec<usize> = labels.iter().map(|l| l.chars().count()).collect();
    let mut year_width = YEAR_HEADER.chars().count();

    for (year, cells) in matrix.rows() {
        year_width = year_width.max(year.to_string().len());
        for (width, cell) in widths.iter_mut().zip(cells) {
            if let Some(cell) = cell {
                *width = (*width).max(cell.text().chars().count());
            }
        }
    }

    let mut out = String::new();
    out.push_str(&format!("{:<year_width$}", YEAR_HEADER));
    for (label, width) in labels.iter().zip(&widths) {
        out.push_str(&format!("  {:>width$}", label, width = *width));
    }
    out.push('\n');

    for (year, cells) in matrix.rows() {
        out.push_str(&format!("{:<year_width$}", year));
        for (cell, width) in cells.iter().zip(&widths) {
            let text = cell.as_ref().map(|c| c.text()).unwrap_or("");
            out.push_str(&format!("  {:>width$}", text, width = *width));
        }
        out.push('\n');
    }

    out
}

fn render_csv(matrix: &CombinedMatrix) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![YEAR_HEADER.to_string()];
    header.extend(matrix.column_labels());
    writer.write_record(&header)?;

    for (year, cells) in matrix.rows() {
        let mut record = vec![year.to_string()];
        record.extend(
            cells
                .iter()
                .map(|cell| cell.as_ref().map(|c| c.text().to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Io(format!("Failed to flush CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Parse(format!("CSV is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::source::fake::FakeSource;

    async fn sample() -> CombinedMatrix {
        let source = FakeSource::new()
            .with_monthly("A", 2022, 11, &[100.0, 103.4, 110.0, 99.0])
            .with_monthly("B", 2023, 1, &[10.0, 11.0]);
        let tickers = TickerSymbol::parse_list("A,B").unwrap();
        let options = CombineOptions {
            months: MonthFilter::only([1, 2]).unwrap(),
            ..CombineOptions::default()
        };
        create_combined_matrix(&source, &tickers, &options).await.unwrap()
    }

    #[tokio::test]
    async fn test_render_table() {
        let output = render(&sample().await, OutputFormat::Table).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        // 2022 only has November and December, so its filtered row is blank
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Año    1_A     2_A  1_B    2_B");
        assert_eq!(lines[1].trim_end(), "2022");
        assert_eq!(lines[2], format!("2023  6,38  -10,00{}10,00", " ".repeat(7)));
    }

    #[tokio::test]
    async fn test_render_csv() {
        let output = render(&sample().await, OutputFormat::Csv).unwrap();

        assert_eq!(output, "Año,1_A,2_A,1_B,2_B\n2022,,,,\n2023,\"6,38\",\"-10,00\",,\"10,00\"\n");
    }

    #[tokio::test]
    async fn test_render_json() {
        let output = render(&sample().await, OutputFormat::Json).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(json["columns"][3]["label"], "2_B");
        assert_eq!(json["rows"][1]["year"], "2023");
        assert!(json["rows"][1]["cells"][2].is_null());
        assert_eq!(json["rows"][1]["cells"][3]["text"], "10,00");
    }

    #[test]
    fn test_render_empty_table() {
        let matrix = crate::services::combine(&[], &MonthFilter::all(), Vec::new());
        let output = render(&matrix, OutputFormat::Table).unwrap();
        assert!(output.starts_with("No data"));
    }
}
