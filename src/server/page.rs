//! Web form and styled table served on `/`

use crate::constants::{DEFAULT_MONTHS, DEFAULT_TICKERS, MONTH_NAMES};
use crate::error::AppError;
use crate::models::{CombinedMatrix, MonthFilter};
use crate::server::api::{build_matrix, MatrixQuery};
use crate::server::AppState;
use crate::services::colorizer::{color_map, CellStyle};
use crate::services::PriceSource;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::Query;
use std::collections::BTreeSet;
use std::fmt::Write;
use tracing::{info, warn};

const PAGE_TITLE: &str = "Análisis de Variaciones Mensuales";

const STYLE: &str = "body { font-family: sans-serif; margin: 2rem; } \
table { border-collapse: collapse; margin-top: 1.5rem; } \
th, td { border: 1px solid #ccc; padding: 0.3rem 0.6rem; text-align: right; } \
th { background: #f4f4f4; } \
.hint { color: #666; font-size: 0.9rem; } \
.notice { background: #fff8e1; border: 1px solid #f0c36d; padding: 0.6rem; margin-top: 1rem; } \
.error { background: #fdecea; border: 1px solid #f5a9a3; padding: 0.6rem; margin-top: 1rem; }";

/// What the page shows under the form
enum Outcome {
    Form,
    Table(CombinedMatrix),
    Failed(AppError),
}

/// GET / - Form plus the combined table when `tickers` is present
pub async fn index_handler<S: PriceSource>(
    State(state): State<AppState<S>>,
    Query(params): Query<MatrixQuery>,
) -> Response {
    let outcome = if params.tickers.is_none() {
        Outcome::Form
    } else {
        match params.parse() {
            Ok((tickers, months)) => match build_matrix(&state, &tickers, months).await {
                Ok(matrix) => {
                    info!(
                        columns = matrix.columns().len(),
                        rows = matrix.years().len(),
                        skipped = matrix.skipped().len(),
                        "Rendered combined matrix"
                    );
                    Outcome::Table(matrix)
                }
                Err(e) => Outcome::Failed(e),
            },
            Err(e) => Outcome::Failed(e),
        }
    };

    let status = match &outcome {
        Outcome::Failed(e) => {
            warn!(error = %e, "Analysis failed");
            e.status_code()
        }
        _ => StatusCode::OK,
    };

    (status, Html(render_page(&params, &outcome))).into_response()
}

fn render_page(params: &MatrixQuery, outcome: &Outcome) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{style}</style>\n</head>\n<body>\n<h1>{title}</h1>\n",
        title = PAGE_TITLE,
        style = STYLE,
    );

    render_form(&mut html, params);

    match outcome {
        Outcome::Form => {}
        Outcome::Table(matrix) => {
            render_skipped(&mut html, matrix);
            render_table(&mut html, matrix);
        }
        Outcome::Failed(e) => {
            let _ = write!(html, "<div class=\"error\">{}</div>\n", escape(&e.to_string()));
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_form(html: &mut String, params: &MatrixQuery) {
    let tickers = params.tickers.as_deref().unwrap_or(DEFAULT_TICKERS);
    let selected = selected_months(params);

    html.push_str("<form method=\"get\" action=\"/\">\n");
    let _ = write!(
        html,
        "<label for=\"tickers\">Tickers (separados por coma)</label><br>\n\
         <input type=\"text\" id=\"tickers\" name=\"tickers\" size=\"50\" value=\"{}\">\n\
         <p class=\"hint\">Para activos argentinos agregue el sufijo .BA (por ejemplo GGAL.BA)</p>\n",
        escape(tickers)
    );

    html.push_str("<label for=\"months\">Meses</label><br>\n<select id=\"months\" name=\"months\" multiple size=\"12\">\n");
    for (index, name) in MONTH_NAMES.iter().enumerate() {
        let month = index as u32 + 1;
        let marker = if selected.contains(&month) { " selected" } else { "" };
        let _ = writeln!(html, "<option value=\"{month}\"{marker}>{month} - {name}</option>");
    }
    html.push_str("</select>\n<p class=\"hint\">Sin meses seleccionados se muestran todos</p>\n");

    html.push_str("<button type=\"submit\">Generar análisis</button>\n</form>\n");
}

/// Months to pre-select: defaults on first load, otherwise what was submitted
fn selected_months(params: &MatrixQuery) -> BTreeSet<u32> {
    if params.tickers.is_none() {
        return DEFAULT_MONTHS.iter().copied().collect();
    }
    match MonthFilter::parse(&params.months) {
        Ok(filter) => filter.months().into_iter().collect(),
        Err(_) => BTreeSet::new(),
    }
}

fn render_skipped(html: &mut String, matrix: &CombinedMatrix) {
    if matrix.skipped().is_empty() {
        return;
    }

    html.push_str("<div class=\"notice\">Sin datos para: <ul>\n");
    for skipped in matrix.skipped() {
        let _ = writeln!(
            html,
            "<li><strong>{}</strong>: {}</li>",
            escape(skipped.ticker.as_str()),
            escape(&skipped.reason)
        );
    }
    html.push_str("</ul></div>\n");
}

fn render_table(html: &mut String, matrix: &CombinedMatrix) {
    if matrix.is_empty() {
        html.push_str("<p>No hay datos para los tickers y meses seleccionados.</p>\n");
        return;
    }

    html.push_str("<table>\n<thead>\n<tr><th>Año</th>");
    for label in matrix.column_labels() {
        let _ = write!(html, "<th>{}</th>", escape(&label));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for (year, cells) in matrix.rows() {
        let _ = write!(html, "<tr><th>{}</th>", year);
        for cell in cells {
            match cell {
                Some(cell) => {
                    let style = color_map(cell.text())
                        .unwrap_or_else(|_| CellStyle::for_value(cell.value()));
                    let _ = write!(html, "<td style=\"{}\">{}</td>", style.css(), escape(cell.text()));
                }
                None => html.push_str("<td></td>"),
            }
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table>\n");
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
