//! Rendering of a [`CorrelationMatrix`]: a static PNG heatmap and a
//! self-contained HTML page with hover highlighting.

use anyhow::{Context, Result};
use plotters::prelude::*;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::analyzers::types::CorrelationMatrix;
use crate::output::write_records;

pub const MATRIX_CSV: &str = "correlation_matrix.csv";
pub const HEATMAP_PNG: &str = "correlation_heatmap.png";
pub const MATRIX_HTML: &str = "correlation_matrix.html";

const NEGATIVE: (u8, u8, u8) = (33, 102, 172);
const POSITIVE: (u8, u8, u8) = (178, 24, 43);
const UNDEFINED: (u8, u8, u8) = (200, 200, 200);

/// Diverging blue/white/red scale over `[-1, 1]`; grey for NaN.
pub fn cell_rgb(r: f64) -> (u8, u8, u8) {
    if !r.is_finite() {
        return UNDEFINED;
    }
    let t = r.clamp(-1.0, 1.0);
    let (base, k) = if t >= 0.0 { (POSITIVE, t) } else { (NEGATIVE, -t) };
    let fade = |c: u8| (255.0 - (255.0 - f64::from(c)) * k).round() as u8;
    (fade(base.0), fade(base.1), fade(base.2))
}

/// Writes the matrix as CSV with the column names as the first row and column.
pub fn write_matrix_csv(path: &Path, matrix: &CorrelationMatrix) -> Result<()> {
    let mut headers = vec![""];
    headers.extend(matrix.names.iter().map(String::as_str));

    let rows = matrix.names.iter().zip(&matrix.r).map(|(name, row)| {
        let mut cells = vec![name.clone()];
        cells.extend(row.iter().map(|r| format!("{r:.4}")));
        cells
    });
    write_records(path, &headers, rows)
}

/// Renders the matrix as a PNG heatmap with the coefficient printed per cell.
pub fn render_png(path: &Path, matrix: &CorrelationMatrix) -> Result<()> {
    let k = matrix.len() as u32;
    let side = 160 + 70 * k.max(1);
    let root = BitMapBackend::new(path, (side + 40, side)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Pearson correlation", ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(110)
        .y_label_area_size(130)
        .build_cartesian_2d((0..k).into_segmented(), (0..k).into_segmented())?;

    let label = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) => matrix.names.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    };
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(k as usize)
        .y_labels(k as usize)
        .x_label_formatter(&label)
        .y_label_formatter(&label)
        .x_label_style(("sans-serif", 13).into_font().transform(FontTransform::Rotate90))
        .y_label_style(("sans-serif", 13))
        .draw()?;

    // rows run top to bottom, so row i sits at y = k - 1 - i
    let cells = (0..k).flat_map(|i| (0..k).map(move |j| (i, j)));
    chart.draw_series(cells.clone().map(|(i, j)| {
        let r = matrix.r[i as usize][j as usize];
        let (red, green, blue) = cell_rgb(r);
        let y = k - 1 - i;
        Rectangle::new(
            [
                (SegmentValue::Exact(j), SegmentValue::Exact(y)),
                (SegmentValue::Exact(j + 1), SegmentValue::Exact(y + 1)),
            ],
            RGBColor(red, green, blue).filled(),
        )
    }))?;
    chart.draw_series(cells.map(|(i, j)| {
        let r = matrix.r[i as usize][j as usize];
        let text = if r.is_finite() { format!("{r:.2}") } else { "n/a".to_string() };
        Text::new(
            text,
            (SegmentValue::CenterOf(j), SegmentValue::CenterOf(k - 1 - i)),
            ("sans-serif", 13).into_font().color(&BLACK),
        )
    }))?;

    root.present()
        .with_context(|| format!("failed to write {path:?}"))?;
    Ok(())
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Builds a standalone HTML page: colored table, per-cell tooltips with `n`,
/// row/column highlighting on hover, and the raw matrix embedded as JSON.
pub fn render_html(matrix: &CorrelationMatrix) -> Result<String> {
    let data = serde_json::to_string(matrix)?.replace("</", "<\\/");

    let mut table = String::from("<table>\n<tr><th></th>");
    for (j, name) in matrix.names.iter().enumerate() {
        table.push_str(&format!("<th data-col=\"{j}\">{}</th>", escape_html(name)));
    }
    table.push_str("</tr>\n");

    for (i, row_name) in matrix.names.iter().enumerate() {
        table.push_str(&format!("<tr><th data-row=\"{i}\">{}</th>", escape_html(row_name)));
        for (j, col_name) in matrix.names.iter().enumerate() {
            let r = matrix.r[i][j];
            let (red, green, blue) = cell_rgb(r);
            let text = if r.is_finite() { format!("{r:.2}") } else { "n/a".to_string() };
            table.push_str(&format!(
                "<td data-row=\"{i}\" data-col=\"{j}\" style=\"background:rgb({red},{green},{blue})\" \
                 title=\"{} / {}: r = {text}, n = {}\">{text}</td>",
                escape_html(row_name),
                escape_html(col_name),
                matrix.n[i][j],
            ));
        }
        table.push_str("</tr>\n");
    }
    table.push_str("</table>");

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Pearson correlation</title>
<style>
body {{ font-family: sans-serif; margin: 2em; }}
table {{ border-collapse: collapse; }}
th, td {{ padding: 6px 10px; text-align: center; border: 1px solid #ddd; }}
td {{ cursor: default; min-width: 3.5em; }}
.hl {{ outline: 2px solid #333; }}
</style>
</head>
<body>
<h1>Pearson correlation</h1>
{table}
<script id="matrix-data" type="application/json">{data}</script>
<script>
document.querySelectorAll("td").forEach(function (cell) {{
  var row = cell.dataset.row, col = cell.dataset.col;
  var peers = document.querySelectorAll('[data-row="' + row + '"], [data-col="' + col + '"]');
  cell.addEventListener("mouseenter", function () {{
    peers.forEach(function (p) {{ p.classList.add("hl"); }});
  }});
  cell.addEventListener("mouseleave", function () {{
    peers.forEach(function (p) {{ p.classList.remove("hl"); }});
  }});
}});
</script>
</body>
</html>
"#
    ))
}

/// Writes the CSV, PNG and HTML artifacts into `out_dir`.
pub fn write_artifacts(out_dir: &Path, matrix: &CorrelationMatrix) -> Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("failed to create {out_dir:?}"))?;

    let csv_path = out_dir.join(MATRIX_CSV);
    write_matrix_csv(&csv_path, matrix)?;

    let png_path = out_dir.join(HEATMAP_PNG);
    render_png(&png_path, matrix).with_context(|| format!("failed to render {png_path:?}"))?;

    let html_path = out_dir.join(MATRIX_HTML);
    fs::write(&html_path, render_html(matrix)?)
        .with_context(|| format!("failed to write {html_path:?}"))?;

    info!(out_dir = ?out_dir, "Correlation artifacts saved");
    Ok(())
}
