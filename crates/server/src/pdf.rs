//! Synthesis report rendering. An HTML template is filled with the current
//! aggregates and converted to PDF through wkhtmltopdf when the binary is on
//! PATH; otherwise the HTML itself is served for browser printing.

use std::collections::HashMap;
use std::process::Stdio;

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{error, info, warn};

/// Register the custom Tera filters used by report templates.
///
/// - `pct`: one-decimal percentage rendering, e.g. `kpis.pct_water | pct`
/// - `round1`: one-decimal rounding for scores and means
pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("pct", tera_pct_filter);
    tera.register_filter("round1", tera_round1_filter);
}

fn tera_pct_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let num = value.as_f64().unwrap_or(0.0);
    Ok(tera::Value::String(format!("{num:.1}%")))
}

fn tera_round1_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let num = value.as_f64().unwrap_or(0.0);
    Ok(tera::Value::String(format!("{num:.1}")))
}

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("template error: {0}")]
    Template(String),
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug)]
pub struct ReportRenderer {
    tera: Tera,
    wkhtmltopdf_path: Option<String>,
}

impl ReportRenderer {
    /// Load report templates from a directory on disk.
    pub fn new(template_dir: &str) -> Result<Self, PdfError> {
        let mut tera = Tera::new(&format!("{template_dir}/**/*"))
            .map_err(|e| PdfError::Template(e.to_string()))?;
        register_template_filters(&mut tera);

        let wkhtmltopdf_path = detect_wkhtmltopdf();
        Ok(Self { tera, wkhtmltopdf_path })
    }

    /// Renderer backed by the templates compiled into the binary. Used as
    /// fallback when no template directory is configured.
    pub fn with_embedded_templates() -> Self {
        let mut tera = Tera::default();
        register_template_filters(&mut tera);

        tera.add_raw_template(
            "summary.html.tera",
            include_str!("../../../templates/report/summary.html.tera"),
        )
        .expect("embedded summary template must parse");

        Self { tera, wkhtmltopdf_path: detect_wkhtmltopdf() }
    }

    /// Render the synthesis report. Returns PDF bytes when wkhtmltopdf is
    /// available and conversion succeeds, HTML otherwise.
    pub async fn generate_summary(
        &self,
        report_data: &serde_json::Value,
    ) -> Result<PdfResult, PdfError> {
        let html = self.render_summary_html(report_data)?;

        if let Some(ref wkhtmltopdf) = self.wkhtmltopdf_path {
            match self.convert_html_to_pdf(&html, wkhtmltopdf).await {
                Ok(pdf_bytes) => Ok(PdfResult::Pdf(pdf_bytes)),
                Err(e) => {
                    warn!(error = %e, "PDF conversion failed, falling back to HTML");
                    Ok(PdfResult::Html(html))
                }
            }
        } else {
            Ok(PdfResult::Html(html))
        }
    }

    pub fn render_summary_html(&self, report_data: &serde_json::Value) -> Result<String, PdfError> {
        let mut context = Context::new();
        context.insert("report", report_data);
        context.insert(
            "kpis",
            &report_data.get("kpis").cloned().unwrap_or(serde_json::json!({})),
        );
        context.insert(
            "zones",
            &report_data.get("zones").cloned().unwrap_or(serde_json::json!([])),
        );
        context.insert(
            "insights",
            &report_data.get("insights").cloned().unwrap_or(serde_json::json!([])),
        );

        self.tera
            .render("summary.html.tera", &context)
            .map_err(|e| PdfError::Template(e.to_string()))
    }

    async fn convert_html_to_pdf(
        &self,
        html: &str,
        wkhtmltopdf_path: &str,
    ) -> Result<Vec<u8>, PdfError> {
        let temp_dir = std::env::temp_dir();
        let html_path = temp_dir.join(format!("report_{}.html", uuid::Uuid::new_v4()));
        let pdf_path = temp_dir.join(format!("report_{}.pdf", uuid::Uuid::new_v4()));

        tokio::fs::write(&html_path, html).await?;

        let output = Command::new(wkhtmltopdf_path)
            .arg("--page-size")
            .arg("A4")
            .arg("--margin-top")
            .arg("10mm")
            .arg("--margin-bottom")
            .arg("10mm")
            .arg("--margin-left")
            .arg("10mm")
            .arg("--margin-right")
            .arg("10mm")
            .arg("--encoding")
            .arg("utf-8")
            .arg("--enable-local-file-access")
            .arg(&html_path)
            .arg(&pdf_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(stderr = %stderr, "wkhtmltopdf failed");
            return Err(PdfError::Conversion(stderr.to_string()));
        }

        let pdf_bytes = tokio::fs::read(&pdf_path).await?;

        let _ = tokio::fs::remove_file(&html_path).await;
        let _ = tokio::fs::remove_file(&pdf_path).await;

        info!(size = pdf_bytes.len(), "report PDF generated");

        Ok(pdf_bytes)
    }
}

fn detect_wkhtmltopdf() -> Option<String> {
    let path = which::which("wkhtmltopdf").ok().map(|p| p.to_string_lossy().to_string());
    match &path {
        Some(found) => info!(path = %found, "wkhtmltopdf found"),
        None => warn!("wkhtmltopdf not found in PATH, reports will be served as HTML"),
    }
    path
}

pub enum PdfResult {
    Pdf(Vec<u8>),
    Html(String),
}

impl PdfResult {
    pub fn into_response(self, filename: &str) -> Response {
        match self {
            PdfResult::Pdf(bytes) => Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "application/pdf")
                .header(
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                )
                .body(Body::from(bytes))
                .unwrap(),
            PdfResult::Html(html) => Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
                .body(Body::from(html))
                .unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_fixture() -> serde_json::Value {
        serde_json::json!({
            "generated_at": "2025-06-30T12:00:00Z",
            "period": { "start": "2025-03-04", "end": "2025-06-20" },
            "zone_count": 6,
            "kpis": {
                "pct_water": 46.7,
                "pct_sanitation": 26.7,
                "pct_schooling": 63.3,
                "pct_multi_need": 40.0,
                "surveyed": 30,
                "target": 1000,
            },
            "zones": [
                {
                    "zone": "Vekky",
                    "household_count": 5,
                    "high_vuln_pct": 60.0,
                    "no_sanitation_pct": 100.0,
                    "mean_need_count": 3.2,
                    "score": 68.4,
                }
            ],
            "insights": [
                { "level": "critical", "message": "Improved water access below 50%." }
            ],
        })
    }

    #[test]
    fn summary_template_renders_kpis_zones_and_insights() {
        let renderer = ReportRenderer::with_embedded_templates();

        let html = renderer.render_summary_html(&report_fixture()).expect("render summary");

        assert!(html.contains("46.7%"));
        assert!(html.contains("Vekky"));
        assert!(html.contains("below 50%"));
    }

    #[tokio::test]
    async fn generate_falls_back_to_html_without_wkhtmltopdf() {
        let mut renderer = ReportRenderer::with_embedded_templates();
        renderer.wkhtmltopdf_path = None;

        let result = renderer.generate_summary(&report_fixture()).await.expect("generate");

        match result {
            PdfResult::Html(html) => assert!(html.contains("Vekky")),
            PdfResult::Pdf(_) => panic!("expected HTML result when wkhtmltopdf is unavailable"),
        }
    }
}
