use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::database::models::VenueExpense;
use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Browser exited with {status}: {stderr}")]
    Browser { status: String, stderr: String },

    #[error("Browser did not finish within {0:?}")]
    Timeout(Duration),
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        tracing::error!("Expense report failed: {}", err);
        ApiError::report_download("Failed to download expense report")
    }
}

/// Turns report HTML into PDF bytes
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    /// `name` is a stable file stem; a later render with the same name overwrites it
    async fn render_pdf(&self, name: &str, html: &str) -> Result<Vec<u8>, ReportError>;
}

/// Prints HTML to PDF with a headless Chromium-family browser
pub struct ChromeRenderer {
    report_dir: PathBuf,
    browser_bin: String,
    timeout: Duration,
}

impl ChromeRenderer {
    pub fn new(report_dir: impl Into<PathBuf>, browser_bin: impl Into<String>) -> Self {
        Self {
            report_dir: report_dir.into(),
            browser_bin: browser_bin.into(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[async_trait]
impl ReportRenderer for ChromeRenderer {
    async fn render_pdf(&self, name: &str, html: &str) -> Result<Vec<u8>, ReportError> {
        tokio::fs::create_dir_all(&self.report_dir).await?;
        let html_path = self.report_dir.join(format!("{}.html", name));
        let pdf_path = self.report_dir.join(format!("{}.pdf", name));
        tokio::fs::write(&html_path, html).await?;

        let html_path = tokio::fs::canonicalize(&html_path).await?;
        let mut cmd = Command::new(&self.browser_bin);
        cmd.arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg(format!("--print-to-pdf={}", pdf_path.display()))
            .arg(format!("file://{}", html_path.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            // dropping the future (timeout, client gone) kills the browser
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ReportError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(ReportError::Browser {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(tokio::fs::read(&pdf_path).await?)
    }
}

/// Minimal escaping for text placed into report HTML
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

/// Stable file stem for an expense's report
pub fn report_name(expense: &VenueExpense) -> String {
    format!("expense-{}", expense.id)
}

pub fn render_expense_html(expense: &VenueExpense, venue_name: &str) -> String {
    let month = MONTHS
        .get((expense.month as usize).wrapping_sub(1))
        .copied()
        .unwrap_or("Unknown");

    let rows: String = expense
        .expenses
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "<tr><td>{}</td><td>{}</td><td class=\"amount\">{:.2}</td></tr>",
                i + 1,
                escape_html(&item.description),
                item.amount
            )
        })
        .collect();

    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Expense report</title>\
         <style>body{{font-family:sans-serif;margin:32px}}table{{width:100%;border-collapse:collapse}}\
         td,th{{border:1px solid #ccc;padding:6px}}.amount{{text-align:right}}</style></head>\
         <body><h1>{venue}</h1><h2>Expenses for {month} {year}</h2>\
         <table><thead><tr><th>#</th><th>Description</th><th class=\"amount\">Amount</th></tr></thead>\
         <tbody>{rows}</tbody>\
         <tfoot><tr><th colspan=\"2\">Total</th><th class=\"amount\">{total:.2}</th></tr></tfoot></table>\
         </body></html>",
        venue = escape_html(venue_name),
        month = month,
        year = expense.year,
        rows = rows,
        total = expense.total(),
    )
}
