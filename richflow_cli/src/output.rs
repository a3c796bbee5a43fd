//! Output formatting for command results

use crate::config::OutputConfig;
use crate::error::CliError;
use anyhow::Result;
use richflow_core::Summary;
use serde::Serialize;

/// Output format enumeration
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl OutputFormat {
    /// Parse output format from string
    pub fn from_string(s: &str) -> Result<Self, CliError> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(CliError::UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Serialize)]
struct StatsReport<'a> {
    #[serde(flatten)]
    summary: &'a Summary,
    skipped: usize,
}

/// Renders command results in one output format
pub struct Renderer {
    format: OutputFormat,
    delimiter: String,
    placeholder: String,
}

impl Renderer {
    pub fn new(format: OutputFormat, config: &OutputConfig) -> Self {
        Self {
            format,
            delimiter: config.delimiter.clone(),
            placeholder: config.placeholder.clone(),
        }
    }

    fn cell<'a>(&'a self, value: &'a Option<String>) -> &'a str {
        value.as_deref().unwrap_or(&self.placeholder)
    }

    fn csv<I>(records: I) -> Result<String>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        for record in records {
            writer.write_record(&record)?;
        }
        let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("{e}"))?;
        Ok(String::from_utf8(bytes)?.trim_end().to_string())
    }

    pub fn count(&self, count: usize) -> Result<String> {
        Ok(match self.format {
            OutputFormat::Text | OutputFormat::Csv => count.to_string(),
            OutputFormat::Json => serde_json::json!({ "count": count }).to_string(),
        })
    }

    /// One value per line
    pub fn lines(&self, lines: &[String]) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(lines.join("\n")),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(lines)?),
            OutputFormat::Csv => Self::csv(lines.iter().map(|line| vec![line.clone()])),
        }
    }

    pub fn summary(&self, summary: &Summary, skipped: usize) -> Result<String> {
        match self.format {
            OutputFormat::Text => {
                let show = |value: Option<f64>| value.map_or_else(|| self.placeholder.clone(), |v| v.to_string());
                Ok([
                    format!("count{}{}", self.delimiter, summary.count),
                    format!("sum{}{}", self.delimiter, summary.sum),
                    format!("min{}{}", self.delimiter, show(summary.min)),
                    format!("max{}{}", self.delimiter, show(summary.max)),
                    format!("average{}{}", self.delimiter, show(summary.average)),
                    format!("skipped{}{}", self.delimiter, skipped),
                ]
                .join("\n"))
            }
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&StatsReport { summary, skipped })?),
            OutputFormat::Csv => Self::csv([
                vec![
                    "count".to_string(),
                    "sum".to_string(),
                    "min".to_string(),
                    "max".to_string(),
                    "average".to_string(),
                    "skipped".to_string(),
                ],
                vec![
                    summary.count.to_string(),
                    summary.sum.to_string(),
                    summary.min.map(|v| v.to_string()).unwrap_or_default(),
                    summary.max.map(|v| v.to_string()).unwrap_or_default(),
                    summary.average.map(|v| v.to_string()).unwrap_or_default(),
                    skipped.to_string(),
                ],
            ]),
        }
    }

    /// Single-source windows, one per line
    pub fn blocks(&self, blocks: &[Vec<Option<String>>]) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(blocks
                .iter()
                .map(|block| {
                    block
                        .iter()
                        .map(|value| self.cell(value))
                        .collect::<Vec<_>>()
                        .join(&self.delimiter)
                })
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(blocks)?),
            OutputFormat::Csv => Self::csv(blocks.iter().map(|block| {
                block
                    .iter()
                    .map(|value| value.clone().unwrap_or_default())
                    .collect()
            })),
        }
    }

    /// Interleaved windows: one row per line, windows separated by a blank line
    pub fn rows(&self, windows: &[Vec<Vec<Option<String>>>]) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(windows
                .iter()
                .map(|window| {
                    window
                        .iter()
                        .map(|row| {
                            row.iter()
                                .map(|value| self.cell(value))
                                .collect::<Vec<_>>()
                                .join(&self.delimiter)
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .collect::<Vec<_>>()
                .join("\n\n")),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(windows)?),
            OutputFormat::Csv => Self::csv(windows.iter().enumerate().flat_map(|(index, window)| {
                window.iter().map(move |row| {
                    let mut record = vec![index.to_string()];
                    record.extend(row.iter().map(|value| value.clone().unwrap_or_default()));
                    record
                })
            })),
        }
    }
}
