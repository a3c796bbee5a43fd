//! Command implementations over text files
//!
//! Every input file is a line source; several files are merged into one
//! root in the order given.

use anyhow::{Context, Result};
use richflow_core::{Boundary, FlowConfig, LineSource, Row, SourceFlow, Summary, Window};
use std::cmp::Ordering;
use std::path::PathBuf;

/// Options for the sort command
#[derive(Debug, Clone, Copy, Default)]
pub struct SortOptions {
    pub descending: bool,
    pub numeric: bool,
    pub unique: bool,
}

/// Open every file as a line source and merge them into one root
pub fn open_root(files: &[PathBuf], config: &FlowConfig) -> Result<SourceFlow<String>> {
    let Some((first, rest)) = files.split_first() else {
        anyhow::bail!("At least one input file is required");
    };

    let open = |path: &PathBuf| {
        LineSource::open(path).with_context(|| format!("Failed to open {}", path.display()))
    };

    let root = SourceFlow::with_config(open(first)?, config.clone());
    for path in rest {
        root.merge(open(path)?)?;
    }
    log::debug!("Opened {} input file(s)", root.source_count());
    Ok(root)
}

pub fn count(root: &SourceFlow<String>, non_empty: bool) -> usize {
    if non_empty {
        root.filter(|line| !line.trim().is_empty()).count()
    } else {
        root.count()
    }
}

pub fn head(root: &SourceFlow<String>, lines: usize) -> Result<Vec<String>> {
    Ok(root.limit(lines).context("Invalid line count")?.to_vec())
}

/// Numbers before text; numbers compare numerically, text lexically
///
/// `NaN` lines count as text.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    match (number(a), number(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn number(line: &str) -> Option<f64> {
    line.trim().parse::<f64>().ok().filter(|x| !x.is_nan())
}

pub fn sort(root: &SourceFlow<String>, options: SortOptions) -> Vec<String> {
    let SortOptions {
        descending,
        numeric,
        unique,
    } = options;

    let sorted = root.order_by(move |a: &String, b: &String| {
        let ordering = if numeric {
            compare_numeric(a, b)
        } else {
            a.cmp(b)
        };
        if descending { ordering.reverse() } else { ordering }
    });

    let mut lines = sorted.to_vec();
    if unique {
        lines.dedup();
    }
    lines
}

/// Summary of the numeric lines and the number of lines that were not numbers
pub fn stats(root: &SourceFlow<String>) -> (Summary, usize) {
    let parsed = root.map(|line| number(&line));
    let skipped = parsed.filter(Option::is_none).count();
    if skipped > 0 {
        log::warn!("Skipped {skipped} non-numeric line(s)");
    }
    (parsed.flatten().summarize(), skipped)
}

/// Fixed-size blocks per file, or blocks closed by a line containing `break_on`
pub fn windows(
    root: &SourceFlow<String>,
    size: usize,
    break_on: Option<String>,
) -> Result<Vec<Vec<Option<String>>>> {
    let boundary = match break_on {
        Some(pattern) => Boundary::when(move |line: &Option<String>, _| {
            line.as_ref().is_none_or(|line| line.contains(&pattern))
        }),
        None => Boundary::count(size).context("Invalid window size")?,
    };

    Ok(root
        .discretize(boundary, false)?
        .map(Window::into_vec)
        .to_vec())
}

/// Rows taking one line from each of the first `span` files, grouped `size` rows per window
pub fn interleave(
    root: &SourceFlow<String>,
    size: usize,
    span: Option<usize>,
) -> Result<Vec<Vec<Row<String>>>> {
    let span = span.unwrap_or_else(|| root.source_count());
    let boundary = Boundary::count(size).context("Invalid window size")?;

    Ok(root
        .discretize_span(span, boundary, false)
        .context("Invalid span")?
        .map(Window::into_vec)
        .to_vec())
}
