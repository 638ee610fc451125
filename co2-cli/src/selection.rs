use anyhow::{Context, Result, bail};
use std::{path::Path, str::FromStr};
use tokio::io::AsyncReadExt;

/// 1-based, inclusive range of lines, written `START:END`, `START:` or `:END`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl FromStr for LineRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = match s.split_once(':') {
            Some((start, end)) => (start.trim(), end.trim()),
            None => (s.trim(), s.trim()),
        };

        let start = if start.is_empty() {
            1
        } else {
            start.parse().with_context(|| format!("Invalid start line '{start}'"))?
        };
        let end = if end.is_empty() {
            None
        } else {
            Some(end.parse().with_context(|| format!("Invalid end line '{end}'"))?)
        };

        if start == 0 {
            bail!("Line numbers start at 1");
        }
        if let Some(end) = end.filter(|&end| end < start) {
            bail!("Line range {start}:{end} ends before it starts");
        }

        Ok(Self { start, end })
    }
}

impl LineRange {
    /// The selected lines of `text`, line endings included.
    pub fn apply<'a>(&self, text: &'a str) -> &'a str {
        let mut offset = 0;
        let mut begin = None;

        for (idx, line) in text.split_inclusive('\n').enumerate() {
            let number = idx + 1;
            if number == self.start {
                begin = Some(offset);
            }
            offset += line.len();
            if Some(number) == self.end {
                break;
            }
        }

        match begin {
            Some(begin) => &text[begin..offset],
            None => "",
        }
    }
}

/// Read the selection from `path`, or stdin when `path` is absent or `-`.
pub async fn read(path: Option<&Path>, lines: Option<LineRange>) -> Result<String> {
    let text = match path {
        Some(p) if p != Path::new("-") => tokio::fs::read_to_string(p)
            .await
            .with_context(|| format!("Failed to read {}", p.display()))?,
        _ => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read selection from stdin")?;
            buf
        }
    };

    Ok(match lines {
        Some(range) => range.apply(&text).to_string(),
        None => text,
    })
}
