// SRT subtitle format
use super::SubtitleEntry;
use crate::error::{Result, SubtransError};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

fn timing_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(\d+):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d+):(\d{2}):(\d{2})[,.](\d{3})",
        )
        .expect("timing regex is valid")
    })
}

/// Parse SRT text into entries numbered by position.
pub fn parse(input: &str) -> Result<Vec<SubtitleEntry>> {
    let normalized = input
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut entries = Vec::new();
    let mut lines = normalized.lines().peekable();

    loop {
        while lines.peek().is_some_and(|l| l.trim().is_empty()) {
            lines.next();
        }
        let Some(index_line) = lines.next() else {
            break;
        };
        let block = entries.len() + 1;

        if index_line.trim().parse::<usize>().is_err() {
            return Err(SubtransError::Format(format!(
                "block {}: expected a numeric index, found {:?}",
                block, index_line
            )));
        }

        let timing_line = lines.next().ok_or_else(|| {
            SubtransError::Format(format!("block {}: missing timing line", block))
        })?;
        let (start, end) = parse_timing(timing_line).ok_or_else(|| {
            SubtransError::Format(format!(
                "block {}: invalid timing line {:?}",
                block, timing_line
            ))
        })?;

        let mut text_lines = Vec::new();
        while let Some(line) = lines.peek() {
            if line.trim().is_empty() {
                break;
            }
            text_lines.push(*line);
            lines.next();
        }

        entries.push(SubtitleEntry {
            index: block,
            start,
            end,
            text: text_lines.join("\n"),
        });
    }

    Ok(entries)
}

/// Serialize entries as SRT. Entries are renumbered by position and blank
/// lines inside a text are dropped, so the output always parses back.
pub fn format(entries: &[SubtitleEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let text = entry
                .text
                .lines()
                .filter(|l| !l.trim().is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "{}\n{} --> {}\n{}\n",
                i + 1,
                format_timestamp(entry.start),
                format_timestamp(entry.end),
                text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_timing(line: &str) -> Option<(Duration, Duration)> {
    let caps = timing_regex().captures(line)?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());

    let start = to_duration(field(1)?, field(2)?, field(3)?, field(4)?)?;
    let end = to_duration(field(5)?, field(6)?, field(7)?, field(8)?)?;
    Some((start, end))
}

/// `None` when the hour field is too large to represent.
fn to_duration(hours: u64, minutes: u64, seconds: u64, millis: u64) -> Option<Duration> {
    let secs = hours
        .checked_mul(3600)?
        .checked_add(minutes * 60 + seconds)?;
    Duration::from_secs(secs).checked_add(Duration::from_millis(millis))
}

fn format_timestamp(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = d.subsec_millis();
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}
