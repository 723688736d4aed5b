//! RecordParser: raw extraction lines into records.
//!
//! Both extraction stages emit whitespace-delimited text. A line with too few
//! fields is a [`Error::MalformedRecord`]; the caller skips that line and keeps
//! reading the stream.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::types::{DetailRecord, TopTalkerRecord};

/// Cut a line at its first CR or LF.
pub fn strip_line_end(line: &str) -> &str {
    line.split(['\r', '\n']).next().unwrap_or(line)
}

/// Parse `"<count> <address>"`.
pub fn parse_top_talker_line(line: &str) -> Result<TopTalkerRecord> {
    let line = strip_line_end(line);
    let mut fields = line.split_whitespace();
    let (Some(count), Some(address)) = (fields.next(), fields.next()) else {
        return Err(malformed(line, "expected `<count> <address>`"));
    };
    let count = count
        .parse::<u64>()
        .map_err(|_| malformed(line, "count is not an integer"))?;
    Ok(TopTalkerRecord {
        count,
        address: address.to_string(),
    })
}

/// Parse `"<addr> [<date> <zone>] <url> ..."`. The URL is the fourth field.
pub fn parse_detail_line(line: &str) -> Result<DetailRecord> {
    let line = strip_line_end(line);
    let fields: Vec<&str> = line.split_whitespace().take(4).collect();
    let [address, date, zone, url] = fields[..] else {
        return Err(malformed(
            line,
            &format!("expected at least 4 fields, found {}", fields.len()),
        ));
    };
    Ok(DetailRecord {
        raw: line.to_string(),
        address: address.to_string(),
        timestamp: format!("{date} {zone}"),
        url: url.to_string(),
    })
}

/// Everything before the first `?`, or the whole string when there is none.
pub fn truncate_at_question_mark(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}

/// Everything before the first case-insensitive `where`.
pub fn truncate_at_where_clause(sql: &str) -> &str {
    static WHERE: OnceLock<Regex> = OnceLock::new();
    let re = WHERE.get_or_init(|| Regex::new("(?i)where").expect("static regex"));
    match re.find(sql) {
        Some(m) => &sql[..m.start()],
        None => sql,
    }
}

fn malformed(line: &str, reason: &str) -> Error {
    Error::MalformedRecord {
        line: line.to_string(),
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
