//! Plain-text rendering for the non-interactive subcommands.

use crate::content::ContentSummary;
use crate::identity::UserId;
use crate::metrics::ErrorRecord;
use crate::results::{SessionRow, TypoCount, UserSummary};
use itertools::Itertools;

pub fn display_char(c: char) -> String {
    match c {
        ' ' => "space".to_string(),
        '\t' => "tab".to_string(),
        '\n' => "newline".to_string(),
        c => format!("'{c}'"),
    }
}

pub fn describe_typo(expected: char, actual: Option<char>) -> String {
    match actual {
        Some(actual) => format!("{} -> {}", display_char(expected), display_char(actual)),
        None => format!("{} -> skipped", display_char(expected)),
    }
}

pub fn describe_error(error: &ErrorRecord) -> String {
    format!(
        "#{} {}",
        error.position + 1,
        describe_typo(error.expected, error.actual)
    )
}

pub fn catalog_table(entries: &[ContentSummary]) -> String {
    if entries.is_empty() {
        return "no practice texts available".to_string();
    }
    let id_width = entries.iter().map(|e| e.id.len()).max().unwrap_or(0);
    entries
        .iter()
        .map(|e| {
            format!(
                "{:<id_width$}  {:<6}  {:>4} chars  {}",
                e.id,
                e.difficulty.to_string(),
                e.char_count,
                e.title
            )
        })
        .join("\n")
}

fn typo_line(typo: &TypoCount) -> String {
    format!("  {} ({}x)", describe_typo(typo.expected, typo.actual), typo.count)
}

pub fn summary_text(user: &UserId, summary: &UserSummary) -> String {
    if summary.total_practices == 0 {
        return format!("{user}: no practice sessions yet, finish one and check again");
    }

    let mut lines = vec![
        format!("{user}: {} practice sessions", summary.total_practices),
        format!("average speed: {} cpm", summary.avg_speed.round()),
        format!("average accuracy: {:.1}%", summary.avg_accuracy),
    ];
    if summary.top_typos.is_empty() {
        lines.push("no typos recorded".to_string());
    } else {
        lines.push("most frequent typos:".to_string());
        lines.extend(summary.top_typos.iter().map(typo_line));
    }
    lines.join("\n")
}

pub fn history_table(sessions: &[SessionRow]) -> String {
    if sessions.is_empty() {
        return "no practice sessions yet".to_string();
    }
    sessions
        .iter()
        .map(|s| {
            format!(
                "{}  {:<12}  {:>4} cpm  {:>5.1}%  {} errors",
                s.finished_at.format("%Y-%m-%d %H:%M"),
                s.content_id,
                s.speed,
                s.accuracy,
                s.error_count
            )
        })
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Difficulty;
    use chrono::{Local, TimeZone};

    #[test]
    fn test_describe_typo() {
        assert_eq!(describe_typo('t', Some('y')), "'t' -> 'y'");
        assert_eq!(describe_typo(' ', None), "space -> skipped");
    }

    #[test]
    fn test_describe_error_is_one_based() {
        let e = ErrorRecord {
            position: 2,
            expected: 't',
            actual: Some('x'),
        };
        assert_eq!(describe_error(&e), "#3 't' -> 'x'");
    }

    #[test]
    fn test_catalog_table() {
        let rows = vec![
            ContentSummary {
                id: "a".into(),
                title: "Alpha".into(),
                difficulty: Difficulty::Easy,
                char_count: 12,
            },
            ContentSummary {
                id: "long-id".into(),
                title: "Beta".into(),
                difficulty: Difficulty::Hard,
                char_count: 300,
            },
        ];

        let table = catalog_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("a        easy"));
        assert!(lines[1].contains(" 300 chars  Beta"));
        assert_eq!(catalog_table(&[]), "no practice texts available");
    }

    #[test]
    fn test_summary_text() {
        let user = UserId::new("neo").unwrap();
        let summary = UserSummary {
            total_practices: 2,
            avg_speed: 230.4,
            avg_accuracy: 96.25,
            top_typos: vec![TypoCount {
                expected: 'e',
                actual: None,
                count: 4,
            }],
        };

        let text = summary_text(&user, &summary);
        assert!(text.contains("neo: 2 practice sessions"));
        assert!(text.contains("average speed: 230 cpm"));
        assert!(text.contains("'e' -> skipped (4x)"));
    }

    #[test]
    fn test_summary_text_without_sessions() {
        let user = UserId::new("neo").unwrap();
        let summary = UserSummary {
            total_practices: 0,
            avg_speed: 0.0,
            avg_accuracy: 0.0,
            top_typos: vec![],
        };

        assert!(summary_text(&user, &summary).contains("no practice sessions yet"));
    }

    #[test]
    fn test_history_table() {
        let row = SessionRow {
            id: 1,
            content_id: "proverb-01".into(),
            speed: 210,
            accuracy: 97.5,
            error_count: 1,
            finished_at: Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap(),
        };

        let table = history_table(&[row]);
        assert!(table.starts_with("2024-03-09 14:05  proverb-01"));
        assert!(table.contains(" 210 cpm"));
        assert!(table.contains(" 97.5%"));
    }
}
