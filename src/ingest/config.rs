// src/ingest/config.rs
//! Topic list override, read from the file named by `INGEST_TOPICS_PATH`.
//!
//! The extension picks the format:
//! - `.toml`: `topics = ["chess", "yoga"]`
//! - `.json`: `["chess", "yoga"]` or `{"topics": [...]}`
//! - `.txt` or none: one topic per line, `#` starts a comment line

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::ingest::topics::TopicScheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicFormat {
    Toml,
    Json,
    Lines,
}

impl TopicFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            Some("txt") | None => Ok(Self::Lines),
            Some(other) => bail!("unsupported topics file extension `.{other}` ({})", path.display()),
        }
    }
}

#[derive(Deserialize)]
struct TopicsTable {
    topics: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonTopics {
    List(Vec<String>),
    Table(TopicsTable),
}

/// Parses and cleans a topic list. A list that ends up empty is an error:
/// a configured file must not silently fall back to the built-in topics.
pub fn parse_topics(content: &str, format: TopicFormat) -> Result<Vec<String>> {
    let raw = match format {
        TopicFormat::Toml => {
            toml::from_str::<TopicsTable>(content)
                .context("expected `topics = [\"...\"]`")?
                .topics
        }
        TopicFormat::Json => match serde_json::from_str::<JsonTopics>(content)
            .context("expected a JSON array of strings or {\"topics\": [...]}")?
        {
            JsonTopics::List(v) => v,
            JsonTopics::Table(t) => t.topics,
        },
        TopicFormat::Lines => content
            .lines()
            .filter(|l| !l.trim_start().starts_with('#'))
            .map(str::to_string)
            .collect(),
    };

    let topics = dedup_topics(raw);
    if topics.is_empty() {
        bail!("no topics listed");
    }
    Ok(topics)
}

/// Reads `path` and builds the scheduler over its topics.
pub fn load_topics(path: &Path) -> Result<TopicScheduler> {
    let format = TopicFormat::from_path(path)?;
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading topics from {}", path.display()))?;
    let topics =
        parse_topics(&content, format).with_context(|| format!("topics file {}", path.display()))?;
    TopicScheduler::new(topics)
}

/// Search is case-insensitive, so "NASA" and "nasa" are one topic; the first spelling wins.
fn dedup_topics(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn format_follows_the_extension() {
        assert_eq!(TopicFormat::from_path(Path::new("t.TOML")).unwrap(), TopicFormat::Toml);
        assert_eq!(TopicFormat::from_path(Path::new("t.json")).unwrap(), TopicFormat::Json);
        assert_eq!(TopicFormat::from_path(Path::new("t.txt")).unwrap(), TopicFormat::Lines);
        assert_eq!(TopicFormat::from_path(Path::new("topics")).unwrap(), TopicFormat::Lines);
        assert!(TopicFormat::from_path(Path::new("t.yaml")).is_err());
    }

    #[test]
    fn each_format_parses_and_dedups_case_insensitively() {
        let toml = r#"topics = [" space   exploration ", "", "NASA", "nasa"]"#;
        assert_eq!(
            parse_topics(toml, TopicFormat::Toml).unwrap(),
            topics(&["space exploration", "NASA"])
        );

        assert_eq!(
            parse_topics(r#"["yoga", "  boxing  ", ""]"#, TopicFormat::Json).unwrap(),
            topics(&["yoga", "boxing"])
        );
        assert_eq!(
            parse_topics(r#"{"topics": ["chess"]}"#, TopicFormat::Json).unwrap(),
            topics(&["chess"])
        );

        let lines = "# sports\nfootball\n\n  tennis \n#music\njazz\n";
        assert_eq!(
            parse_topics(lines, TopicFormat::Lines).unwrap(),
            topics(&["football", "tennis", "jazz"])
        );
    }

    #[test]
    fn wrong_shape_for_the_extension_is_an_error() {
        assert!(parse_topics(r#"["chess"]"#, TopicFormat::Toml).is_err());
        assert!(parse_topics(r#"topics = ["chess"]"#, TopicFormat::Json).is_err());
    }

    #[test]
    fn file_without_topics_is_an_error() {
        assert!(parse_topics("topics = []", TopicFormat::Toml).is_err());
        assert!(parse_topics(r#"["", "  "]"#, TopicFormat::Json).is_err());
        assert!(parse_topics("# nothing yet\n\n", TopicFormat::Lines).is_err());
    }

    #[test]
    fn load_reads_the_file_into_a_scheduler() {
        let dir = tempfile::tempdir().unwrap();

        let p = dir.path().join("topics.toml");
        fs::write(&p, r#"topics = ["chess", "yoga"]"#).unwrap();
        let sched = load_topics(&p).unwrap();
        assert_eq!(sched.topics(), topics(&["chess", "yoga"]).as_slice());

        let empty = dir.path().join("empty.json");
        fs::write(&empty, "[]").unwrap();
        let err = load_topics(&empty).unwrap_err();
        assert!(format!("{err:#}").contains("no topics"), "{err:#}");

        assert!(load_topics(&dir.path().join("missing.txt")).is_err());
    }
}
