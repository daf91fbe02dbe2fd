//! Movie recommendation lines
//!
//! Grammar, one recommendation per line:
//!
//! ```text
//! [list marker] 《Title》 (Year) [Genre] <sep> description
//! ```
//!
//! The year parentheses may be ASCII or full-width, `<sep>` is one of
//! `- – — : ：`, and the description may be empty.

use regex::Regex;
use std::sync::LazyLock;

use super::MAX_EXTRACTED;
use crate::models::{MISSING_DESCRIPTION, MovieRecommendation};

static MOVIE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:\d+[.)、]|[-*•])\s*)?(?:\*\*)?《([^》]+)》\s*[(（](\d{4})[)）]\s*\[([^\]]+)\](?:\*\*)?\s*(?:[-–—:：]\s*(.*))?$",
    )
    .expect("movie line pattern is valid")
});

/// Parse one line; `None` if it does not follow the grammar
pub fn parse_movie_line(line: &str) -> Option<MovieRecommendation> {
    let caps = MOVIE_LINE_RE.captures(line)?;

    let title = caps.get(1)?.as_str().trim();
    let genre = caps.get(3)?.as_str().trim();
    if title.is_empty() || genre.is_empty() {
        return None;
    }

    let description = caps
        .get(4)
        .map(|d| d.as_str().trim())
        .filter(|d| !d.is_empty())
        .unwrap_or(MISSING_DESCRIPTION);

    Some(MovieRecommendation {
        title: title.to_string(),
        year: caps.get(2)?.as_str().to_string(),
        genre: genre.to_string(),
        description: description.to_string(),
    })
}

/// Collect up to four recommendations from `reply`, in line order
pub fn extract_movies(reply: &str) -> Vec<MovieRecommendation> {
    reply
        .lines()
        .filter_map(parse_movie_line)
        .take(MAX_EXTRACTED)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_well_formed_line() {
        let movie = parse_movie_line("《Interstellar》(2014)[Sci-Fi] - A journey through a wormhole.")
            .expect("line should parse");
        assert_eq!(movie.title, "Interstellar");
        assert_eq!(movie.year, "2014");
        assert_eq!(movie.genre, "Sci-Fi");
        assert_eq!(movie.description, "A journey through a wormhole.");
    }

    #[test]
    fn test_accepts_list_markers_bold_and_fullwidth_punctuation() {
        let movie = parse_movie_line("1. **《星际穿越》（2014）[科幻]**：穿越虫洞的旅程").unwrap();
        assert_eq!(movie.title, "星际穿越");
        assert_eq!(movie.year, "2014");
        assert_eq!(movie.genre, "科幻");
        assert_eq!(movie.description, "穿越虫洞的旅程");

        assert!(parse_movie_line("- 《Arrival》 (2016) [Drama] — Linguistics and aliens").is_some());
    }

    #[test]
    fn test_empty_description_gets_placeholder() {
        let movie = parse_movie_line("《Dune》(2021)[Sci-Fi] -").unwrap();
        assert_eq!(movie.description, MISSING_DESCRIPTION);

        let movie = parse_movie_line("《Dune》(2021)[Sci-Fi]").unwrap();
        assert_eq!(movie.description, MISSING_DESCRIPTION);
    }

    #[test]
    fn test_rejects_malformed_lines() {
        assert!(parse_movie_line("Interstellar (2014) [Sci-Fi] - no angle brackets").is_none());
        assert!(parse_movie_line("《Interstellar》(14)[Sci-Fi] - short year").is_none());
        assert!(parse_movie_line("《Interstellar》(2014) - no genre").is_none());
        assert!(parse_movie_line("Here are some picks:").is_none());
    }

    #[test]
    fn test_extract_caps_at_four_in_order() {
        let reply = "Here you go:\n\
            《A》(2001)[Drama] - one\n\
            chatter in between\n\
            《B》(2002)[Drama] - two\n\
            《C》(2003)[Drama] - three\n\
            《D》(2004)[Drama] - four\n\
            《E》(2005)[Drama] - five\n";
        let titles: Vec<_> = extract_movies(reply).into_iter().map(|m| m.title).collect();
        assert_eq!(titles, ["A", "B", "C", "D"]);
    }
}
