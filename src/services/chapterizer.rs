use crate::models::ChapterMap;
use regex::Regex;

#[derive(Debug, Clone, Copy)]
enum TitleSource {
    /// Second capture group holds the title.
    Captured,
    /// Heading has no title; use "Chapter N".
    Synthetic,
}

// Applied in order. A later match for the same number replaces the earlier
// title, and chapter scoping depends on whichever title won.
const HEADING_PATTERNS: [(&str, TitleSource); 4] = [
    (r"(?i)\bChapter[ \t]+(\d+)[ \t:\-]+([^\n]+)", TitleSource::Captured), // Chapter 1: Title
    (r"(?i)\bCHAPTER[ \t]+(\d+)[ \t:\-]+([^\n]+)", TitleSource::Captured), // CHAPTER 1: Title
    (r"(?im)\bCHAPTER[ \t]+(\d+)[ \t:\-]*\r?$", TitleSource::Synthetic),   // CHAPTER 1
    (r"(?i)\bSection[ \t]+(\d+)[ \t:\-]+([^\n]+)", TitleSource::Captured), // Section 1: Title
];

/// Scans `text` for chapter headings and returns chapter number -> title.
///
/// An empty map means the document has no recognisable chapter structure.
pub fn detect_chapters(text: &str) -> ChapterMap {
    let mut chapters = ChapterMap::new();

    let regexes: Vec<(Regex, TitleSource)> = HEADING_PATTERNS
        .iter()
        .filter_map(|(pattern, source)| Regex::new(pattern).ok().map(|re| (re, *source)))
        .collect();

    for (regex, source) in &regexes {
        for captures in regex.captures_iter(text) {
            let Some(number) = captures
                .get(1)
                .and_then(|num_match| num_match.as_str().parse::<u32>().ok())
            else {
                tracing::debug!("skipping heading with out-of-range number: {:?}", &captures[0]);
                continue;
            };

            let title = match source {
                TitleSource::Captured => captures
                    .get(2)
                    .map(|title_match| title_match.as_str().trim())
                    .filter(|title| !title.is_empty())
                    .map(str::to_string),
                TitleSource::Synthetic => None,
            }
            .unwrap_or_else(|| format!("Chapter {}", number));

            chapters.insert(number, title);
        }
    }

    tracing::debug!("detected {} chapters", chapters.len());
    chapters
}

/// Returns the text of one chapter: from its "Chapter N: Title" heading up to
/// the next "Chapter N:" heading or the end of `full_text`.
///
/// Falls back to the whole of `full_text` when the chapter is unknown or its
/// reconstructed heading does not occur verbatim, which happens for chapters
/// found through the bare "CHAPTER N" or "Section N" patterns.
pub fn select_chapter_text(full_text: &str, chapter_number: u32, chapters: &ChapterMap) -> String {
    let Some(title) = chapters.get(&chapter_number) else {
        return full_text.to_string();
    };

    let heading = format!("Chapter {}: {}", chapter_number, title);
    let pattern = format!(r"(?is){}(.*?)(?:Chapter\s+\d+:|$)", regex::escape(&heading));

    match Regex::new(&pattern) {
        Ok(regex) => {
            if let Some(body) = regex.captures(full_text).and_then(|captures| captures.get(1)) {
                return body.as_str().trim().to_string();
            }
            tracing::warn!(
                "heading {:?} not found verbatim, using the full document as context",
                heading
            );
        }
        Err(e) => {
            tracing::warn!("could not build chapter pattern for {:?}: {}", heading, e);
        }
    }

    full_text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(u32, &str)]) -> ChapterMap {
        entries.iter().map(|(n, t)| (*n, t.to_string())).collect()
    }

    #[test]
    fn titled_chapters_are_detected() {
        let text = "Preface\nChapter 3: Intro\nsome text\nChapter 4: Next\nmore text";
        assert_eq!(detect_chapters(text), map(&[(3, "Intro"), (4, "Next")]));
    }

    #[test]
    fn bare_heading_gets_synthetic_title() {
        assert_eq!(detect_chapters("CHAPTER 2"), map(&[(2, "Chapter 2")]));
        assert_eq!(
            detect_chapters("CHAPTER 2\nThe road north\nIt was cold."),
            map(&[(2, "Chapter 2")])
        );
        assert_eq!(
            detect_chapters("Chapter 7:\r\nbody"),
            map(&[(7, "Chapter 7")])
        );
    }

    #[test]
    fn matching_ignores_case_and_accepts_dash_separators() {
        let text = "chapter 5 - Rivers\nSECTION 6: Lakes";
        assert_eq!(detect_chapters(text), map(&[(5, "Rivers"), (6, "Lakes")]));
    }

    #[test]
    fn later_matches_overwrite_earlier_titles() {
        let text = "Chapter 2: First\nChapter 2: Second";
        assert_eq!(detect_chapters(text), map(&[(2, "Second")]));

        // Section patterns run last and win collisions.
        let text = "Chapter 1: Alpha\nSection 1: Beta";
        assert_eq!(detect_chapters(text), map(&[(1, "Beta")]));
    }

    #[test]
    fn no_headings_yields_empty_map() {
        assert!(detect_chapters("Just a syllabus with weeks and topics.").is_empty());
        assert!(detect_chapters("").is_empty());
        assert!(detect_chapters("subchapter 2: nope").is_empty());
    }

    #[test]
    fn oversized_numbers_are_skipped() {
        let text = "Chapter 99999999999: Too big\nChapter 1: Fine";
        assert_eq!(detect_chapters(text), map(&[(1, "Fine")]));
    }

    #[test]
    fn selects_text_between_headings() {
        let text = "Chapter 1: A\nfoo\nChapter 2: B\nbar";
        let chapters = map(&[(1, "A"), (2, "B")]);
        assert_eq!(select_chapter_text(text, 1, &chapters), "foo");
        assert_eq!(select_chapter_text(text, 2, &chapters), "bar");
    }

    #[test]
    fn heading_search_ignores_case() {
        let text = "CHAPTER 1: INTRO\n  first part  \nchapter 2: next\nrest";
        let chapters = map(&[(1, "Intro"), (2, "Next")]);
        assert_eq!(select_chapter_text(text, 1, &chapters), "first part");
    }

    #[test]
    fn missing_heading_falls_back_to_full_text() {
        let text = "Section 4: Methods\nwe measured things";
        let chapters = detect_chapters(text);
        assert_eq!(chapters, map(&[(4, "Methods")]));
        assert_eq!(select_chapter_text(text, 4, &chapters), text);
    }

    #[test]
    fn bare_heading_chapter_falls_back_to_full_text() {
        let text = "CHAPTER 2\nbody";
        let chapters = detect_chapters(text);
        assert_eq!(chapters, map(&[(2, "Chapter 2")]));
        assert_eq!(select_chapter_text(text, 2, &chapters), text);
    }

    #[test]
    fn unknown_chapter_returns_full_text() {
        let text = "Chapter 1: A\nfoo";
        let chapters = map(&[(1, "A")]);
        assert_eq!(select_chapter_text(text, 9, &chapters), text);
    }

    #[test]
    fn regex_metacharacters_in_titles_are_literal() {
        let text = "Chapter 1: Sets (and *stars*)\nbody one\nChapter 2: Next\nbody two";
        let chapters = detect_chapters(text);
        assert_eq!(select_chapter_text(text, 1, &chapters), "body one");
    }
}
