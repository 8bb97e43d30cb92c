use super::*;

fn config(chunk_size: usize, chunk_overlap: usize) -> SplitterConfig {
    SplitterConfig::new(chunk_size, chunk_overlap)
}

#[test]
fn short_text_is_a_single_chunk() {
    let chunks = split_text(
        "Paris is the capital of France.",
        &SplitterConfig::default(),
    );
    assert_eq!(chunks, vec!["Paris is the capital of France."]);
}

#[test]
fn whitespace_only_text_yields_nothing() {
    assert!(split_text("", &config(10, 2)).is_empty());
    assert!(split_text("  \n\n  \n ", &config(10, 2)).is_empty());
}

#[test]
fn words_are_merged_with_overlap() {
    let chunks = split_text("a b c d e f g h i j", &config(5, 2));
    assert_eq!(
        chunks,
        vec!["a b c", "c d", "d e", "e f", "f g", "g h", "h i", "i j"]
    );
}

#[test]
fn paragraphs_split_before_lines() {
    let text = "First paragraph here.\nStill first.\n\nSecond paragraph here.";
    let chunks = split_text(text, &config(40, 0));
    assert_eq!(
        chunks,
        vec!["First paragraph here.\nStill first.", "Second paragraph here."]
    );
}

#[test]
fn unbroken_text_falls_back_to_characters() {
    let chunks = split_text("abcdefghij", &config(4, 1));
    assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
}

#[test]
fn oversized_piece_is_split_with_next_separator() {
    let chunks = split_text("aaaa bbbbbbbbbb cc", &config(5, 0));
    assert_eq!(chunks, vec!["aaaa", "bbbb", "bbbbb", "b", "cc"]);
}

#[test]
fn chunk_size_is_counted_in_characters() {
    let text = "ééééé ééééé ééééé";
    let chunks = split_text(text, &config(11, 0));

    assert_eq!(chunks, vec!["ééééé ééééé", "ééééé"]);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= 11);
    }
}

#[test]
fn chunks_never_exceed_size_on_prose() {
    let sentence = "The quick brown fox jumps over the lazy dog. ";
    let text = format!(
        "{}\n\n{}\n{}",
        sentence.repeat(30),
        sentence.repeat(12),
        sentence.repeat(50)
    );
    let cfg = config(200, 100);

    let chunks = split_text(&text, &cfg);

    assert!(chunks.len() > 10);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= cfg.chunk_size, "chunk too long: {chunk:?}");
        assert_eq!(chunk.trim(), chunk);
    }
    // Consecutive chunks within a paragraph share text
    let first = &chunks[0];
    let second = &chunks[1];
    let tail: String = first.split(' ').next_back().unwrap_or_default().to_string();
    assert!(second.contains(&tail));
}

#[test]
fn split_documents_keeps_metadata_and_numbers_chunks() {
    let documents = vec![
        Document {
            content: "one two three four".to_string(),
            source: "data/a.pdf".to_string(),
            page: 0,
        },
        Document {
            content: "five six".to_string(),
            source: "data/a.pdf".to_string(),
            page: 1,
        },
        Document {
            content: "seven".to_string(),
            source: "data/b.pdf".to_string(),
            page: 0,
        },
    ];

    let chunks = split_documents(&documents, &config(11, 0));

    let summary: Vec<(&str, &str, u32, usize)> = chunks
        .iter()
        .map(|c| (c.content.as_str(), c.source.as_str(), c.page, c.chunk_index))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("one two", "data/a.pdf", 0, 0),
            ("three four", "data/a.pdf", 0, 1),
            ("five six", "data/a.pdf", 1, 2),
            ("seven", "data/b.pdf", 0, 3),
        ]
    );
}

#[test]
fn default_config_matches_index_settings() {
    let cfg = SplitterConfig::default();
    assert_eq!(cfg.chunk_size, 1000);
    assert_eq!(cfg.chunk_overlap, 500);
    assert_eq!(cfg.separators, vec!["\n\n", "\n", " ", ""]);
}
