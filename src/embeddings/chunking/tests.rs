use super::*;

/// 240 distinct five-character words, 1,200 characters in total
fn numbered_words(count: usize) -> String {
    (0..count).map(|i| format!("w{:03} ", i)).collect()
}

fn tail(text: &str, len: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    chars[chars.len().saturating_sub(len)..].iter().collect()
}

#[test]
fn twelve_hundred_characters_make_three_overlapping_chunks() {
    let text = numbered_words(240);
    assert_eq!(char_len(&text), 1200);
    let config = ChunkingConfig::default();

    let chunks = split_text(&text, &config);

    assert_eq!(chunks.len(), 3);
    for chunk in &chunks {
        assert!(char_len(chunk) <= 500, "chunk too long: {}", char_len(chunk));
    }
    for pair in chunks.windows(2) {
        let overlap = tail(&pair[0], 49);
        assert!(
            pair[1].starts_with(&overlap),
            "{:?} should start with {:?}",
            &pair[1],
            overlap
        );
    }
    assert!(chunks[1].starts_with("w090"));
    assert!(chunks[2].starts_with("w180"));
    assert!(chunks[2].ends_with("w239"));
}

#[test]
fn chunking_is_deterministic() {
    let text = format!(
        "{}\n\n{}\n{}",
        numbered_words(150),
        "A sentence. Another sentence. ".repeat(30),
        numbered_words(90)
    );
    let config = ChunkingConfig::default();

    let first = split_text(&text, &config);
    let second = split_text(&text, &config);

    assert_eq!(first, second);
    assert!(first.len() > 1);
}

#[test]
fn small_text_is_a_single_chunk() {
    let config = ChunkingConfig::default();

    let chunks = split_text("  Just one short line of text.\n", &config);

    assert_eq!(chunks, vec!["Just one short line of text.".to_string()]);
}

#[test]
fn empty_and_blank_text_produce_nothing() {
    let config = ChunkingConfig::default();

    assert!(split_text("", &config).is_empty());
    assert!(split_text(" \n\n \n", &config).is_empty());
}

#[test]
fn paragraphs_are_preferred_split_points() {
    let paragraphs: Vec<String> = (0..3)
        .map(|p| format!("p{} {}", p, "word ".repeat(59).trim_end()))
        .collect();
    let text = paragraphs.join("\n\n");
    let config = ChunkingConfig::default();

    let chunks = split_text(&text, &config);

    assert_eq!(chunks, paragraphs);
}

#[test]
fn oversized_word_is_kept_whole() {
    let long_word = "x".repeat(600);
    let text = format!("alpha beta {} gamma delta", long_word);
    let config = ChunkingConfig::default();

    let chunks = split_text(&text, &config);

    assert_eq!(
        chunks,
        vec![
            "alpha beta".to_string(),
            long_word.clone(),
            "gamma delta".to_string()
        ]
    );
    for chunk in chunks.iter().filter(|c| **c != long_word) {
        assert!(char_len(chunk) <= config.chunk_size);
    }
}

#[test]
fn no_chunk_exceeds_limit_on_mixed_text() {
    let text = format!(
        "Title\n\n{}\n\n{}\nLast line without a period",
        "Some sentence goes here. ".repeat(80),
        numbered_words(300)
    );
    let config = ChunkingConfig {
        chunk_size: 120,
        chunk_overlap: 20,
        ..ChunkingConfig::default()
    };

    let chunks = split_text(&text, &config);

    assert!(chunks.len() > 10);
    for chunk in &chunks {
        assert!(char_len(chunk) <= 120, "chunk too long: {:?}", chunk);
    }
}

#[test]
fn every_word_survives_chunking() {
    let text = numbered_words(500);
    let config = ChunkingConfig {
        chunk_size: 200,
        chunk_overlap: 30,
        ..ChunkingConfig::default()
    };

    let joined = split_text(&text, &config).join(" ");

    for i in 0..500 {
        assert!(joined.contains(&format!("w{:03}", i)), "lost word {}", i);
    }
}

#[test]
fn lengths_count_characters_not_bytes() {
    // "é" is two bytes but one character
    let text = "é".repeat(450);
    let config = ChunkingConfig::default();

    let chunks = split_text(&text, &config);

    assert_eq!(chunks.len(), 1);
    assert_eq!(char_len(&chunks[0]), 450);
}

#[test]
fn chunk_document_assigns_ids_in_order() {
    let text = numbered_words(240);
    let config = ChunkingConfig::default();

    let chunks = chunk_document("notes.txt", &text, &config);

    assert_eq!(chunks.len(), 3);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, i);
        assert_eq!(chunk.source, "notes.txt");
        assert_eq!(chunk.id(), format!("notes.txt_chunk_{}", i));
    }
}
