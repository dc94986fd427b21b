use ragdb_core::chunker::Chunker;
use ragdb_core::config::ChunkingConfig;
use ragdb_core::types::{Document, CHUNK_INDEX_KEY, SOURCE_KEY, START_INDEX_KEY};
use ragdb_core::Error;

fn chunker(max: usize, overlap: usize) -> Chunker {
    Chunker::new(ChunkingConfig { max_chunk_length: max, overlap_length: overlap }).expect("valid config")
}

fn text_of_len(len: usize) -> String {
    (0..len).map(|i| char::from(b'a' + (i % 26) as u8)).collect()
}

#[test]
fn empty_text_yields_no_chunks() {
    let doc = Document::new("", "empty.txt");
    assert_eq!(chunker(10, 2).chunks(&doc).count(), 0);
}

#[test]
fn short_text_is_a_single_chunk() {
    for len in [1, 5, 10] {
        let doc = Document::new(text_of_len(len), "short.txt");
        let chunks: Vec<_> = chunker(10, 3).chunks(&doc).collect();
        assert_eq!(chunks.len(), 1, "len={len}");
        assert_eq!(chunks[0].content, doc.content);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].seq, 0);
    }
}

#[test]
fn long_text_is_covered_with_exact_overlap() {
    let max = 10;
    let overlap = 3;
    for len in [11, 17, 24, 25, 53, 100] {
        let text = text_of_len(len);
        let doc = Document::new(text.clone(), "long.txt");
        let chunks: Vec<_> = chunker(max, overlap).chunks(&doc).collect();

        assert!(chunks.len() > 1, "len={len}");
        assert_eq!(chunks[0].start_offset, 0, "covers the start");
        let last = chunks.last().expect("at least one chunk");
        assert_eq!(last.start_offset + last.char_len(), len, "covers the end");

        for chunk in &chunks {
            assert!(chunk.char_len() <= max);
            let expected: String = text.chars().skip(chunk.start_offset).take(chunk.char_len()).collect();
            assert_eq!(chunk.content, expected, "content matches its offset");
        }
        for pair in chunks.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert_eq!(a.char_len(), max, "only the final chunk may be short");
            assert_eq!(a.start_offset + a.char_len() - b.start_offset, overlap, "len={len}");
            assert_eq!(b.seq, a.seq + 1);
        }
    }
}

#[test]
fn twenty_five_hundred_chars_make_three_chunks() {
    let doc = Document::new(text_of_len(2500), "book.txt");
    let chunks: Vec<_> = chunker(1000, 100).chunks(&doc).collect();
    let spans: Vec<_> = chunks.iter().map(|c| (c.start_offset, c.char_len())).collect();
    assert_eq!(spans, vec![(0, 1000), (900, 1000), (1800, 700)]);
}

#[test]
fn offsets_count_characters_not_bytes() {
    let doc = Document::new("héllo wörld ünïcode", "utf8.txt");
    let chunks: Vec<_> = chunker(5, 1).chunks(&doc).collect();
    let rebuilt: String = chunks
        .iter()
        .enumerate()
        .map(|(i, c)| if i == 0 { c.content.clone() } else { c.content.chars().skip(1).collect() })
        .collect();
    assert_eq!(rebuilt, doc.content);
    assert_eq!(chunks[1].start_offset, 4);
}

#[test]
fn chunks_inherit_metadata_and_record_position() {
    let doc = Document::new(text_of_len(25), "notes/a.txt").with_attribute("category", "notes");
    let chunks: Vec<_> = chunker(10, 2).chunks(&doc).collect();
    for chunk in &chunks {
        assert_eq!(chunk.source, "notes/a.txt");
        assert_eq!(chunk.metadata.get(SOURCE_KEY).map(String::as_str), Some("notes/a.txt"));
        assert_eq!(chunk.metadata.get("category").map(String::as_str), Some("notes"));
        assert_eq!(chunk.metadata.get(START_INDEX_KEY), Some(&chunk.start_offset.to_string()));
        assert_eq!(chunk.metadata.get(CHUNK_INDEX_KEY), Some(&chunk.seq.to_string()));
    }
}

#[test]
fn ids_are_stable_and_distinct() {
    let doc = Document::new("aaaaaaaaaaaaaaaaaaaa", "same.txt");
    let first: Vec<_> = chunker(5, 0).chunks(&doc).map(|c| c.id).collect();
    let second: Vec<_> = chunker(5, 0).chunks(&doc).map(|c| c.id).collect();
    assert_eq!(first, second, "re-chunking yields the same ids");

    let unique: std::collections::HashSet<_> = first.iter().collect();
    assert_eq!(unique.len(), first.len(), "identical content at different offsets gets distinct ids");

    let other = Document::new(doc.content.clone(), "other.txt");
    let other_ids: Vec<_> = chunker(5, 0).chunks(&other).map(|c| c.id).collect();
    assert_ne!(first, other_ids, "source participates in the id");
}

#[test]
fn overlap_must_be_smaller_than_window() {
    let err = Chunker::new(ChunkingConfig { max_chunk_length: 10, overlap_length: 10 }).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
    let err = Chunker::new(ChunkingConfig { max_chunk_length: 0, overlap_length: 0 }).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn iterator_is_fused() {
    let doc = Document::new("abc", "a.txt");
    let mut it = chunker(10, 0).chunks(&doc);
    assert!(it.next().is_some());
    assert!(it.next().is_none());
    assert!(it.next().is_none());
}

#[test]
fn count_matches_iteration() {
    let c = chunker(10, 3);
    for len in [0, 1, 10, 11, 17, 24, 25, 53, 100] {
        let doc = Document::new(text_of_len(len), "n.txt");
        assert_eq!(c.count_chunks(&doc), c.chunks(&doc).count(), "len={len}");
    }
    let doc = Document::new(text_of_len(2500), "book.txt");
    assert_eq!(chunker(1000, 100).count_chunks(&doc), 3);
}
