//! Keyword-overlap chunk retrieval.
//!
//! Picks the chunks of a document that share the most keywords with a
//! question or concept name, so only those are sent to the model as context.

use crate::db::models::Chunk;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "can", "did", "do", "does",
        "for", "from", "how", "if", "in", "into", "is", "it", "its", "me", "no", "not", "of",
        "on", "or", "such", "that", "the", "their", "then", "there", "these", "they", "this",
        "to", "was", "what", "when", "where", "which", "who", "why", "will", "with", "you",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScoredChunk {
    pub chunk_index: u32,
    pub page_number: u32,
    pub content: String,
    pub score: usize,
}

/// Lowercase keywords of a query, in first-seen order without duplicates.
/// Punctuation splits words; stop words and single characters are dropped.
pub fn keywords(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let mut seen = HashSet::new();
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 1 && !STOP_WORDS.contains(w))
        .filter(|w| seen.insert(*w))
        .map(String::from)
        .collect()
}

/// Number of distinct keywords found in `content`, case-insensitively.
fn score_chunk(content: &str, keywords: &[String]) -> usize {
    let content = content.to_lowercase();
    keywords
        .iter()
        .filter(|k| content.contains(k.as_str()))
        .count()
}

/// Top `k` chunks by keyword overlap with `query`.
///
/// Ties keep document order (ascending `chunk_index`), so the result is a
/// pure function of its inputs.
pub fn find_relevant_chunks(chunks: &[Chunk], query: &str, k: usize) -> Vec<ScoredChunk> {
    if k == 0 || chunks.is_empty() {
        return vec![];
    }

    let keywords = keywords(query);
    let mut scored: Vec<ScoredChunk> = chunks
        .iter()
        .map(|chunk| ScoredChunk {
            chunk_index: chunk.chunk_index,
            page_number: chunk.page_number,
            content: chunk.content.clone(),
            score: score_chunk(&chunk.content, &keywords),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.chunk_index.cmp(&b.chunk_index))
    });
    scored.truncate(k);
    scored
}

/// Join retrieved chunk contents into a prompt context block.
pub fn build_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: u32, content: &str) -> Chunk {
        Chunk {
            chunk_index: index,
            page_number: 0,
            content: content.to_string(),
        }
    }

    fn corpus() -> Vec<Chunk> {
        vec![
            chunk(0, "Cells are the basic unit of life."),
            chunk(1, "The mitochondria produces energy for the cell."),
            chunk(2, "Photosynthesis happens in the chloroplast and produces glucose."),
            chunk(3, "Mitochondria have their own DNA and produce ATP energy."),
        ]
    }

    #[test]
    fn test_keywords_strip_stop_words_and_punctuation() {
        assert_eq!(
            keywords("What is the Mitochondria's role, in energy? energy!"),
            vec!["mitochondria", "role", "energy"]
        );
        assert!(keywords("? a the !").is_empty());
    }

    #[test]
    fn test_ranks_by_keyword_overlap() {
        let results = find_relevant_chunks(&corpus(), "mitochondria energy DNA", 2);
        let order: Vec<u32> = results.iter().map(|r| r.chunk_index).collect();
        assert_eq!(order, vec![3, 1]);
        assert_eq!(results[0].score, 3);
        assert_eq!(results[1].score, 2);
    }

    #[test]
    fn test_ties_break_by_chunk_index() {
        let chunks = vec![chunk(5, "alpha"), chunk(2, "alpha"), chunk(9, "beta")];
        let order: Vec<u32> = find_relevant_chunks(&chunks, "alpha", 3)
            .iter()
            .map(|r| r.chunk_index)
            .collect();
        assert_eq!(order, vec![2, 5, 9]);
    }

    #[test]
    fn test_k_bounds() {
        assert!(find_relevant_chunks(&corpus(), "energy", 0).is_empty());
        assert_eq!(find_relevant_chunks(&corpus(), "energy", 10).len(), 4);
        assert!(find_relevant_chunks(&[], "energy", 3).is_empty());
    }

    #[test]
    fn test_query_without_keywords_keeps_document_order() {
        let order: Vec<u32> = find_relevant_chunks(&corpus(), "what is it?", 2)
            .iter()
            .map(|r| r.chunk_index)
            .collect();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn test_deterministic() {
        let chunks = corpus();
        let first = find_relevant_chunks(&chunks, "produces energy glucose", 3);
        let second = find_relevant_chunks(&chunks, "produces energy glucose", 3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_more_keywords_never_rank_lower() {
        let chunks = vec![
            chunk(0, "enzyme"),
            chunk(1, "enzyme substrate"),
            chunk(2, "enzyme substrate catalyst"),
        ];
        let order: Vec<u32> = find_relevant_chunks(&chunks, "enzyme substrate catalyst", 3)
            .iter()
            .map(|r| r.chunk_index)
            .collect();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn test_build_context() {
        let results = find_relevant_chunks(&corpus(), "chloroplast", 1);
        assert_eq!(
            build_context(&results),
            "Photosynthesis happens in the chloroplast and produces glucose."
        );
    }
}
