use crate::db::models::Chunk;
use crate::error::{MentoraError, Result};
use std::fs;
use std::path::Path;

/// Page separator emitted by PDF text extraction.
const PAGE_BREAK: char = '\u{c}';

/// Parsed document content
pub struct ParsedDocument {
    pub content: String,
    pub file_type: String,
}

/// File extensions accepted for import.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md", "markdown"];

pub fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Parse a document file into plain text
pub fn parse_file(path: &Path) -> Result<ParsedDocument> {
    let ext = file_extension(path);

    match ext.as_str() {
        "txt" => Ok(ParsedDocument {
            content: fs::read_to_string(path)?,
            file_type: "txt".into(),
        }),
        "md" | "markdown" => Ok(ParsedDocument {
            content: fs::read_to_string(path)?,
            file_type: "md".into(),
        }),
        "pdf" => {
            let bytes = fs::read(path)?;
            let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
                .map_err(|e| MentoraError::Parse(format!("PDF parse error: {}", e)))?;
            Ok(ParsedDocument {
                content: join_pages(&pages),
                file_type: "pdf".into(),
            })
        }
        _ => Err(MentoraError::InvalidInput(format!(
            "Unsupported file type: .{}",
            ext
        ))),
    }
}

/// Join extracted pages, ending each with a page break so even a
/// single-page PDF numbers its words from page 1.
fn join_pages(pages: &[String]) -> String {
    pages.iter().fold(String::new(), |mut text, page| {
        text.push_str(page);
        text.push(PAGE_BREAK);
        text
    })
}

/// Words of `text` paired with the 1-based page they sit on, or 0 when the
/// text carries no page breaks.
fn paged_words(text: &str) -> Vec<(&str, u32)> {
    let paged = text.contains(PAGE_BREAK);
    text.split(PAGE_BREAK)
        .enumerate()
        .flat_map(|(i, page)| {
            let page_number = if paged { i as u32 + 1 } else { 0 };
            page.split_whitespace().map(move |w| (w, page_number))
        })
        .collect()
}

/// Split text into overlapping word windows.
///
/// Every window holds at most `chunk_size` words and each window after the
/// first starts `overlap` words before the previous one ended. Text with no
/// words yields no chunks.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let words = paged_words(text);
    if words.is_empty() {
        return vec![];
    }

    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size - 1);
    let step = chunk_size - overlap;

    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + chunk_size).min(words.len());
        let window = &words[start..end];
        chunks.push(Chunk {
            chunk_index: chunks.len() as u32,
            page_number: window[0].1,
            content: window
                .iter()
                .map(|(w, _)| *w)
                .collect::<Vec<_>>()
                .join(" "),
        });
        if end >= words.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    fn expected_count(n: usize, size: usize, overlap: usize) -> usize {
        if n <= size {
            1
        } else {
            (n - overlap).div_ceil(size - overlap)
        }
    }

    #[test]
    fn test_chunk_text_short() {
        let chunks = chunk_text("Hello   world\n", 100, 20);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Hello world");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].page_number, 0);
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("", 500, 50).is_empty());
        assert!(chunk_text(" \n\t ", 500, 50).is_empty());
    }

    #[test]
    fn test_chunk_text_exactly_chunk_size() {
        let chunks = chunk_text(&numbered_words(500), 500, 50);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_chunk_count_formula() {
        for &(n, size, overlap) in &[(1000, 500, 50), (501, 500, 50), (1234, 100, 10), (37, 5, 2)] {
            let chunks = chunk_text(&numbered_words(n), size, overlap);
            assert_eq!(chunks.len(), expected_count(n, size, overlap), "n={n}");
        }
    }

    #[test]
    fn test_chunk_text_overlap_reconstructs_source() {
        let text = numbered_words(1234);
        let chunks = chunk_text(&text, 100, 10);

        let mut rebuilt: Vec<String> = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index as usize, i);
            let words = chunk.content.split(' ').map(String::from);
            if i == 0 {
                rebuilt.extend(words);
            } else {
                rebuilt.extend(words.skip(10));
            }
        }
        let original: Vec<String> = text.split_whitespace().map(String::from).collect();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_chunk_text_adjacent_chunks_share_band() {
        let chunks = chunk_text(&numbered_words(30), 10, 3);
        let first: Vec<&str> = chunks[0].content.split(' ').collect();
        let second: Vec<&str> = chunks[1].content.split(' ').collect();
        assert_eq!(&first[7..], &second[..3]);
    }

    #[test]
    fn test_chunk_text_degenerate_parameters() {
        // overlap >= size is clamped so the window still advances
        let chunks = chunk_text("a b c d", 2, 5);
        assert_eq!(chunks.len(), 3);
        let chunks = chunk_text("a b c", 0, 0);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_chunk_text_tags_pages() {
        let text = "one two three\u{c}four five six\u{c}seven";
        let chunks = chunk_text(text, 3, 0);
        let pages: Vec<u32> = chunks.iter().map(|c| c.page_number).collect();
        assert_eq!(pages, vec![1, 2, 3]);
    }

    #[test]
    fn test_pdf_pages_number_chunks() {
        let pages = vec!["alpha beta".to_string(), "gamma".to_string(), "delta epsilon".to_string()];
        let chunks = chunk_text(&join_pages(&pages), 2, 0);
        let tagged: Vec<(u32, &str)> = chunks
            .iter()
            .map(|c| (c.page_number, c.content.as_str()))
            .collect();
        assert_eq!(
            tagged,
            vec![(1, "alpha beta"), (2, "gamma delta"), (3, "epsilon")]
        );

        let single = chunk_text(&join_pages(&["only page".to_string()]), 10, 0);
        assert_eq!(single[0].page_number, 1);
    }

    #[test]
    fn test_parse_text_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.MD");
        fs::write(&path, "# Cells\nMitochondria").unwrap();
        let parsed = parse_file(&path).unwrap();
        assert_eq!(parsed.file_type, "md");
        assert!(parsed.content.contains("Mitochondria"));
    }

    #[test]
    fn test_parse_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slides.pptx");
        fs::write(&path, "x").unwrap();
        assert!(matches!(
            parse_file(&path),
            Err(MentoraError::InvalidInput(_))
        ));
    }
}
