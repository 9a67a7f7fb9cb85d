//! Paragraph segmentation
//!
//! Splits raw text into the ordered segment list the narrator consumes.
//! Blank lines delimit paragraphs when present (the common shape of pasted
//! and extracted text); otherwise every line is its own segment. Line wraps
//! inside a paragraph collapse to spaces.

/// Split text into ordered, trimmed, non-empty paragraph segments
pub fn split_segments(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");

    if normalized.contains("\n\n") {
        normalized
            .split("\n\n")
            .map(join_wrapped_lines)
            .filter(|p| !p.is_empty())
            .collect()
    } else {
        normalized
            .split('\n')
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }
}

fn join_wrapped_lines(paragraph: &str) -> String {
    paragraph
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
