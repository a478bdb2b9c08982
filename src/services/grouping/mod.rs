// Reading-order grouping: turns an unordered bag of detected regions into
// translation-ready chunks.
//
// Pure and deterministic; no engine or network access. The ordering is the
// usual left-to-right, top-to-bottom approximation for horizontal scripts.

use crate::core::types::{Chunk, GroupingStrategy, TextRegion};

/// Stable reading-order sort: top-to-bottom by `y_min`, then left-to-right
/// by `x_min`. Regions with identical keys keep their detection order.
pub fn sort_regions(mut regions: Vec<TextRegion>) -> Vec<TextRegion> {
    regions.sort_by_key(|r| (r.bbox[1], r.bbox[0]));
    regions
}

/// Merges sorted regions into chunks.
///
/// Leading/trailing whitespace is stripped per region; regions whose text is
/// empty after stripping never contribute. With [`GroupingStrategy::Page`]
/// and no non-empty region, the result is an empty sequence rather than one
/// empty chunk.
pub fn group_regions(sorted: &[TextRegion], strategy: GroupingStrategy) -> Vec<Chunk> {
    let texts = sorted
        .iter()
        .map(|r| r.text.trim())
        .filter(|t| !t.is_empty());

    match strategy {
        GroupingStrategy::PerSegment => texts.map(|t| Chunk(t.to_string())).collect(),
        GroupingStrategy::Page => {
            let joined = texts.collect::<Vec<_>>().join("\n");
            if joined.is_empty() {
                Vec::new()
            } else {
                vec![Chunk(joined)]
            }
        }
    }
}
