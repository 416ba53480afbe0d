//! Edit-distance similarity for fuzzy name matching.

/// Optimal string alignment distance: insertions, deletions, substitutions
/// and adjacent transpositions each cost one.
pub fn osa_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let width = b.len() + 1;
    // Three rolling rows: i-2, i-1 and i.
    let mut two_back = vec![0usize; width];
    let mut previous: Vec<usize> = (0..width).collect();
    let mut current = vec![0usize; width];

    for i in 1..=a.len() {
        current[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut value = (previous[j] + 1)
                .min(current[j - 1] + 1)
                .min(previous[j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                value = value.min(two_back[j - 2] + 1);
            }
            current[j] = value;
        }
        std::mem::swap(&mut two_back, &mut previous);
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Distance scaled by the longer input, in `0.0..=1.0`.
pub fn normalized_distance(query: &[char], candidate: &[char]) -> f64 {
    let longest = query.len().max(candidate.len());
    if longest == 0 {
        return 0.0;
    }
    osa_distance(query, candidate) as f64 / longest as f64
}

/// Returns the similarity (`1 - distance`) of the closest candidate when it
/// is within `threshold`.
pub fn fuzzy_similarity(query: &[char], candidates: &[&[char]], threshold: f64) -> Option<f64> {
    if query.is_empty() {
        return None;
    }
    candidates
        .iter()
        .filter(|candidate| {
            // The length gap alone is a lower bound on the distance.
            let longest = query.len().max(candidate.len()) as f64;
            let gap = query.len().abs_diff(candidate.len()) as f64;
            gap / longest <= threshold
        })
        .map(|candidate| normalized_distance(query, candidate))
        .filter(|distance| *distance <= threshold)
        .min_by(f64::total_cmp)
        .map(|distance| 1.0 - distance)
}

/// Greedily aligns query characters to candidate characters, left to right,
/// skipping query characters that have no later match.
pub fn aligned_char_indices(query: &[char], candidate: &[char]) -> Vec<usize> {
    let mut indices = Vec::with_capacity(query.len());
    let mut cursor = 0usize;
    for ch in query {
        if let Some(offset) = candidate[cursor..].iter().position(|c| c == ch) {
            indices.push(cursor + offset);
            cursor += offset + 1;
        }
    }
    indices
}
