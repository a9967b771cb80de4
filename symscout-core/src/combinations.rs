//! Lookup query generation: the cartesian product over the search alphabet.

/// Glyphs the lookup endpoint is probed with: lowercase ascii, digits,
/// dot and dash.
pub const ALPHABET: [char; 38] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
    '.', '-',
];

/// Pre-allocation size for `combinations(len)`; zero when 38^len does not
/// fit a usize.
fn capacity_hint(len: usize) -> usize {
    u32::try_from(len)
        .ok()
        .and_then(|exp| ALPHABET.len().checked_pow(exp))
        .unwrap_or(0)
}

/// All strings of exactly `len` glyphs, in odometer order. Repetition is
/// allowed and order is significant, so the result has `38^len` entries.
pub fn combinations(len: usize) -> Vec<String> {
    if len == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(capacity_hint(len));
    let mut indices = vec![0usize; len];
    loop {
        out.push(indices.iter().map(|&i| ALPHABET[i]).collect());
        // rightmost position ticks fastest
        let mut pos = len;
        loop {
            if pos == 0 {
                return out;
            }
            pos -= 1;
            indices[pos] += 1;
            if indices[pos] < ALPHABET.len() {
                break;
            }
            indices[pos] = 0;
        }
    }
}

/// All strings of length 1 through `max`, shortest first.
pub fn combinations_up_to(max: usize) -> Vec<String> {
    (1..=max).flat_map(combinations).collect()
}
