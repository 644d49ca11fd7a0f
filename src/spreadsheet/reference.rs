//! A1-style cell references with 1-based row and column numbers.

/// Converts a 1-based column number to its letters (1 → "A", 27 → "AA").
pub(crate) fn col_to_letters(col: usize) -> String {
    let mut col = col;
    let mut letters = Vec::<u8>::new();
    while col > 0 {
        col -= 1;
        letters.push(b'A' + (col % 26) as u8);
        col /= 26;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

/// Converts column letters to a 1-based column number.
pub(crate) fn letters_to_col(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.bytes().try_fold(0usize, |col, byte| {
        byte.is_ascii_alphabetic()
            .then(|| col * 26 + (byte.to_ascii_uppercase() - b'A') as usize + 1)
    })
}

/// Builds an A1 reference from 1-based coordinates.
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", col_to_letters(col), row)
}

/// Parses an A1 reference ("$B$3" allowed) into 1-based `(row, col)`.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let col = letters_to_col(&reference[..split])?;
    let row = reference[split..].parse::<usize>().ok().filter(|row| *row > 0)?;
    Some((row, col))
}

/// Parses a range reference ("A1:C3", or a single cell) into its corners.
pub(crate) fn range_to_indexes(range: &str) -> Option<((usize, usize), (usize, usize))> {
    match range.split_once(':') {
        Some((first, last)) => Some((reference_to_index(first)?, reference_to_index(last)?)),
        None => reference_to_index(range).map(|cell| (cell, cell)),
    }
}

/// Builds a range reference from its corners.
pub(crate) fn indexes_to_range(first: (usize, usize), last: (usize, usize)) -> String {
    format!(
        "{}:{}",
        index_to_reference(first.0, first.1),
        index_to_reference(last.0, last.1)
    )
}
