//! Sequential record references
//!
//! References are a fixed prefix followed by a zero-padded number
//! ("TRN007", "JRN00000012"). The next reference is one above the highest
//! number already issued under the same prefix.

/// Numeric suffix of `reference` under `prefix`.
///
/// Leading digits are read after the prefix, so "TRN012-bis" yields 12.
fn suffix_number(reference: &str, prefix: &str) -> Option<u64> {
    let rest = reference.strip_prefix(prefix)?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn format_reference(prefix: &str, number: u64, padding: usize) -> String {
    format!("{}{:0width$}", prefix, number, width = padding)
}

/// Next reference after everything in `existing`
pub fn next_reference<S: AsRef<str>>(prefix: &str, padding: usize, existing: &[S]) -> String {
    let max = existing
        .iter()
        .filter_map(|r| suffix_number(r.as_ref(), prefix))
        .max()
        .unwrap_or(0);
    format_reference(prefix, max + 1, padding)
}

/// Issues successive references, starting above a set of known ones
#[derive(Debug, Clone)]
pub struct ReferenceSequence {
    prefix: String,
    padding: usize,
    last: u64,
}

impl ReferenceSequence {
    pub fn new<S: AsRef<str>>(prefix: impl Into<String>, padding: usize, existing: &[S]) -> Self {
        let prefix = prefix.into();
        let last = existing
            .iter()
            .filter_map(|r| suffix_number(r.as_ref(), &prefix))
            .max()
            .unwrap_or(0);

        Self { prefix, padding, last }
    }

    pub fn issue(&mut self) -> String {
        self.last += 1;
        format_reference(&self.prefix, self.last, self.padding)
    }
}
