//! Bundle naming
//!
//! The worksheet server only accepts bundle names matching
//! `[A-Za-z_][A-Za-z0-9_.-]*`. Scenario and model descriptions such as
//! `mmlu:subject=philosophy,model=gpt2` or `openai/davinci` are collapsed
//! onto that alphabet before being used as bundle names.

/// Character substituted for anything outside the legal alphabet
const REPLACEMENT: char = '_';

/// Encode an arbitrary description into a platform-legal bundle name
///
/// Every character outside `[A-Za-z0-9_.-]` becomes `_`, and a leading `_` is
/// added when the result would not start with a letter or underscore.
/// Encoding is idempotent: `encode(&encode(s)) == encode(s)`.
///
/// # Example
/// ```
/// use worksync_core::naming::encode;
///
/// assert_eq!(encode("openai/davinci"), "openai_davinci");
/// assert_eq!(encode("mmlu:subject=philosophy"), "mmlu_subject_philosophy");
/// ```
pub fn encode(description: &str) -> String {
    let mut name: String = description
        .chars()
        .map(|c| if is_legal_char(c) { c } else { REPLACEMENT })
        .collect();

    match name.chars().next() {
        Some(first) if first.is_ascii_alphabetic() || first == REPLACEMENT => {}
        _ => name.insert(0, REPLACEMENT),
    }

    name
}

/// Check whether a name is already acceptable to the server as-is
pub fn is_valid(name: &str) -> bool {
    !name.is_empty() && encode(name) == name
}

/// Name of the bundle evaluating `model` on `scenario`
pub fn evaluation_job_name(scenario: &str, model: &str) -> String {
    encode(&format!("run_{}_{}", scenario, model))
}

fn is_legal_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}
