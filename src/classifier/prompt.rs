//! Prompt construction for relevance judgements

/// Build the judgement prompt for one candidate.
///
/// The model is asked to answer with a single JSON object carrying
/// `relevant`, `score` and `rationale`.
pub fn build_prompt(search_term: &str, candidate_name: &str, price: &str, store: &str) -> String {
    format!(
        r#"Task: decide whether the MATCH corresponds to the INPUT product.
Answer with a single JSON object using exactly these keys:

{{
  "relevant": "YES" or "NO",
  "score": 0..100 (integer),
  "rationale": "short justification, 1-2 sentences at most"
}}

Decision criteria:
- Matching key expressions in the name (size, type, thread such as E27/E14, material, quantity).
- If the match is very generic, answer NO.
- If the match is strong (same standard, same marking), answer YES.

INPUT_TERM: "{search_term}"
MATCH_NAME: "{candidate_name}"
PRICE: "{price} Ft"
STORE: "{store}""#
    )
}
