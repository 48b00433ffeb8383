//! Parsing of free-text judgement responses
//!
//! Two tiers: the first `{` .. last `}` slice is parsed as JSON; when that is
//! missing or malformed a keyword heuristic decides instead. Parsing never
//! fails.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::record::Verdict;

/// Token marking a positive answer
pub const AFFIRMATIVE: &str = "YES";

/// Score assigned when the heuristic finds the affirmative token
pub const HEURISTIC_ACCEPT_SCORE: u8 = 80;

/// Score assigned when the heuristic does not find it
pub const HEURISTIC_REJECT_SCORE: u8 = 30;

/// A verdict extracted from a model response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Judgement {
    pub verdict: Verdict,
    pub score: u8,
    pub rationale: String,
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default, alias = "relevans")]
    relevant: Option<Value>,
    #[serde(default, alias = "pontszam")]
    score: Option<Value>,
    #[serde(default, alias = "indoklas")]
    rationale: Option<Value>,
}

/// Slice from the first `{` to the last `}`, if both exist in that order.
pub fn extract_payload(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    response.get(start..=end)
}

/// Turn a raw response into a judgement.
pub fn parse_judgement(response: &str) -> Judgement {
    let Some(payload) = extract_payload(response) else {
        return heuristic(response, "no JSON object in response");
    };

    match parse_payload(payload) {
        Ok(judgement) => judgement,
        Err(reason) => {
            warn!("Could not parse judgement ({}). Response: {}", reason, response);
            heuristic(response, "JSON could not be parsed")
        }
    }
}

fn parse_payload(payload: &str) -> Result<Judgement, String> {
    let parsed: Payload = serde_json::from_str(payload).map_err(|e| e.to_string())?;

    let verdict = match parsed.relevant {
        Some(value) if value_text(&value).trim().to_uppercase() == AFFIRMATIVE => {
            Verdict::Relevant
        }
        _ => Verdict::NotRelevant,
    };
    let score = match parsed.score {
        None | Some(Value::Null) => 0,
        Some(value) => parse_score(&value)?,
    };
    let rationale = parsed
        .rationale
        .map(|value| value_text(&value).trim().to_string())
        .unwrap_or_default();

    Ok(Judgement {
        verdict,
        score,
        rationale,
    })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_score(value: &Value) -> Result<u8, String> {
    let raw = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| format!("score out of range: {}", n))?,
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("score {:?} is not an integer: {}", s, e))?,
        other => return Err(format!("score has unsupported type: {}", other)),
    };
    Ok(raw.clamp(0, 100) as u8)
}

fn heuristic(response: &str, reason: &str) -> Judgement {
    if response.to_uppercase().contains(AFFIRMATIVE) {
        Judgement {
            verdict: Verdict::Relevant,
            score: HEURISTIC_ACCEPT_SCORE,
            rationale: format!("heuristic fallback, accepted: {}", reason),
        }
    } else {
        Judgement {
            verdict: Verdict::NotRelevant,
            score: HEURISTIC_REJECT_SCORE,
            rationale: format!("heuristic fallback, rejected: {}", reason),
        }
    }
}
