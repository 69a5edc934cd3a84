//! Analysis service — code explanation and review via the LLM boundary.
//!
//! DESIGN
//! ======
//! The engine treats text analysis as an opaque asynchronous capability: a
//! prompt goes out, free-form text comes back, and everything is normalized
//! into the wire contract here. Model output is never trusted to be well
//! formed; line parsing and review parsing both degrade through fallbacks
//! before giving up.
//!
//! Validation happens before the collaborator is reached: empty or
//! whitespace-only code is rejected without issuing a request, and failures
//! surface as a directed error payload with an empty result body. Room state
//! is never touched from this module.

use tracing::info;

use crate::event::CodeReview;
use crate::llm::{LlmComplete, LlmError};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("empty code submitted for analysis")]
    EmptyCode,
    #[error("analysis model not configured")]
    NotConfigured,
    #[error("model call failed: {0}")]
    Llm(#[from] LlmError),
}

/// Filler explanation for code lines the model said nothing about.
const NO_EXPLANATION: &str = "No explanation available";

// =============================================================================
// LINE-BY-LINE ANALYSIS
// =============================================================================

/// Explain the given code line by line. The result is indexed 0..n-1 and has
/// exactly one entry per input line.
///
/// # Errors
///
/// Returns `EmptyCode` before the collaborator is reached when the input is
/// blank, or an [`LlmError`] when the model call fails.
pub async fn analyze_code(llm: &dyn LlmComplete, code: &str) -> Result<Vec<String>, AnalysisError> {
    if code.trim().is_empty() {
        return Err(AnalysisError::EmptyCode);
    }

    let prompt = format!(
        "Analyze this code line by line and provide a brief explanation for each line.\n\n\
         Code to analyze:\n{code}\n\n\
         Please format your response as a simple list with line numbers, like:\n\
         Line 1: Explanation\n\
         Line 2: Explanation\n\
         And so on."
    );

    let response = llm.complete(&prompt).await?;
    let code_lines: Vec<&str> = code.lines().collect();
    let explanations = line_explanations(&response, &code_lines);
    info!(lines = code_lines.len(), "code analysis complete");
    Ok(explanations)
}

/// Map "Line N: ..." style model output onto the code's line indices,
/// filling gaps per the contract: echo the source for lines with content,
/// the filler string otherwise.
pub(crate) fn line_explanations(response: &str, code_lines: &[&str]) -> Vec<String> {
    let mut parsed: Vec<Option<String>> = vec![None; code_lines.len()];
    for line in response.lines() {
        if let Some((index, text)) = parse_numbered_line(line) {
            if index < parsed.len() {
                parsed[index] = Some(text);
            }
        }
    }

    parsed
        .into_iter()
        .enumerate()
        .map(|(i, slot)| match slot {
            Some(text) => text,
            None if !code_lines[i].trim().is_empty() => format!("Code: {}", code_lines[i].trim()),
            None => NO_EXPLANATION.to_string(),
        })
        .collect()
}

/// Parse one response line of the form "Line N: text", "N: text", or
/// "N - text" into a zero-based index and explanation.
fn parse_numbered_line(line: &str) -> Option<(usize, String)> {
    let rest = line.trim_start();
    let rest = rest
        .strip_prefix("Line")
        .or_else(|| rest.strip_prefix("line"))
        .unwrap_or(rest)
        .trim_start();

    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    let number: usize = rest[..digits_end].parse().ok()?;
    if number == 0 {
        return None;
    }

    let tail = rest[digits_end..].trim_start();
    let tail = tail
        .strip_prefix(':')
        .or_else(|| tail.strip_prefix('-'))?;
    let text = tail.trim();
    if text.is_empty() {
        return None;
    }
    Some((number - 1, text.to_string()))
}

// =============================================================================
// STRUCTURED REVIEW
// =============================================================================

/// Review the given code, returning the structured
/// summary/strengths/improvements/bestPractices contract.
///
/// # Errors
///
/// Returns `EmptyCode` before the collaborator is reached when the input is
/// blank, or an [`LlmError`] when the model call fails.
pub async fn review_code(llm: &dyn LlmComplete, code: &str) -> Result<CodeReview, AnalysisError> {
    if code.trim().is_empty() {
        return Err(AnalysisError::EmptyCode);
    }

    let prompt = format!(
        "Review the following code and provide detailed feedback. Format your response with these exact sections:\n\
         1. Summary: A brief overview of what the code does\n\
         2. Strengths: List at least 3 positive aspects of the code\n\
         3. Improvements: List at least 3 specific suggestions for improvement\n\
         4. Best Practices: List at least 3 best practices that should be followed\n\n\
         Code to review:\n{code}\n\n\
         IMPORTANT: Your response MUST be in valid JSON format like this example:\n\
         {{\n\
           \"summary\": \"Brief summary of the code\",\n\
           \"strengths\": [\"strength 1\", \"strength 2\", \"strength 3\"],\n\
           \"improvements\": [\"improvement 1\", \"improvement 2\", \"improvement 3\"],\n\
           \"bestPractices\": [\"practice 1\", \"practice 2\", \"practice 3\"]\n\
         }}\n\n\
         Do not include any text before or after the JSON object. Return ONLY the JSON object."
    );

    let response = llm.complete(&prompt).await?;
    info!("code review complete");
    Ok(parse_review(&response))
}

/// Normalize free-form model output into a `CodeReview`: JSON object first,
/// markdown-fence-cleaned JSON second, leading paragraphs as a last resort.
pub(crate) fn parse_review(response: &str) -> CodeReview {
    if let Some(json) = extract_json_object(response) {
        if let Ok(review) = serde_json::from_str::<CodeReview>(json) {
            return with_summary_default(review);
        }
        let cleaned = json.replace("```json", "").replace("```", "");
        if let Ok(review) = serde_json::from_str::<CodeReview>(cleaned.trim()) {
            return with_summary_default(review);
        }
    }
    paragraph_fallback(response)
}

fn with_summary_default(mut review: CodeReview) -> CodeReview {
    if review.summary.trim().is_empty() {
        review.summary = "No summary available".to_string();
    }
    review
}

/// Widest `{...}` span in the text, mirroring the greedy match the contract
/// tolerates (models often wrap JSON in prose or fences).
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn paragraph_fallback(response: &str) -> CodeReview {
    let paragraphs: Vec<&str> = response
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let pick = |i: usize, default: &str| -> String {
        paragraphs.get(i).map_or_else(|| default.to_string(), |p| (*p).to_string())
    };

    CodeReview {
        summary: pick(0, "Code review completed"),
        strengths: vec![pick(1, "Code was submitted for review")],
        improvements: vec![pick(2, "Try simplifying your code for better analysis")],
        best_practices: vec![pick(3, "Follow standard coding conventions")],
    }
}

#[cfg(test)]
#[path = "analysis_test.rs"]
mod tests;
