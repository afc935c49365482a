// Copyright 2025 PeerJudge (https://github.com/peerjudge)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Input-size validation applied before any tier executes.
//!
//! Size bounds prevent a hostile or buggy caller from feeding the pipeline
//! unbounded text (TF-IDF and the LLM prompts both scale with input size).

use crate::config::InputLimits;
use crate::error::JudgeError;

/// Validate evaluation inputs against the configured size bounds.
///
/// The review text is checked against both the review bound and the agent
/// output bound: it is simultaneously the document under judgment and the
/// agent output compared against references.
pub fn validate_evaluation_input(
    paper: &str,
    review: &str,
    reference_reviews: &[String],
    limits: &InputLimits,
) -> Result<(), JudgeError> {
    if paper.len() > limits.max_paper_bytes {
        return Err(JudgeError::Validation(format!(
            "paper excerpt is {} bytes, limit is {}",
            paper.len(),
            limits.max_paper_bytes
        )));
    }
    if review.len() > limits.max_review_bytes {
        return Err(JudgeError::Validation(format!(
            "review is {} bytes, limit is {}",
            review.len(),
            limits.max_review_bytes
        )));
    }
    if review.len() > limits.max_agent_output_bytes {
        return Err(JudgeError::Validation(format!(
            "agent output is {} bytes, limit is {}",
            review.len(),
            limits.max_agent_output_bytes
        )));
    }
    if reference_reviews.len() > limits.max_reference_texts {
        return Err(JudgeError::Validation(format!(
            "{} reference texts provided, limit is {}",
            reference_reviews.len(),
            limits.max_reference_texts
        )));
    }
    for (index, reference) in reference_reviews.iter().enumerate() {
        if reference.len() > limits.max_agent_output_bytes {
            return Err(JudgeError::Validation(format!(
                "reference text {index} is {} bytes, limit is {}",
                reference.len(),
                limits.max_agent_output_bytes
            )));
        }
    }
    Ok(())
}
