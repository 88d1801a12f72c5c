use serde::Deserialize;
use serde_json::Value;

use crate::Prompt;
use journal_domain::enrichment::{GeneratedQuote, MoodScore, ValidationError};

const MOOD_SYSTEM_PROMPT: &str = "You rate the mood of a personal journal entry. \
Reply with a single JSON object {\"mood_score\": <integer>} where the integer is between 1 \
(very low) and 10 (very high). Output JSON only.";
const QUOTE_SYSTEM_PROMPT: &str = "You write one short, original inspirational quote for the \
author of the journal entries below, and four single-word tags describing its themes. Reply \
with a single JSON object {\"quote\": <string>, \"tags\": [<4 strings>]}. Output JSON only.";

/// Why a completion could not be turned into a task output.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
	#[error("Completion is not valid JSON: {0}")]
	Json(String),
	#[error(transparent)]
	Invalid(#[from] ValidationError),
}

/// A unit of enrichment work: how to prompt for it and how to validate the reply.
pub trait EnrichmentTask: Send + Sync {
	type Output: Send;

	fn name(&self) -> &'static str;

	fn prompt(&self) -> Prompt;

	fn parse(&self, completion: &str) -> Result<Self::Output, ParseError>;
}

/// Scores the mood of one entry body.
#[derive(Clone, Debug)]
pub struct MoodTask {
	pub body: String,
}
impl EnrichmentTask for MoodTask {
	type Output = MoodScore;

	fn name(&self) -> &'static str {
		"mood"
	}

	fn prompt(&self) -> Prompt {
		Prompt { system: MOOD_SYSTEM_PROMPT.to_string(), user: self.body.clone() }
	}

	fn parse(&self, completion: &str) -> Result<MoodScore, ParseError> {
		let json = parse_json(completion)?;
		let raw = match json.get("mood_score").unwrap_or(&json) {
			Value::Number(number) => number.to_string(),
			Value::String(text) => text.clone(),
			other => return Err(ParseError::Json(format!("Unexpected mood value {other}."))),
		};

		Ok(MoodScore::parse(&raw)?)
	}
}

/// Generates a quote from a user's most recent entry bodies, newest first.
#[derive(Clone, Debug)]
pub struct QuoteTask {
	pub entries: Vec<String>,
}
impl EnrichmentTask for QuoteTask {
	type Output = GeneratedQuote;

	fn name(&self) -> &'static str {
		"quote"
	}

	fn prompt(&self) -> Prompt {
		let user = if self.entries.is_empty() {
			"The author has not written anything yet.".to_string()
		} else {
			self.entries
				.iter()
				.enumerate()
				.map(|(idx, body)| format!("Entry {}:\n{}", idx + 1, body.trim()))
				.collect::<Vec<_>>()
				.join("\n\n")
		};

		Prompt { system: QUOTE_SYSTEM_PROMPT.to_string(), user }
	}

	fn parse(&self, completion: &str) -> Result<GeneratedQuote, ParseError> {
		#[derive(Deserialize)]
		struct QuoteReply {
			quote: String,
			tags: Vec<String>,
		}

		let reply: QuoteReply = serde_json::from_value(parse_json(completion)?)
			.map_err(|err| ParseError::Json(err.to_string()))?;

		Ok(GeneratedQuote::new(&reply.quote, reply.tags)?)
	}
}

/// Parses a completion as JSON, tolerating a surrounding Markdown code fence.
fn parse_json(completion: &str) -> Result<Value, ParseError> {
	let mut text = completion.trim();

	if let Some(rest) = text.strip_prefix("```") {
		let rest = rest.split_once('\n').map_or("", |(_, body)| body);

		text = rest.trim_end().strip_suffix("```").unwrap_or(rest).trim();
	}

	serde_json::from_str(text).map_err(|err| ParseError::Json(err.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mood_accepts_object_bare_number_and_fenced_reply() {
		let task = MoodTask { body: "had a great day".to_string() };

		assert_eq!(task.parse("{\"mood_score\": 8}").map(MoodScore::get), Ok(8));
		assert_eq!(task.parse("7").map(MoodScore::get), Ok(7));
		assert_eq!(task.parse("```json\n{\"mood_score\": \"4\"}\n```").map(MoodScore::get), Ok(4));
	}

	#[test]
	fn mood_rejects_out_of_range_and_prose() {
		let task = MoodTask { body: "meh".to_string() };

		assert_eq!(
			task.parse("{\"mood_score\": 12}"),
			Err(ParseError::Invalid(ValidationError::MoodOutOfRange(12)))
		);
		assert!(matches!(task.parse("I'd say a seven."), Err(ParseError::Json(_))));
	}

	#[test]
	fn quote_requires_exactly_four_tags() {
		let task = QuoteTask { entries: vec!["walked by the sea".to_string()] };
		let ok = task
			.parse("{\"quote\": \"Small steps.\", \"tags\": [\"calm\", \"sea\", \"growth\", \"rest\"]}")
			.expect("Failed to parse quote.");

		assert_eq!(ok.text, "Small steps.");
		assert_eq!(ok.tags[3], "rest");
		assert_eq!(
			task.parse("{\"quote\": \"Small steps.\", \"tags\": [\"calm\"]}"),
			Err(ParseError::Invalid(ValidationError::TagCount(1)))
		);
	}

	#[test]
	fn quote_prompt_numbers_entries() {
		let task = QuoteTask { entries: vec![" first ".to_string(), "second".to_string()] };

		assert_eq!(task.prompt().user, "Entry 1:\nfirst\n\nEntry 2:\nsecond");
		assert!(QuoteTask { entries: Vec::new() }.prompt().user.contains("not written"));
	}
}
