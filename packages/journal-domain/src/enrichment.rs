use serde::{Deserialize, Serialize};

pub const MIN_MOOD_SCORE: i16 = 1;
pub const MAX_MOOD_SCORE: i16 = 10;
pub const QUOTE_TAG_COUNT: usize = 4;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
	#[error("Mood score {0} is outside {MIN_MOOD_SCORE}..={MAX_MOOD_SCORE}.")]
	MoodOutOfRange(i64),
	#[error("Mood score {0:?} is not an integer.")]
	MoodNotInteger(String),
	#[error("Quote text is empty.")]
	EmptyQuote,
	#[error("Quote must carry exactly {QUOTE_TAG_COUNT} tags, got {0}.")]
	TagCount(usize),
	#[error("Quote tags must be non-empty.")]
	EmptyTag,
}

/// Mood on a 1–10 scale. Only constructible from a validated value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i16")]
pub struct MoodScore(i16);
impl MoodScore {
	pub fn get(self) -> i16 {
		self.0
	}

	/// Accepts an integer, optionally written as a float with no fractional part (`7.0`).
	pub fn parse(raw: &str) -> Result<Self, ValidationError> {
		let trimmed = raw.trim();

		if let Ok(value) = trimmed.parse::<i64>() {
			return Self::try_from(value);
		}

		match trimmed.parse::<f64>() {
			Ok(value) if value.is_finite() && value.fract() == 0.0 => Self::try_from(value as i64),
			_ => Err(ValidationError::MoodNotInteger(trimmed.to_string())),
		}
	}
}
impl TryFrom<i64> for MoodScore {
	type Error = ValidationError;

	fn try_from(value: i64) -> Result<Self, Self::Error> {
		if !(i64::from(MIN_MOOD_SCORE)..=i64::from(MAX_MOOD_SCORE)).contains(&value) {
			return Err(ValidationError::MoodOutOfRange(value));
		}

		Ok(Self(value as i16))
	}
}
impl From<MoodScore> for i16 {
	fn from(score: MoodScore) -> Self {
		score.0
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GeneratedQuote {
	pub text: String,
	pub tags: [String; QUOTE_TAG_COUNT],
}
impl GeneratedQuote {
	pub fn new(text: &str, tags: Vec<String>) -> Result<Self, ValidationError> {
		let text = text.trim();

		if text.is_empty() {
			return Err(ValidationError::EmptyQuote);
		}

		let tags: Vec<String> = tags.into_iter().map(|tag| tag.trim().to_string()).collect();

		if tags.iter().any(String::is_empty) {
			return Err(ValidationError::EmptyTag);
		}

		let count = tags.len();
		let tags: [String; QUOTE_TAG_COUNT] =
			tags.try_into().map_err(|_| ValidationError::TagCount(count))?;

		Ok(Self { text: text.to_string(), tags })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mood_accepts_whole_numbers_in_range() {
		assert_eq!(MoodScore::parse(" 7 ").map(MoodScore::get), Ok(7));
		assert_eq!(MoodScore::parse("10.0").map(MoodScore::get), Ok(10));
		assert_eq!(MoodScore::parse("1").map(MoodScore::get), Ok(1));
	}

	#[test]
	fn mood_rejects_out_of_range_and_fractions() {
		assert_eq!(MoodScore::parse("0"), Err(ValidationError::MoodOutOfRange(0)));
		assert_eq!(MoodScore::parse("11"), Err(ValidationError::MoodOutOfRange(11)));
		assert!(matches!(MoodScore::parse("6.5"), Err(ValidationError::MoodNotInteger(_))));
		assert!(matches!(MoodScore::parse("happy"), Err(ValidationError::MoodNotInteger(_))));
	}

	#[test]
	fn quote_requires_four_non_blank_tags() {
		let tags = |n: usize| (0..n).map(|i| format!("tag{i}")).collect::<Vec<_>>();

		assert!(GeneratedQuote::new("Keep going.", tags(4)).is_ok());
		assert_eq!(GeneratedQuote::new("Keep going.", tags(3)), Err(ValidationError::TagCount(3)));
		assert_eq!(GeneratedQuote::new("Keep going.", tags(5)), Err(ValidationError::TagCount(5)));
		assert_eq!(GeneratedQuote::new("  ", tags(4)), Err(ValidationError::EmptyQuote));
		assert_eq!(
			GeneratedQuote::new(
				"Keep going.",
				vec!["a".to_string(), " ".to_string(), "c".to_string(), "d".to_string()]
			),
			Err(ValidationError::EmptyTag)
		);
	}
}
