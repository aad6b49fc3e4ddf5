use std::collections::{BTreeSet, HashMap, HashSet};

use unicode_segmentation::UnicodeSegmentation;

/// Lowercased Unicode words of `text`, in order.
pub fn words(text: &str) -> Vec<String> {
	text.unicode_words().map(str::to_lowercase).collect()
}

/// Word-boundary terms with short words and stopwords removed, deduplicated in first-seen order.
pub fn extract_terms(text: &str, stopwords: &HashSet<String>, min_chars: usize) -> Vec<String> {
	let mut out = Vec::new();
	let mut seen = HashSet::new();

	for word in text.unicode_words() {
		let word = word.to_lowercase();

		if word.chars().count() < min_chars || stopwords.contains(&word) {
			continue;
		}
		if seen.insert(word.clone()) {
			out.push(word);
		}
	}

	out
}

pub fn token_set(text: &str) -> HashSet<String> {
	text.unicode_words().map(str::to_lowercase).collect()
}

/// The `max` most frequent terms of `text`; ties resolve alphabetically.
pub fn top_keywords(
	text: &str,
	stopwords: &HashSet<String>,
	min_chars: usize,
	max: usize,
) -> BTreeSet<String> {
	let mut counts: HashMap<String, usize> = HashMap::new();

	for word in text.unicode_words() {
		let word = word.to_lowercase();

		if word.chars().count() < min_chars || stopwords.contains(&word) {
			continue;
		}

		*counts.entry(word).or_default() += 1;
	}

	let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();

	ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

	ranked.into_iter().take(max).map(|(word, _)| word).collect()
}

pub fn jaccard<T>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f32
where
	T: Ord,
{
	let union = a.union(b).count();

	if union == 0 {
		return 0.0;
	}

	a.intersection(b).count() as f32 / union as f32
}

/// Truncates to at most `max_chars` characters without splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
	match text.char_indices().nth(max_chars) {
		Some((idx, _)) => text[..idx].to_string(),
		None => text.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn stopwords() -> HashSet<String> {
		["the", "and"].into_iter().map(str::to_string).collect()
	}

	#[test]
	fn extract_terms_filters_and_dedupes() {
		let terms = extract_terms("The Rust and rust of a Tokio runtime", &stopwords(), 3);

		assert_eq!(terms, vec!["rust", "tokio", "runtime"]);
	}

	#[test]
	fn top_keywords_prefers_frequency_then_alphabet() {
		let keywords = top_keywords("beta alpha beta gamma alpha beta", &stopwords(), 3, 2);

		assert_eq!(keywords.into_iter().collect::<Vec<_>>(), vec!["alpha", "beta"]);
	}

	#[test]
	fn jaccard_of_empty_sets_is_zero() {
		let empty: BTreeSet<String> = BTreeSet::new();

		assert_eq!(jaccard(&empty, &empty), 0.0);
	}

	#[test]
	fn truncate_respects_char_boundaries() {
		assert_eq!(truncate_chars("héllo", 2), "hé");
		assert_eq!(truncate_chars("hi", 10), "hi");
	}
}
