use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
	pub field: String,
	pub text: String,
	pub highlighted: String,
	/// Character offset of the match within the field.
	pub start: usize,
	/// Match length in characters.
	pub length: usize,
}

/// Case-insensitive matchers for a query's terms, compiled once per search.
#[derive(Debug, Clone, Default)]
pub struct TermPatterns(Vec<Regex>);
impl TermPatterns {
	pub fn compile(terms: &[String]) -> Self {
		let patterns = terms
			.iter()
			.filter(|term| !term.is_empty())
			.filter_map(|term| {
				RegexBuilder::new(&regex::escape(term)).case_insensitive(true).build().ok()
			})
			.collect();

		Self(patterns)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

#[derive(Debug, Clone)]
pub struct Highlighter {
	window: usize,
	open: String,
	close: String,
}
impl Highlighter {
	pub fn new(window: usize, open: impl Into<String>, close: impl Into<String>) -> Self {
		Self { window, open: open.into(), close: close.into() }
	}

	/// One highlight per case-insensitive, non-overlapping occurrence of each term.
	pub fn highlight(&self, field: &str, text: &str, patterns: &TermPatterns) -> Vec<Highlight> {
		let mut out = Vec::new();

		if text.is_empty() {
			return out;
		}

		for pattern in &patterns.0 {
			for found in pattern.find_iter(text) {
				let window_start = back_chars(text, found.start(), self.window);
				let window_end = forward_chars(text, found.end(), self.window);
				let highlighted = format!(
					"{}{}{}{}{}",
					&text[window_start..found.start()],
					self.open,
					found.as_str(),
					self.close,
					&text[found.end()..window_end],
				);

				out.push(Highlight {
					field: field.to_string(),
					text: text[window_start..window_end].to_string(),
					highlighted,
					start: text[..found.start()].chars().count(),
					length: found.as_str().chars().count(),
				});
			}
		}

		out
	}
}

fn back_chars(text: &str, from: usize, count: usize) -> usize {
	text[..from].char_indices().rev().take(count).last().map(|(idx, _)| idx).unwrap_or(from)
}

fn forward_chars(text: &str, from: usize, count: usize) -> usize {
	text[from..].char_indices().nth(count).map(|(idx, _)| from + idx).unwrap_or(text.len())
}
