use std::{
	collections::HashSet,
	fs,
	path::{Path, PathBuf},
	sync::Arc,
	time::Instant,
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio_util::sync::CancellationToken;

use recall_config::Config;
use recall_domain::clock::{Clock, SystemClock};
use recall_service::{RecallService, SearchFilters, SearchMode, SearchRequest};
use recall_storage::{MemoryArchive, TracingAnalyticsSink, models::ConversationTurn};

#[derive(Debug, Parser)]
#[command(
	version = recall_cli::VERSION,
	rename_all = "kebab",
	styles = recall_cli::styles(),
)]
pub struct Args {
	/// TOML config; built-in defaults when omitted.
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: Option<PathBuf>,
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: PathBuf,
	#[arg(long, value_name = "N", default_value_t = 10)]
	pub take: u32,
	/// Pins the scoring clock so temporal relevance is reproducible.
	#[arg(long, value_name = "RFC3339", value_parser = parse_rfc3339)]
	pub now: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
struct EvalDataset {
	name: Option<String>,
	turns: Vec<ConversationTurn>,
	queries: Vec<EvalQuery>,
}

#[derive(Debug, Deserialize)]
struct EvalQuery {
	id: Option<String>,
	query: String,
	#[serde(default)]
	filters: Option<SearchFilters>,
	#[serde(default)]
	mode: SearchMode,
	expected_conversation_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct EvalOutput {
	dataset: EvalDatasetInfo,
	settings: EvalSettings,
	summary: EvalSummary,
	queries: Vec<QueryReport>,
}

#[derive(Debug, Serialize)]
struct EvalDatasetInfo {
	name: String,
	turn_count: usize,
	query_count: usize,
}

#[derive(Debug, Serialize)]
struct EvalSettings {
	config_path: Option<String>,
	take: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	now: Option<String>,
}

#[derive(Debug, Serialize)]
struct EvalSummary {
	avg_recall_at_k: f64,
	avg_precision_at_k: f64,
	mean_rr: f64,
	mean_ndcg: f64,
	fallback_count: usize,
	latency_ms_p50: f64,
	latency_ms_p95: f64,
}

#[derive(Debug, Serialize)]
struct QueryReport {
	id: String,
	query: String,
	interpretation: String,
	expected_count: usize,
	retrieved_count: usize,
	relevant_count: usize,
	recall_at_k: f64,
	precision_at_k: f64,
	rr: f64,
	ndcg: f64,
	latency_ms: f64,
	fallback: bool,
	expected_conversation_ids: Vec<String>,
	retrieved_conversation_ids: Vec<String>,
}

struct Metrics {
	recall_at_k: f64,
	precision_at_k: f64,
	rr: f64,
	ndcg: f64,
	relevant_count: usize,
}

struct FixedClock(OffsetDateTime);
impl Clock for FixedClock {
	fn now(&self) -> OffsetDateTime {
		self.0
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let cfg = match &args.config {
		Some(path) => recall_config::load(path)?,
		None => Config::default(),
	};

	recall_cli::init_tracing(&cfg.service.log_level);

	let dataset = load_dataset(&args.dataset)?;
	let output = evaluate(cfg, dataset, &args).await?;
	let json = serde_json::to_string_pretty(&output)?;

	println!("{json}");

	Ok(())
}

fn parse_rfc3339(raw: &str) -> Result<OffsetDateTime, String> {
	OffsetDateTime::parse(raw, &Rfc3339)
		.map_err(|err| format!("Invalid RFC 3339 timestamp: {err}."))
}

fn load_dataset(path: &Path) -> color_eyre::Result<EvalDataset> {
	let raw = fs::read_to_string(path)?;
	let dataset: EvalDataset = serde_json::from_str(&raw)?;

	if dataset.queries.is_empty() {
		return Err(eyre::eyre!("Dataset must include at least one query."));
	}
	if dataset.turns.is_empty() {
		return Err(eyre::eyre!("Dataset must include at least one turn."));
	}

	Ok(dataset)
}

async fn evaluate(
	cfg: Config,
	dataset: EvalDataset,
	args: &Args,
) -> color_eyre::Result<EvalOutput> {
	let turn_count = dataset.turns.len();
	let clock: Arc<dyn Clock> = match args.now {
		Some(now) => Arc::new(FixedClock(now)),
		None => Arc::new(SystemClock),
	};
	let service = RecallService::with_parts(
		cfg,
		Arc::new(MemoryArchive::from_turns(dataset.turns)),
		Arc::new(TracingAnalyticsSink),
		clock,
	)?;
	let cancel = CancellationToken::new();
	let mut reports = Vec::with_capacity(dataset.queries.len());
	let mut latencies_ms = Vec::with_capacity(dataset.queries.len());

	for (idx, query) in dataset.queries.into_iter().enumerate() {
		let request = SearchRequest {
			query: query.query.clone(),
			filters: query.filters,
			mode: query.mode,
			take: args.take,
			..Default::default()
		};
		let started = Instant::now();
		let response = service.search(request, &cancel).await;
		let latency_ms = started.elapsed().as_secs_f64() * 1_000.0;
		let retrieved = unique_ids(
			response.scored_results.iter().map(|hit| hit.turn.conversation_id.clone()),
		);
		let expected: HashSet<String> = query.expected_conversation_ids.iter().cloned().collect();
		let metrics = compute_metrics(&retrieved, &expected);

		tracing::debug!(query = %query.query, latency_ms, rr = metrics.rr, "Evaluated query.");

		latencies_ms.push(latency_ms);
		reports.push(QueryReport {
			id: query.id.unwrap_or_else(|| format!("q{idx}")),
			query: query.query,
			interpretation: response.interpretation,
			expected_count: expected.len(),
			retrieved_count: retrieved.len(),
			relevant_count: metrics.relevant_count,
			recall_at_k: metrics.recall_at_k,
			precision_at_k: metrics.precision_at_k,
			rr: metrics.rr,
			ndcg: metrics.ndcg,
			latency_ms,
			fallback: response.metadata.fallback,
			expected_conversation_ids: query.expected_conversation_ids,
			retrieved_conversation_ids: retrieved,
		});
	}

	let summary = summarize(&reports, &latencies_ms);

	Ok(EvalOutput {
		dataset: EvalDatasetInfo {
			name: dataset.name.unwrap_or_else(|| "unnamed".to_string()),
			turn_count,
			query_count: reports.len(),
		},
		settings: EvalSettings {
			config_path: args.config.as_ref().map(|path| path.display().to_string()),
			take: args.take,
			now: args.now.and_then(|now| now.format(&Rfc3339).ok()),
		},
		summary,
		queries: reports,
	})
}

/// Conversation ids in first-seen order; several turns of one conversation count once.
fn unique_ids<I>(iter: I) -> Vec<String>
where
	I: Iterator<Item = String>,
{
	let mut seen = HashSet::new();
	let mut out = Vec::new();

	for id in iter {
		if seen.insert(id.clone()) {
			out.push(id);
		}
	}

	out
}

fn compute_metrics(retrieved: &[String], expected: &HashSet<String>) -> Metrics {
	let mut relevant_count = 0_usize;
	let mut dcg = 0.0_f64;
	let mut first_hit: Option<usize> = None;

	for (idx, id) in retrieved.iter().enumerate() {
		if !expected.contains(id) {
			continue;
		}

		let rank = idx + 1;

		relevant_count += 1;
		dcg += 1.0 / (rank as f64 + 1.0).log2();
		first_hit.get_or_insert(rank);
	}

	let idcg: f64 = (1..=expected.len().min(retrieved.len()))
		.map(|rank| 1.0 / (rank as f64 + 1.0).log2())
		.sum();
	let rr = first_hit.map(|rank| 1.0 / rank as f64).unwrap_or(0.0);
	let ndcg = if idcg > 0.0 { dcg / idcg } else { 0.0 };
	let precision_at_k =
		if retrieved.is_empty() { 0.0 } else { relevant_count as f64 / retrieved.len() as f64 };
	let recall_at_k =
		if expected.is_empty() { 0.0 } else { relevant_count as f64 / expected.len() as f64 };

	Metrics { recall_at_k, precision_at_k, rr, ndcg, relevant_count }
}

fn summarize(reports: &[QueryReport], latencies_ms: &[f64]) -> EvalSummary {
	let count = reports.len().max(1) as f64;
	let mut sorted = latencies_ms.to_vec();

	sorted.sort_by(f64::total_cmp);

	EvalSummary {
		avg_recall_at_k: reports.iter().map(|r| r.recall_at_k).sum::<f64>() / count,
		avg_precision_at_k: reports.iter().map(|r| r.precision_at_k).sum::<f64>() / count,
		mean_rr: reports.iter().map(|r| r.rr).sum::<f64>() / count,
		mean_ndcg: reports.iter().map(|r| r.ndcg).sum::<f64>() / count,
		fallback_count: reports.iter().filter(|r| r.fallback).count(),
		latency_ms_p50: percentile(&sorted, 0.50),
		latency_ms_p95: percentile(&sorted, 0.95),
	}
}

/// Linear interpolation between the closest ranks of an ascending slice.
fn percentile(values: &[f64], percentile: f64) -> f64 {
	if values.is_empty() {
		return 0.0;
	}

	let pos = percentile.clamp(0.0, 1.0) * (values.len() as f64 - 1.0);
	let lower = pos.floor() as usize;
	let upper = pos.ceil() as usize;
	let weight = pos - lower as f64;

	values[lower] * (1.0 - weight) + values[upper] * weight
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ids(values: &[&str]) -> Vec<String> {
		values.iter().map(|value| value.to_string()).collect()
	}

	#[test]
	fn metrics_reward_early_hits() {
		let expected: HashSet<String> = ids(&["a", "c"]).into_iter().collect();
		let metrics = compute_metrics(&ids(&["b", "a", "c"]), &expected);

		assert_eq!(metrics.relevant_count, 2);
		assert!((metrics.rr - 0.5).abs() < 1e-12);
		assert!((metrics.recall_at_k - 1.0).abs() < 1e-12);
		assert!((metrics.precision_at_k - 2.0 / 3.0).abs() < 1e-12);
		assert!(metrics.ndcg > 0.0 && metrics.ndcg < 1.0);
	}

	#[test]
	fn metrics_are_zero_without_hits() {
		let expected: HashSet<String> = ids(&["z"]).into_iter().collect();
		let metrics = compute_metrics(&ids(&["a"]), &expected);

		assert_eq!(metrics.rr, 0.0);
		assert_eq!(metrics.ndcg, 0.0);
	}

	#[test]
	fn percentile_interpolates() {
		let values = [10.0, 20.0, 30.0, 40.0];

		assert_eq!(percentile(&values, 0.0), 10.0);
		assert!((percentile(&values, 0.5) - 25.0).abs() < 1e-12);
		assert_eq!(percentile(&[], 0.95), 0.0);
	}

	#[test]
	fn unique_ids_keep_first_occurrence() {
		let out = unique_ids(ids(&["a", "b", "a", "c"]).into_iter());

		assert_eq!(out, ids(&["a", "b", "c"]));
	}

	#[tokio::test]
	async fn sample_dataset_finds_expected_conversations() {
		let path =
			Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample_dataset.json");
		let dataset = load_dataset(&path).expect("Sample dataset must load.");
		let args = Args {
			config: None,
			dataset: path,
			take: 5,
			now: Some(time::macros::datetime!(2025-06-01 12:00 UTC)),
		};
		let output =
			evaluate(Config::default(), dataset, &args).await.expect("Evaluation must succeed.");

		assert_eq!(output.dataset.query_count, 3);
		assert_eq!(output.summary.fallback_count, 0);
		assert!((output.summary.mean_rr - 1.0).abs() < 1e-12);
	}
}
