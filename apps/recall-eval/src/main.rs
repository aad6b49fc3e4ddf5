use clap::Parser;

use recall_eval::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	recall_eval::run(args).await
}
