use clap::Parser;

use journal_worker::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	journal_worker::run(Args::parse()).await
}
