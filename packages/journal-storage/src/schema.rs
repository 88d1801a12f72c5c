/// The bootstrap script with every `\ir` include inlined.
pub fn render_schema() -> String {
	let mut out = String::new();

	for line in include_str!("../../../sql/init.sql").lines() {
		match line.trim().strip_prefix("\\ir ").map(str::trim) {
			Some("tables/001_journal_entries.sql") =>
				out.push_str(include_str!("../../../sql/tables/001_journal_entries.sql")),
			Some("tables/002_analysis_queue.sql") =>
				out.push_str(include_str!("../../../sql/tables/002_analysis_queue.sql")),
			Some("tables/003_inspirational_quotes.sql") =>
				out.push_str(include_str!("../../../sql/tables/003_inspirational_quotes.sql")),
			Some(_) | None => {
				out.push_str(line);
				out.push('\n');
			},
		}
	}

	out
}
