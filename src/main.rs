use clap::Parser;
use lineloop::App;
use lineloop::core::config::{self, CliOverrides};
use lineloop::journal::{Journal, JournalStore, Output};
use simplelog::{ConfigBuilder, WriteLogger};
use std::fs::File;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "lineloop", about = "A line journal driven by a message loop")]
struct Args {
    /// Journal file to read and write
    #[arg(short, long)]
    journal: Option<String>,

    /// Log level written to the log file
    #[arg(long)]
    log_level: Option<String>,

    /// Exit once stdin is exhausted (useful when piping input)
    #[arg(long)]
    quit_on_eof: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let file_config = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("lineloop: {e}");
            std::process::exit(2);
        }
    };
    let resolved = config::resolve(
        &file_config,
        &CliOverrides {
            journal: args.journal.as_deref(),
            log_level: args.log_level.as_deref(),
            quit_on_eof: args.quit_on_eof,
        },
    );

    // File logger: stdout belongs to the journal
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create(&resolved.log_file) {
        let _ = WriteLogger::init(resolved.log_level, log_config, log_file);
    }

    log::info!(
        "lineloop starting with journal at {}",
        resolved.journal_path.display()
    );

    let (output, printer) = Output::stdout();
    let journal = Journal::with_output(JournalStore::new(resolved.journal_path.clone()), output);
    let result = App::with_options(journal, resolved.runtime_options())
        .run()
        .await;

    // Let queued replies reach the terminal before exiting.
    match tokio::time::timeout(Duration::from_secs(1), printer).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("Reply printer failed: {}", e),
        Err(_) => log::warn!("Reply printer did not finish, some replies may be lost"),
    }

    let code = match result {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("lineloop: {e}");
            1
        }
    };

    // The stdin reader may still be parked in a blocking read, which would
    // keep the runtime from shutting down.
    std::process::exit(code)
}
