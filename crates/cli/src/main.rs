use anyhow::Context;
use clap::{Parser, Subcommand};

use libris_app::modules::books::fine::{compute_fine, FinePolicy};
use libris_kernel::settings::Settings;

/// Library catalog service: book inventory, loans, and overdue fines
#[derive(Debug, Parser)]
#[command(name = "libris", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create the database and its tables, then exit
    InitDb,
    /// Compute the fine for a loan without touching the database
    Fine {
        /// Loan start, YYYY-MM-DD
        #[arg(long)]
        borrowed: String,
        /// Loan end, YYYY-MM-DD
        #[arg(long)]
        returned: String,
        /// Charge per day past the grace period [default: fines.rate_per_day]
        #[arg(long, allow_negative_numbers = true)]
        rate: Option<f64>,
        /// Days that are free of charge [default: fines.grace_days]
        #[arg(long, allow_negative_numbers = true)]
        grace_days: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Fine {
            borrowed,
            returned,
            rate,
            grace_days,
        } => {
            let fines = Settings::load()
                .with_context(|| "failed to load Libris settings")?
                .fines;
            let policy = FinePolicy::new(
                rate.unwrap_or(fines.rate_per_day),
                grace_days.unwrap_or(fines.grace_days),
            )
            .with_context(|| "invalid fine policy")?;
            println!("{}", compute_fine(Some(&borrowed), Some(&returned), &policy));
            Ok(())
        }
        Command::InitDb => {
            let settings = load_settings()?;
            let app = libris_app::App::bootstrap(settings).await?;
            tracing::info!(url = %app.settings.database.url, "database initialized");
            app.db.close().await;
            Ok(())
        }
        Command::Serve => libris_app::run(load_settings()?).await,
    }
}

fn load_settings() -> anyhow::Result<Settings> {
    let settings = Settings::load().with_context(|| "failed to load Libris settings")?;
    libris_telemetry::init(&settings.telemetry)?;
    Ok(settings)
}
