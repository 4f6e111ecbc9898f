use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_app::{dashboard::QueryState, Application};
use shelf_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "shelf", version, about = "Personal book catalog")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server until Ctrl-C.
    Serve,
    /// Print a user's dashboard for a shareable query state.
    View {
        /// Session token of the user.
        #[arg(long)]
        token: String,
        /// Shareable query string, e.g. `sort=-price&title=dune&view=grid`.
        #[arg(long, default_value = "")]
        query: String,
    },
    /// Print the canonical form of a shareable query string.
    Normalize { query: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => {
            let settings = load_settings()?;
            shelf_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "shelf serve starting");

            let app = Application::build(&settings).await?;
            app.serve(&settings).await
        }
        Command::View { token, query } => {
            let state = parse_query(&query)?;
            let settings = load_settings()?;

            let app = Application::build(&settings).await?;
            let dashboard = app.dashboard(&token, state).await?;
            println!("{}", dashboard.render());
            Ok(())
        }
        Command::Normalize { query } => {
            println!("{}", parse_query(&query)?);
            Ok(())
        }
    }
}

fn load_settings() -> anyhow::Result<Settings> {
    Settings::load().with_context(|| "failed to load SHELF settings")
}

fn parse_query(query: &str) -> anyhow::Result<QueryState> {
    QueryState::from_query_str(query).with_context(|| format!("invalid query state '{query}'"))
}
