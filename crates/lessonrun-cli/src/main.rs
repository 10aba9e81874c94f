//! lessonrun CLI: take module quizzes and manage modules from the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "lessonrun", version, about = "Learning-module quiz runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a module's quiz, resuming an unfinished attempt if there is one
    Take {
        /// Module slug
        #[arg(long)]
        module: String,

        /// Student name (prompted for when omitted)
        #[arg(long)]
        name: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List modules
    Modules {
        /// Search by title
        #[arg(long)]
        keyword: Option<String>,

        /// Filter by grade id ("all" for every grade)
        #[arg(long)]
        grade: Option<String>,

        /// Filter by subject id ("all" for every subject)
        #[arg(long)]
        subject: Option<String>,

        /// Page number
        #[arg(long)]
        page: Option<u32>,

        /// Modules per page
        #[arg(long)]
        per_page: Option<u32>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Flip a module's published flag
    Publish {
        /// Module slug
        #[arg(long)]
        module: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Delete a module and its questions
    Delete {
        /// Module slug
        #[arg(long)]
        module: String,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List submissions grouped by module
    Submissions {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Forget the unfinished attempt, if any
    Reset {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lessonrun=info".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            module,
            name,
            config,
        } => commands::take::execute(module, name, config).await,
        Commands::Modules {
            keyword,
            grade,
            subject,
            page,
            per_page,
            config,
        } => commands::modules::execute(keyword, grade, subject, page, per_page, config).await,
        Commands::Publish { module, config } => commands::publish::execute(module, config).await,
        Commands::Delete {
            module,
            yes,
            config,
        } => commands::delete::execute(module, yes, config).await,
        Commands::Submissions { config } => commands::submissions::execute(config).await,
        Commands::Reset { config } => commands::reset::execute(config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
