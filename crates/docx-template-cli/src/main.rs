//! docx-template CLI - Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "docx-template")]
#[command(version)]
#[command(about = "Fill Word document templates with data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template with a JSON or YAML data file
    Render {
        /// Template document (.docx)
        template: String,

        /// Data file (.json, .yaml or .yml)
        #[arg(short = 'd', long)]
        data: String,

        /// Write the rendered document to FILE
        #[arg(short = 'o', long)]
        output: String,

        /// TOML file with render options
        #[arg(long)]
        config: Option<String>,

        /// Directory that relative image paths are resolved against
        #[arg(long)]
        image_root: Option<String>,

        /// Write the output without compression
        #[arg(long)]
        store: bool,
    },

    /// List the placeholders of a template, per part
    Placeholders {
        /// Template document (.docx)
        template: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docx_template=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            template,
            data,
            output,
            config,
            image_root,
            store,
        } => commands::render::execute(commands::render::RenderArgs {
            template,
            data,
            output,
            config,
            image_root,
            store,
        }),
        Commands::Placeholders { template, json } => {
            commands::placeholders::execute(commands::placeholders::PlaceholdersArgs {
                template,
                json,
            })
        }
    }
}
