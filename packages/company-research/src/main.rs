use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use console::Term;
use dialoguer::{theme::ColorfulTheme, Input};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use company_research::{
    Catalog, ChatModel, Config, EventSink, FirecrawlClient, MatchKind, ResearchError,
    ResearchEvent, ResearchReport, Researcher, SerperSearcher, Stage,
};

#[derive(Parser)]
#[command(name = "company-research")]
#[command(about = "Research a company from web sources", long_about = None)]
struct Cli {
    /// Company name or ticker (prompted when omitted)
    #[arg(short, long)]
    company: Option<String>,

    /// Research objective, e.g. "quarterly earnings 2024" (prompted when omitted)
    #[arg(short, long)]
    objective: Option<String>,

    /// Print the report without writing it to the results directory
    #[arg(long)]
    no_save: bool,
}

impl Cli {
    /// True when at least one value still has to be prompted for.
    fn is_interactive(&self) -> bool {
        self.company.is_none() || self.objective.is_none()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,company_research=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".bright_red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let catalog = Catalog::load(&config.companies_file)
        .context("Company catalog could not be loaded")?;

    if cli.is_interactive() {
        print_banner()?;
    }

    let company = match cli.company {
        Some(company) => company,
        None => prompt("Enter company name or ticker")?,
    };
    let objective = match cli.objective {
        Some(objective) => objective,
        None => prompt("Enter research objective")?,
    };
    let company = company.trim().to_string();
    let objective = objective.trim().to_string();
    if company.is_empty() || objective.is_empty() {
        bail!("Both company and research objective are required");
    }

    let chat = ChatModel::openrouter(&config.openrouter_api_key, config.model.clone())
        .with_base_url(config.openrouter_base_url.clone());

    let mut firecrawl = FirecrawlClient::new(config.firecrawl_api_key.clone());
    if let Some(url) = &config.firecrawl_base_url {
        firecrawl = firecrawl.with_base_url(url.clone());
    }

    let researcher = Researcher::new(
        catalog,
        SerperSearcher::new(config.serper_api_key.clone()),
        chat,
        firecrawl,
    )
    .with_poll_policy(config.poll_policy)
    .with_events(console_events());

    println!();
    println!(
        "{} {}",
        "🔍 Researching".bright_cyan().bold(),
        format!("{} ({})", company, objective).bright_white()
    );

    let outcome = tokio::select! {
        outcome = researcher.research(&company, &objective) => outcome,
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("{}", "⚠️  Research interrupted by user".yellow());
            return Ok(ExitCode::FAILURE);
        }
    };

    match outcome {
        Ok(report) => {
            finish(&report, &config, cli.no_save);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            report_failure(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_banner() -> Result<()> {
    let term = Term::stdout();
    if term.is_term() {
        term.clear_screen()?;
    }
    println!(
        "{}",
        "╔════════════════════════════════════════╗".bright_cyan()
    );
    println!(
        "{}",
        "║        Company Research Agent          ║".bright_cyan()
    );
    println!(
        "{}",
        "╚════════════════════════════════════════╝".bright_cyan()
    );
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    let value: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(label)
        .interact_text()?;
    Ok(value)
}

/// Print pipeline progress as it happens.
fn console_events() -> EventSink {
    Arc::new(|event: &ResearchEvent| match event {
        ResearchEvent::Resolved { name, ticker, kind } => {
            let how = match kind {
                MatchKind::Identifier => "ticker".to_string(),
                MatchKind::Name => "name".to_string(),
                MatchKind::Fuzzy { score } => format!("fuzzy, score {}", score),
            };
            println!(
                "{} {} ({}) [{}]",
                "✓ Found company:".green(),
                name.bold(),
                ticker.as_deref().unwrap_or("N/A"),
                how.dimmed()
            );
        }
        ResearchEvent::Searching { query } => {
            println!("{} {}", "🌐 Searching:".cyan(), query);
        }
        ResearchEvent::SearchResults { count } => {
            println!("{} {} results", "✓ Search returned".green(), count);
        }
        ResearchEvent::UrlsSelected { urls, degraded } => {
            if *degraded {
                println!(
                    "{}",
                    "⚠️  URL selection unavailable, using top search results".yellow()
                );
            }
            println!("{}", "📋 Selected URLs:".cyan());
            for (i, url) in urls.iter().enumerate() {
                println!("   {}. {}", i + 1, url);
            }
        }
        ResearchEvent::JobSubmitted { job_id } => {
            println!("{} {}", "⏳ Extraction job started:".cyan(), job_id.dimmed());
        }
        ResearchEvent::StillProcessing {
            attempt,
            max_attempts,
        } => {
            println!(
                "{}",
                format!("   Still processing... ({}/{})", attempt, max_attempts).dimmed()
            );
        }
        ResearchEvent::ExtractionComplete { attempts } => {
            println!(
                "{} after {} checks",
                "✓ Extraction completed".green(),
                attempts
            );
        }
    })
}

fn finish(report: &ResearchReport, config: &Config, no_save: bool) {
    println!();
    println!("{}", report.render());

    if no_save {
        return;
    }

    match report.save(&config.results_dir) {
        Ok(path) => println!(
            "{} {}",
            "💾 Results saved to:".bright_green(),
            path.display()
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to save report");
            println!("{} {}", format!("⚠️  {} failed:", Stage::Report).yellow(), e);
        }
    }
}

fn report_failure(error: &ResearchError) {
    println!();
    println!(
        "{} {}",
        format!("❌ {} failed:", error.stage())
            .bright_red()
            .bold(),
        error
    );
    if let ResearchError::NotFound { .. } = error {
        println!(
            "{}",
            "   Try the exact ticker symbol or a distinctive part of the company name.".dimmed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_skip_prompts() {
        let cli = Cli::parse_from(["company-research", "-c", "AAPL", "-o", "earnings", "--no-save"]);
        assert!(!cli.is_interactive());
        assert!(cli.no_save);
        assert_eq!(cli.company.as_deref(), Some("AAPL"));
    }

    #[test]
    fn test_missing_value_is_interactive() {
        assert!(Cli::parse_from(["company-research"]).is_interactive());
        assert!(Cli::parse_from(["company-research", "--company", "NVDA"]).is_interactive());
    }
}
