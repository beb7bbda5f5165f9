//! Fastfeet CLI client - admin tool for deliveries and their problems

mod client;
mod messages;
mod tui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::client::FastfeetClient;

#[derive(Parser)]
#[command(name = "fastfeet")]
#[command(about = "CLI client for Fastfeet - delivery management admin")]
#[command(version)]
struct Cli {
    /// Server URL
    #[arg(short, long, env = "FASTFEET_URL", default_value = "http://localhost:3000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List reported problems, six per page
    Problems {
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Only problems whose description contains this text
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Show every problem reported on a delivery
    Show {
        delivery_id: i64,
    },

    /// Report a problem on a delivery
    Report {
        delivery_id: i64,

        /// Deliveryman responsible for the delivery
        #[arg(short, long)]
        deliveryman: i64,

        #[arg(short = 'm', long)]
        description: String,
    },

    /// Cancel the delivery a problem was reported on
    Cancel {
        problem_id: i64,
    },

    /// List deliveries
    Deliveries {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Browse problems interactively
    Tui,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fastfeet_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let client = FastfeetClient::new(&cli.server)?;

    match cli.command {
        Commands::Problems { page, query } => run_problems(&client, page, query.as_deref()).await,
        Commands::Show { delivery_id } => run_show(&client, delivery_id).await,
        Commands::Report {
            delivery_id,
            deliveryman,
            description,
        } => run_report(&client, delivery_id, deliveryman, &description).await,
        Commands::Cancel { problem_id } => run_cancel(&client, problem_id).await,
        Commands::Deliveries { page } => run_deliveries(&client, page).await,
        Commands::Tui => tui::run(client).await,
    }
}

async fn run_problems(client: &FastfeetClient, page: u32, query: Option<&str>) -> Result<()> {
    let problems = client.list_problems(page, query).await?;

    if problems.is_empty() {
        println!("No problems found.");
    } else {
        println!("Problems (page {}):", page);
        println!("{:─<60}", "");
        for problem in problems {
            println!(
                "  #{:<4} delivery #{} [{}] {}",
                problem.id,
                problem.delivery.id,
                problem.delivery.status.label(),
                problem.description
            );
        }
    }

    Ok(())
}

async fn run_show(client: &FastfeetClient, delivery_id: i64) -> Result<()> {
    let problems = client.show_problems(delivery_id).await?;

    if problems.is_empty() {
        println!("Delivery #{} has no problems.", delivery_id);
    } else {
        println!("Problems of delivery #{}:", delivery_id);
        println!("{:─<60}", "");
        for problem in problems {
            println!(
                "  {} - {}",
                problem.created_at.format("%Y-%m-%d %H:%M"),
                problem.description
            );
        }
    }

    Ok(())
}

async fn run_report(
    client: &FastfeetClient,
    delivery_id: i64,
    deliveryman_id: i64,
    description: &str,
) -> Result<()> {
    let created = client
        .report_problem(delivery_id, deliveryman_id, description)
        .await?;
    println!(
        "Reported problem #{} on delivery #{}",
        created.id, created.delivery_id
    );
    Ok(())
}

async fn run_cancel(client: &FastfeetClient, problem_id: i64) -> Result<()> {
    let detail = client.cancel_problem(problem_id).await?;
    println!(
        "Canceled delivery #{} ({}); {} will be notified at {}",
        detail.delivery.id, detail.delivery.product, detail.deliveryman.name, detail.deliveryman.email
    );
    Ok(())
}

async fn run_deliveries(client: &FastfeetClient, page: u32) -> Result<()> {
    let deliveries = client.list_deliveries(page).await?;

    if deliveries.is_empty() {
        println!("No deliveries found.");
    } else {
        println!("Deliveries (page {}):", page);
        println!("{:─<60}", "");
        for delivery in deliveries {
            println!(
                "  #{:<4} [{}] {} (deliveryman #{})",
                delivery.id,
                delivery.status.label(),
                delivery.product,
                delivery.deliveryman_id
            );
        }
    }

    Ok(())
}
