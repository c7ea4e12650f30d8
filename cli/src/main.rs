//! Command-line client for the exchange service.

use clap::{Parser, Subcommand};
use orderbook::{OrderKind, Side};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "book-cli")]
#[command(about = "Command line client for the exchange service")]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    server: String,
    /// Bearer token when the service runs with AUTH_TOKEN set.
    #[arg(long)]
    token: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a new order.
    Submit {
        /// Order id; generated when omitted.
        #[arg(long)]
        id: Option<String>,
        #[arg(short = 'y', long)]
        symbol: String,
        #[arg(long, value_parser = parse_side)]
        side: Side,
        #[arg(long = "type", value_parser = parse_kind, default_value = "limit")]
        kind: OrderKind,
        #[arg(short, long, default_value_t = 0)]
        price: i64,
        #[arg(short, long)]
        quantity: i64,
    },
    /// Cancel a resting order.
    Cancel {
        #[arg(long)]
        id: String,
    },
    /// Amend price and/or quantity of a resting order.
    Amend {
        #[arg(long)]
        id: String,
        #[arg(short, long)]
        price: Option<i64>,
        #[arg(short, long)]
        quantity: Option<i64>,
    },
    /// Print the current top of book.
    Book,
    /// Check service health.
    Health,
}

#[derive(Serialize)]
struct SubmitRequest {
    id: String,
    symbol: String,
    side: Side,
    #[serde(rename = "type")]
    kind: OrderKind,
    price: i64,
    quantity: i64,
}

#[derive(Serialize)]
struct AmendRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quantity: Option<i64>,
}

fn parse_side(value: &str) -> Result<Side, String> {
    match value.to_lowercase().as_str() {
        "buy" | "bid" | "b" => Ok(Side::Buy),
        "sell" | "ask" | "s" => Ok(Side::Sell),
        _ => Err(format!("unknown side {value}, use buy or sell")),
    }
}

fn parse_kind(value: &str) -> Result<OrderKind, String> {
    match value.to_lowercase().as_str() {
        "limit" | "lmt" => Ok(OrderKind::Limit),
        "market" | "mkt" => Ok(OrderKind::Market),
        _ => Err(format!("unknown order type {value}, use limit or market")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let authorize = |req: reqwest::RequestBuilder| match &cli.token {
        Some(token) => req.bearer_auth(token),
        None => req,
    };

    match &cli.command {
        Commands::Submit {
            id,
            symbol,
            side,
            kind,
            price,
            quantity,
        } => {
            let id = id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let request = SubmitRequest {
                id: id.clone(),
                symbol: symbol.clone(),
                side: *side,
                kind: *kind,
                price: *price,
                quantity: *quantity,
            };

            let response = authorize(client.post(format!("{}/orders", cli.server)))
                .json(&request)
                .send()
                .await?;

            if response.status().is_success() {
                println!("order {id} accepted");
            } else {
                println!("Error: {}", response.status());
                println!("{}", response.text().await?);
            }
        }

        Commands::Cancel { id } => {
            let response = authorize(client.delete(format!("{}/orders/{}", cli.server, id)))
                .send()
                .await?;

            if response.status().is_success() {
                println!("order {id} canceled");
            } else {
                println!("Error: {}", response.status());
                println!("{}", response.text().await?);
            }
        }

        Commands::Amend {
            id,
            price,
            quantity,
        } => {
            let request = AmendRequest {
                price: *price,
                quantity: *quantity,
            };
            let response = authorize(client.patch(format!("{}/orders/{}", cli.server, id)))
                .json(&request)
                .send()
                .await?;

            if response.status().is_success() {
                println!("order {id} amended");
            } else {
                println!("Error: {}", response.status());
                println!("{}", response.text().await?);
            }
        }

        Commands::Book => {
            let response = authorize(client.get(format!("{}/book", cli.server)))
                .send()
                .await?;

            if response.status().is_success() {
                let view: serde_json::Value = response.json().await?;
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("Error: {}", response.status());
            }
        }

        Commands::Health => {
            let response = authorize(client.get(format!("{}/health", cli.server)))
                .send()
                .await?;

            if response.status().is_success() {
                let health: serde_json::Value = response.json().await?;
                println!("{}", serde_json::to_string_pretty(&health)?);
            } else {
                println!("Error: {}", response.status());
            }
        }
    }

    Ok(())
}
