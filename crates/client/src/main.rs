//! CLI for interacting with commit-reveal blind auctions.
//!
//! This binary provides commands for:
//! - Committing bids and keeping their secrets locally
//! - Revealing every stored bid of an account
//! - Withdrawing refunds and ending the auction
//! - Querying auction status and driving the mock chain clock

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use auction_client::{parse_amount, BidBuilder, BidStore, RevealBatch};
use auction_crypto::{AnyHasher, HasherKind};
use auction_module::AuctionCall;
use auction_types::{format_address, parse_address};

#[derive(Parser)]
#[command(name = "auction-cli")]
#[command(about = "CLI for commit-reveal blind auctions")]
struct Cli {
    /// Mock chain RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:9944")]
    rpc: String,

    /// File holding prepared bids and their secrets
    #[arg(long, default_value = "bids.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Commit to a bid
    Bid {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,

        /// Bid value, e.g. 1.5ether or 1500000 (wei)
        #[arg(long)]
        value: String,

        /// Deposit to escrow (defaults to the value)
        #[arg(long)]
        deposit: Option<String>,

        /// Commit a fake bid
        #[arg(long)]
        fake: bool,

        /// Blinding secret (random if omitted)
        #[arg(long)]
        secret: Option<String>,
    },

    /// Reveal all stored bids of an account
    Reveal {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,
    },

    /// Withdraw pending returns
    Withdraw {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,
    },

    /// End the auction and pay the beneficiary
    End {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,
    },

    /// Get auction details
    GetAuction,

    /// Get the committed bids of an account
    GetBids {
        /// Bidder address (hex)
        #[arg(long)]
        bidder: String,
    },

    /// Get the pending return of an account
    GetPending {
        /// Account address (hex)
        #[arg(long)]
        address: String,
    },

    /// Get the ledger balance of an account
    GetBalance {
        /// Account address (hex)
        #[arg(long)]
        account: String,
    },

    /// List recorded auction events
    Events {
        /// First event to return
        #[arg(long, default_value = "0")]
        from: u64,
    },

    /// Mint funds into an account (for testing)
    Fund {
        /// Account address (hex)
        #[arg(long)]
        account: String,

        /// Amount, e.g. 10ether
        #[arg(long)]
        amount: String,
    },

    /// Set chain timestamp (for testing)
    SetTimestamp {
        /// Unix timestamp to set
        #[arg(long)]
        timestamp: u64,
    },

    /// Advance chain time (for testing)
    AdvanceTime {
        /// Seconds to advance
        #[arg(long)]
        secs: u64,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct ChainTime {
    timestamp: u64,
    phase: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AuctionInfoRpc {
    beneficiary: String,
    created_at: u64,
    bidding_deadline: u64,
    reveal_deadline: u64,
    phase: String,
    ended: bool,
    highest_bid: String,
    highest_bidder: Option<String>,
    num_bidders: usize,
    num_bids: usize,
    num_unrevealed: usize,
    escrow: String,
    hasher: String,
    refund_policy: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct BidRpc {
    index: u32,
    commitment: String,
    deposit: String,
    revealed: bool,
    committed_at: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RevealOutcomeRpc {
    kind: String,
    amount: Option<String>,
    refund: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CallOutcomeRpc {
    BidPlaced {
        index: u32,
    },
    Revealed {
        outcomes: Vec<RevealOutcomeRpc>,
        credited: String,
        paid_out: String,
    },
    Withdrawn {
        amount: String,
    },
    Ended {
        amount: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct EventRpc {
    seq: u64,
    kind: String,
    account: Option<String>,
    index: Option<u32>,
    amount: Option<String>,
}

async fn submit_call(client: &HttpClient, sender: &str, call: &AuctionCall) -> Result<CallOutcomeRpc> {
    let params = serde_json::json!({
        "sender": sender,
        "call": hex::encode(call.encode()?),
    });
    Ok(client.request("auction_submitCall", rpc_params![params]).await?)
}

async fn get_auction(client: &HttpClient) -> Result<AuctionInfoRpc> {
    Ok(client.request("query_getAuction", rpc_params![]).await?)
}

async fn submit_bid_cmd(
    client: &HttpClient,
    store: &mut BidStore,
    sender: &str,
    value: &str,
    deposit: Option<&str>,
    fake: bool,
    secret: Option<String>,
) -> Result<()> {
    let bidder = parse_address(sender)?;
    let auction = get_auction(client).await?;
    let hasher = AnyHasher::from(auction.hasher.parse::<HasherKind>()?);

    let mut builder = BidBuilder::new(parse_amount(value)?).fake(fake);
    if let Some(deposit) = deposit {
        builder = builder.deposit(parse_amount(deposit)?);
    }
    if let Some(secret) = secret {
        builder = builder.secret(secret);
    }
    let prepared = builder.build(&hasher, &mut OsRng)?;

    let call = AuctionCall::Bid {
        commitment: prepared.commitment,
        deposit: prepared.deposit,
    };
    let index = match submit_call(client, sender, &call).await? {
        CallOutcomeRpc::BidPlaced { index } => index,
        other => bail!("Unexpected outcome: {:?}", other),
    };

    println!("Bid committed");
    println!("  Index: {}", index);
    println!("  Commitment: {}", prepared.commitment);
    println!("  Deposit: {}", prepared.deposit);

    store.push(&bidder, prepared);
    store.save()?;
    info!("Bid secret stored in {}", store.path().display());
    Ok(())
}

async fn reveal_cmd(client: &HttpClient, store: &BidStore, sender: &str) -> Result<()> {
    let bidder = parse_address(sender)?;
    let stored = store.bids(&bidder);

    let on_chain: Vec<BidRpc> = client
        .request("query_getBids", rpc_params![format_address(&bidder)])
        .await?;
    if on_chain.len() != stored.len() {
        bail!(
            "{} has {} bids on chain but {} in {}",
            sender,
            on_chain.len(),
            stored.len(),
            store.path().display()
        );
    }

    let batch = RevealBatch::from_bids(stored);
    match submit_call(client, sender, &batch.into_call()).await? {
        CallOutcomeRpc::Revealed {
            outcomes,
            credited,
            paid_out,
        } => {
            println!("Revealed {} bids:", outcomes.len());
            for (i, outcome) in outcomes.iter().enumerate() {
                match &outcome.amount {
                    Some(amount) => println!(
                        "  [{}] {} at {} (refund {})",
                        i, outcome.kind, amount, outcome.refund
                    ),
                    None => println!("  [{}] {} (refund {})", i, outcome.kind, outcome.refund),
                }
            }
            println!("  Credited: {}", credited);
            println!("  Paid out: {}", paid_out);
        }
        other => bail!("Unexpected outcome: {:?}", other),
    }
    Ok(())
}

async fn get_auction_cmd(client: &HttpClient) -> Result<()> {
    let a = get_auction(client).await?;
    println!("Auction:");
    println!("  Phase: {}{}", a.phase, if a.ended { " (settled)" } else { "" });
    println!("  Beneficiary: {}", a.beneficiary);
    println!("  Bidding until: {}", a.bidding_deadline);
    println!("  Reveal until: {}", a.reveal_deadline);
    println!(
        "  Highest bid: {} by {}",
        a.highest_bid,
        a.highest_bidder.as_deref().unwrap_or("nobody")
    );
    println!(
        "  Bids: {} from {} bidders ({} unrevealed)",
        a.num_bids, a.num_bidders, a.num_unrevealed
    );
    println!("  Escrow: {}", a.escrow);
    println!("  Hasher: {}, refunds: {}", a.hasher, a.refund_policy);
    Ok(())
}

async fn get_bids_cmd(client: &HttpClient, bidder: &str) -> Result<()> {
    let bids: Vec<BidRpc> = client.request("query_getBids", rpc_params![bidder]).await?;

    if bids.is_empty() {
        println!("No bids from {}", bidder);
    } else {
        println!("Bids from {}:", bidder);
        for bid in bids {
            println!(
                "  [{}] Deposit: {}{}",
                bid.index,
                bid.deposit,
                if bid.revealed { " (revealed)" } else { "" }
            );
            println!("      Commitment: {}", bid.commitment);
        }
    }
    Ok(())
}

async fn events_cmd(client: &HttpClient, from: u64) -> Result<()> {
    let events: Vec<EventRpc> = client.request("query_getEvents", rpc_params![from]).await?;
    for e in events {
        println!(
            "  #{} {} {} {} {}",
            e.seq,
            e.kind,
            e.account.unwrap_or_default(),
            e.index.map(|i| format!("[{}]", i)).unwrap_or_default(),
            e.amount.unwrap_or_default()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("auction_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let client = HttpClientBuilder::default().build(&cli.rpc)?;

    match cli.command {
        Commands::Bid {
            sender,
            value,
            deposit,
            fake,
            secret,
        } => {
            let mut store = BidStore::open(&cli.store)?;
            submit_bid_cmd(
                &client,
                &mut store,
                &sender,
                &value,
                deposit.as_deref(),
                fake,
                secret,
            )
            .await?;
        }

        Commands::Reveal { sender } => {
            let store = BidStore::open(&cli.store)?;
            reveal_cmd(&client, &store, &sender).await?;
        }

        Commands::Withdraw { sender } => {
            match submit_call(&client, &sender, &AuctionCall::Withdraw).await? {
                CallOutcomeRpc::Withdrawn { amount } => println!("Withdrawn: {}", amount),
                other => return Err(anyhow!("Unexpected outcome: {:?}", other)),
            }
        }

        Commands::End { sender } => {
            match submit_call(&client, &sender, &AuctionCall::AuctionEnd).await? {
                CallOutcomeRpc::Ended { amount } => println!("Auction ended, paid {}", amount),
                other => return Err(anyhow!("Unexpected outcome: {:?}", other)),
            }
        }

        Commands::GetAuction => {
            get_auction_cmd(&client).await?;
        }

        Commands::GetBids { bidder } => {
            get_bids_cmd(&client, &bidder).await?;
        }

        Commands::GetPending { address } => {
            let pending: String = client
                .request("query_getPendingReturn", rpc_params![address])
                .await?;
            println!("Pending return: {}", pending);
        }

        Commands::GetBalance { account } => {
            let balance: String = client.request("query_getBalance", rpc_params![account]).await?;
            println!("Balance: {}", balance);
        }

        Commands::Events { from } => {
            events_cmd(&client, from).await?;
        }

        Commands::Fund { account, amount } => {
            let amount = parse_amount(&amount)?;
            let balance: String = client
                .request("admin_fund", rpc_params![account, amount.to_string()])
                .await?;
            println!("Balance: {}", balance);
        }

        Commands::SetTimestamp { timestamp } => {
            let time: ChainTime = client
                .request("admin_setTimestamp", rpc_params![timestamp])
                .await?;
            println!("Timestamp set to {} ({})", time.timestamp, time.phase);
        }

        Commands::AdvanceTime { secs } => {
            let time: ChainTime = client.request("admin_advanceTime", rpc_params![secs]).await?;
            println!("Time advanced to {} ({})", time.timestamp, time.phase);
        }
    }

    Ok(())
}
