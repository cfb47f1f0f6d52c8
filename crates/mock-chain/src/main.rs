//! Mock chain server for local testing of the blind auction.
//!
//! This provides a JSON-RPC server that hosts one auction engine with an
//! in-memory ledger and an externally driven clock, without requiring a real
//! blockchain.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::Server;
use jsonrpsee::types::ErrorObjectOwned;
use parking_lot::RwLock;
use tracing::info;

use auction_crypto::{AnyHasher, HasherKind};
use auction_module::{
    AuctionCall, AuctionEngine, AuctionEvent, AuctionGenesisConfig, AuctionQuery,
    AuctionQueryResponse, Clock, InMemoryLedger, ManualClock, RefundPolicy, SystemClock,
};
use auction_types::{parse_address, Address, Amount, Timestamp};

mod types;
use types::*;

type Engine = AuctionEngine<ManualClock, InMemoryLedger, AnyHasher>;

#[derive(Parser)]
#[command(name = "mock-chain")]
#[command(about = "JSON-RPC host for a single blind auction")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:9944")]
    listen: SocketAddr,

    /// Genesis config file (JSON). Overrides the auction flags below.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Beneficiary address (hex)
    #[arg(long)]
    beneficiary: Option<String>,

    /// Bidding window length in seconds
    #[arg(long, default_value = "60")]
    bidding_secs: u64,

    /// Reveal window length in seconds
    #[arg(long, default_value = "60")]
    reveal_secs: u64,

    /// Commitment scheme: keccak256-abi or sha256
    #[arg(long, default_value = "keccak256-abi")]
    hasher: HasherKind,

    /// Pay refunds out during reveal instead of crediting them
    #[arg(long)]
    pay_on_reveal: bool,

    /// Initial chain time (defaults to the wall clock)
    #[arg(long)]
    start_time: Option<Timestamp>,
}

impl Args {
    fn genesis_config(&self) -> Result<AuctionGenesisConfig> {
        if let Some(path) = &self.config {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            return serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()));
        }

        let beneficiary = self
            .beneficiary
            .as_deref()
            .context("--beneficiary or --config is required")?;
        let refund_policy = if self.pay_on_reveal {
            RefundPolicy::PayOnReveal
        } else {
            RefundPolicy::Credit
        };
        Ok(
            AuctionGenesisConfig::new(parse_address(beneficiary)?, self.bidding_secs, self.reveal_secs)
                .with_refund_policy(refund_policy)
                .with_hasher(self.hasher),
        )
    }
}

/// Shared chain state.
struct ChainState {
    engine: Engine,
    /// Handle on the engine's clock
    clock: ManualClock,
    hasher: HasherKind,
    refund_policy: RefundPolicy,
    /// Every event the engine has recorded, in order
    events: Vec<AuctionEvent>,
}

impl ChainState {
    fn new(config: &AuctionGenesisConfig, start_time: Timestamp) -> Result<Self> {
        let clock = ManualClock::new(start_time);
        let engine = AuctionEngine::new(
            config,
            clock.clone(),
            InMemoryLedger::new(),
            AnyHasher::from(config.hasher),
        )?;
        Ok(Self {
            engine,
            clock,
            hasher: config.hasher,
            refund_policy: config.refund_policy,
            events: Vec::new(),
        })
    }

    fn time(&self) -> ChainTime {
        ChainTime::new(self.clock.now(), self.engine.phase())
    }

    fn collect_events(&mut self) {
        let events = self.engine.take_events();
        self.events.extend(events);
    }
}

/// RPC API definition for the mock chain.
#[rpc(server)]
pub trait MockChainApi {
    // ============ Admin Methods ============

    /// Mint funds into an account. Returns the new balance.
    #[method(name = "admin_fund")]
    async fn admin_fund(&self, account: String, amount: String) -> Result<String, ErrorObjectOwned>;

    /// Set the current timestamp (for testing time-dependent logic).
    #[method(name = "admin_setTimestamp")]
    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<ChainTime, ErrorObjectOwned>;

    /// Move the clock forward.
    #[method(name = "admin_advanceTime")]
    async fn admin_advance_time(&self, secs: u64) -> Result<ChainTime, ErrorObjectOwned>;

    /// Make transfers to an account fail (or succeed again).
    #[method(name = "admin_failTransfersTo")]
    async fn admin_fail_transfers_to(
        &self,
        account: String,
        fail: bool,
    ) -> Result<bool, ErrorObjectOwned>;

    // ============ Auction Methods ============

    /// Execute an encoded auction call.
    #[method(name = "auction_submitCall")]
    async fn auction_submit_call(
        &self,
        params: SubmitCallParams,
    ) -> Result<CallOutcomeRpc, ErrorObjectOwned>;

    // ============ Query Methods ============

    /// Get current chain time and auction phase.
    #[method(name = "chain_getTime")]
    async fn chain_get_time(&self) -> Result<ChainTime, ErrorObjectOwned>;

    /// Get the auction summary.
    #[method(name = "query_getAuction")]
    async fn query_get_auction(&self) -> Result<AuctionInfoRpc, ErrorObjectOwned>;

    /// Get all bids of an account.
    #[method(name = "query_getBids")]
    async fn query_get_bids(&self, bidder: String) -> Result<Vec<BidRpc>, ErrorObjectOwned>;

    /// Get the pending return of an account.
    #[method(name = "query_getPendingReturn")]
    async fn query_get_pending_return(&self, address: String) -> Result<String, ErrorObjectOwned>;

    /// Get the ledger balance of an account.
    #[method(name = "query_getBalance")]
    async fn query_get_balance(&self, account: String) -> Result<String, ErrorObjectOwned>;

    /// Get recorded events starting at `from`.
    #[method(name = "query_getEvents")]
    async fn query_get_events(&self, from: u64) -> Result<Vec<EventRpc>, ErrorObjectOwned>;
}

/// Implementation of the mock chain RPC server.
struct MockChainServer {
    state: Arc<RwLock<ChainState>>,
}

impl MockChainServer {
    fn new(state: ChainState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    fn rpc_error(msg: &str) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(-32000, msg.to_string(), None::<()>)
    }

    fn address(s: &str) -> Result<Address, ErrorObjectOwned> {
        parse_address(s).map_err(|e| Self::rpc_error(&format!("Invalid address: {}", e)))
    }

    fn amount(s: &str) -> Result<Amount, ErrorObjectOwned> {
        s.parse()
            .map_err(|e| Self::rpc_error(&format!("Invalid amount {:?}: {}", s, e)))
    }
}

#[async_trait]
impl MockChainApiServer for MockChainServer {
    async fn admin_fund(&self, account: String, amount: String) -> Result<String, ErrorObjectOwned> {
        let account = Self::address(&account)?;
        let amount = Self::amount(&amount)?;

        let mut state = self.state.write();
        let balance = state
            .engine
            .ledger_mut()
            .credit(account, amount)
            .map_err(|e| Self::rpc_error(&e.to_string()))?;
        info!("Funded {} with {}", auction_types::format_address(&account), amount);
        Ok(balance.to_string())
    }

    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<ChainTime, ErrorObjectOwned> {
        let state = self.state.read();
        if timestamp < state.clock.now() {
            return Err(Self::rpc_error("Timestamp cannot go backwards"));
        }
        state.clock.set(timestamp);
        info!("Timestamp set to {}", timestamp);
        Ok(state.time())
    }

    async fn admin_advance_time(&self, secs: u64) -> Result<ChainTime, ErrorObjectOwned> {
        let state = self.state.read();
        let now = state.clock.advance(secs);
        info!("Time advanced to {}", now);
        Ok(state.time())
    }

    async fn admin_fail_transfers_to(
        &self,
        account: String,
        fail: bool,
    ) -> Result<bool, ErrorObjectOwned> {
        let account = Self::address(&account)?;
        let mut state = self.state.write();
        let ledger = state.engine.ledger_mut();
        if fail {
            ledger.fail_transfers_to(account);
        } else {
            ledger.allow_transfers_to(&account);
        }
        Ok(fail)
    }

    async fn auction_submit_call(
        &self,
        params: SubmitCallParams,
    ) -> Result<CallOutcomeRpc, ErrorObjectOwned> {
        let sender = Self::address(&params.sender)?;
        let bytes = hex::decode(params.call.trim_start_matches("0x"))
            .map_err(|e| Self::rpc_error(&format!("Invalid call hex: {}", e)))?;
        let call = AuctionCall::decode(&bytes)
            .map_err(|e| Self::rpc_error(&format!("Invalid call encoding: {}", e)))?;

        let mut state = self.state.write();
        let result = state.engine.dispatch(sender, call);
        state.collect_events();

        let outcome = result.map_err(|e| Self::rpc_error(&e.to_string()))?;
        Ok(CallOutcomeRpc::from(outcome))
    }

    async fn chain_get_time(&self) -> Result<ChainTime, ErrorObjectOwned> {
        Ok(self.state.read().time())
    }

    async fn query_get_auction(&self) -> Result<AuctionInfoRpc, ErrorObjectOwned> {
        let state = self.state.read();
        match state.engine.query(AuctionQuery::GetAuction) {
            AuctionQueryResponse::Auction(summary) => Ok(AuctionInfoRpc::from_summary(
                summary,
                state.engine.ledger().escrow_balance(),
                state.hasher.to_string(),
                match state.refund_policy {
                    RefundPolicy::Credit => "credit".to_string(),
                    RefundPolicy::PayOnReveal => "pay-on-reveal".to_string(),
                },
            )),
            _ => Err(Self::rpc_error("Unexpected query response")),
        }
    }

    async fn query_get_bids(&self, bidder: String) -> Result<Vec<BidRpc>, ErrorObjectOwned> {
        let bidder = Self::address(&bidder)?;
        let state = self.state.read();
        match state.engine.query(AuctionQuery::GetBids { bidder }) {
            AuctionQueryResponse::Bids(bids) => Ok(bids
                .iter()
                .enumerate()
                .map(|(i, bid)| BidRpc::new(i, bid))
                .collect()),
            _ => Err(Self::rpc_error("Unexpected query response")),
        }
    }

    async fn query_get_pending_return(&self, address: String) -> Result<String, ErrorObjectOwned> {
        let address = Self::address(&address)?;
        let state = self.state.read();
        match state.engine.query(AuctionQuery::GetPendingReturn { address }) {
            AuctionQueryResponse::PendingReturn(amount) => Ok(amount.to_string()),
            _ => Err(Self::rpc_error("Unexpected query response")),
        }
    }

    async fn query_get_balance(&self, account: String) -> Result<String, ErrorObjectOwned> {
        let account = Self::address(&account)?;
        let state = self.state.read();
        Ok(state.engine.ledger().balance_of(&account).to_string())
    }

    async fn query_get_events(&self, from: u64) -> Result<Vec<EventRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state
            .events
            .iter()
            .enumerate()
            .skip(from as usize)
            .map(|(seq, event)| EventRpc::new(seq as u64, event))
            .collect())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mock_chain=info".parse()?)
                .add_directive("auction_module=info".parse()?)
                .add_directive("jsonrpsee=warn".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = args.genesis_config()?;
    let start_time = args.start_time.unwrap_or_else(|| SystemClock.now());
    let chain = ChainState::new(&config, start_time)?;

    info!(
        "Auction open until {}, reveals until {}",
        chain.engine.state().config.bidding_deadline,
        chain.engine.state().config.reveal_deadline
    );
    info!("Starting mock chain server on {}", args.listen);

    let server = Server::builder().build(args.listen).await?;
    let handle = server.start(MockChainServer::new(chain).into_rpc());

    info!("Mock chain server running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    handle.stop()?;
    handle.stopped().await;

    Ok(())
}
