//! Queue Simulator CLI Tool
//!
//! Drives the matchmaking engine against in-memory collaborators, so queue
//! behavior can be exercised without any live backend.
//!
//! Usage:
//!   cargo run --bin queue-sim -- --help
//!   cargo run --bin queue-sim run-scenario --scenario full-queue
//!   cargo run --bin queue-sim run-scenario --scenario party
//!   cargo run --bin queue-sim run-all-scenarios
//!   cargo run --bin queue-sim stats

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use war_room::config::{EngineSettings, QueueConfig, StaticQueueRegistry};
use war_room::directory::{
    InMemoryActiveGameDirectory, InMemoryPartyDirectory, InMemoryPlayerDirectory,
    StaticOnlineProbe,
};
use war_room::game::{InMemoryMapDirectory, RecordingGameCreator};
use war_room::notify::MockNotifier;
use war_room::types::{Entitlement, PlayerCandidate};
use war_room::Matchmaker;

#[derive(Parser)]
#[command(name = "queue-sim")]
#[command(about = "Scenario simulator for the war-room matchmaking engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Debounce delay in milliseconds (shortened so scenarios finish fast)
    #[arg(long, default_value = "200")]
    debounce_ms: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a predefined scenario
    RunScenario {
        /// Scenario name (full-queue, party, multi-game, removal)
        #[arg(short, long)]
        scenario: String,
    },
    /// Run all scenarios back to back
    RunAllScenarios,
    /// Run the full-queue scenario and print engine statistics
    Stats,
}

struct Simulator {
    engine: Arc<Matchmaker>,
    registry: Arc<StaticQueueRegistry>,
    players: Arc<InMemoryPlayerDirectory>,
    parties: Arc<InMemoryPartyDirectory>,
    probe: Arc<StaticOnlineProbe>,
    creator: Arc<RecordingGameCreator>,
    notifier: Arc<MockNotifier>,
    settings: EngineSettings,
}

impl Simulator {
    fn new(debounce_ms: u64) -> Self {
        let mut settings = EngineSettings::default();
        settings.debounce_delay_ms = debounce_ms;
        settings.inter_game_pause_ms = 50;

        let registry = Arc::new(StaticQueueRegistry::new());
        let players = Arc::new(InMemoryPlayerDirectory::new());
        let parties = Arc::new(InMemoryPartyDirectory::new());
        let probe = Arc::new(StaticOnlineProbe::new());
        let maps = Arc::new(InMemoryMapDirectory::new());
        maps.add("Lighthouse", 8, true, true);
        maps.add("Orchid", 8, true, false);
        maps.add("Speedway", 4, true, false);
        let creator = Arc::new(RecordingGameCreator::new());
        let notifier = Arc::new(MockNotifier::new());

        let engine = Matchmaker::new(
            registry.clone(),
            players.clone(),
            parties.clone(),
            probe.clone(),
            Arc::new(InMemoryActiveGameDirectory::new()),
            maps,
            creator.clone(),
            notifier.clone(),
            settings.clone(),
        );
        Self {
            engine,
            registry,
            players,
            parties,
            probe,
            creator,
            notifier,
            settings,
        }
    }

    fn add_queue(&self, queue_id: &str, capacity: usize) -> Result<()> {
        self.registry
            .upsert(QueueConfig::new(queue_id, capacity, 0, 3000)?)
    }

    fn add_player(&self, id: &str, elo: i32) {
        self.players
            .upsert(PlayerCandidate::solo(id, format!("Name_{}", id), elo));
        self.probe.set_online(&format!("Name_{}", id), true);
    }

    async fn wait_for_runs(&self) {
        tokio::time::sleep(Duration::from_millis(self.settings.debounce_delay_ms * 2 + 500)).await;
    }

    async fn run_full_queue(&self) -> Result<bool> {
        self.add_queue("ranked-4", 4)?;
        for i in 0..4 {
            let id = format!("solo{}", i);
            self.add_player(&id, 800 + 100 * i);
            let outcome = self.engine.admit_candidate("ranked-4", &id).await?;
            println!(
                "  admit {} -> {}",
                id,
                if outcome.accepted { "accepted" } else { "rejected" }
            );
        }
        self.wait_for_runs().await;

        for game in self.creator.created() {
            println!(
                "  game #{} on {}: {:?} vs {:?}",
                game.game_id, game.map, game.team1, game.team2
            );
        }
        Ok(self.creator.count() == 1)
    }

    async fn run_party(&self) -> Result<bool> {
        self.add_queue("ranked-4", 4)?;
        for id in ["duo1", "duo2"] {
            self.add_player(id, 1200);
            self.players.update(id, |c| {
                c.party_id = Some("party-a".to_string());
                c.entitlements.insert(Entitlement::PartyOfTwo);
            });
        }
        self.parties
            .upsert("party-a", vec!["duo1".to_string(), "duo2".to_string()]);
        self.add_player("solo1", 900);
        self.add_player("solo2", 1000);

        self.engine.admit_candidate("ranked-4", "duo1").await?;
        self.engine.admit_candidate("ranked-4", "solo1").await?;
        self.engine.admit_candidate("ranked-4", "solo2").await?;
        self.wait_for_runs().await;

        let games = self.creator.created();
        if games.len() != 1 {
            return Ok(false);
        }
        let game = &games[0];
        println!(
            "  game #{} on {}: {:?} vs {:?}",
            game.game_id, game.map, game.team1, game.team2
        );
        let together = game.team1.contains(&"duo1".to_string())
            == game.team1.contains(&"duo2".to_string());
        Ok(together)
    }

    async fn run_multi_game(&self) -> Result<bool> {
        self.add_queue("ranked-4", 4)?;
        for i in 0..8 {
            let id = format!("solo{}", i);
            self.add_player(&id, 700 + 50 * i);
            self.engine.admit_candidate("ranked-4", &id).await?;
        }
        self.wait_for_runs().await;

        println!("  {} game(s) from one debounced run", self.creator.count());
        Ok(self.creator.count() == 2)
    }

    async fn run_removal(&self) -> Result<bool> {
        self.add_queue("ranked-4", 4)?;
        for i in 0..4 {
            let id = format!("solo{}", i);
            self.add_player(&id, 1000);
            self.engine.admit_candidate("ranked-4", &id).await?;
        }
        // Leave before the debounce fires; the pending run must be cancelled
        let removed = self.engine.remove_candidate("ranked-4", "solo0").await?;
        println!("  removed {:?} before the debounce fired", removed);
        self.wait_for_runs().await;

        Ok(self.creator.count() == 0)
    }

    async fn run(&self, name: &str) -> Result<bool> {
        match name {
            "full-queue" => self.run_full_queue().await,
            "party" => self.run_party().await,
            "multi-game" => self.run_multi_game().await,
            "removal" => self.run_removal().await,
            _ => Err(anyhow::anyhow!(
                "Unknown scenario '{}'. Available: full-queue, party, multi-game, removal",
                name
            )),
        }
    }

    fn print_stats(&self) {
        let stats = self.engine.get_stats();
        println!("📊 Engine statistics:");
        println!("  Candidates admitted: {}", stats.candidates_admitted);
        println!("  Candidates rejected: {}", stats.candidates_rejected);
        println!("  Games created: {}", stats.games_created);
        println!("  Runs completed: {}", stats.runs_completed);
        println!("  Reconcile drops: {}", stats.reconcile_drops);
        println!("  Notifications sent: {}", self.notifier.count());
    }
}

const ALL_SCENARIOS: [&str; 4] = ["full-queue", "party", "multi-game", "removal"];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::RunScenario { scenario } => {
            println!("🧪 Running scenario: {}", scenario);
            let sim = Simulator::new(cli.debounce_ms);
            match sim.run(&scenario).await {
                Ok(true) => println!("✅ Scenario completed successfully!"),
                Ok(false) => {
                    println!("❌ Scenario did not produce the expected games.");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("❌ Error running scenario: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::RunAllScenarios => {
            let mut passed = 0;
            let mut failed = 0;

            println!("🧪 Running all scenarios...\n");
            for name in ALL_SCENARIOS {
                print!("Running '{}' scenario... ", name);
                // Fresh collaborators per scenario so state cannot leak
                let sim = Simulator::new(cli.debounce_ms);
                match sim.run(name).await {
                    Ok(true) => {
                        println!("✅ PASSED");
                        passed += 1;
                    }
                    Ok(false) => {
                        println!("❌ FAILED");
                        failed += 1;
                    }
                    Err(e) => {
                        println!("❌ FAILED ({})", e);
                        failed += 1;
                    }
                }
            }

            println!("\n📊 Results: {} passed, {} failed", passed, failed);
            if failed > 0 {
                std::process::exit(1);
            }
        }

        Commands::Stats => {
            let sim = Simulator::new(cli.debounce_ms);
            sim.run("full-queue").await?;
            sim.print_stats();
        }
    }

    Ok(())
}
