use clap::Parser;
use server::game::{GameState, RecipeCatalog, WorldMap};
use server::limiter::{Weapon, WeaponCatalog};
use server::network::{Server, ServerConfig};
use server::transport::Transport;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Tick rate (updates per second)
    #[clap(short, long, default_value = "30")]
    tick_rate: u32,
    /// Protocol build version announced to clients
    #[clap(long, default_value = "1")]
    protocol_version: i32,
    /// World width in tiles
    #[clap(long, default_value = "256")]
    world_width: i16,
    /// World height in tiles
    #[clap(long, default_value = "256")]
    world_height: i16,
    /// Path of the persistent moderation store
    #[clap(long)]
    admin_store: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let cfg = ServerConfig {
        version: args.protocol_version,
        admin_store: args.admin_store,
        ..ServerConfig::default()
    };
    let game = GameState::new(WorldMap::new(args.world_width, args.world_height));

    let address = format!("{}:{}", args.host, args.port);
    let tick_duration = Duration::from_secs_f64(1.0 / f64::from(args.tick_rate.max(1)));

    let transport = Transport::bind(&address, tick_duration, |out_tx| {
        Server::new(cfg, game, default_weapons(), default_recipes(), out_tx)
    })
    .await?;
    transport.run().await
}

fn default_weapons() -> WeaponCatalog {
    let mut weapons = WeaponCatalog::new();
    for (id, reload_ms) in [(0, 400), (1, 250), (2, 700), (3, 1_200)] {
        weapons.insert(Weapon { id, reload_ms });
    }
    weapons
}

fn default_recipes() -> RecipeCatalog {
    let mut recipes = RecipeCatalog::new();
    // Recipe ids map onto the block ids the clients know.
    for (recipe, block) in [(0, 100), (1, 101), (2, 102), (3, 110), (4, 111)] {
        recipes.insert(recipe, block);
    }
    recipes
}
