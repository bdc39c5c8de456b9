//! `pokelink` binary: parse arguments, bind, then run the battle loop until
//! the match ends or the peer is lost.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use pokelink_client::cli::{Cli, Options};
use pokelink_client::{
    Battle, BattleContext, BattleState, ChatContent, ChatMessage, Command, Dex, Handler, Role,
    Session, Side, Transport, TransportConfig,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Console view of the battle on stdout
#[derive(Default)]
struct Printer {
    last_turn: Option<u32>,
}

impl Printer {
    fn scoreboard(context: &BattleContext) {
        println!(
            "  {} {} HP | {} {} HP",
            context.name_of(Side::Local),
            context.my_hp,
            context.name_of(Side::Remote),
            context.opponent_hp
        );
    }
}

impl Handler for Printer {
    fn on_battle_update(&mut self, context: &BattleContext) {
        if self.last_turn == Some(context.turn) {
            return;
        }
        self.last_turn = Some(context.turn);

        if context.turn == 0 {
            if let Some(opponent) = &context.opponent_identity {
                println!("Battle ready: {} vs {}", context.name_of(Side::Local), opponent);
            }
        } else {
            println!("After turn {}:", context.turn);
        }
        Self::scoreboard(context);
    }

    fn on_chat(&mut self, chat: &ChatMessage, _from: SocketAddr) {
        match &chat.content {
            ChatContent::Text(text) => println!("[{}] {}", chat.sender_name, text),
            ChatContent::Sticker(_) => println!("[{}] sent a sticker", chat.sender_name),
        }
    }

    fn on_sticker_saved(&mut self, sender_name: &str, path: &Path) {
        println!("Sticker from {} saved to {}", sender_name, path.display());
    }

    fn on_spectator_joined(&mut self, addr: SocketAddr) {
        println!("A spectator joined from {addr}");
    }

    fn on_game_over(&mut self, context: &BattleContext) {
        if let Some(side) = context.winner() {
            println!("Game over! {} wins.", context.name_of(side));
        }
    }

    fn on_disconnected(&mut self, _context: &BattleContext) {
        println!("Connection lost: the other side stopped answering.");
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_dex(options: &Options) -> Result<Dex> {
    match &options.dex {
        Some(path) => {
            Dex::load(path).with_context(|| format!("Failed to load dex from {}", path.display()))
        }
        None => Ok(Dex::builtin()),
    }
}

fn choose_pokemon(dex: &Dex, role: Role, requested: Option<&str>) -> Result<String> {
    if role == Role::Spectator {
        return Ok(String::new());
    }
    match requested {
        Some(name) => match dex.lookup(name) {
            Some(pokemon) => Ok(pokemon.name.clone()),
            None => {
                let known: Vec<&str> = dex.pokemon().iter().map(|p| p.name.as_str()).collect();
                bail!("Unknown pokemon {name:?}; choose one of: {}", known.join(", "))
            }
        },
        None => dex
            .pokemon()
            .first()
            .map(|p| p.name.clone())
            .context("Dex has no pokemon"),
    }
}

fn prompt(session: &Session<Dex>) {
    let context = session.battle().context();
    println!(
        "Your turn. Moves: {}",
        session.battle().available_moves().join(", ")
    );
    if context.turn == 0 {
        println!("(type a move name; anything typed on the other side's turn is chat)");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.options.log_level);

    let mut config = TransportConfig::default();
    config.apply_cli_overrides(&cli.options);
    let poll_interval = config.poll_interval;

    let role = cli.mode.role();
    let dex = load_dex(&cli.options)?;
    let pokemon = choose_pokemon(&dex, role, cli.options.pokemon.as_deref())?;

    let mut transport = Transport::bind(cli.mode.bind_addr(), config)
        .await
        .context("Could not open the UDP socket")?;
    if let Some(peer) = cli.mode.peer() {
        transport.configure_peer(peer);
    }

    match role {
        Role::Host => println!("Hosting with {pokemon}, waiting for a joiner..."),
        Role::Joiner => println!("Joining with {pokemon}..."),
        Role::Spectator => println!("Spectating..."),
    }

    let mut session = Session::new(transport, Battle::new(role, &pokemon, dex));
    if let Some(dir) = &cli.options.sticker_dir {
        session = session.with_sticker_dir(dir);
    }

    let mut printer = Printer::default();
    let mut ticker = tokio::time::interval(poll_interval);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut prompted_turn = None;

    while !session.is_finished() {
        tokio::select! {
            _ = ticker.tick() => {
                session.tick(&mut printer);
                let context = session.battle().context();
                if context.can_move() && prompted_turn != Some(context.turn) {
                    prompted_turn = Some(context.turn);
                    prompt(&session);
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match session.handle_input(&line) {
                    Ok(Command::Move(name)) => println!("You used {name}!"),
                    Ok(_) => {}
                    Err(e) => println!("{e}"),
                },
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!(error = %e, "Reading stdin failed");
                    stdin_open = false;
                }
            },
        }
    }

    let context = session.battle().context();
    match (context.state, context.winner()) {
        (BattleState::GameOver, Some(side)) => {
            println!("Winner: {}", context.name_of(side));
        }
        _ => println!("Battle ended without a winner ({}).", context.state),
    }
    Ok(())
}
