//! `stucard` - CLI for studentcard
//!
//! Fills in, shows and resets the student card, and encodes or decodes the
//! token printed in its QR code.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context};
use clap::Parser;
use tracing::warn;

use studentcard::cli::{
    Cli, Command, ConfigCommand, DecodeCommand, ExportCommand, ResetCommand, ShowCommand,
    StatusCommand, SubmitCommand, TokenCommand,
};
use studentcard::projection::{self, qr};
use studentcard::{
    export_card, init_logging, load_photo, CardController, CardState, CardView, Config, Event,
    PngRasterizer, RecordStore, Storage,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    // Validation reports on the file itself, so it must not fail on loading it.
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        return handle_validate(file.clone().or_else(|| cli.config.clone()));
    }

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Submit(cmd) => handle_submit(&config, cmd).await,
        Command::Show(cmd) => handle_show(&config, &cmd),
        Command::Token(cmd) => handle_token(&config, &cmd),
        Command::Decode(cmd) => handle_decode(&cmd),
        Command::Export(cmd) => handle_export(&config, &cmd).await,
        Command::Reset(cmd) => handle_reset(&config, &cmd),
        Command::Status(cmd) => handle_status(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, &cmd),
    }
}

fn open_controller(config: &Config) -> anyhow::Result<CardController<Storage>> {
    let path = config.database_path();
    let storage = Storage::open(&path)
        .with_context(|| format!("failed to open card database {}", path.display()))?;
    Ok(CardController::start(RecordStore::with_key(
        storage,
        &config.storage.slot_key,
    )))
}

fn print_card(card: &CardView) {
    println!("{card}");
    match card.qr.render_terminal() {
        Ok(symbol) => println!("{symbol}"),
        Err(e) => warn!(
            len = card.qr.token.len(),
            level = %card.qr.level,
            error = %e,
            "QR token exceeds the capacity of a single symbol"
        ),
    }
}

async fn handle_submit(config: &Config, cmd: SubmitCommand) -> anyhow::Result<()> {
    let photo = match &cmd.photo {
        Some(path) => Some(
            load_photo(path)
                .await
                .with_context(|| format!("failed to load photo {}", path.display()))?,
        ),
        None => None,
    };

    let mut controller = open_controller(config)?;
    if controller.state().is_submitted() {
        if !cmd.replace {
            bail!("a card is already submitted; pass --replace or run `stucard reset` first");
        }
        controller.dispatch(Event::Reset)?;
    }

    let events = [
        Event::SetName(cmd.name),
        Event::SetRollNumber(cmd.roll),
        Event::SetClassDivision(cmd.class),
        Event::SetAllergies(cmd.allergies),
        photo.map_or(Event::ClearPhoto, Event::SetPhoto),
        Event::SetRack(cmd.rack),
        Event::SetBusRoute(cmd.bus),
    ];
    for event in events {
        controller.dispatch(event)?;
    }
    controller.submit()?;

    let card = CardView::new(controller.state().record(), &config.card_options());
    print_card(&card);
    Ok(())
}

fn handle_show(config: &Config, cmd: &ShowCommand) -> anyhow::Result<()> {
    let controller = open_controller(config)?;
    let state = controller.state();

    if cmd.json {
        let mut value = serde_json::json!({
            "submitted": state.is_submitted(),
            "record": state.record(),
        });
        if let Some(token) = controller.token() {
            value["token"] = serde_json::Value::String(token.into());
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match state {
        CardState::Submitted(record) => {
            print_card(&CardView::new(record, &config.card_options()));
        }
        CardState::Draft(record) => match record.missing_field() {
            Some(field) if *record != Default::default() => {
                println!("No card submitted. The saved draft is missing its {field}.");
            }
            _ => println!("No card submitted."),
        },
    }
    Ok(())
}

fn handle_token(config: &Config, cmd: &TokenCommand) -> anyhow::Result<()> {
    let controller = open_controller(config)?;
    let Some(token) = controller.token() else {
        bail!("no card submitted");
    };

    let level = cmd.level.unwrap_or(config.qr.error_correction);
    if cmd.render {
        println!("{}", qr::render_terminal(token.as_str(), level)?);
        return Ok(());
    }
    if !token.fits(level) {
        warn!(
            len = token.len(),
            max = level.max_bytes(),
            %level,
            "QR token exceeds the capacity of a single symbol"
        );
    }
    println!("{token}");
    Ok(())
}

fn handle_decode(cmd: &DecodeCommand) -> anyhow::Result<()> {
    let projection = projection::decode(&cmd.token)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&projection)?);
    } else {
        let allergies = projection
            .allergies
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!("Name:      {}", projection.name);
        println!("Roll No:   {}", projection.roll_number);
        println!("Class:     {}", projection.class_division);
        println!("Rack:      {}", projection.rack);
        println!("Bus Route: {}", projection.bus_route);
        if !allergies.is_empty() {
            println!("Allergies: {allergies}");
        }
    }
    Ok(())
}

async fn handle_export(config: &Config, cmd: &ExportCommand) -> anyhow::Result<()> {
    let controller = open_controller(config)?;
    let CardState::Submitted(record) = controller.state() else {
        bail!("no card submitted");
    };

    let card = CardView::new(record, &config.card_options());
    let path = export_card(&PngRasterizer, &card, &cmd.out)
        .await
        .with_context(|| format!("failed to export card to {}", cmd.out.display()))?;
    println!("Card saved to {}", path.display());
    Ok(())
}

fn handle_reset(config: &Config, cmd: &ResetCommand) -> anyhow::Result<()> {
    if !cmd.yes {
        println!("This will delete the saved card.");
        println!("Use --yes to confirm.");
        return Ok(());
    }

    let mut controller = open_controller(config)?;
    if controller.reset()? {
        println!("Saved card deleted.");
    } else {
        println!("No saved card.");
    }
    Ok(())
}

fn handle_status(config: &Config, cmd: &StatusCommand) -> anyhow::Result<()> {
    let path = config.database_path();
    let storage = Storage::open(&path)
        .with_context(|| format!("failed to open card database {}", path.display()))?;
    let stats = storage.stats()?;
    let store = RecordStore::with_key(storage, &config.storage.slot_key);
    let stored = store.load_stored();
    let state = match &stored {
        Some(s) if s.record.is_complete() => "submitted",
        _ => "draft",
    };

    if cmd.json {
        let status = serde_json::json!({
            "state": state,
            "database_path": path,
            "slot_key": store.key(),
            "schema_version": stored.as_ref().map(|s| s.schema_version),
            "saved_at": stored.as_ref().and_then(|s| s.saved_at),
            "slots": stats.slot_count,
            "last_write": stats.last_write,
            "db_size_bytes": stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("stucard status");
        println!("--------------");
        println!("State:         {state}");
        println!("Database:      {}", path.display());
        println!("Slot key:      {}", store.key());
        if let Some(stored) = &stored {
            println!("Record format: v{}", stored.schema_version);
            if let Some(saved_at) = stored.saved_at {
                println!("Saved at:      {}", saved_at.to_rfc3339());
            }
        }
        if let Some(last_write) = stats.last_write {
            println!("Last write:    {}", last_write.to_rfc3339());
        }
        println!("Database size: {} bytes", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:    {}", config.database_path().display());
                println!("  Slot key:         {}", config.storage.slot_key);
                println!();
                println!("[QR]");
                println!("  Error correction: {}", config.qr.error_correction);
                println!("  Size (px):        {}", config.qr.size);
                println!();
                println!("[Card]");
                println!("  Template:         {}", config.card.template.label());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            return handle_validate(file.clone());
        }
    }
    Ok(())
}

fn handle_validate(file: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    Config::load_file(&path)?;
    println!("Configuration is valid.");
    Ok(())
}
