//! Execution of CLI commands against the working document.

use std::path::Path;

use anyhow::{bail, Context, Result};
use loadpath::persistence::write_document;
use loadpath::{
    find_load_contributors, Config, ContributorLoads, GraphDocument, GraphStore, ImportWarning,
    NodeProperties, Position,
};

use crate::cli::{Cli, Command, SetArgs};
use crate::report::{render_document, render_trace};

/// Run one command.
pub fn execute(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    let path = cli.document.as_path();

    match cli.command {
        Command::Init { force } => init(path, force),
        Command::Import { file } => import(path, &file, &config),
        Command::Show => {
            let store = open(path, &config)?;
            print!("{}", render_document(store.document()));
            Ok(())
        }
        Command::Trace { edge, json } => {
            let store = open(path, &config)?;
            trace(store.document(), &edge, json)
        }
        Command::Export { dir } => {
            let store = open(path, &config)?;
            let dir = dir.unwrap_or_else(|| config.export_dir.clone());
            let timestamp = chrono::Local::now().naive_local();
            let written = store
                .export_to_dir(&dir, timestamp)
                .context("Failed to export document")?;
            println!("Exported {}", written.display());
            Ok(())
        }
        Command::AddNode { count } => edit(path, &config, |store| {
            for _ in 0..count {
                let node = store.add_node();
                println!("Added {}", node.id());
            }
            Ok(())
        }),
        Command::DeleteNode { id } => edit(path, &config, |store| {
            match store.delete_node(&id) {
                Some(node) => println!("Deleted {}", node.id()),
                None => println!("No node {id:?}; nothing deleted"),
            }
            Ok(())
        }),
        Command::Rename { id, name } => edit(path, &config, |store| {
            if store.rename_node(&id, &name)? {
                println!("Renamed {id} to {}", name.trim());
            } else {
                println!("{id} keeps its name; nothing renamed");
            }
            Ok(())
        }),
        Command::Connect { source, target } => edit(path, &config, |store| {
            let edge = store.connect(&source, &target)?;
            println!("Connected {source} -> {target} as {}", edge.id());
            Ok(())
        }),
        Command::Disconnect { edge } => edit(path, &config, |store| {
            match store.disconnect(&edge) {
                Some(removed) => println!(
                    "Removed {} ({} -> {})",
                    removed.id(),
                    removed.source(),
                    removed.target()
                ),
                None => println!("No connection {edge:?}; nothing removed"),
            }
            Ok(())
        }),
        Command::Set(args) => edit(path, &config, |store| {
            let id = args.id.clone();
            let form = property_form(store, args)?;
            store.update_node_properties(&id, form)?;
            println!("Updated {id}");
            Ok(())
        }),
        Command::Move { id, x, y } => edit(path, &config, |store| {
            store.move_node(&id, Position::new(x, y))?;
            println!("Moved {id} to ({x}, {y})");
            Ok(())
        }),
    }
}

/// Open the working document, apply `change`, and save it when the change succeeds.
fn edit<F>(path: &Path, config: &Config, change: F) -> Result<()>
where
    F: FnOnce(&mut GraphStore) -> Result<()>,
{
    let mut store = open(path, config)?;
    change(&mut store)?;
    save(&store, path)
}

/// Create an empty document at `path`.
fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }
    write_document(&GraphDocument::new(), path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    println!("Created empty load path at {}", path.display());
    Ok(())
}

/// Load the working document into a store that uses the configured layout.
fn open(path: &Path, config: &Config) -> Result<GraphStore> {
    let mut store = GraphStore::with_layout(config.layout.clone());
    store.import_file(path).with_context(|| {
        format!(
            "Failed to open {}; run `loadpath init` to create it",
            path.display()
        )
    })?;
    Ok(store)
}

/// Write the working document back to disk.
fn save(store: &GraphStore, path: &Path) -> Result<()> {
    write_document(store.document(), path)
        .with_context(|| format!("Failed to save {}", path.display()))
}

/// Print import warnings to stderr.
fn report_warnings(warnings: &[ImportWarning]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

/// Replace the working document with `file`, leaving it untouched on failure.
fn import(path: &Path, file: &Path, config: &Config) -> Result<()> {
    let mut store = GraphStore::with_layout(config.layout.clone());
    let warnings = store
        .import_file(file)
        .with_context(|| format!("Error processing file {}", file.display()))?;
    report_warnings(&warnings);
    save(&store, path)?;
    println!(
        "Successfully imported {} ({} nodes, {} connections)",
        file.display(),
        store.node_count(),
        store.edge_count()
    );
    Ok(())
}

/// Trace and print the contributors of `edge`.
fn trace(document: &GraphDocument, edge: &str, json: bool) -> Result<()> {
    let report = find_load_contributors(document, edge)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let loads = ContributorLoads::from_report(document, &report);
        print!("{}", render_trace(&report, &loads));
    }
    Ok(())
}

/// Build the property form for `set`, starting from the node's current values.
fn property_form(store: &GraphStore, args: SetArgs) -> Result<NodeProperties> {
    let node = store
        .document()
        .node(&args.id)
        .with_context(|| format!("Node {:?} does not exist", args.id))?;
    let mut form = NodeProperties::from(&node.data);
    let components = |v: loadpath::Vec3| v.to_array().map(Some);
    if let Some(name) = args.name {
        form.name = Some(name);
    }
    if let Some(mass) = args.mass {
        form.mass = Some(mass);
    }
    if let Some(cog) = args.cog {
        form.cog = components(cog);
    }
    if let Some(force) = args.force {
        form.external_force = components(force);
    }
    if let Some(moment) = args.moment {
        form.moment = components(moment);
    }
    if let Some(euler) = args.euler {
        form.euler_angles = components(euler);
    }
    if let Some(order) = args.rotation_order {
        form.rotation_order = Some(order);
    }
    if let Some(translation) = args.translation {
        form.translation = components(translation);
    }
    Ok(form)
}
