//! Command line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use loadpath::{RotationOrder, Vec3};

/// Build mechanical load-path graphs and trace load contributors.
#[derive(Parser, Debug)]
#[command(name = "loadpath", version, about)]
pub struct Cli {
    /// Working document
    #[arg(
        long,
        global = true,
        env = "LOADPATH_DOCUMENT",
        default_value = "load_path.json"
    )]
    pub document: PathBuf,

    /// Configuration file (defaults apply when it does not exist)
    #[arg(long, global = true, env = "LOADPATH_CONFIG", default_value = "loadpath.toml")]
    pub config: PathBuf,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Editing and analysis commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty working document
    Init {
        /// Overwrite an existing document
        #[arg(long)]
        force: bool,
    },

    /// Add nodes with default properties at random canvas positions
    AddNode {
        /// Number of nodes to add
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },

    /// Delete a node and every connection attached to it
    DeleteNode {
        /// Node id
        id: String,
    },

    /// Rename a node; connections follow the new name
    Rename {
        /// Current node id
        id: String,
        /// New name (also the new id)
        name: String,
    },

    /// Connect SOURCE to TARGET, replacing any connection between the pair
    Connect {
        /// Node that transmits the load
        source: String,
        /// Node that receives the load
        target: String,
    },

    /// Remove a connection
    Disconnect {
        /// Edge id, e.g. e3
        edge: String,
    },

    /// Edit node properties; omitted options keep their current values
    Set(SetArgs),

    /// Move a node on the canvas
    #[command(allow_negative_numbers = true)]
    Move {
        /// Node id
        id: String,
        /// Horizontal canvas coordinate
        #[arg(value_parser = parse_finite)]
        x: f64,
        /// Vertical canvas coordinate
        #[arg(value_parser = parse_finite)]
        y: f64,
    },

    /// Print the node property table and the connection list
    Show,

    /// List the nodes contributing load to a connection
    Trace {
        /// Edge id, e.g. e3
        edge: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a timestamped snapshot (load_path_data_YYYYMMDD_HHMMSS.json)
    Export {
        /// Target directory (defaults to `export_dir` from the configuration)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Replace the working document with a JSON file
    Import {
        /// File to import
        file: PathBuf,
    },
}

/// Arguments for the `set` command.
#[derive(Args, Debug, Clone)]
pub struct SetArgs {
    /// Node id
    pub id: String,

    /// New name (also the new id)
    #[arg(long)]
    pub name: Option<String>,

    /// Mass in kilograms
    #[arg(long, value_parser = parse_finite, allow_negative_numbers = true)]
    pub mass: Option<f64>,

    /// Centre of gravity as x,y,z in metres
    #[arg(long, value_parser = parse_triple, allow_hyphen_values = true)]
    pub cog: Option<Vec3>,

    /// External force as x,y,z in newtons
    #[arg(long, value_parser = parse_triple, allow_hyphen_values = true)]
    pub force: Option<Vec3>,

    /// External moment as x,y,z in newton-metres
    #[arg(long, value_parser = parse_triple, allow_hyphen_values = true)]
    pub moment: Option<Vec3>,

    /// Euler angles as x,y,z in degrees
    #[arg(long, value_parser = parse_triple, allow_hyphen_values = true)]
    pub euler: Option<Vec3>,

    /// Rotation order (xyz, xzy, yxz, yzx, zxy, zyx)
    #[arg(long)]
    pub rotation_order: Option<RotationOrder>,

    /// Translation as x,y,z in metres
    #[arg(long, value_parser = parse_triple, allow_hyphen_values = true)]
    pub translation: Option<Vec3>,
}

/// Parse a finite number; NaN and infinities cannot be stored in a document.
pub fn parse_finite(s: &str) -> Result<f64, String> {
    let value = s
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid number {s:?}: {e}"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{s:?} is not a finite number"))
    }
}

/// Parse `x,y,z` into a vector of finite numbers.
pub fn parse_triple(s: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = s.split(',').collect();
    let &[x, y, z] = parts.as_slice() else {
        return Err(format!("expected three comma-separated numbers, got {s:?}"));
    };
    Ok(Vec3::new(parse_finite(x)?, parse_finite(y)?, parse_finite(z)?))
}
