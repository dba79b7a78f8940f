//! Kinematic model inspector
//!
//! Loads a model file and prints its frame tree, joint layout and poses,
//! or exports it back to a configuration file and STL meshes.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use kin_core::{World, export_config, export_meshes, import_model};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kin-inspect")]
#[command(about = "Inspect and convert kinematic model files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one line per frame
    Dump {
        /// Model file (.ron or .json)
        model: PathBuf,
    },

    /// Print the frame tree with joint types and DOF offsets
    Tree { model: PathBuf },

    /// Print the joint vector and its layout
    Q { model: PathBuf },

    /// Set the joint vector and print the resulting world poses
    Pose {
        model: PathBuf,

        /// Comma separated joint values; length must match the joint vector
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        q: Vec<f64>,
    },

    /// Write the model back out as a configuration file
    Export {
        model: PathBuf,

        /// Output file; `.json` selects JSON, anything else RON
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Write every shape mesh as STL
    Meshes {
        model: PathBuf,

        #[arg(long, default_value = "meshes")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kin_core=info,kin_inspect=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Dump { model } => {
            let world = load(&model)?;
            print!("{world}");
            report_warnings(&world);
        }
        Commands::Tree { model } => {
            let world = load(&model)?;
            print_tree(&world);
        }
        Commands::Q { model } => {
            let mut world = load(&model)?;
            let q = world.get_q()?;
            println!("q_dim = {}", q.len());
            for (id, joint) in world.joints() {
                let Some(offset) = joint.q_index() else {
                    continue;
                };
                let name = world.frame_name(id).unwrap_or("?");
                let values = &q[offset..offset + joint.dim()];
                println!("{offset:>4} {name} {} {values:?}", joint.joint_type());
            }
        }
        Commands::Pose { model, q } => {
            let mut world = load(&model)?;
            let dim = world.q_dim();
            if q.len() != dim {
                bail!("expected {} joint values, got {}", dim, q.len());
            }
            world.set_q(&q)?;
            for frame in world.frames() {
                println!("{} {}", frame.name, frame.pose);
            }
            report_warnings(&world);
        }
        Commands::Export { model, out } => {
            let world = load(&model)?;
            let config = export_config(&world);
            match out {
                Some(path) if path.extension().is_some_and(|e| e == "json") => {
                    let json = serde_json::to_string_pretty(&config)?;
                    std::fs::write(&path, json)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!("Wrote {}", path.display());
                }
                Some(path) => {
                    config.save(&path)?;
                    info!("Wrote {}", path.display());
                }
                None => println!("{}", config.to_ron_string()?),
            }
        }
        Commands::Meshes { model, dir } => {
            let world = load(&model)?;
            for path in export_meshes(&world, &dir)? {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<World> {
    import_model(path).with_context(|| format!("loading {}", path.display()))
}

fn print_tree(world: &World) {
    for root in world.roots() {
        print_subtree(world, root, 0);
    }
}

fn print_subtree(world: &World, id: kin_core::FrameId, depth: usize) {
    let Some(frame) = world.frame(id) else {
        return;
    };
    let mut line = format!("{}{} {}", "  ".repeat(depth), id, frame.name);
    if let Some(joint) = frame.joint() {
        line.push_str(&format!(" [{}", joint.joint_type()));
        if let Some(offset) = joint.q_index() {
            line.push_str(&format!(" q{}..{}", offset, offset + joint.dim()));
        }
        if joint.mimic().is_some() {
            line.push_str(" mimic");
        }
        line.push(']');
    }
    if let Some(shape) = frame.shape() {
        line.push_str(&format!(" <{}>", shape.shape_type));
    }
    println!("{line}");
    for &child in frame.children() {
        print_subtree(world, child, depth + 1);
    }
}

fn report_warnings(world: &World) {
    for warning in world.warnings() {
        eprintln!("warning: {warning}");
    }
}
