use crate::controller::{ControllerConfig, DEFAULT_ATTRIBUTION, DEFAULT_TILE_URL, DEFAULT_ZOOM};
use crate::ports::TileLayer;
use crate::types::Coords;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_RESTORE_DELAY_MS: u64 = 1000;

#[derive(Parser, Debug)]
#[command(
    name = "waymark",
    about = "Log running and cycling workouts by clicking a map, from a command script"
)]
pub struct Cli {
    /// Command script to run. Reads stdin when omitted or `-`.
    #[arg(value_name = "SCRIPT")]
    pub script: Option<PathBuf>,

    /// Latitude reported by the location lookup. Without it the map never loads.
    #[arg(long, allow_negative_numbers = true, requires = "lng")]
    pub lat: Option<f64>,

    /// Longitude reported by the location lookup.
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    pub lng: Option<f64>,

    /// Zoom used when loading the map and when panning to a workout.
    #[arg(long, default_value_t = DEFAULT_ZOOM)]
    pub zoom: u8,

    /// Milliseconds before the form layout is restored after a submission.
    #[arg(long, default_value_t = DEFAULT_RESTORE_DELAY_MS)]
    pub restore_delay_ms: u64,

    /// Tile URL template for the base layer.
    #[arg(long, default_value = DEFAULT_TILE_URL)]
    pub tiles: String,

    /// Print the logged workouts as JSON when the script ends.
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v, -vv). Defaults to INFO.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease log verbosity (-q, -qq). Defaults to INFO.
    #[arg(short = 'q', long, action = ArgAction::Count, global = true)]
    pub quiet: u8,
}

impl Cli {
    pub fn location(&self) -> Option<Coords> {
        Some(Coords::new(self.lat?, self.lng?))
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            default_zoom: self.zoom,
            form_restore_delay: Duration::from_millis(self.restore_delay_ms),
            tile_layer: TileLayer {
                url_template: self.tiles.clone(),
                attribution: DEFAULT_ATTRIBUTION.to_string(),
            },
        }
    }
}
