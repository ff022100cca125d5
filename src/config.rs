use std::sync::OnceLock;

use crate::track::CellType;

pub static CONFIG: OnceLock<Config> = OnceLock::new();

fn parse_cell_type(s: &str) -> Result<CellType, String> {
    s.parse::<CellType>().map_err(|e| e.to_string())
}

#[derive(Debug, Default)]
#[derive(clap::Parser)]
pub struct Config {
    /// Cell type tag of per-track archives (GFP, RFP, iRFP or Phase)
    #[clap(long, parse(try_from_str = parse_cell_type))]
    pub cell_type: Option<CellType>,

    /// Leave per-track JSON files loose instead of zipping them
    #[clap(long)]
    pub no_zip: bool,
}

impl Config {
    /// The configuration set at startup, or the defaults.
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::default)
    }

    pub fn as_zip_archive(&self) -> bool {
        !self.no_zip
    }
}
