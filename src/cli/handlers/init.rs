use std::fs;
use std::path::Path;

use crate::io::config_io::{CONFIG_FILE, CONFIG_TEMPLATE};
use crate::io::json_store::JsonStore;

use super::DATA_DIR;

/// Create `.taskline/` under `root` with an empty store and a commented
/// config. Existing files are left alone.
pub fn cmd_init(root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = root.join(DATA_DIR);
    let existed = data_dir.join(crate::io::json_store::STORE_FILE).exists();
    JsonStore::init(&data_dir)?;

    let config_path = data_dir.join(CONFIG_FILE);
    if !config_path.exists() {
        fs::write(&config_path, CONFIG_TEMPLATE)?;
    }

    if existed {
        println!("taskline already initialized in {}", data_dir.display());
    } else {
        println!("initialized taskline in {}", data_dir.display());
    }
    Ok(())
}
