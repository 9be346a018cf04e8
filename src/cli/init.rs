use std::path::PathBuf;

use costwise::db::{get_connection, init_db};
use costwise::error::Result;
use costwise::settings::{load_settings, save_settings, shellexpand_path, DB_FILE};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;

    let conn = get_connection(&resolved.join(DB_FILE))?;
    init_db(&conn)?;
    save_settings(&settings)?;

    println!("Initialized costwise at {}", resolved.display());
    Ok(())
}
