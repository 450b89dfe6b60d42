use std::path::Path;

use crate::commands::common::open_database;
use crate::error::CliError;

pub async fn run_categories(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let categories = db.list_categories().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
    } else {
        for category in categories {
            println!("{category}");
        }
    }

    Ok(())
}
