use std::path::Path;

/// Loads `.env` from the crate directory, then from the working directory.
///
/// Variables already set in the environment win.
pub fn init() {
    let _ = dotenvy::from_path(Path::new(
        format!("{}/.env", env!("CARGO_MANIFEST_DIR")).as_str(),
    ));
    dotenvy::dotenv().ok();
}
