//! First-run provisioning: placeholder secret files, the `.env` file that
//! feeds them into settings, and schema migrations.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{info, warn};

use crate::config::{Settings, StoreBackend};
use crate::db::PgStore;
use crate::Result;

/// Written into every secret file that does not exist yet.
pub const PLACEHOLDER: &str = "password";

/// Secret file name and the environment key it is exported under. The
/// `APP_EMAIL__*` keys have no `Settings` section yet; they are written so the
/// `.env` file covers every secret file.
pub const SECRET_FILES: [(&str, &str); 4] = [
    ("django-secret.key", "APP_AUTH__JWT_SECRET"),
    ("database.password", "APP_DATABASE__PASSWORD"),
    ("email.password", "APP_EMAIL__PASSWORD"),
    ("email.from", "APP_EMAIL__FROM"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secret {
    pub file: &'static str,
    pub env_key: &'static str,
    pub value: String,
    /// Whether this run wrote the placeholder.
    pub created: bool,
}

#[derive(Debug)]
pub struct InstallReport {
    pub secrets: Vec<Secret>,
    pub migrated: bool,
}

fn first_line(path: &Path) -> Result<String> {
    let mut line = String::new();
    BufReader::new(fs::File::open(path)?).read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Creates `dir` and any missing secret file. Existing files are only read.
pub fn ensure_secrets(dir: &Path) -> Result<Vec<Secret>> {
    fs::create_dir_all(dir)?;

    let mut secrets = Vec::with_capacity(SECRET_FILES.len());
    for (file, env_key) in SECRET_FILES {
        let path = dir.join(file);
        let (value, created) = if path.exists() {
            (first_line(&path)?, false)
        } else {
            fs::write(&path, PLACEHOLDER)?;
            warn!("Wrote placeholder secret {}; replace it before deploying", path.display());
            (PLACEHOLDER.to_string(), true)
        };
        secrets.push(Secret {
            file,
            env_key,
            value,
            created,
        });
    }
    Ok(secrets)
}

pub fn render_env(secrets: &[Secret]) -> String {
    secrets
        .iter()
        .map(|s| format!("{}={}\n", s.env_key, s.value))
        .collect()
}

pub fn write_env_file(path: &Path, secrets: &[Secret]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_env(secrets))?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Runs every provisioning step. Migrations only apply to the Postgres
/// backend, using the database password secret unless one is configured.
pub async fn run(settings: &Settings) -> Result<InstallReport> {
    let secrets = ensure_secrets(Path::new(&settings.install.secrets_dir))?;
    write_env_file(Path::new(&settings.install.env_file), &secrets)?;

    let migrated = match settings.database.backend {
        StoreBackend::Postgres => {
            let mut database = settings.database.clone();
            if database.password.is_none() {
                database.password = secrets
                    .iter()
                    .find(|s| s.file == "database.password")
                    .map(|s| s.value.clone());
            }
            let store = PgStore::connect(&database).await?;
            store.migrate().await?;
            store.close().await;
            true
        }
        StoreBackend::Memory => {
            info!("Memory backend configured; no migrations to run");
            false
        }
    };

    Ok(InstallReport { secrets, migrated })
}
