//! Scans one or more directory trees, hashes every file on a worker pool and reports
//! progress once a second.
//!
//! ```text
//! RUST_LOG=pipeweave=debug cargo run --example dir_scan -- ./src ./tests
//! ```

use pipeweave::{Chan, ChanPush, StageConfig, window};
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

struct Hashed {
  path: PathBuf,
  bytes: usize,
  digest: String,
}

async fn walk(roots: Vec<PathBuf>, paths: ChanPush<PathBuf>) {
  let mut pending = roots;
  while let Some(dir) = pending.pop() {
    if let Err(err) = list_dir(&dir, &mut pending, &paths).await {
      warn!(dir = %dir.display(), %err, "skipping unreadable directory");
    }
  }
}

async fn list_dir(dir: &Path, pending: &mut Vec<PathBuf>, paths: &ChanPush<PathBuf>) -> io::Result<()> {
  let mut entries = tokio::fs::read_dir(dir).await?;
  while let Some(entry) = entries.next_entry().await? {
    let kind = match entry.file_type().await {
      Ok(kind) => kind,
      Err(err) => {
        warn!(path = %entry.path().display(), %err, "skipping unreadable entry");
        continue;
      }
    };
    if kind.is_dir() {
      pending.push(entry.path());
    } else if kind.is_file() {
      paths.push(entry.path()).await;
    }
  }
  Ok(())
}

fn hash(path: PathBuf) -> io::Result<Hashed> {
  let contents = tokio::task::block_in_place(|| std::fs::read(&path))?;
  let digest = Sha256::digest(&contents)
    .iter()
    .map(|b| format!("{b:02x}"))
    .collect();
  Ok(Hashed { path, bytes: contents.len(), digest })
}

#[tokio::main]
async fn main() -> io::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let mut roots: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
  if roots.is_empty() {
    roots.push(PathBuf::from("."));
  }
  let (paths, input) = Chan::new(64).split();

  let walker = tokio::spawn(async move {
    walk(roots, paths.clone()).await;
    paths.close();
  });

  let hashers = StageConfig::new(4, 16).with_name("hash");
  let hashed = input
    .map_with_error_sink(&hashers, hash, |err: io::Error| warn!(%err, "skipping unreadable file"))
    .tap(&StageConfig::new(1, 16), |h: Hashed| {
      info!(path = %h.path.display(), bytes = h.bytes, digest = %&h.digest[..12], "hashed");
      h
    });

  let progress = window(
    &StageConfig::new(1, 4).with_name("progress"),
    Duration::from_secs(1),
    |h: Hashed, (files, bytes): (usize, usize)| (files + 1, bytes + h.bytes),
    || (0, 0),
    hashed,
  );

  let (files, bytes) = progress
    .reduce(
      |(files, bytes), (total_files, total_bytes)| {
        info!(files, bytes, "progress");
        (total_files + files, total_bytes + bytes)
      },
      (0, 0),
    )
    .await;

  walker.await?;
  info!(files, bytes, "scan complete");
  Ok(())
}
