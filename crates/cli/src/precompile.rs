use getsmart_api::{CacheInspector, Outcome, ScriptRequest};
use getsmart_core::InterceptorConfig;
use std::collections::BTreeSet;
use tabled::{Table, Tabled};
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[derive(Tabled)]
struct ArtifactRow {
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Members")]
    members: usize,
    #[tabled(rename = "Size")]
    size: String,
}

pub fn run(config: InterceptorConfig) -> Result<(), Box<dyn std::error::Error>> {
    if !config.is_persistent() {
        return Err("build needs a destination directory (--dest)".into());
    }

    let urls = collect_urls(&config)?;
    info!(
        "Building {} scripts from {}...",
        urls.len(),
        config.src.display()
    );

    let src = config.src.clone();
    let interceptor = getsmart_runtime::build_default_interceptor(config)?;
    let mut failed = 0usize;
    for url in &urls {
        match interceptor.handle(&ScriptRequest::get(url.as_str())) {
            Ok(Outcome::Serve(_)) => info!("Built {}", url),
            Ok(Outcome::NotFound) => {
                failed += 1;
                error!("Built {} but couldn't write it to the destination", url);
            }
            Ok(Outcome::PassThrough) => warn!("Nothing to build for {}", url),
            Err(e) => {
                failed += 1;
                error!("{}", e);
            }
        }
    }

    let rows: Vec<ArtifactRow> = interceptor
        .cache()
        .entries()
        .into_iter()
        .map(|entry| ArtifactRow {
            url: entry.url,
            kind: entry.kind.as_str(),
            source: entry
                .source
                .strip_prefix(&src)
                .unwrap_or(entry.source.as_path())
                .display()
                .to_string(),
            members: entry.member_count,
            size: format_size(entry.artifact_bytes),
        })
        .collect();
    if !rows.is_empty() {
        println!("{}", Table::new(rows));
    }

    if failed > 0 {
        return Err(format!("{} of {} scripts failed to build", failed, urls.len()).into());
    }
    info!("Build complete.");
    Ok(())
}

/// Request URLs for every top-level script, alternate source and directory
pub fn collect_urls(config: &InterceptorConfig) -> Result<Vec<String>, walkdir::Error> {
    let suffix = config.script_suffix();
    let mut urls = BTreeSet::new();

    for entry in WalkDir::new(&config.src).min_depth(1).max_depth(1) {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            continue;
        }

        if entry.file_type().is_dir() {
            urls.insert(format!("/{}{}", name, suffix));
            continue;
        }

        let path = entry.path();
        let (Some(stem), Some(ext)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.extension().and_then(|e| e.to_str()),
        ) else {
            continue;
        };
        if ext == config.script_extension || Some(ext) == config.alternate_extension.as_deref() {
            urls.insert(format!("/{}{}", stem, suffix));
        }
    }

    Ok(urls.into_iter().collect())
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0)
    }
}
