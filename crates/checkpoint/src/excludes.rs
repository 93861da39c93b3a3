//! The shadow repository's `info/exclude` file.

use crate::nested::HIDDEN_SUFFIX;
use std::path::Path;

const BUILD_ARTIFACTS: &[&str] = &[
    ".gradle/", ".idea/", ".parcel-cache/", ".pytest_cache/", ".next/", ".nuxt/",
    ".sass-cache/", ".vs/", ".vscode/", "Pods/", "__pycache__/", "bin/", "build/",
    "bundle/", "coverage/", "deps/", "dist/", "env/", "node_modules/", "obj/", "out/",
    "pkg/", "pycache/", "target/dependency/", "temp/", "vendor/", "venv/",
];

const MEDIA: &[&str] = &[
    "*.jpg", "*.jpeg", "*.png", "*.gif", "*.bmp", "*.ico", "*.webp", "*.tiff", "*.tif",
    "*.raw", "*.heic", "*.avif", "*.eps", "*.psd", "*.3gp", "*.aac", "*.aiff", "*.asf",
    "*.avi", "*.divx", "*.flac", "*.m4a", "*.m4v", "*.mkv", "*.mov", "*.mp3", "*.mp4",
    "*.mpeg", "*.mpg", "*.ogg", "*.opus", "*.rm", "*.rmvb", "*.vob", "*.wav", "*.webm",
    "*.wma", "*.wmv",
];

const CACHES: &[&str] = &[
    "*.DS_Store", "*.bak", "*.cache", "*.crdownload", "*.dmp", "*.dump", "*.eslintcache",
    "*.lock", "*.log", "*.old", "*.part", "*.partial", "*.pyc", "*.pyo", "*.stackdump",
    "*.swo", "*.swp", "*.temp", "*.tmp", "*.Thumbs.db",
];

const ENV_FILES: &[&str] = &["*.env*", "*.local", "*.development", "*.production"];

const ARCHIVES_AND_BINARIES: &[&str] = &[
    "*.zip", "*.tar", "*.gz", "*.rar", "*.7z", "*.iso", "*.bin", "*.exe", "*.dll", "*.so",
    "*.dylib", "*.dat", "*.dmg", "*.msi",
];

const DATABASES: &[&str] = &[
    "*.arrow", "*.accdb", "*.aof", "*.avro", "*.bson", "*.csv", "*.db", "*.dbf", "*.frm",
    "*.ibd", "*.mdb", "*.myd", "*.myi", "*.orc", "*.parquet", "*.pdb", "*.rdb", "*.sql",
    "*.sqlite",
];

const GEOSPATIAL: &[&str] = &[
    "*.shp", "*.shx", "*.prj", "*.sbn", "*.sbx", "*.shp.xml", "*.cpg", "*.gdb", "*.gpkg",
    "*.kml", "*.kmz", "*.gml", "*.geojson", "*.dem", "*.asc", "*.img", "*.ecw", "*.las",
    "*.laz", "*.mxd", "*.qgs", "*.grd", "*.dwg", "*.dxf",
];

const LOGS: &[&str] = &[
    "*.error", "*.logs", "*.npm-debug.log*", "*.out", "*.stdout", "yarn-debug.log*",
    "yarn-error.log*",
];

/// Every exclusion pattern, built-in groups first, then `lfs_patterns`.
pub fn exclusions(lfs_patterns: &[String]) -> Vec<String> {
    let mut patterns = vec![".git/".to_string(), format!(".git{HIDDEN_SUFFIX}/")];
    for group in [
        BUILD_ARTIFACTS,
        MEDIA,
        CACHES,
        ENV_FILES,
        ARCHIVES_AND_BINARIES,
        DATABASES,
        GEOSPATIAL,
        LOGS,
    ] {
        patterns.extend(group.iter().map(|p| p.to_string()));
    }
    patterns.extend(lfs_patterns.iter().cloned());
    patterns
}

/// Patterns tracked by Git LFS according to `.gitattributes` content: the
/// first field of every line mentioning `filter=lfs`.
pub fn lfs_patterns(attributes: &str) -> Vec<String> {
    attributes
        .lines()
        .filter(|line| line.contains("filter=lfs"))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Rewrite `<repo>/info/exclude` for `workspace_root`.
pub(crate) async fn write_excludes_file(repo: &Path, workspace_root: &Path) -> crate::Result<()> {
    let attributes_path = workspace_root.join(".gitattributes");
    let lfs = match tokio::fs::read_to_string(&attributes_path).await {
        Ok(content) => lfs_patterns(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            tracing::warn!(path = %attributes_path.display(), error = %e, "Failed to read .gitattributes");
            Vec::new()
        }
    };

    let info_dir = repo.join("info");
    tokio::fs::create_dir_all(&info_dir)
        .await
        .map_err(|e| crate::CheckpointError::io(&info_dir, e))?;
    let exclude_path = info_dir.join("exclude");
    tokio::fs::write(&exclude_path, exclusions(&lfs).join("\n"))
        .await
        .map_err(|e| crate::CheckpointError::io(&exclude_path, e))
}
