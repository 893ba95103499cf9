//! Progress bar and summary reporting for CLI installs.

use indicatif::{ProgressBar, ProgressStyle};

use crate::{CacheKey, InstallProgress, InstallStats, Resolved, format_bytes, format_duration};

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Install progress rendered as one bar counting assets.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    /// Creates a bar for `total` assets.
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("progress template is valid")
                .progress_chars("━━╌"),
        );
        Self { bar }
    }
}

impl InstallProgress for BarProgress {
    fn on_asset_start(&self, url: &str) {
        self.bar.set_message(url.to_string());
    }

    fn on_asset_fetched(&self, _url: &str, _bytes: u64) {
        self.bar.inc(1);
    }

    fn on_error(&self, url: &str, error: &str) {
        self.bar.abandon_with_message(format!("{url}: {error}"));
    }

    fn on_complete(&self, _stats: &InstallStats) {
        self.bar.finish_and_clear();
    }
}

/// Prints a summary of a finished install.
pub fn print_summary(stats: &InstallStats) {
    println!("\n{SEPARATOR}");
    println!("Install Summary");
    println!("{SEPARATOR}");
    println!("  Cache:             {}", stats.cache_name);
    println!("  Assets stored:     {}", stats.assets_stored);
    println!("  Total size:        {}", format_bytes(stats.total_bytes));
    println!("  Total time:        {}", format_duration(stats.elapsed));
    println!(
        "  Average speed:     {}/s",
        format_bytes(stats.average_speed())
    );
    println!("{SEPARATOR}");
}

/// Prints where a resolved response came from and what it contains.
pub fn print_resolved(url: &str, resolved: &Resolved) {
    let response = &resolved.response;
    println!("{url}");
    println!("  source:  {}", resolved.source.as_str());
    println!("  status:  {}", response.status);
    if let Some(content_type) = response.header("content-type") {
        println!("  type:    {content_type}");
    }
    println!("  size:    {}", format_bytes(response.body.len() as u64));
}

/// Prints the keys held by a store.
pub fn print_keys(cache_name: &str, keys: &[CacheKey]) {
    if keys.is_empty() {
        println!("{cache_name}: empty");
        return;
    }
    println!("{cache_name}: {} entr{}", keys.len(), if keys.len() == 1 { "y" } else { "ies" });
    for key in keys {
        println!("  {key}");
    }
}
