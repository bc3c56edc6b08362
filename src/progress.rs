use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar for one refinement pass; hidden when `enabled` is false.
pub fn pass_bar(len: usize, enabled: bool, message: &'static str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
    {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar.set_message(message);
    bar
}
