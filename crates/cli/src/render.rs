//! Reference terminal renderer (spec §4.8's "Status observer interface",
//! concretized for this crate per SPEC_FULL §4.9): consumes
//! [`engine::StatusSnapshot`] values and draws either redraw-in-place bars
//! (`indicatif::MultiProgress`, the default) or a scrolling line log
//! (`--scroll`).

use std::collections::HashMap;

use engine::{Summary, StatusSnapshot};
use humansize::{format_size, DECIMAL};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

pub struct Renderer {
    scroll: bool,
    multi: MultiProgress,
    bars: HashMap<u32, ProgressBar>,
}

impl Renderer {
    pub fn new(scroll: bool) -> Self {
        Self {
            scroll,
            multi: MultiProgress::new(),
            bars: HashMap::new(),
        }
    }

    /// Draws one snapshot. Called on every status tick from the aggregator.
    pub fn render(&mut self, snapshot: &StatusSnapshot) {
        if self.scroll {
            for file in &snapshot.files {
                println!(
                    "[{}] {:.1}% ({} / {}), {} active{}",
                    file.id,
                    file.ratio,
                    format_size(file.done, DECIMAL),
                    format_size(file.size, DECIMAL),
                    file.active_connections,
                    file.error.as_deref().map(|e| format!(" — {e}")).unwrap_or_default(),
                );
            }
            return;
        }

        for file in &snapshot.files {
            let bar = self.bars.entry(file.id).or_insert_with(|| {
                let bar = self.multi.add(ProgressBar::new(file.size.max(1)));
                bar.set_style(
                    ProgressStyle::with_template(
                        "{prefix} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({msg})",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                bar.set_prefix(format!("file {}", file.id));
                bar
            });

            bar.set_length(file.size.max(1));
            bar.set_position(file.done);
            bar.set_message(format!("{} active", file.active_connections));

            if let Some(err) = &file.error {
                bar.abandon_with_message(err.clone());
            } else if file.finished {
                bar.finish_with_message("done");
            }
        }
    }

    /// Prints the final summary line once every file is finished-or-failed.
    pub fn finish(&self, summary: &Summary) {
        if !self.scroll {
            let _ = self.multi.clear();
        }
        println!(
            "Downloaded {} in {:.2?}",
            format_size(summary.total_bytes, DECIMAL),
            summary.elapsed
        );
    }
}
