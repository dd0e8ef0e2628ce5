use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use molgrid::engine::progress::{Progress, ProgressCallback};
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

const TICK_INTERVAL: Duration = Duration::from_millis(100);
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";
const BAR_TEMPLATE: &str =
    "{msg:<18} {bar:40.cyan/blue} {pos:>5}/{len:5} [{elapsed_precise}<{eta_precise}] {per_sec}";

/// Renders workflow progress events on stderr.
///
/// A phase shows as a spinner; a task inside it switches to a bar counting
/// batches. Cloning shares the same bar.
#[derive(Clone)]
pub struct CliProgressHandler {
    bar: ProgressBar,
    phase: Option<&'static str>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), target);
        bar.set_style(spinner_style());
        Self { bar, phase: None }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let state = Mutex::new(self.clone());
        Box::new(move |event: Progress| match state.lock() {
            Ok(mut handler) => handler.handle(event),
            Err(_) => warn!("Progress state was poisoned; dropping event."),
        })
    }

    fn handle(&mut self, event: Progress) {
        match event {
            Progress::PhaseStart { name } => {
                self.phase = Some(name);
                self.bar.reset();
                self.bar.set_style(spinner_style());
                self.bar.set_message(name);
                self.bar.enable_steady_tick(TICK_INTERVAL);
            }
            Progress::TaskStart { total_steps } => {
                self.bar.disable_steady_tick();
                self.bar.reset();
                self.bar.set_length(total_steps);
                self.bar.set_style(bar_style());
                if let Some(name) = self.phase {
                    self.bar.set_message(name);
                }
            }
            Progress::TaskIncrement => self.bar.inc(1),
            Progress::TaskFinish => {
                if let Some(len) = self.bar.length() {
                    self.bar.set_position(len);
                }
            }
            Progress::PhaseFinish => {
                self.bar.disable_steady_tick();
                let done = match self.phase.take() {
                    Some(name) => format!("✓ {}", name),
                    None => "✓ Done".to_string(),
                };
                self.bar.finish_with_message(done);
            }
            Progress::Message(msg) => self.bar.println(format!("  {}", msg)),
        }
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template(SPINNER_TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden() -> CliProgressHandler {
        CliProgressHandler::with_target(ProgressDrawTarget::hidden())
    }

    #[test]
    fn task_events_drive_the_bar_position() {
        let handler = hidden();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart { name: "Gridding batches" });
        assert_eq!(handler.bar.message(), "Gridding batches");

        callback(Progress::TaskStart { total_steps: 5 });
        callback(Progress::TaskIncrement);
        callback(Progress::TaskIncrement);
        assert_eq!(handler.bar.length(), Some(5));
        assert_eq!(handler.bar.position(), 2);

        callback(Progress::TaskFinish);
        assert_eq!(handler.bar.position(), 5);

        callback(Progress::PhaseFinish);
        assert!(handler.bar.is_finished());
        assert_eq!(handler.bar.message(), "✓ Gridding batches");
    }

    #[test]
    fn phase_finish_without_start_reports_done() {
        let handler = hidden();
        handler.get_callback()(Progress::PhaseFinish);
        assert_eq!(handler.bar.message(), "✓ Done");
    }

    #[test]
    fn callback_can_move_to_another_thread() {
        let handler = hidden();
        let callback = handler.get_callback();
        std::thread::spawn(move || {
            callback(Progress::TaskStart { total_steps: 1 });
            callback(Progress::TaskIncrement);
            callback(Progress::Message("halfway".into()));
        })
        .join()
        .unwrap();
        assert_eq!(handler.bar.position(), 1);
    }
}
