use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_green, bright_yellow};

const PHASES: usize = 4;

/// Progress tracking for the report phases
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_phase_1() -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        let pb = create_spinner(phase_message(1, "Resolving flake inputs"));
        Self { pb }
    }

    pub fn finish_phase_1_start_phase_2(self, input_count: usize) -> Self {
        self.pb.finish_with_message(done_message(
            1,
            &format!("Resolved {input_count} flake inputs"),
        ));
        let pb = create_counter(phase_message(2, "Collecting CI results"));
        Self { pb }
    }

    /// Bar ticked once per collected job.
    pub fn bar(&self) -> &ProgressBar {
        &self.pb
    }

    pub fn finish_phase_2_start_phase_3(self, package_count: usize) -> Self {
        self.pb.finish_with_message(done_message(
            2,
            &format!("Collected CI results for {package_count} packages"),
        ));
        let pb = create_spinner(phase_message(3, "Evaluating flake checks"));
        Self { pb }
    }

    pub fn finish_phase_3_start_phase_4(self) -> Self {
        self.pb
            .finish_with_message(done_message(3, "Evaluated flake checks"));
        let pb = create_spinner(phase_message(4, "Assembling report"));
        Self { pb }
    }

    pub fn finish_phase_4(self) {
        self.pb
            .finish_with_message(done_message(4, "Report assembled successfully"));
        eprintln!("\n");
    }
}

fn phase_message(phase: usize, text: &str) -> String {
    bright_yellow(format!("Phase {phase}/{PHASES}: {text}")).to_string()
}

fn done_message(phase: usize, text: &str) -> String {
    bright_green(format!("Phase {phase}/{PHASES}: {text} ✓")).to_string()
}

fn create_spinner(message: String) -> ProgressBar {
    create_bar(message, "  {msg} {spinner}")
}

fn create_counter(message: String) -> ProgressBar {
    create_bar(message, "  {msg} {spinner} {pos}/{len}")
}

fn create_bar(message: String, template: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
