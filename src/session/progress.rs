//! Weighted phase plans and the terminal progress bar.

use super::events::{SessionEvent, SessionListener};
use indicatif::{ProgressBar, ProgressStyle};

/// One named step of an orchestration operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    pub name: &'static str,
    pub weight: u32,
}

/// Ordered phases of one operation. Percentages come from the weights.
#[derive(Debug, Clone, Copy)]
pub struct PhasePlan {
    pub operation: &'static str,
    phases: &'static [Phase],
}

/// A progress report for the operation currently running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub operation: &'static str,
    pub phase: &'static str,
    pub percent: u8,
}

impl PhasePlan {
    pub const FULL_ANALYSIS: PhasePlan = PhasePlan {
        operation: "analysis",
        phases: &[
            Phase {
                name: "load_documents",
                weight: 1,
            },
            Phase {
                name: "analyze_first",
                weight: 1,
            },
        ],
    };

    pub const SWITCH_DOCUMENT: PhasePlan = PhasePlan {
        operation: "switch",
        phases: &[Phase {
            name: "analyze_document",
            weight: 1,
        }],
    };

    pub const EXPORT_REPORT: PhasePlan = PhasePlan {
        operation: "export",
        phases: &[
            Phase {
                name: "sync_document",
                weight: 1,
            },
            Phase {
                name: "export_report",
                weight: 1,
            },
        ],
    };

    pub const EXPORT_ALL: PhasePlan = PhasePlan {
        operation: "export",
        phases: &[Phase {
            name: "export_all",
            weight: 1,
        }],
    };

    fn total_weight(&self) -> u32 {
        self.phases.iter().map(|p| p.weight).sum()
    }

    fn percent_of(&self, done: u32) -> u8 {
        let total = self.total_weight();
        if total == 0 {
            return 100;
        }
        // done <= total, so the result fits in a u8
        (done * 100 / total).min(100) as u8
    }

    /// Update emitted when the phase at `position` starts.
    ///
    /// Positions past the end report completion.
    pub fn enter(&self, position: usize) -> ProgressUpdate {
        match self.phases.get(position) {
            Some(phase) => {
                let done: u32 = self.phases[..position].iter().map(|p| p.weight).sum();
                ProgressUpdate {
                    operation: self.operation,
                    phase: phase.name,
                    percent: self.percent_of(done),
                }
            }
            None => self.finished(),
        }
    }

    pub fn finished(&self) -> ProgressUpdate {
        ProgressUpdate {
            operation: self.operation,
            phase: "done",
            percent: 100,
        }
    }

    pub fn failed(&self) -> ProgressUpdate {
        ProgressUpdate {
            operation: self.operation,
            phase: "failed",
            percent: 0,
        }
    }
}

/// Session listener that mirrors progress events on an indicatif bar.
pub struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    pub fn new(visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(100)
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self { bar }
    }

    #[cfg(test)]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl SessionListener for TerminalProgress {
    fn on_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Progress(update) => {
                if update.percent == 0 {
                    self.bar.reset();
                }
                self.bar.set_position(u64::from(update.percent));
                self.bar
                    .set_message(format!("{}: {}", update.operation, update.phase));
                if update.percent == 100 {
                    self.bar.finish_with_message(format!("{} complete", update.operation));
                }
            }
            SessionEvent::Failed { operation, message } => {
                self.bar
                    .abandon_with_message(format!("{} failed: {}", operation, message));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_analysis_percentages() {
        let plan = PhasePlan::FULL_ANALYSIS;
        assert_eq!(plan.enter(0).percent, 0);
        assert_eq!(plan.enter(0).phase, "load_documents");
        assert_eq!(plan.enter(1).percent, 50);
        assert_eq!(plan.enter(1).phase, "analyze_first");
        assert_eq!(plan.enter(2), plan.finished());
        assert_eq!(plan.finished().percent, 100);
    }

    #[test]
    fn test_weights_drive_percentages() {
        const PHASES: &[Phase] = &[
            Phase {
                name: "scan",
                weight: 1,
            },
            Phase {
                name: "render",
                weight: 3,
            },
        ];
        let plan = PhasePlan {
            operation: "custom",
            phases: PHASES,
        };
        assert_eq!(plan.enter(1).percent, 25);
        assert_eq!(plan.failed().percent, 0);
        assert_eq!(plan.failed().phase, "failed");
    }

    #[test]
    fn test_single_phase_plans() {
        assert_eq!(PhasePlan::SWITCH_DOCUMENT.enter(0).percent, 0);
        assert_eq!(PhasePlan::EXPORT_ALL.enter(0).phase, "export_all");
        assert_eq!(PhasePlan::EXPORT_ALL.operation, "export");
    }

    #[test]
    fn test_terminal_progress_tracks_updates() {
        let progress = TerminalProgress::new(false);
        progress.on_event(&SessionEvent::Progress(PhasePlan::FULL_ANALYSIS.enter(1)));
        assert_eq!(progress.position(), 50);

        progress.on_event(&SessionEvent::Progress(PhasePlan::FULL_ANALYSIS.failed()));
        assert_eq!(progress.position(), 0);
    }
}
