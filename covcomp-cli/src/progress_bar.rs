use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use covcomp::progress::{ByteNum, ProgressNotifier};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum ProgressUnit {
    Bytes,
    Sequences,
}

#[derive(Debug)]
struct CovProgressBarState {
    length: Option<u64>,
    unit: ProgressUnit,
    initialized: bool,
}

/// Spinner or bar shown on the standard error while an archive is being
/// written or read.
///
/// The style is picked lazily on the first update, once the unit and the
/// expected length are known.
#[derive(Debug, Clone)]
pub(crate) struct CovProgressBar {
    bar: ProgressBar,
    state: Arc<Mutex<CovProgressBarState>>,
}

impl CovProgressBar {
    pub fn new() -> CovProgressBar {
        let bar = ProgressBar::hidden();
        bar.set_style(ProgressStyle::default_spinner());
        bar.enable_steady_tick(Duration::from_millis(50));
        bar.set_message("Initializing...");

        Self {
            bar,
            state: Arc::new(Mutex::new(CovProgressBarState {
                length: None,
                unit: ProgressUnit::Sequences,
                initialized: false,
            })),
        }
    }

    pub fn show(&self) {
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
    }

    pub fn is_hidden(&self) -> bool {
        self.bar.is_hidden()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear()
    }

    fn state(&self) -> MutexGuard<'_, CovProgressBarState> {
        // the state holds no invariants a panicking thread could break
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn template(unit: ProgressUnit, length: Option<u64>) -> &'static str {
        match (unit, length) {
            (ProgressUnit::Bytes, None) => "{spinner} {bytes} written ({bytes_per_sec}) {msg}",
            (ProgressUnit::Bytes, Some(_)) => "{wide_bar} {bytes}/{total_bytes} [ETA {eta}]",
            (ProgressUnit::Sequences, None) => "{spinner} {pos} sequences ({per_sec}) {msg}",
            (ProgressUnit::Sequences, Some(_)) => "{wide_bar} {pos}/{len} sequences [ETA {eta}]",
        }
    }

    fn init(&self) {
        let mut state = self.state();
        if state.initialized {
            return;
        }

        let style = match state.length {
            Some(_) => ProgressStyle::default_bar(),
            None => ProgressStyle::default_spinner(),
        };
        if let Ok(style) = style.template(Self::template(state.unit, state.length)) {
            self.bar.set_style(style);
        }
        if let Some(length) = state.length {
            self.bar.set_length(length);
        }
        self.bar.set_position(0);
        self.bar.set_message("");
        state.initialized = true;
    }

    /// Counts written bytes; `length` of 0 means the total is unknown.
    pub fn set_total_bytes(&self, length: u64) {
        let mut state = self.state();

        state.initialized = false;
        state.unit = ProgressUnit::Bytes;
        state.length = Some(length).filter(|&length| length != 0);
    }

    pub fn set_sequence_num(&self, length: u64) {
        let mut state = self.state();

        state.initialized = false;
        state.unit = ProgressUnit::Sequences;
        state.length = Some(length);
    }

    pub fn inc_sequences(&self) {
        self.init();
        if self.state().unit == ProgressUnit::Sequences {
            self.bar.inc(1);
        }
    }

    pub fn println<I: AsRef<str>>(&self, msg: I) {
        self.bar.println(msg);
    }
}

impl ProgressNotifier for CovProgressBar {
    fn processed_bytes(&self, bytes: ByteNum) {
        self.init();
        if self.state().unit == ProgressUnit::Bytes {
            self.bar.inc(bytes.get() as u64);
        }
    }

    fn set_iter_num(&self, num_iter: u64) {
        self.set_sequence_num(num_iter);
    }

    fn inc_iter(&self) {
        self.inc_sequences();
    }
}
