use std::sync::Arc;

use crate::fake::FakeClock;

/// Callback invoked when a timer or ticker is created or reset; receives the
/// owning clock and the duration that was requested.
pub type HookEventFn = Arc<dyn Fn(&FakeClock, i64) + Send + Sync>;

/// Callback invoked when a timer or ticker is stopped.
pub type HookStopFn = Arc<dyn Fn(&FakeClock) + Send + Sync>;

/// Selects which alarm kinds a [`Hook`] observes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HookFilter {
    /// Matches nothing.
    #[default]
    None,
    /// Matches one-shot timers (including `after` and `after_func`).
    Timers,
    /// Matches tickers.
    Tickers,
    /// Matches both.
    All,
}

impl HookFilter {
    fn matches_timers(self) -> bool {
        matches!(self, HookFilter::Timers | HookFilter::All)
    }

    fn matches_tickers(self) -> bool {
        matches!(self, HookFilter::Tickers | HookFilter::All)
    }
}

/// Lifecycle observer for a [`FakeClock`]'s timers and tickers.
///
/// Hooks are registered at clock construction via
/// [`FakeClock::with_hooks`](crate::FakeClock::with_hooks) and are immutable
/// afterwards. Callbacks are dispatched fire-and-forget on their own thread;
/// the only ordering guarantee is "happens after the event it reports".
#[derive(Clone, Default)]
pub struct Hook {
    filter: HookFilter,
    on_create: Option<HookEventFn>,
    on_reset: Option<HookEventFn>,
    on_stop: Option<HookStopFn>,
}

impl Hook {
    pub fn new(filter: HookFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Observes creation of matching alarms.
    pub fn on_create(mut self, f: impl Fn(&FakeClock, i64) + Send + Sync + 'static) -> Self {
        self.on_create = Some(Arc::new(f));
        self
    }

    /// Observes resets of matching alarms.
    pub fn on_reset(mut self, f: impl Fn(&FakeClock, i64) + Send + Sync + 'static) -> Self {
        self.on_reset = Some(Arc::new(f));
        self
    }

    /// Observes stops of matching alarms. A one-shot timer that fires is
    /// stopped implicitly and reports here too.
    pub fn on_stop(mut self, f: impl Fn(&FakeClock) + Send + Sync + 'static) -> Self {
        self.on_stop = Some(Arc::new(f));
        self
    }
}

/// Hooks flattened into per-kind, per-event dispatch lists at clock
/// construction, so each event walks one Vec instead of re-filtering.
#[derive(Default)]
pub(crate) struct ResolvedHooks {
    pub(crate) timer_create: Vec<HookEventFn>,
    pub(crate) timer_reset: Vec<HookEventFn>,
    pub(crate) timer_stop: Vec<HookStopFn>,
    pub(crate) ticker_create: Vec<HookEventFn>,
    pub(crate) ticker_reset: Vec<HookEventFn>,
    pub(crate) ticker_stop: Vec<HookStopFn>,
}

impl ResolvedHooks {
    pub(crate) fn resolve(hooks: impl IntoIterator<Item = Hook>) -> Self {
        let mut resolved = Self::default();
        for hook in hooks {
            if let Some(f) = hook.on_create {
                if hook.filter.matches_timers() {
                    resolved.timer_create.push(Arc::clone(&f));
                }
                if hook.filter.matches_tickers() {
                    resolved.ticker_create.push(f);
                }
            }
            if let Some(f) = hook.on_reset {
                if hook.filter.matches_timers() {
                    resolved.timer_reset.push(Arc::clone(&f));
                }
                if hook.filter.matches_tickers() {
                    resolved.ticker_reset.push(f);
                }
            }
            if let Some(f) = hook.on_stop {
                if hook.filter.matches_timers() {
                    resolved.timer_stop.push(Arc::clone(&f));
                }
                if hook.filter.matches_tickers() {
                    resolved.ticker_stop.push(f);
                }
            }
        }
        resolved
    }
}
