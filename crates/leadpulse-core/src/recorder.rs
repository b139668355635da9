//! Page-load session recording.
//!
//! [`SessionRecorder`] owns the single [`Session`] built during one page load
//! and is its only mutation surface. The browser snippet served by the server
//! follows the same rules; this type pins them down and makes them testable.
//!
//! Lifecycle: `Opened` (device captured) → `Viewing` (one page view open,
//! receiving scroll/tick/click updates) → `Closing` (time frozen, payloads
//! handed out once).

use crate::error::CoreError;
use crate::session::{ClickEvent, DeviceInfo, Location, PageView, Position, Session, VisitReport};

/// Upper bound of a scroll-depth percentage.
pub const MAX_SCROLL_DEPTH: f64 = 100.0;

/// Interval of the time-on-page tick, in milliseconds.
pub const TICK_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Opened,
    Viewing,
    Closing,
}

/// Scroll position reported by the page.
#[derive(Debug, Clone, Copy)]
pub struct ScrollSample {
    pub scroll_y: f64,
    pub scroll_height: f64,
    pub viewport_height: f64,
}

impl ScrollSample {
    /// Percentage of the scrollable height reached by this sample.
    ///
    /// A page that cannot scroll (`scroll_height <= viewport_height`) and any
    /// non-finite input yield 0. The result is clamped to [0, 100].
    pub fn percent(&self) -> f64 {
        let scrollable = self.scroll_height - self.viewport_height;
        if !scrollable.is_finite() || scrollable <= 0.0 || !self.scroll_y.is_finite() {
            return 0.0;
        }
        (self.scroll_y / scrollable * 100.0).clamp(0.0, MAX_SCROLL_DEPTH)
    }
}

/// What the page knows about a clicked element.
#[derive(Debug, Clone, Default)]
pub struct ClickTarget {
    pub element_id: Option<String>,
    pub element_text: Option<String>,
}

/// The two independent requests fired at unload.
#[derive(Debug, Clone, PartialEq)]
pub struct UnloadPayloads {
    pub visit: VisitReport,
    pub session: Session,
}

#[derive(Debug)]
pub struct SessionRecorder {
    state: RecorderState,
    session: Session,
    /// Index into `session.page_views` of the open page view.
    open_view: Option<usize>,
}

impl SessionRecorder {
    /// Start recording a page load at `now_ms`.
    pub fn open(site_id: impl Into<String>, device_info: DeviceInfo, now_ms: i64) -> Self {
        Self {
            state: RecorderState::Opened,
            session: Session {
                site_id: site_id.into(),
                start_time: now_ms,
                last_active: now_ms,
                device_info,
                page_views: Vec::new(),
                clicks: Vec::new(),
                navigation_path: Vec::new(),
            },
            open_view: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn ensure_not_closing(&self) -> Result<(), CoreError> {
        if self.state == RecorderState::Closing {
            return Err(CoreError::RecorderClosed);
        }
        Ok(())
    }

    fn open_view_mut(&mut self) -> Result<&mut PageView, CoreError> {
        self.ensure_not_closing()?;
        let idx = self.open_view.ok_or(CoreError::NoOpenPageView)?;
        self.session
            .page_views
            .get_mut(idx)
            .ok_or(CoreError::NoOpenPageView)
    }

    /// Open the page view for this page load and append its path to the
    /// navigation path. Only one page view may be opened per page load.
    pub fn begin_page_view(
        &mut self,
        path: impl Into<String>,
        location: Location,
        now_ms: i64,
    ) -> Result<(), CoreError> {
        self.ensure_not_closing()?;
        if self.open_view.is_some() {
            return Err(CoreError::PageViewAlreadyOpen);
        }
        let path = path.into();
        self.session.page_views.push(PageView {
            path: path.clone(),
            timestamp: now_ms,
            time_spent: 0,
            scroll_depth: 0.0,
            device_info: self.session.device_info.clone(),
            location,
        });
        self.session.navigation_path.push(path);
        self.open_view = Some(self.session.page_views.len() - 1);
        self.session.last_active = self.session.last_active.max(now_ms);
        self.state = RecorderState::Viewing;
        Ok(())
    }

    /// Fold a scroll sample into the open page view and return the new depth.
    pub fn record_scroll(&mut self, sample: ScrollSample) -> Result<f64, CoreError> {
        let view = self.open_view_mut()?;
        view.scroll_depth = view.scroll_depth.max(sample.percent());
        Ok(view.scroll_depth)
    }

    /// Periodic tick: recompute time spent on the open page view.
    pub fn tick(&mut self, now_ms: i64) -> Result<(), CoreError> {
        let view = self.open_view_mut()?;
        view.time_spent = view.time_spent.max(now_ms - view.timestamp);
        self.session.last_active = self.session.last_active.max(now_ms);
        Ok(())
    }

    /// Append a click. Clicks are accepted before the page view opens.
    pub fn record_click(
        &mut self,
        path: impl Into<String>,
        target: ClickTarget,
        position: Position,
        now_ms: i64,
    ) -> Result<(), CoreError> {
        self.ensure_not_closing()?;
        self.session.clicks.push(ClickEvent {
            path: path.into(),
            timestamp: now_ms,
            element_id: target.element_id.unwrap_or_default(),
            element_text: target.element_text.unwrap_or_default(),
            position,
        });
        self.session.last_active = self.session.last_active.max(now_ms);
        Ok(())
    }

    /// Stop the tick, freeze time spent and produce the unload payloads.
    ///
    /// `referrer` is `document.referrer`; empty or absent becomes `"direct"`.
    pub fn close(
        &mut self,
        now_ms: i64,
        referrer: Option<&str>,
    ) -> Result<UnloadPayloads, CoreError> {
        self.ensure_not_closing()?;
        if self.open_view.is_some() {
            self.tick(now_ms)?;
        }
        self.session.last_active = self.session.last_active.max(now_ms);
        self.state = RecorderState::Closing;

        let elapsed_ms = (now_ms - self.session.start_time).max(0);
        let source = match referrer.map(str::trim) {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => "direct".to_string(),
        };

        Ok(UnloadPayloads {
            visit: VisitReport {
                duration: (elapsed_ms as f64 / 1000.0).round(),
                source,
                session_start_time: Some(self.session.start_time),
            },
            session: self.session.clone(),
        })
    }
}
