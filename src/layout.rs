//! Flipbook sizing for the public reader.
//!
//! Pages keep the magazine's 480:700 aspect ratio. Desktop viewports show a
//! two-page spread; viewports narrower than 768 px show one page, sized from
//! the width in portrait and from the height in landscape. Either way the page never
//! takes more than 85 % of the viewport height.
//!
//! The flipbook widget cannot change its page size in place once pages are
//! laid out for a different orientation or spread mode, so
//! [`LayoutTracker`] tells the host whether a viewport change needs a plain
//! resize or a rebuild of the widget (keeping the current page).

use serde::{Deserialize, Serialize};

/// Natural page width in CSS pixels.
pub const PAGE_WIDTH: u32 = 480;
/// Natural page height in CSS pixels.
pub const PAGE_HEIGHT: u32 = 700;
/// Viewports narrower than this are treated as mobile.
pub const MOBILE_BREAKPOINT: u32 = 768;

const ASPECT: f64 = PAGE_WIDTH as f64 / PAGE_HEIGHT as f64;
const DESKTOP_WIDTH_SHARE: f64 = 0.9;
const MOBILE_WIDTH_SHARE: f64 = 0.95;
const HEIGHT_SHARE: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Pages shown side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spread {
    Single,
    Double,
}

/// The browser viewport as reported by resize/orientation events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    /// Orientation reported by the device, if any.
    pub orientation: Option<Orientation>,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            orientation: None,
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    /// Reported orientation, else derived from the aspect of the viewport.
    pub fn orientation(&self) -> Orientation {
        self.orientation.unwrap_or(if self.height >= self.width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        })
    }

    pub fn is_mobile(&self) -> bool {
        self.width < MOBILE_BREAKPOINT
    }
}

/// Size of one flipbook page plus how pages are arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderLayout {
    pub page_width: u32,
    pub page_height: u32,
    pub spread: Spread,
    pub orientation: Orientation,
    pub mobile: bool,
}

impl ReaderLayout {
    /// Width of the whole book on screen.
    pub fn book_width(&self) -> u32 {
        match self.spread {
            Spread::Single => self.page_width,
            Spread::Double => self.page_width * 2,
        }
    }
}

/// Compute the flipbook page size for `viewport`.
pub fn compute_layout(viewport: Viewport) -> ReaderLayout {
    let orientation = viewport.orientation();
    let mobile = viewport.is_mobile();
    let max_height = viewport.height as f64 * HEIGHT_SHARE;

    let (spread, width) = match (mobile, orientation) {
        (false, _) => (
            Spread::Double,
            (viewport.width as f64 * DESKTOP_WIDTH_SHARE / 2.0).min(PAGE_WIDTH as f64),
        ),
        (true, Orientation::Portrait) => (Spread::Single, viewport.width as f64 * MOBILE_WIDTH_SHARE),
        (true, Orientation::Landscape) => (Spread::Single, max_height * ASPECT),
    };

    let (width, height) = if width / ASPECT > max_height {
        (max_height * ASPECT, max_height)
    } else {
        (width, width / ASPECT)
    };

    ReaderLayout {
        page_width: (width.floor() as u32).max(1),
        page_height: (height.floor() as u32).max(1),
        spread,
        orientation,
        mobile,
    }
}

/// What the host must do after a viewport change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutChange {
    /// Same layout as before.
    Unchanged,
    /// Same orientation and spread; resize the existing widget.
    Resize(ReaderLayout),
    /// First layout, or orientation/spread changed: recreate the widget at
    /// the current page.
    Rebuild(ReaderLayout),
}

/// Remembers the last layout and classifies viewport changes.
#[derive(Debug, Default, Clone)]
pub struct LayoutTracker {
    current: Option<ReaderLayout>,
}

impl LayoutTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<ReaderLayout> {
        self.current
    }

    pub fn update(&mut self, viewport: Viewport) -> LayoutChange {
        let next = compute_layout(viewport);
        let change = match self.current {
            Some(prev) if prev == next => LayoutChange::Unchanged,
            Some(prev) if prev.orientation == next.orientation && prev.spread == next.spread => {
                LayoutChange::Resize(next)
            }
            _ => LayoutChange::Rebuild(next),
        };
        self.current = Some(next);
        change
    }
}
