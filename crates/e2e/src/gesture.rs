//! Drag-and-drop gesture simulation
//!
//! Gestures are raw pointer sequences: resolve the bounding boxes up front,
//! move to the source center, press, travel through any waypoints, release
//! over the target. Committed board state only changes on release over a
//! valid target; a press-and-hover with no release must leave it untouched.

use serde::Deserialize;

use crate::driver::BrowserBridge;
use crate::error::E2eResult;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Element geometry as reported by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    /// A point `dy` below the element, horizontally centered.
    pub fn below(&self, dy: f64) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height + dy,
        }
    }
}

/// Pointer gestures against the current page.
pub struct Gestures<'a> {
    bridge: &'a BrowserBridge,
}

impl<'a> Gestures<'a> {
    pub fn new(bridge: &'a BrowserBridge) -> Self {
        Self { bridge }
    }

    /// Drag the element at `source` onto `target` and release.
    pub async fn drag(&self, source: &str, target: &str) -> E2eResult<()> {
        self.drag_via(source, &[], target).await
    }

    /// Drag `source` through each waypoint, then release over `target`.
    /// All boxes are resolved before the pointer moves; mid-drag layout
    /// shifts must not redirect the gesture.
    pub async fn drag_via(&self, source: &str, via: &[String], target: &str) -> E2eResult<()> {
        let from = self.bridge.bounding_box(source).await?.center();
        let mut path = Vec::with_capacity(via.len() + 1);
        for waypoint in via {
            path.push(self.bridge.bounding_box(waypoint).await?.center());
        }
        path.push(self.bridge.bounding_box(target).await?.center());

        self.bridge.mouse_move(from.x, from.y).await?;
        self.bridge.mouse_down().await?;
        for point in path {
            // two moves per stop so dragover fires even if one collapses
            // into a single frame
            self.bridge.mouse_move(point.x, point.y).await?;
            self.bridge.mouse_move(point.x, point.y).await?;
        }
        self.bridge.mouse_up().await
    }

    /// Press on `source`, drift just below it and never release. Models a
    /// drag that hovers without a discrete drop.
    pub async fn hover_below(&self, source: &str, dy: f64) -> E2eResult<()> {
        let source_box = self.bridge.bounding_box(source).await?;
        let from = source_box.center();
        let hover = source_box.below(dy);

        self.bridge.mouse_move(from.x, from.y).await?;
        self.bridge.mouse_down().await?;
        self.bridge.mouse_move(hover.x, hover.y).await?;
        self.bridge.mouse_move(hover.x, hover.y).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0.0, 0.0, 100.0, 40.0, 50.0, 20.0; "at origin")]
    #[test_case(10.0, 30.0, 80.0, 20.0, 50.0, 40.0; "offset box")]
    fn center_is_box_midpoint(x: f64, y: f64, w: f64, h: f64, cx: f64, cy: f64) {
        let center = BoundingBox {
            x,
            y,
            width: w,
            height: h,
        }
        .center();
        assert_eq!(center, Point { x: cx, y: cy });
    }

    #[test]
    fn below_clears_the_element() {
        let card = BoundingBox {
            x: 10.0,
            y: 30.0,
            width: 80.0,
            height: 20.0,
        };
        let point = card.below(20.0);
        assert_eq!(point, Point { x: 50.0, y: 70.0 });
        assert!(point.y > card.y + card.height);
    }
}
