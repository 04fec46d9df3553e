// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene continuity.
//!
//! Consecutive nodes set in the same location share one scene heading. A
//! heading is printed when the location changes, and the scene counter only
//! advances when one is printed.

use storyweave_graph::SceneForm;

/// A heading emitted for a new scene
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneHeading {
    /// 1-based scene number
    pub number: usize,
    /// `"{scene_type} {name}"` with `" - {time}"` when a time is set
    pub text: String,
}

/// Tracks the current location while walking a sequence
#[derive(Debug, Clone, Default)]
pub struct SceneTracker {
    last_location: String,
    emitted: usize,
}

impl SceneTracker {
    /// Create a tracker at scene 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Heading for `form`, if it opens a new scene.
    ///
    /// Placeholder locations (`INT.`/`EXT.` with no name) never produce a
    /// heading and do not reset continuity.
    pub fn heading(&mut self, form: &SceneForm) -> Option<SceneHeading> {
        let location = form.location();
        if form.has_placeholder_location() || location == self.last_location {
            return None;
        }

        let mut text = format!("{} {}", form.scene_type, form.name);
        if !form.time_description.is_empty() {
            text.push_str(" - ");
            text.push_str(&form.time_description);
        }

        self.last_location = location;
        self.emitted += 1;
        Some(SceneHeading {
            number: self.emitted,
            text,
        })
    }

    /// Number of headings emitted so far
    pub fn scenes(&self) -> usize {
        self.emitted
    }
}
