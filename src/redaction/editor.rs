//! Redaction editor state machine
//!
//! Holds the loaded source, the committed rectangles and the gesture in
//! progress. Pointer positions arrive in displayed coordinates and are
//! mapped to native pixels before anything is stored.

use super::composite::composite;
use super::error::{LoadError, RedactionError};
use super::export::RedactedArtifact;
use super::geometry::{Point, Rect, ViewportScale};
use super::source::{self, ImageSources, SourceImage};
use image::RgbaImage;
use tracing::{debug, info};

/// Pointer input shared by mouse and touch
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    Start(Point),
    Move(Point),
    End(Point),
    Leave(Point),
}

/// Result of feeding one gesture event to the editor
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// No gesture in progress or no image loaded
    Ignored,
    Started,
    /// Base composite with the candidate rectangle overlaid
    Preview(RgbaImage),
    Committed(Rect),
    /// Gesture ended below the minimum size
    Discarded,
}

pub struct RedactionEditor {
    source: Result<SourceImage, LoadError>,
    scale: ViewportScale,
    rects: Vec<Rect>,
    anchor: Option<Point>,
}

impl RedactionEditor {
    /// Load the image and open an editor displayed at `displayed` size
    pub async fn open(
        sources: &ImageSources,
        client: &reqwest::Client,
        displayed: (f64, f64),
    ) -> Self {
        match source::load(sources, client).await {
            Ok(source) => Self::with_source(source, displayed),
            Err(e) => Self::failed(e),
        }
    }

    pub fn with_source(source: SourceImage, displayed: (f64, f64)) -> Self {
        let scale = ViewportScale::new(source.dimensions(), displayed);
        Self {
            source: Ok(source),
            scale,
            rects: Vec::new(),
            anchor: None,
        }
    }

    /// Editor whose source could not be loaded; every edit is ignored
    pub fn failed(error: LoadError) -> Self {
        Self {
            source: Err(error),
            scale: ViewportScale::identity(),
            rects: Vec::new(),
            anchor: None,
        }
    }

    pub fn load_error(&self) -> Option<&LoadError> {
        self.source.as_ref().err()
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref().ok()
    }

    /// Update the displayed size after a layout change
    pub fn set_display_size(&mut self, displayed: (f64, f64)) {
        if let Ok(source) = &self.source {
            self.scale = ViewportScale::new(source.dimensions(), displayed);
        }
    }

    pub fn handle(&mut self, event: GestureEvent) -> GestureOutcome {
        match event {
            GestureEvent::Start(p) => self.pointer_down(p),
            GestureEvent::Move(p) => self.pointer_move(p),
            GestureEvent::End(p) => self.pointer_up(p),
            GestureEvent::Leave(p) => self.pointer_leave(p),
        }
    }

    pub fn pointer_down(&mut self, p: Point) -> GestureOutcome {
        if self.source.is_err() {
            return GestureOutcome::Ignored;
        }
        self.anchor = Some(self.scale.to_native(p));
        GestureOutcome::Started
    }

    pub fn pointer_move(&mut self, p: Point) -> GestureOutcome {
        let (Some(anchor), Ok(source)) = (self.anchor, &self.source) else {
            return GestureOutcome::Ignored;
        };
        let candidate = Rect::from_corners(anchor, self.scale.to_native(p));
        GestureOutcome::Preview(composite(&source.image, &self.rects, Some(&candidate)))
    }

    pub fn pointer_up(&mut self, p: Point) -> GestureOutcome {
        let Some(anchor) = self.anchor.take() else {
            return GestureOutcome::Ignored;
        };
        let rect = Rect::from_corners(anchor, self.scale.to_native(p));
        if !rect.meets_minimum() {
            debug!("Rectangle too small ({:.0}x{:.0}), ignoring", rect.w, rect.h);
            return GestureOutcome::Discarded;
        }
        self.rects.push(rect);
        GestureOutcome::Committed(rect)
    }

    /// Pointer left the canvas; the gesture ends where it left
    pub fn pointer_leave(&mut self, p: Point) -> GestureOutcome {
        self.pointer_up(p)
    }

    pub fn is_drawing(&self) -> bool {
        self.anchor.is_some()
    }

    /// Remove the most recent rectangle
    pub fn undo(&mut self) -> Option<Rect> {
        self.rects.pop()
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Source with every committed rectangle, without preview
    pub fn render(&self) -> Option<RgbaImage> {
        self.source
            .as_ref()
            .ok()
            .map(|source| composite(&source.image, &self.rects, None))
    }

    /// Flatten all rectangles into the image and encode it
    pub fn save(&self) -> Result<RedactedArtifact, RedactionError> {
        let source = self.source.as_ref().map_err(|_| RedactionError::NotLoaded)?;
        let flattened = composite(&source.image, &self.rects, None);
        let artifact = RedactedArtifact::encode(&flattened, source.format, &source.name)?;
        info!(
            name = %artifact.name,
            rects = self.rects.len(),
            bytes = artifact.bytes.len(),
            "Redacted image saved"
        );
        Ok(artifact)
    }
}
