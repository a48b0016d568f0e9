use super::Context;
use anyhow::{bail, Context as _, Result};
use lexvox::redaction::{
    GestureEvent, GestureOutcome, ImageSources, Point, RedactionEditor,
};
use lexvox::storage;
use lexvox::uploads::{RecentUploads, UploadList, RECENT_UPLOADS_FILE};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

/// Displayed canvas size, `WxH`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl FromStr for DisplaySize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WxH, got '{}'", s))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|n| *n > 0.0)
                .ok_or_else(|| format!("invalid dimension '{}'", v))
        };
        Ok(Self {
            width: parse(w)?,
            height: parse(h)?,
        })
    }
}

/// One pointer drag from `from` to `to` in display coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drag {
    pub from: Point,
    pub to: Point,
}

impl FromStr for Drag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid coordinate in '{}': {}", s, e))?;
        match values.as_slice() {
            [x, y, x2, y2] => Ok(Self {
                from: Point::new(*x, *y),
                to: Point::new(*x2, *y2),
            }),
            _ => Err(format!("expected x,y,x2,y2, got '{}'", s)),
        }
    }
}

impl Drag {
    fn gestures(&self) -> [GestureEvent; 3] {
        [
            GestureEvent::Start(self.from),
            GestureEvent::Move(self.to),
            GestureEvent::End(self.to),
        ]
    }
}

pub async fn run(
    ctx: &Context,
    sources: &[String],
    display: Option<DisplaySize>,
    drags: &[Drag],
    out: Option<PathBuf>,
) -> Result<()> {
    let sources = ImageSources::from_locations(sources);
    // Zero display size maps 1:1 onto native pixels
    let displayed = display.map_or((0.0, 0.0), |d| (d.width, d.height));
    let client = reqwest::Client::new();

    let mut editor = RedactionEditor::open(&sources, &client, displayed).await;
    if let Some(e) = editor.load_error() {
        bail!("Cannot redact: {}", e);
    }

    for drag in drags {
        for event in drag.gestures() {
            match editor.handle(event) {
                GestureOutcome::Committed(rect) => println!(
                    "Redacting {:.0},{:.0} {:.0}x{:.0}",
                    rect.x, rect.y, rect.w, rect.h
                ),
                GestureOutcome::Discarded => {
                    warn!(?drag, "Rectangle below minimum size, skipped")
                }
                _ => {}
            }
        }
    }

    let source = editor.source().context("Image not loaded")?;
    let mut uploads = UploadList::new();
    uploads.add(source.to_upload());
    let original = source.name.clone();

    let artifact = editor.save()?;
    let path = out.unwrap_or_else(|| PathBuf::from(&artifact.name));
    std::fs::write(&path, &artifact.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!(
        "Saved {} ({} rectangles) to {}",
        artifact.name,
        editor.rects().len(),
        path.display()
    );

    let name = artifact.name.clone();
    uploads.replace(&original, artifact.into_upload());
    let mut recent = RecentUploads::load(storage::data_file(&ctx.prefs, RECENT_UPLOADS_FILE)?);
    if let Err(e) = recent.record(&name) {
        warn!(error = %e, "Could not update recent uploads");
    }
    for file in uploads.files() {
        println!("Attached: {} ({}, {} bytes)", file.name, file.mime_type, file.bytes.len());
    }
    Ok(())
}
