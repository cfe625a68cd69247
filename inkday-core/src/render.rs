//! Frame composition.
//!
//! Produces the monochrome 800x480 frame and the `DisplayState` describing it.
//! Layout from top to bottom: date line, weather panel, up to three event
//! rows, an overflow marker and the footer.

use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use chrono::DateTime;
use chrono_tz::Tz;
use image::{GrayImage, ImageFormat, Luma};
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut, text_size,
};
use imageproc::rect::Rect;

use crate::agenda::{AgendaDay, AgendaView};
use crate::error::{InkdayError, InkdayResult};
use crate::state::{DisplayState, EventState};
use crate::weather::{WeatherState, clock_label};

pub const FRAME_WIDTH: u32 = 800;
pub const FRAME_HEIGHT: u32 = 480;

const BLACK: Luma<u8> = Luma([0]);
const WHITE: Luma<u8> = Luma([255]);

const EVENTS_TOP: i32 = 235;
const EVENT_X: i32 = 20;
const EVENT_WIDTH: u32 = 760;
const EVENT_HEIGHT: u32 = 62;
const BORDER: u32 = 4;
/// Rows overlap by half a border so neighbouring outlines merge
const EVENT_STEP: i32 = (EVENT_HEIGHT - BORDER / 2) as i32;
const TIME_COLUMN: i32 = 160;
const ALL_DAY_BAND: u32 = 145;

/// Fonts tried when none is configured.
static FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
];

/// A finished frame, white background with black ink.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame(GrayImage);

impl Frame {
    pub fn blank() -> Self {
        Frame(GrayImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, WHITE))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn image(&self) -> &GrayImage {
        &self.0
    }

    /// Write the frame as PNG, creating parent directories.
    pub fn save(&self, path: &Path) -> InkdayResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.0
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| InkdayError::Render(format!("Failed to write {}: {e}", path.display())))
    }
}

pub struct Renderer {
    font: Option<FontVec>,
}

impl Renderer {
    /// Load the font at `font_path`, or the first system font found.
    ///
    /// Without any font the frame still carries the layout boxes.
    pub fn new(font_path: Option<&Path>) -> InkdayResult<Self> {
        if let Some(path) = font_path {
            return Ok(Renderer {
                font: Some(load_font(path)?),
            });
        }

        let font = FALLBACK_FONTS
            .iter()
            .map(PathBuf::from)
            .filter(|p| p.exists())
            .find_map(|p| load_font(&p).ok());
        if font.is_none() {
            tracing::warn!("no usable font found, frames are drawn without text");
        }
        Ok(Renderer { font })
    }

    pub fn without_text() -> Self {
        Renderer { font: None }
    }

    /// Draw the frame for `view` and describe it.
    pub fn compose(
        &self,
        now: DateTime<Tz>,
        view: &AgendaView,
        weather: Option<&WeatherState>,
    ) -> (DisplayState, Frame) {
        let mut canvas = Canvas {
            image: GrayImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, WHITE),
            font: self.font.as_ref(),
        };

        let date_label = now.format("%A, %b %-d").to_string();
        canvas.text(10, 0, 36.0, &date_label, BLACK);

        if let Some(weather) = weather {
            canvas.weather(weather);
        }

        let events: Vec<EventState> = view
            .rendered
            .iter()
            .map(|event| EventState::from_event(event, now))
            .collect();

        let mut y = EVENTS_TOP;
        for event in &events {
            canvas.event_row(y, event);
            y += EVENT_STEP;
        }

        if view.overflow > 0 {
            canvas.border(Rect::at(200, y).of_size(240, 46));
            canvas.text_centered(320, y + 23, 26.0, &format!("{} more...", view.overflow));
        }

        let footer = view.footer();
        match view.day {
            AgendaDay::Empty => canvas.text_centered(400, 330, 26.0, &footer),
            AgendaDay::Today | AgendaDay::Tomorrow => canvas.text_bottom_right(785, 470, 26.0, &footer),
        }

        let state = DisplayState {
            date_label,
            weather: weather.cloned(),
            events,
            overflow: view.overflow,
            total_count: view.total_count,
            footer,
        };
        (state, Frame(canvas.image))
    }
}

fn load_font(path: &Path) -> InkdayResult<FontVec> {
    let bytes = std::fs::read(path)?;
    FontVec::try_from_vec(bytes)
        .map_err(|e| InkdayError::Render(format!("Invalid font {}: {e}", path.display())))
}

struct Canvas<'a> {
    image: GrayImage,
    font: Option<&'a FontVec>,
}

impl Canvas<'_> {
    fn text(&mut self, x: i32, y: i32, size: f32, text: &str, color: Luma<u8>) {
        if let Some(font) = self.font {
            draw_text_mut(&mut self.image, color, x, y, PxScale::from(size), font, text);
        }
    }

    fn measure(&self, size: f32, text: &str) -> (i32, i32) {
        match self.font {
            Some(font) => {
                let (w, h) = text_size(PxScale::from(size), font, text);
                (w as i32, h as i32)
            }
            None => (0, 0),
        }
    }

    fn text_centered(&mut self, cx: i32, cy: i32, size: f32, text: &str) {
        let (w, h) = self.measure(size, text);
        self.text(cx - w / 2, cy - h / 2, size, text, BLACK);
    }

    fn text_bottom_right(&mut self, right: i32, bottom: i32, size: f32, text: &str) {
        let (w, h) = self.measure(size, text);
        self.text(right - w, bottom - h, size, text, BLACK);
    }

    /// Draw `text` vertically centred on `cy`, left edge at `x` or right edge at `x` when `right_aligned`.
    fn text_in_row(&mut self, x: i32, cy: i32, text: &str, color: Luma<u8>, right_aligned: bool) {
        let (w, h) = self.measure(30.0, text);
        let left = if right_aligned { x - w } else { x };
        self.text(left, cy - h / 2, 30.0, text, color);
    }

    fn border(&mut self, rect: Rect) {
        for t in 0..BORDER {
            let w = rect.width().saturating_sub(2 * t);
            let h = rect.height().saturating_sub(2 * t);
            if w > 0 && h > 0 {
                let inner = Rect::at(rect.left() + t as i32, rect.top() + t as i32).of_size(w, h);
                draw_hollow_rect_mut(&mut self.image, inner, BLACK);
            }
        }
    }

    /// Shorten `title` with an ellipsis until it fits `max_width`.
    fn fit(&self, title: &str, max_width: i32) -> String {
        let title = title.trim();
        if self.measure(30.0, title).0 <= max_width {
            return title.to_string();
        }

        let mut chars: Vec<char> = title.chars().collect();
        while !chars.is_empty() {
            chars.pop();
            let candidate = format!("{}...", chars.iter().collect::<String>().trim_end());
            if self.measure(30.0, &candidate).0 <= max_width {
                return candidate;
            }
        }
        "...".to_string()
    }

    fn event_row(&mut self, y: i32, event: &EventState) {
        let rect = Rect::at(EVENT_X, y).of_size(EVENT_WIDTH, EVENT_HEIGHT);
        let cy = y + EVENT_HEIGHT as i32 / 2;
        let title = self.fit(&event.title, EVENT_WIDTH as i32 - TIME_COLUMN - 15);

        if event.all_day {
            // Thin outline with a solid time column
            draw_hollow_rect_mut(&mut self.image, rect, BLACK);
            let band = Rect::at(EVENT_X, y).of_size(ALL_DAY_BAND, EVENT_HEIGHT);
            draw_filled_rect_mut(&mut self.image, band, BLACK);
            self.text_in_row(EVENT_X + ALL_DAY_BAND as i32 - 15, cy, "All day", WHITE, true);
            self.text_in_row(EVENT_X + TIME_COLUMN, cy, &title, BLACK, false);
        } else if event.in_progress {
            draw_filled_rect_mut(&mut self.image, rect, BLACK);
            self.text_in_row(EVENT_X + 30, cy, &title, WHITE, false);
            let end = clock_label(event.end);
            self.text_in_row(EVENT_X + EVENT_WIDTH as i32 - 20, cy, &end, WHITE, true);
        } else {
            self.border(rect);
            let start = clock_label(event.start);
            self.text_in_row(EVENT_X + TIME_COLUMN - 20, cy, &start, BLACK, true);
            self.text_in_row(EVENT_X + TIME_COLUMN, cy, &title, BLACK, false);
        }
    }

    fn weather(&mut self, weather: &WeatherState) {
        self.text(170, 70, 58.0, &format!("{}°", weather.feels_like), BLACK);
        self.text(270, 60, 30.0, &format!("H {}°", weather.high), BLACK);
        self.text(270, 120, 30.0, &format!("L {}°", weather.low), BLACK);
        self.text(400, 60, 30.0, &weather.sunrise, BLACK);
        self.text(400, 120, 30.0, &weather.sunset, BLACK);
        self.text(170, 185, 30.0, &format!("{}% rain", weather.precip_percent), BLACK);
        self.text(370, 185, 30.0, &format!("{}% hum", weather.humidity_percent), BLACK);
        self.text(640, 160, 26.0, &format!("Bft {}", weather.beaufort), BLACK);

        self.wind_arrow(610, 110, 28.0, weather.wind_dir);
    }

    /// Arrow pointing where the wind blows to, `degrees` being where it comes from.
    fn wind_arrow(&mut self, cx: i32, cy: i32, radius: f32, degrees: i64) {
        let heading = (degrees as f32 + 180.0).to_radians();
        let (dx, dy) = (heading.sin() * radius, -heading.cos() * radius);
        let (cx, cy) = (cx as f32, cy as f32);
        let tip = (cx + dx, cy + dy);

        draw_line_segment_mut(&mut self.image, (cx - dx, cy - dy), tip, BLACK);
        for side in [-0.5_f32, 0.5] {
            let wing = heading + std::f32::consts::PI + side;
            let end = (tip.0 + wing.sin() * radius / 2.0, tip.1 - wing.cos() * radius / 2.0);
            draw_line_segment_mut(&mut self.image, tip, end, BLACK);
        }
    }
}
