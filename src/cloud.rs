//! Word-cloud layout and rasterisation.
//!
//! Words are placed largest first. Each one is rasterised, then put at the
//! free position closest to the canvas centre, where "free" is decided
//! against the ink of every word placed so far plus the masked-out pixels.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use image::{GrayImage, ImageFormat, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusttype::{point, Font, Scale};

use crate::config::CloudConfig;
use crate::error::{CloudError, Result};
use crate::intake::MaskArray;
use crate::stopwords::StopWordSet;

/// Samples of the viridis colormap
const PALETTE: &[[u8; 3]] = &[
    [68, 1, 84],
    [72, 35, 116],
    [64, 67, 135],
    [52, 94, 141],
    [41, 120, 142],
    [32, 144, 140],
    [34, 167, 132],
    [68, 190, 112],
    [121, 209, 81],
    [189, 222, 38],
];

/// Turns a word into a glyph coverage mask (0 = empty, 255 = full ink).
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, word: &str, size: u32) -> GrayImage;
}

/// Rasterizer backed by a TrueType/OpenType font
pub struct FontRasterizer {
    font: Font<'static>,
}

impl FontRasterizer {
    pub fn new(font: Font<'static>) -> Self {
        Self { font }
    }
}

impl Rasterizer for FontRasterizer {
    fn rasterize(&self, word: &str, size: u32) -> GrayImage {
        let scale = Scale::uniform(size as f32);
        let v_metrics = self.font.v_metrics(scale);
        let glyphs: Vec<_> = self
            .font
            .layout(word, scale, point(0.0, v_metrics.ascent))
            .collect();

        let advance = glyphs
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0);
        let width = glyphs
            .iter()
            .filter_map(|g| g.pixel_bounding_box())
            .map(|bb| bb.max.x)
            .fold(advance.ceil() as i32, i32::max)
            .max(0) as u32;
        let height = (v_metrics.ascent - v_metrics.descent).ceil().max(0.0) as u32;

        let mut canvas = GrayImage::new(width, height);
        for glyph in &glyphs {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|x, y, v| {
                let px = bb.min.x + x as i32;
                let py = bb.min.y + y as i32;
                if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                    let pixel = canvas.get_pixel_mut(px as u32, py as u32);
                    pixel.0[0] = pixel.0[0].max((v * 255.0).round() as u8);
                }
            });
        }

        trim(&canvas)
    }
}

/// Crop a coverage mask to its ink. No ink yields a 0x0 image.
fn trim(mask: &GrayImage) -> GrayImage {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, p) in mask.enumerate_pixels() {
        if p.0[0] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    match bounds {
        Some((x0, y0, x1, y1)) => {
            image::imageops::crop_imm(mask, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image()
        }
        None => GrayImage::new(0, 0),
    }
}

/// Count whitespace-separated words, drop stop words and keep the
/// `max_words` most frequent. Frequencies are relative to the top word;
/// ties keep order of first appearance.
pub fn word_frequencies(text: &str, stopwords: &StopWordSet, max_words: usize) -> Vec<(String, f32)> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (index, word) in text.split_whitespace().enumerate() {
        if stopwords.contains(word) {
            continue;
        }
        counts.entry(word).or_insert((0, index)).0 += 1;
    }

    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.truncate(max_words);

    let top = ranked.first().map(|(_, (count, _))| *count).unwrap_or(1) as f32;
    ranked
        .into_iter()
        .map(|(word, (count, _))| (word.to_string(), count as f32 / top))
        .collect()
}

/// A word as laid out on the canvas
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedWord {
    pub text: String,
    pub frequency: f32,
    pub font_size: u32,
    /// Top-left corner of the ink
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub vertical: bool,
    pub color: Rgb<u8>,
}

/// The rendered cloud
#[derive(Debug, Clone)]
pub struct CloudImage {
    image: RgbImage,
    placed: Vec<PlacedWord>,
}

impl CloudImage {
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn placed(&self) -> &[PlacedWord] {
        &self.placed
    }

    /// No word made it onto the canvas
    pub fn is_blank(&self) -> bool {
        self.placed.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.image)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_png()?)?;
        Ok(())
    }
}

pub(crate) fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| CloudError::Render(e.to_string()))?;
    Ok(bytes)
}

/// Word-cloud generator
pub struct WordCloud {
    config: CloudConfig,
    stopwords: StopWordSet,
    rasterizer: Box<dyn Rasterizer>,
}

impl WordCloud {
    pub fn new(config: CloudConfig, stopwords: StopWordSet, rasterizer: Box<dyn Rasterizer>) -> Self {
        Self {
            config,
            stopwords,
            rasterizer,
        }
    }

    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    /// Render `text` (whitespace-separated words). With a mask, the canvas
    /// takes the mask's dimensions and words stay off its white pixels.
    pub fn generate(&self, text: &str, mask: Option<&MaskArray>) -> CloudImage {
        let frequencies = word_frequencies(text, &self.stopwords, self.config.max_words);
        self.generate_from_frequencies(&frequencies, mask)
    }

    pub fn generate_from_frequencies(&self, frequencies: &[(String, f32)], mask: Option<&MaskArray>) -> CloudImage {
        let (width, height) = match mask {
            Some(m) => (m.width(), m.height()),
            None => (self.config.width, self.config.height),
        };

        let start_size = match self.config.max_font_size {
            Some(size) => size,
            None if frequencies.len() > 1 => {
                // Size the top word from a trial run with the two leading words
                let trial = self.layout(&frequencies[..2], height, width, height, mask);
                match trial.as_slice() {
                    [a, b, ..] => 2 * a.font_size * b.font_size / (a.font_size + b.font_size),
                    [a] => a.font_size,
                    [] => height,
                }
            }
            None => height,
        };

        let placed = self.layout(frequencies, start_size, width, height, mask);
        tracing::debug!(
            candidates = frequencies.len(),
            placed = placed.len(),
            start_size,
            "Laid out word cloud"
        );

        let [r, g, b] = self.config.background;
        let mut image = RgbImage::from_pixel(width, height, Rgb([r, g, b]));
        for word in &placed {
            let glyph = self.glyph(&word.text, word.font_size, word.vertical);
            blend(&mut image, &glyph, word.x, word.y, word.color);
        }

        CloudImage { image, placed }
    }

    fn glyph(&self, word: &str, size: u32, vertical: bool) -> GrayImage {
        let glyph = self.rasterizer.rasterize(word, size);
        if vertical {
            image::imageops::rotate270(&glyph)
        } else {
            glyph
        }
    }

    fn layout(
        &self,
        frequencies: &[(String, f32)],
        start_size: u32,
        width: u32,
        height: u32,
        mask: Option<&MaskArray>,
    ) -> Vec<PlacedWord> {
        let config = &self.config;
        let mut rng = StdRng::seed_from_u64(config.random_seed);
        let mut occupancy = Occupancy::new(width, height, mask);
        let mut placed = Vec::new();

        let min_size = config.min_font_size.max(1);
        let step = config.font_step.max(1);
        let rs = config.relative_scaling.clamp(0.0, 1.0);
        let mut font_size = start_size;
        let mut last_freq = 1.0f32;

        for (word, freq) in frequencies {
            if *freq <= 0.0 {
                continue;
            }
            if rs > 0.0 {
                font_size = ((rs * (freq / last_freq) + (1.0 - rs)) * font_size as f32).round() as u32;
            }

            let mut vertical = rng.gen::<f32>() >= config.prefer_horizontal;
            let mut tried_other_orientation = false;
            let mut found = None;

            while font_size >= min_size {
                let glyph = self.glyph(word, font_size, vertical);
                if glyph.width() > 0 && glyph.height() > 0 {
                    let box_w = glyph.width() + config.margin;
                    let box_h = glyph.height() + config.margin;
                    if let Some((x, y)) = occupancy.find_position(box_w, box_h) {
                        found = Some((glyph, x + config.margin / 2, y + config.margin / 2));
                        break;
                    }
                } else {
                    // Nothing to draw at any size
                    break;
                }

                if !tried_other_orientation && config.prefer_horizontal < 1.0 {
                    vertical = !vertical;
                    tried_other_orientation = true;
                } else {
                    font_size = font_size.saturating_sub(step);
                    vertical = false;
                    tried_other_orientation = false;
                }
            }

            if font_size < min_size {
                // The canvas is full
                break;
            }
            let Some((glyph, x, y)) = found else {
                continue;
            };

            occupancy.paint(&glyph, x, y);
            let [r, g, b] = PALETTE[rng.gen_range(0..PALETTE.len())];
            placed.push(PlacedWord {
                text: word.clone(),
                frequency: *freq,
                font_size,
                x,
                y,
                width: glyph.width(),
                height: glyph.height(),
                vertical,
                color: Rgb([r, g, b]),
            });
            last_freq = *freq;
        }

        placed
    }
}

/// Alpha-blend a coverage mask in `color` onto `image` at (x, y).
fn blend(image: &mut RgbImage, glyph: &GrayImage, x: u32, y: u32, color: Rgb<u8>) {
    for (gx, gy, coverage) in glyph.enumerate_pixels() {
        let alpha = coverage.0[0] as f32 / 255.0;
        if alpha == 0.0 {
            continue;
        }
        let (px, py) = (x + gx, y + gy);
        if px >= image.width() || py >= image.height() {
            continue;
        }
        let pixel = image.get_pixel_mut(px, py);
        for c in 0..3 {
            let mixed = pixel.0[c] as f32 * (1.0 - alpha) + color.0[c] as f32 * alpha;
            pixel.0[c] = mixed.round() as u8;
        }
    }
}

/// Pixel occupancy with a summed-area table for O(1) box queries
struct Occupancy {
    width: u32,
    height: u32,
    filled: Vec<bool>,
    /// (width + 1) x (height + 1), row-major; row 0 and column 0 are zero
    integral: Vec<u32>,
}

impl Occupancy {
    fn new(width: u32, height: u32, mask: Option<&MaskArray>) -> Self {
        let mut filled = vec![false; (width * height) as usize];
        if let Some(mask) = mask {
            for y in 0..height.min(mask.height()) {
                for x in 0..width.min(mask.width()) {
                    filled[(y * width + x) as usize] = mask.is_masked_out(x, y);
                }
            }
        }

        let mut occupancy = Self {
            width,
            height,
            filled,
            integral: vec![0; ((width + 1) * (height + 1)) as usize],
        };
        occupancy.refresh(0, 0);
        occupancy
    }

    fn at(&self, x: u32, y: u32) -> u32 {
        self.integral[(y * (self.width + 1) + x) as usize]
    }

    /// Recompute the table for every cell at or below-right of (x0, y0).
    fn refresh(&mut self, x0: u32, y0: u32) {
        let stride = self.width + 1;
        for y in y0..self.height {
            for x in x0..self.width {
                let here = self.filled[(y * self.width + x) as usize] as u32;
                let value = here + self.at(x + 1, y) + self.at(x, y + 1) - self.at(x, y);
                self.integral[((y + 1) * stride + x + 1) as usize] = value;
            }
        }
    }

    /// Number of occupied pixels in the box
    fn occupied(&self, x: u32, y: u32, w: u32, h: u32) -> u32 {
        (self.at(x + w, y + h) + self.at(x, y)) - (self.at(x + w, y) + self.at(x, y + h))
    }

    /// Free top-left position for a `w` x `h` box closest to the centre,
    /// scanning square rings outward.
    fn find_position(&self, w: u32, h: u32) -> Option<(u32, u32)> {
        if w == 0 || h == 0 || w > self.width || h > self.height {
            return None;
        }

        let max_x = (self.width - w) as i64;
        let max_y = (self.height - h) as i64;
        let (cx, cy) = (max_x / 2, max_y / 2);
        let reach = cx.max(max_x - cx).max(cy).max(max_y - cy);

        let free = |x: i64, y: i64| -> Option<(u32, u32)> {
            if x < 0 || y < 0 || x > max_x || y > max_y {
                return None;
            }
            let (x, y) = (x as u32, y as u32);
            (self.occupied(x, y, w, h) == 0).then_some((x, y))
        };

        for r in 0..=reach {
            if r == 0 {
                if let Some(p) = free(cx, cy) {
                    return Some(p);
                }
                continue;
            }
            for d in -r..=r {
                if let Some(p) = free(cx + d, cy - r).or_else(|| free(cx + d, cy + r)) {
                    return Some(p);
                }
            }
            for d in (-r + 1)..r {
                if let Some(p) = free(cx - r, cy + d).or_else(|| free(cx + r, cy + d)) {
                    return Some(p);
                }
            }
        }

        None
    }

    fn paint(&mut self, glyph: &GrayImage, x: u32, y: u32) {
        for (gx, gy, coverage) in glyph.enumerate_pixels() {
            let (px, py) = (x + gx, y + gy);
            if coverage.0[0] > 0 && px < self.width && py < self.height {
                self.filled[(py * self.width + px) as usize] = true;
            }
        }
        self.refresh(x, y);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Luma;
    use pretty_assertions::assert_eq;
    use unicode_segmentation::UnicodeSegmentation;

    /// Draws every character as a solid `size` x `size` square.
    pub(crate) struct BlockRasterizer;

    impl Rasterizer for BlockRasterizer {
        fn rasterize(&self, word: &str, size: u32) -> GrayImage {
            let chars = word.graphemes(true).count() as u32;
            GrayImage::from_pixel(chars * size, size, Luma([255]))
        }
    }

    fn cloud(width: u32, height: u32) -> WordCloud {
        let config = CloudConfig {
            width,
            height,
            ..CloudConfig::default()
        };
        WordCloud::new(config, StopWordSet::new(), Box::new(BlockRasterizer))
    }

    fn overlaps(a: &PlacedWord, b: &PlacedWord) -> bool {
        a.x < b.x + b.width && b.x < a.x + a.width && a.y < b.y + b.height && b.y < a.y + a.height
    }

    #[test]
    fn test_word_frequencies_counts_and_orders() {
        let freqs = word_frequencies("사과 바나나 바나나 그리고 사과 포도", &StopWordSet::new(), 200);

        assert_eq!(
            freqs,
            vec![
                ("사과".to_string(), 1.0),
                ("바나나".to_string(), 1.0),
                ("포도".to_string(), 0.5),
            ]
        );
    }

    #[test]
    fn test_word_frequencies_truncates() {
        let freqs = word_frequencies("가나 다라 다라 마바", &StopWordSet::empty(), 1);
        assert_eq!(freqs, vec![("다라".to_string(), 1.0)]);
    }

    #[test]
    fn test_word_frequencies_stop_words_case_sensitive() {
        let freqs = word_frequencies("The the cloud", &StopWordSet::new(), 200);
        let words: Vec<_> = freqs.iter().map(|(w, _)| w.as_str()).collect();
        assert_eq!(words, vec!["The", "cloud"]);
    }

    #[test]
    fn test_empty_text_renders_blank_canvas() {
        let result = cloud(800, 800).generate("", None);

        assert!(result.is_blank());
        assert_eq!((result.width(), result.height()), (800, 800));
        assert!(result.image().pixels().all(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn test_stop_word_only_text_renders_blank_canvas() {
        let result = cloud(800, 800).generate("그리고 하지만 위한 그리고", None);

        assert!(result.is_blank());
        assert_eq!((result.width(), result.height()), (800, 800));
    }

    #[test]
    fn test_equal_frequencies_get_similar_sizes() {
        let result = cloud(800, 800).generate("사과 바나나 바나나 그리고 사과", None);
        let words: Vec<_> = result.placed().iter().map(|w| w.text.as_str()).collect();

        assert_eq!(words, vec!["사과", "바나나"]);
        let (a, b) = (result.placed()[0].font_size, result.placed()[1].font_size);
        assert!(a.min(b) * 2 >= a.max(b), "sizes {} and {} differ too much", a, b);
    }

    #[test]
    fn test_more_frequent_words_are_not_smaller() {
        let result = cloud(400, 400).generate("하늘 하늘 하늘 하늘 바다 바다 구름", None);
        let sizes: Vec<_> = result.placed().iter().map(|w| (w.text.as_str(), w.font_size)).collect();

        assert_eq!(sizes.len(), 3);
        assert!(sizes[0].1 >= sizes[1].1);
        assert!(sizes[1].1 >= sizes[2].1);
    }

    #[test]
    fn test_words_do_not_overlap_and_stay_inside() {
        let text = "하늘 하늘 하늘 바다 바다 구름 구름 바람 별빛 달빛 노을 산책 여행 기차";
        let result = cloud(300, 300).generate(text, None);

        assert!(result.placed().len() > 3);
        for (i, a) in result.placed().iter().enumerate() {
            assert!(a.x + a.width <= 300 && a.y + a.height <= 300);
            for b in &result.placed()[i + 1..] {
                assert!(!overlaps(a, b), "{} overlaps {}", a.text, b.text);
            }
        }
    }

    #[test]
    fn test_first_word_is_centered() {
        let result = cloud(400, 400).generate("중심", None);
        let word = &result.placed()[0];

        let center_x = word.x + word.width / 2;
        let center_y = word.y + word.height / 2;
        assert!(center_x.abs_diff(200) <= 2);
        assert!(center_y.abs_diff(200) <= 2);
    }

    #[test]
    fn test_mask_restricts_placement() {
        // Only the left half is paintable
        let mut image = RgbImage::from_pixel(200, 200, Rgb([255, 255, 255]));
        for y in 0..200 {
            for x in 0..100 {
                image.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        let mask = MaskArray::from_image(image);

        let result = cloud(800, 800).generate("왼쪽 왼쪽 오른쪽 가운데 하나 두울", Some(&mask));

        assert_eq!((result.width(), result.height()), (200, 200));
        assert!(!result.is_blank());
        for word in result.placed() {
            assert!(word.x + word.width <= 100, "{} leaked into the masked area", word.text);
        }
    }

    #[test]
    fn test_fully_masked_canvas_is_blank() {
        let mask = MaskArray::from_image(RgbImage::from_pixel(100, 100, Rgb([255, 255, 255])));
        let result = cloud(800, 800).generate("사과 바나나", Some(&mask));

        assert!(result.is_blank());
        assert_eq!((result.width(), result.height()), (100, 100));
    }

    #[test]
    fn test_same_seed_same_layout() {
        let text = "하늘 하늘 바다 구름 바람 별빛";
        let a = cloud(300, 300).generate(text, None);
        let b = cloud(300, 300).generate(text, None);

        assert_eq!(a.placed(), b.placed());
    }

    #[test]
    fn test_ink_is_drawn() {
        let result = cloud(200, 200).generate("사과", None);
        assert!(result.image().pixels().any(|p| *p != Rgb([255, 255, 255])));
    }

    #[test]
    fn test_png_encoding() {
        let result = cloud(64, 64).generate("사과", None);
        let png = result.to_png().unwrap();

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 64));
    }

    #[test]
    fn test_occupancy_queries() {
        let mut occupancy = Occupancy::new(10, 10, None);
        assert_eq!(occupancy.occupied(0, 0, 10, 10), 0);

        occupancy.paint(&GrayImage::from_pixel(2, 3, Luma([255])), 4, 5);
        assert_eq!(occupancy.occupied(0, 0, 10, 10), 6);
        assert_eq!(occupancy.occupied(4, 5, 2, 3), 6);
        assert_eq!(occupancy.occupied(0, 0, 4, 10), 0);
        assert_eq!(occupancy.occupied(6, 0, 4, 10), 0);
    }

    #[test]
    fn test_find_position_prefers_centre() {
        let occupancy = Occupancy::new(100, 100, None);
        assert_eq!(occupancy.find_position(20, 10), Some((40, 45)));
        assert_eq!(occupancy.find_position(101, 10), None);
    }

    #[test]
    fn test_trim_crops_to_ink() {
        let mut mask = GrayImage::new(10, 10);
        mask.put_pixel(3, 4, Luma([200]));
        mask.put_pixel(5, 7, Luma([10]));

        let trimmed = trim(&mask);
        assert_eq!((trimmed.width(), trimmed.height()), (3, 4));
        assert_eq!(trim(&GrayImage::new(4, 4)).width(), 0);
    }

    #[test]
    fn test_font_rasterizer_draws_hangul() {
        let Ok(path) = std::env::var("HANGUL_CLOUD_TEST_FONT") else {
            return;
        };
        let font = crate::font::load_font(Path::new(&path)).unwrap();
        let glyph = FontRasterizer::new(font).rasterize("사과", 48);

        assert!(glyph.width() > 48);
        assert!(glyph.height() > 20 && glyph.height() <= 60);
    }
}
