//! One pass from uploaded bytes to a rendered cloud.

use std::fmt;
use std::path::Path;

use rusttype::Font;

use crate::analyzer::{extract_nouns, MorphologicalAnalyzer, NounExtractor};
use crate::cloud::{CloudImage, FontRasterizer, WordCloud};
use crate::config::Config;
use crate::error::{CloudError, Result};
use crate::intake::{decode_mask, decode_text, MaskArray};
use crate::stopwords::StopWordSet;

/// Files submitted in one interaction
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub text: Option<Vec<u8>>,
    pub mask: Option<Vec<u8>>,
}

/// Non-fatal conditions reported next to the result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The mask could not be decoded; the cloud uses the full canvas.
    MaskIgnored(String),
    /// No word survived filtering; the canvas is blank.
    NothingToDisplay,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::MaskIgnored(reason) => {
                write!(f, "{} 마스크 없이 전체 캔버스에 생성했습니다.", reason)
            }
            Notice::NothingToDisplay => write!(
                f,
                "표시할 단어가 없습니다. 두 글자 이상의 명사가 없거나 모두 불용어입니다."
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rendered {
    pub image: CloudImage,
    /// Nouns fed to the renderer, before stop-word filtering
    pub noun_count: usize,
    pub notices: Vec<Notice>,
}

#[derive(Debug)]
pub enum PipelineOutcome {
    /// No text uploaded yet
    AwaitingText,
    Rendered(Rendered),
    Failed(CloudError),
}

pub struct Pipeline {
    extractor: Box<dyn NounExtractor>,
    cloud: WordCloud,
}

impl Pipeline {
    pub fn new(extractor: Box<dyn NounExtractor>, cloud: WordCloud) -> Self {
        Self { extractor, cloud }
    }

    /// Ko-dic analyzer, configured stop words and the given font.
    pub fn from_config(config: &Config, font: Font<'static>) -> anyhow::Result<Self> {
        let analyzer = MorphologicalAnalyzer::new()?;
        let stopwords = StopWordSet::with_extra(config.stopwords.extra.iter().cloned());
        let cloud = WordCloud::new(config.cloud.clone(), stopwords, Box::new(FontRasterizer::new(font)));
        Ok(Self::new(Box::new(analyzer), cloud))
    }

    #[tracing::instrument(skip_all, fields(text_bytes = tracing::field::Empty, mask_bytes = tracing::field::Empty))]
    pub fn run(&self, upload: Upload) -> PipelineOutcome {
        let Some(text_bytes) = upload.text else {
            tracing::debug!("No text uploaded");
            return PipelineOutcome::AwaitingText;
        };
        tracing::Span::current().record("text_bytes", text_bytes.len());

        let text = match decode_text(text_bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Rejected text upload: {}", e);
                return PipelineOutcome::Failed(e);
            }
        };

        let mut notices = Vec::new();
        let mask = upload.mask.and_then(|bytes| {
            tracing::Span::current().record("mask_bytes", bytes.len());
            let config = self.cloud.config();
            match decode_mask(&bytes, config.width, config.height) {
                Ok(mask) => Some(mask),
                Err(e) => {
                    tracing::warn!("Ignoring mask: {}", e);
                    notices.push(Notice::MaskIgnored(e.to_string()));
                    None
                }
            }
        });

        let (image, noun_count) = match self.render_text(&text, mask.as_ref()) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::error!("Noun extraction failed: {}", e);
                return PipelineOutcome::Failed(e);
            }
        };
        if image.is_blank() {
            notices.push(Notice::NothingToDisplay);
        }

        PipelineOutcome::Rendered(Rendered {
            image,
            noun_count,
            notices,
        })
    }

    /// Extract nouns from decoded text and render them.
    pub fn render_text(&self, text: &str, mask: Option<&MaskArray>) -> Result<(CloudImage, usize)> {
        let nouns = extract_nouns(self.extractor.as_ref(), text)?;
        tracing::debug!(chars = text.chars().count(), nouns = nouns.len(), "Extracted nouns");

        let image = self.cloud.generate(&nouns.joined(), mask);
        tracing::info!(
            nouns = nouns.len(),
            placed = image.placed().len(),
            masked = mask.is_some(),
            "Rendered word cloud"
        );
        Ok((image, nouns.len()))
    }
}

/// Read the files and run the pipeline once.
pub fn render_file(pipeline: &Pipeline, text_path: &Path, mask_path: Option<&Path>) -> Result<Rendered> {
    let upload = Upload {
        text: Some(std::fs::read(text_path)?),
        mask: mask_path.map(std::fs::read).transpose()?,
    };

    match pipeline.run(upload) {
        PipelineOutcome::Rendered(rendered) => Ok(rendered),
        PipelineOutcome::Failed(e) => Err(e),
        PipelineOutcome::AwaitingText => Err(CloudError::Render("no text to render".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::tests::WhitespaceNouns;
    use crate::cloud::tests::BlockRasterizer;
    use crate::config::CloudConfig;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn pipeline() -> Pipeline {
        let cloud = WordCloud::new(CloudConfig::default(), StopWordSet::new(), Box::new(BlockRasterizer));
        Pipeline::new(Box::new(WhitespaceNouns), cloud)
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut image = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        for y in height / 4..height * 3 / 4 {
            for x in width / 4..width * 3 / 4 {
                image.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn rendered(outcome: PipelineOutcome) -> Rendered {
        match outcome {
            PipelineOutcome::Rendered(r) => r,
            other => panic!("expected a rendered cloud, got {:?}", other),
        }
    }

    #[test]
    fn test_no_text_awaits_upload() {
        let outcome = pipeline().run(Upload {
            text: None,
            mask: Some(png(10, 10)),
        });
        assert!(matches!(outcome, PipelineOutcome::AwaitingText));
    }

    #[test]
    fn test_invalid_utf8_fails_without_rendering() {
        let outcome = pipeline().run(Upload {
            text: Some(vec![0xc0, 0xaf]),
            mask: None,
        });
        assert!(matches!(outcome, PipelineOutcome::Failed(CloudError::Decode(_))));
    }

    struct BrokenAnalyzer;

    impl NounExtractor for BrokenAnalyzer {
        fn nouns(&self, _text: &str) -> Result<Vec<String>> {
            Err(CloudError::Analysis("dictionary not loaded".to_string()))
        }
    }

    #[test]
    fn test_analysis_failure_is_reported_not_blank() {
        let cloud = WordCloud::new(CloudConfig::default(), StopWordSet::new(), Box::new(BlockRasterizer));
        let pipeline = Pipeline::new(Box::new(BrokenAnalyzer), cloud);

        let outcome = pipeline.run(Upload {
            text: Some("사과 바나나".as_bytes().to_vec()),
            mask: None,
        });

        match outcome {
            PipelineOutcome::Failed(CloudError::Analysis(reason)) => {
                assert_eq!(reason, "dictionary not loaded");
            }
            other => panic!("expected an analysis failure, got {:?}", other),
        }
    }

    #[test]
    fn test_stop_words_excluded_and_duplicates_counted() {
        let result = rendered(pipeline().run(Upload {
            text: Some("사과 바나나 바나나 그리고 사과".as_bytes().to_vec()),
            mask: None,
        }));

        let mut words: Vec<_> = result.image.placed().iter().map(|w| w.text.clone()).collect();
        words.sort();
        assert_eq!(words, vec!["바나나", "사과"]);
        assert_eq!(result.noun_count, 5);
        assert!(result.notices.is_empty());
    }

    #[test]
    fn test_single_character_nouns_give_blank_canvas() {
        let result = rendered(pipeline().run(Upload {
            text: Some("그 것 수".as_bytes().to_vec()),
            mask: None,
        }));

        assert_eq!(result.noun_count, 0);
        assert!(result.image.is_blank());
        assert_eq!((result.image.width(), result.image.height()), (800, 800));
        assert_eq!(result.notices, vec![Notice::NothingToDisplay]);
    }

    #[test]
    fn test_no_mask_uses_full_canvas() {
        let result = rendered(pipeline().run(Upload {
            text: Some("하늘 바다".as_bytes().to_vec()),
            mask: None,
        }));

        assert_eq!((result.image.width(), result.image.height()), (800, 800));
        assert_eq!(result.image.placed().len(), 2);
    }

    #[test]
    fn test_non_square_mask_is_resized_to_canvas() {
        let result = rendered(pipeline().run(Upload {
            text: Some("하늘 바다".as_bytes().to_vec()),
            mask: Some(png(320, 80)),
        }));

        assert_eq!((result.image.width(), result.image.height()), (800, 800));
        assert!(result.notices.is_empty());
        // The paintable region is the stretched centre rectangle
        for word in result.image.placed() {
            assert!(word.x >= 190 && word.x + word.width <= 610);
            assert!(word.y >= 190 && word.y + word.height <= 610);
        }
    }

    #[test]
    fn test_bad_mask_falls_back_to_full_canvas() {
        let result = rendered(pipeline().run(Upload {
            text: Some("하늘 바다".as_bytes().to_vec()),
            mask: Some(b"GIF89a broken".to_vec()),
        }));

        assert_eq!(result.image.placed().len(), 2);
        assert!(matches!(result.notices.as_slice(), [Notice::MaskIgnored(_)]));
    }

    #[test]
    fn test_render_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.txt");
        std::fs::write(&path, "하늘 하늘 바다").unwrap();

        let result = render_file(&pipeline(), &path, None).unwrap();
        assert_eq!(result.image.placed()[0].text, "하늘");
    }

    #[test]
    fn test_render_file_missing_mask_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.txt");
        std::fs::write(&path, "하늘").unwrap();

        let err = render_file(&pipeline(), &path, Some(&dir.path().join("missing.png"))).unwrap_err();
        assert!(matches!(err, CloudError::Io(_)));
    }
}
