//! HTML rendering of the dashboard page.

use base64::engine::general_purpose::STANDARD;
use askama::Template;
use base64::Engine;
use image::imageops::FilterType;
use image::RgbImage;

use crate::intake::UploadKind;
use crate::pipeline::{PipelineOutcome, Rendered};

pub const TITLE: &str = "한글 워드클라우드 생성기";
pub const HEADING: &str = "☁️ 한글 워드클라우드 생성기 (마스크 + 형태소 분석)";
pub const DESCRIPTION: &str = "이 대시보드는 한글 텍스트를 업로드하고, 선택한 마스크 이미지에 맞춰 워드클라우드를 생성합니다.";
pub const TEXT_HINT: &str = "`.txt` 파일로 텍스트를 업로드하세요";
pub const MASK_HINT: &str = "`.png` 또는 `.jpg` 마스크 이미지를 업로드하면 해당 모양으로 클라우드가 생성됩니다";
pub const PROMPT: &str = "텍스트 파일을 업로드하면 여기에 워드클라우드가 생성됩니다!";
pub const RESULT_HEADING: &str = "생성된 워드클라우드";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    fn css_class(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

/// A message box shown above the result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub level: Level,
    pub message: String,
}

impl Status {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }
}

/// Everything drawn on one page view
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub statuses: Vec<Status>,
    /// PNG bytes of the cloud
    pub image: Option<Vec<u8>>,
    /// Hide the upload form (the pipeline cannot run)
    pub form_disabled: bool,
}

impl Page {
    /// Landing page before anything is uploaded
    pub fn prompt() -> Self {
        Self {
            statuses: vec![Status::info(PROMPT)],
            ..Self::default()
        }
    }

    /// The pipeline cannot run at all; show only the remediation message.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            statuses: vec![Status::error(message)],
            image: None,
            form_disabled: true,
        }
    }

    /// Page for one pipeline run. `display_size` is the edge length of the shown image.
    pub fn from_outcome(outcome: PipelineOutcome, display_size: u32) -> Self {
        match outcome {
            PipelineOutcome::AwaitingText => Self::prompt(),
            PipelineOutcome::Failed(e) => Self {
                statuses: vec![Status::error(e.to_string())],
                ..Self::default()
            },
            PipelineOutcome::Rendered(rendered) => Self::rendered(rendered, display_size),
        }
    }

    fn rendered(rendered: Rendered, display_size: u32) -> Self {
        let mut statuses: Vec<Status> = rendered
            .notices
            .iter()
            .map(|n| Status::warning(n.to_string()))
            .collect();

        let scaled = scale_for_display(rendered.image.image(), display_size);
        let image = match crate::cloud::encode_png(&scaled) {
            Ok(png) => Some(png),
            Err(e) => {
                tracing::error!("Failed to encode cloud: {}", e);
                statuses.push(Status::error(e.to_string()));
                None
            }
        };

        Self {
            statuses,
            image,
            form_disabled: false,
        }
    }
}

/// Resize for display with bilinear filtering. A zero size keeps the original.
pub fn scale_for_display(image: &RgbImage, size: u32) -> RgbImage {
    if size == 0 || (image.width() == size && image.height() == size) {
        return image.clone();
    }
    image::imageops::resize(image, size, size, FilterType::Triangle)
}

/// PNG bytes as a `data:` URI
pub fn data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// A piece of a hint line. Pieces written between backticks render as code.
struct HintPart {
    text: &'static str,
    code: bool,
}

fn hint_parts(hint: &'static str) -> Vec<HintPart> {
    hint.split('`')
        .enumerate()
        .map(|(i, text)| HintPart { text, code: i % 2 == 1 })
        .collect()
}

const STYLE: &str = "body{font-family:sans-serif;max-width:760px;margin:2rem auto;padding:0 1rem;color:#262730}\
.status{padding:.75rem 1rem;border-radius:.5rem;margin:1rem 0}\
.info{background:#e8f0fe;color:#0b3d91}.success{background:#e6f4ea;color:#137333}\
.warning{background:#fef7e0;color:#8a5300}.error{background:#fce8e6;color:#a50e0e}\
form label{display:block;margin:1rem 0 .25rem}\
img.cloud{width:100%;height:auto;display:block}";

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="ko">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{{ title }}</title>
    <style>{{ style|safe }}</style>
  </head>
  <body>
    <h1>{{ heading }}</h1>
    <p>{{ description }}</p>
    <ul>
      <li>{% for part in text_hint %}{% if part.code %}<code>{{ part.text }}</code>{% else %}{{ part.text }}{% endif %}{% endfor %}</li>
      <li>{% for part in mask_hint %}{% if part.code %}<code>{{ part.text }}</code>{% else %}{{ part.text }}{% endif %}{% endfor %}</li>
    </ul>
    {% if !page.form_disabled %}
    <form method="post" action="/" enctype="multipart/form-data">
      <label for="text">📂 텍스트 파일 (.txt)을 업로드하세요</label>
      <input type="file" id="text" name="text" accept="{{ text_accept }}">
      <label for="mask">🖼 마스크 이미지 업로드 (선택 사항, PNG/JPG)</label>
      <input type="file" id="mask" name="mask" accept="{{ mask_accept }}">
      <p><button type="submit">생성</button></p>
    </form>
    {% endif %}
    {% for status in page.statuses %}
    <div class="status {{ status.level.css_class() }}">{{ status.message }}</div>
    {% endfor %}
    {% match image_uri %}
    {% when Some with (uri) %}
    <h3>{{ result_heading }}</h3>
    <img class="cloud" alt="{{ result_heading }}" src="{{ uri|safe }}">
    {% when None %}
    {% endmatch %}
  </body>
</html>"#,
    ext = "html"
)]
struct PageTemplate<'a> {
    title: &'a str,
    heading: &'a str,
    description: &'a str,
    text_hint: Vec<HintPart>,
    mask_hint: Vec<HintPart>,
    text_accept: String,
    mask_accept: String,
    style: &'a str,
    result_heading: &'a str,
    page: &'a Page,
    /// Base64 `data:` URI; contains no markup characters
    image_uri: Option<String>,
}

/// Render the whole dashboard page.
pub fn render_page(page: &Page) -> String {
    let template = PageTemplate {
        title: TITLE,
        heading: HEADING,
        description: DESCRIPTION,
        text_hint: hint_parts(TEXT_HINT),
        mask_hint: hint_parts(MASK_HINT),
        text_accept: UploadKind::Text.accept_attr(),
        mask_accept: UploadKind::Mask.accept_attr(),
        style: STYLE,
        result_heading: RESULT_HEADING,
        page,
        image_uri: page.image.as_deref().map(data_uri),
    };

    template.render().unwrap_or_else(|e| {
        tracing::error!("Failed to render page: {}", e);
        format!("<!DOCTYPE html>\n<title>{}</title>\n<p>페이지를 표시할 수 없습니다.</p>\n", TITLE)
    })
}

/// Emit statuses as log lines, for surfaces without a page.
pub fn log_statuses(statuses: &[Status]) {
    for status in statuses {
        match status.level {
            Level::Info | Level::Success => tracing::info!("{}", status.message),
            Level::Warning => tracing::warn!("{}", status.message),
            Level::Error => tracing::error!("{}", status.message),
        }
    }
}
