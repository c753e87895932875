//! Error kinds surfaced by the word-cloud pipeline.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CloudError {
    /// The font could not be found locally nor fetched from its source.
    #[error("폰트 파일을 사용할 수 없습니다 ({path}): {reason}. {}", download_hint(.url))]
    AssetUnavailable {
        path: PathBuf,
        url: String,
        reason: String,
    },

    /// Uploaded text is not valid UTF-8.
    #[error("텍스트 파일을 UTF-8로 읽을 수 없습니다: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    /// Uploaded mask is not a supported image.
    #[error("마스크 이미지를 읽을 수 없습니다: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Morphological analysis failed on the uploaded text.
    #[error("형태소 분석에 실패했습니다: {0}")]
    Analysis(String),

    #[error("워드클라우드 렌더링 실패: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn download_hint(url: &str) -> String {
    if url.is_empty() {
        "한글 폰트(.ttf)를 직접 내려받아 해당 경로에 저장한 뒤 다시 실행하세요.".to_string()
    } else {
        format!("{} 에서 직접 내려받아 해당 경로에 저장한 뒤 다시 실행하세요.", url)
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
