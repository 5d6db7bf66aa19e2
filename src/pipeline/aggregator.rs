//! Page Text Aggregation
//!
//! The rasterizer does not report which files it wrote, so the page list is
//! rebuilt from the workspace listing, ordered, and recognized one page at a
//! time. The first page that fails aborts the whole document.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OcrPdfError;
use crate::ocr::OcrService;

/// Extension of rasterized page images
pub const PAGE_EXTENSION: &str = "png";

/// Separator appended after every page's text
pub const PAGE_SEPARATOR: &str = "\n\n";

/// How page images are put back into document order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrdering {
    /// By the page number in the file name, then by file name.
    /// `page-2.png` comes before `page-10.png`.
    #[default]
    Numeric,
    /// Plain file name order. `page-10.png` comes before `page-2.png`
    /// unless the rasterizer zero-pads its numbers.
    #[serde(rename = "lexical")]
    Lexicographic,
}

impl FromStr for PageOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "numeric" => Ok(Self::Numeric),
            "lexical" | "lexicographic" => Ok(Self::Lexicographic),
            other => Err(format!(
                "unknown page order '{}', expected numeric or lexical",
                other
            )),
        }
    }
}

/// List `<prefix>-*.png` files in `dir`, in document order
pub async fn list_page_images(
    dir: &Path,
    prefix: &str,
    ordering: PageOrdering,
) -> std::io::Result<Vec<PathBuf>> {
    let stem = format!("{}-", prefix);
    let mut names = Vec::new();

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_page = name.starts_with(&stem)
            && Path::new(&name)
                .extension()
                .is_some_and(|ext| ext == PAGE_EXTENSION);
        if is_page && entry.file_type().await?.is_file() {
            names.push(name);
        }
    }

    match ordering {
        PageOrdering::Lexicographic => names.sort(),
        PageOrdering::Numeric => names.sort_by(|a, b| compare_numeric(a, b, &stem)),
    }

    Ok(names.into_iter().map(|name| dir.join(name)).collect())
}

/// Page number between `<prefix>-` and `.png`, if it is all digits
fn page_number(name: &str, stem: &str) -> Option<u64> {
    name.strip_prefix(stem)?
        .strip_suffix(PAGE_EXTENSION)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

fn compare_numeric(a: &str, b: &str, stem: &str) -> Ordering {
    // Unnumbered names sort after numbered ones
    let key = |name: &str| {
        let n = page_number(name, stem);
        (n.is_none(), n.unwrap_or(0))
    };
    key(a).cmp(&key(b)).then_with(|| a.cmp(b))
}

/// OCR every page image in `dir` and join the results.
///
/// Each page's text is followed by a blank line; the joined text is trimmed.
/// Pages are processed strictly in order and the first failure is returned
/// with the failing file's path. Zero pages yields an empty string.
pub async fn aggregate(
    dir: &Path,
    prefix: &str,
    ordering: PageOrdering,
    ocr: &OcrService,
) -> Result<String, OcrPdfError> {
    let pages = list_page_images(dir, prefix, ordering)
        .await
        .map_err(OcrPdfError::PageListing)?;
    tracing::info!(pages = pages.len(), "Running OCR on rasterized pages");

    let mut text = String::new();
    for (index, path) in pages.iter().enumerate() {
        let page_text = ocr.recognize(path).await.map_err(|source| OcrPdfError::Ocr {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(page = index + 1, chars = page_text.len(), "Page OCR complete");

        text.push_str(&page_text);
        text.push_str(PAGE_SEPARATOR);
    }

    Ok(text.trim().to_string())
}
