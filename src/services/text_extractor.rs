//! PDF 文本提取服务 - 业务能力层
//!
//! 只负责"从 PDF 字节中取出文字"能力，不关心后续如何出题

use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, ExtractionError};

/// 从 PDF 字节中提取纯文本
///
/// 返回去掉首尾空白后的全文。以下情况返回 `ExtractionError`：
/// - 文件头不是 `%PDF`
/// - PDF 解析失败（包括解析库 panic）
/// - 没有任何可提取文字（扫描件、纯图片）
pub fn extract(pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
    if !pdf_bytes.starts_with(b"%PDF") {
        return Err(ExtractionError::NotPdf);
    }

    debug!("开始提取 PDF 文本，大小: {} 字节", pdf_bytes.len());

    // pdf-extract 遇到某些畸形文件会 panic
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(pdf_bytes))
        .map_err(|_| ExtractionError::Unreadable {
            reason: "PDF parser aborted on this document".to_string(),
        })?;

    let text = result.map_err(|e| {
        warn!("PDF 解析失败: {}", e);
        ExtractionError::Unreadable {
            reason: e.to_string(),
        }
    })?;

    let text = text.trim();
    if text.is_empty() {
        warn!("PDF 中没有可提取的文字");
        return Err(ExtractionError::NoText);
    }

    info!("✓ 提取到 {} 个字符", text.chars().count());
    Ok(text.to_string())
}

/// 读取 PDF 文件并提取文本
pub async fn extract_file(path: &Path) -> AppResult<String> {
    let bytes = tokio::fs::read(path).await?;
    extract(&bytes).map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Content;
    use lopdf::{dictionary, Document, Object, Stream};

    /// 构造一页不含任何文字的 PDF（模拟扫描件）
    fn blank_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content = Content { operations: vec![] };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {},
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_rejects_non_pdf_bytes() {
        let err = extract(b"hello world").unwrap_err();
        assert!(matches!(err, ExtractionError::NotPdf));
    }

    #[test]
    fn test_rejects_corrupted_pdf() {
        let err = extract(b"%PDF-1.4\nInvalid content without proper PDF structure").unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::Unreadable { .. } | ExtractionError::NoText
        ));
    }

    #[test]
    fn test_image_only_pdf_has_no_text() {
        let err = extract(&blank_pdf()).unwrap_err();
        assert!(matches!(err, ExtractionError::NoText));
    }

    #[tokio::test]
    async fn test_extract_file_missing() {
        let result = extract_file(Path::new("definitely/not/here.pdf")).await;
        assert!(matches!(result, Err(AppError::Io(_))));
    }
}
