//! 文本获取模块
//!
//! 负责把 PDF / TXT 源文件转换为原始文本。
//! PDF 提取采用双后端回退：优先 pdf-extract，失败或产出空文本时
//! 回退到 lopdf 的逐页提取。两个后端都失败时返回空字符串，
//! 由上层按"未找到题目"处理，不视为获取错误。

use crate::error::{AppError, AppResult};
use std::path::Path;
use tracing::{debug, warn};

/// 从源文件获取原始文本
///
/// # 参数
/// - `path`: 源文件路径，扩展名决定处理方式（仅支持 .pdf / .txt）
///
/// # 返回
/// 提取出的原始文本；文件类型不支持或文件不可读时返回错误
pub async fn acquire(path: &Path) -> AppResult<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "txt" => {
            debug!("📄 读取文本文件: {}", path.display());
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| AppError::acquisition_read_failed(path.display().to_string(), e))
        }
        "pdf" => {
            debug!("📄 读取PDF文件: {}", path.display());
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| AppError::acquisition_read_failed(path.display().to_string(), e))?;
            Ok(extract_pdf_text(&bytes))
        }
        _ => Err(AppError::unsupported_extension(extension)),
    }
}

/// 双后端 PDF 文本提取
///
/// 第一个产出非空文本的后端胜出。
pub fn extract_pdf_text(bytes: &[u8]) -> String {
    match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) if !text.trim().is_empty() => {
            debug!("✓ pdf-extract 提取到 {} 字符", text.chars().count());
            return text;
        }
        Ok(_) => warn!("⚠️ pdf-extract 返回空文本，尝试备用后端"),
        Err(e) => warn!("⚠️ pdf-extract 提取失败: {}，尝试备用后端", e),
    }

    match extract_with_lopdf(bytes) {
        Ok(text) if !text.trim().is_empty() => {
            debug!("✓ lopdf 提取到 {} 字符", text.chars().count());
            text
        }
        Ok(_) => {
            warn!("⚠️ 两个PDF后端都未提取到文本");
            String::new()
        }
        Err(e) => {
            warn!("⚠️ lopdf 提取失败: {}", e);
            String::new()
        }
    }
}

/// 备用后端：lopdf 逐页提取并拼接
fn extract_with_lopdf(bytes: &[u8]) -> anyhow::Result<String> {
    let doc = lopdf::Document::load_mem(bytes)?;
    let mut text = String::new();
    for (page_number, _) in doc.get_pages() {
        match doc.extract_text(&[page_number]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => debug!("第 {} 页提取失败: {}", page_number, e),
        }
    }
    Ok(text)
}
