use crate::models::exam_sheet::ExamSheet;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载一张试卷
pub async fn load_exam_sheet(toml_file_path: &Path) -> Result<ExamSheet> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let sheet: ExamSheet = toml::from_str(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    Ok(sheet.with_file_path(toml_file_path.to_string_lossy().to_string()))
}

/// 从文件夹中加载所有试卷 TOML 文件（按文件名排序）
///
/// 单个文件解析失败只记录警告，不影响其他文件
pub async fn load_all_exam_sheets(folder_path: &str) -> Result<Vec<ExamSheet>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut toml_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    toml_files.sort();

    let mut sheets = Vec::with_capacity(toml_files.len());
    for path in toml_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_exam_sheet(&path).await {
            Ok(sheet) => {
                tracing::info!("成功加载 {} 道待录入题目", sheet.draft_count());
                sheets.push(sheet);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {:#}", path.display(), e);
            }
        }
    }

    Ok(sheets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn skips_broken_files_and_non_toml() {
        let dir = std::env::temp_dir().join(format!("sheets-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.toml"), "name = \"期中\"\nrequired_coding = 1\n").unwrap();
        std::fs::write(dir.join("b.toml"), "name = ").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let sheets = load_all_exam_sheets(dir.to_str().unwrap()).await.unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "期中");
        assert!(sheets[0].file_path.as_deref().unwrap().ends_with("a.toml"));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn missing_folder_is_an_error() {
        let result = load_all_exam_sheets("/definitely/not/here").await;
        assert!(result.is_err());
    }
}
