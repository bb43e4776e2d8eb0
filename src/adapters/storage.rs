use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::fs;
use std::path::Path;

/// 本機檔案輸出（值班表列印與 CSV 匯出）
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn full_path(&self, path: &str) -> String {
        Path::new(&self.base_path)
            .join(path)
            .to_string_lossy()
            .into_owned()
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = Path::new(&self.base_path).join(path);
        let data = fs::read(full_path)?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().to_str().unwrap());

        storage
            .write_file("exports/duty_sheet.csv", b"ward_name\nAldersgate\n")
            .await
            .unwrap();

        let data = storage.read_file("exports/duty_sheet.csv").await.unwrap();
        assert_eq!(data, b"ward_name\nAldersgate\n");
        assert!(storage.full_path("exports/duty_sheet.csv").ends_with("duty_sheet.csv"));
    }

    #[tokio::test]
    async fn test_read_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().to_str().unwrap());
        let err = storage.read_file("missing.csv").await.unwrap_err();
        assert_eq!(err.category(), crate::utils::error::ErrorCategory::System);
    }

    #[test]
    fn test_overwrite_existing_file() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().to_str().unwrap());

        tokio_test::block_on(async {
            tokio_test::assert_ok!(storage.write_file("sheet.txt", b"first").await);
            tokio_test::assert_ok!(storage.write_file("sheet.txt", b"second").await);
            let data = tokio_test::assert_ok!(storage.read_file("sheet.txt").await);
            assert_eq!(data, b"second");
        });
    }
}
