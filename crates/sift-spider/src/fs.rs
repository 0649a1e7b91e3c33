use std::path::Path;
use tracing::trace;

/// Reads a `.json` file from `path`.
pub async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    trace!("reading file path: {}", path.display());
    let file = tokio::fs::read(path).await?;
    trace!("file read; deserializing bytes ...");
    let data: T = serde_json::from_slice(&file)?;
    Ok(data)
}

/// Writes `data` as `.json` to `path`, creating parent directories as necessary.
pub async fn write_json<T: serde::Serialize>(path: &Path, data: &T) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        trace!("checking directory path: {}", dir.display());
        tokio::fs::create_dir_all(dir).await?;
    }
    let bytes = serde_json::to_vec(data)?;
    tokio::fs::write(path, bytes).await?;
    trace!("file written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn json_buffer_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/buffer.json");
        let data: HashMap<String, String> =
            [("AAPL".to_string(), "0000320193".to_string())].into();

        write_json(&path, &data).await.unwrap();
        let read: HashMap<String, String> = read_json(&path).await.unwrap();
        assert_eq!(read, data);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let read: anyhow::Result<Vec<u8>> = read_json(&dir.path().join("none.json")).await;
        assert!(read.is_err());
    }
}
